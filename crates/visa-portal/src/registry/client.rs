use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ApplicationRegistry, RegistryError};
use crate::applications::{Application, ApplicationId, ApplicationStatus};

/// reqwest-backed client for the registry's REST collection.
pub struct HttpRegistryClient {
    http: Client,
    base_url: String,
}

impl HttpRegistryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/applications", self.base_url)
    }

    fn item_url(&self, id: &ApplicationId) -> String {
        format!("{}/applications/{}", self.base_url, id.0)
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, RegistryError> {
        let response = self.check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| RegistryError::Malformed(e.to_string()))
    }

    async fn check_status(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, RegistryError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(RegistryError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[derive(Serialize)]
struct StatusUpdateRequest {
    status: ApplicationStatus,
}

/// Registry documents carry their storage key as `_id`, usually next to the `id` we posted.
/// The posted `id` wins; `_id` stands in only when it is missing.
#[derive(Deserialize)]
struct RegistryRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "_id")]
    storage_key: Option<String>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl RegistryRecord {
    fn key(&self) -> Option<&str> {
        self.id.as_deref().or(self.storage_key.as_deref())
    }

    fn into_application(mut self) -> Result<Application, RegistryError> {
        let key = self
            .key()
            .map(str::to_string)
            .ok_or_else(|| RegistryError::Malformed("registry record has no id".to_string()))?;
        self.fields.insert("id".to_string(), Value::String(key));
        serde_json::from_value(Value::Object(self.fields))
            .map_err(|e| RegistryError::Malformed(e.to_string()))
    }
}

fn transport(error: reqwest::Error) -> RegistryError {
    RegistryError::Unavailable(error.to_string())
}

#[async_trait]
impl ApplicationRegistry for HttpRegistryClient {
    async fn list(&self) -> Result<Vec<Application>, RegistryError> {
        let response = self
            .http
            .get(self.collection_url())
            .send()
            .await
            .map_err(transport)?;
        let records: Vec<RegistryRecord> = self.handle_response(response).await?;
        records
            .into_iter()
            .map(RegistryRecord::into_application)
            .collect()
    }

    async fn create(&self, application: &Application) -> Result<ApplicationId, RegistryError> {
        let response = self
            .http
            .post(self.collection_url())
            .json(application)
            .send()
            .await
            .map_err(transport)?;
        let response = self.check_status(response).await?;

        // Some deployments answer with an empty body; the id we sent is then authoritative.
        let body = response.bytes().await.map_err(transport)?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(application.id.clone());
        }
        let created: RegistryRecord =
            serde_json::from_slice(&body).map_err(|e| RegistryError::Malformed(e.to_string()))?;
        Ok(created
            .key()
            .map(|key| ApplicationId(key.to_string()))
            .unwrap_or_else(|| application.id.clone()))
    }

    async fn update_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<(), RegistryError> {
        let response = self
            .http
            .put(self.item_url(id))
            .json(&StatusUpdateRequest { status })
            .send()
            .await
            .map_err(transport)?;
        self.check_status(response).await?;
        Ok(())
    }

    async fn delete(&self, id: &ApplicationId) -> Result<(), RegistryError> {
        let response = self
            .http
            .delete(self.item_url(id))
            .send()
            .await
            .map_err(transport)?;
        self.check_status(response).await?;
        Ok(())
    }
}

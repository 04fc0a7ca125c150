use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::applications::domain::{
    Application, ApplicationDocument, ApplicationDraft, ApplicationId, ApplicationStatus,
    DocumentStatus,
};
use crate::applications::service::ApplicationService;
use crate::applications::store::{ApplicationSnapshot, ApplicationStore};
use crate::identity::{Caller, CallerRole};
use crate::persistence::MemorySnapshots;
use crate::registry::{ApplicationRegistry, RegistryError, RegistrySync, RetryPolicy};

pub(super) type MemoryApplications = MemorySnapshots<ApplicationSnapshot>;

pub(super) fn intake_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date")
}

pub(super) fn later_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 18).expect("valid date")
}

pub(super) fn draft() -> ApplicationDraft {
    ApplicationDraft {
        user_id: "9876543212".to_string(),
        agent_id: None,
        country: "United States".to_string(),
        visa_type: "Tourist Visa".to_string(),
        applicant_name: "John Doe".to_string(),
        amount: 15000,
        documents: vec![
            ApplicationDocument {
                name: "Passport".to_string(),
                status: DocumentStatus::Verified,
            },
            ApplicationDocument {
                name: "Bank Statement".to_string(),
                status: DocumentStatus::Pending,
            },
        ],
    }
}

pub(super) fn admin() -> Caller {
    Caller::new("ADMIN001", CallerRole::Admin)
}

pub(super) fn agent() -> Caller {
    Caller::new("AGENT001", CallerRole::Agent)
}

pub(super) fn customer() -> Caller {
    Caller::new("9876543212", CallerRole::User)
}

pub(super) fn open_store() -> (ApplicationStore<MemoryApplications>, Arc<MemoryApplications>) {
    let snapshots = Arc::new(MemoryApplications::default());
    let store = ApplicationStore::open(snapshots.clone()).expect("store opens");
    (store, snapshots)
}

pub(super) fn create(store: &mut ApplicationStore<MemoryApplications>) -> ApplicationId {
    store.create(draft(), intake_day()).expect("create succeeds")
}

pub(super) fn build_service(
    registry: Option<Arc<RecordingRegistry>>,
) -> Arc<ApplicationService<MemoryApplications>> {
    let (store, _) = open_store();
    let sync = registry.map(|registry| {
        Arc::new(RegistrySync::new(
            registry,
            RetryPolicy {
                attempts: 2,
                initial_backoff: std::time::Duration::from_millis(1),
                max_backoff: std::time::Duration::from_millis(1),
            },
        ))
    });
    Arc::new(ApplicationService::new(store, sync))
}

/// Registry double recording every write; optionally refuses them.
#[derive(Default)]
pub(super) struct RecordingRegistry {
    pub(super) created: Mutex<Vec<ApplicationId>>,
    pub(super) statuses: Mutex<Vec<(ApplicationId, ApplicationStatus)>>,
    pub(super) deleted: Mutex<Vec<ApplicationId>>,
    pub(super) reads: AtomicUsize,
    pub(super) offline: bool,
}

impl RecordingRegistry {
    pub(super) fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub(super) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), RegistryError> {
        if self.offline {
            Err(RegistryError::Unavailable("registry offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ApplicationRegistry for RecordingRegistry {
    async fn list(&self) -> Result<Vec<Application>, RegistryError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(Vec::new())
    }

    async fn create(&self, application: &Application) -> Result<ApplicationId, RegistryError> {
        self.check()?;
        self.created
            .lock()
            .expect("registry mutex poisoned")
            .push(application.id.clone());
        Ok(application.id.clone())
    }

    async fn update_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<(), RegistryError> {
        self.check()?;
        self.statuses
            .lock()
            .expect("registry mutex poisoned")
            .push((id.clone(), status));
        Ok(())
    }

    async fn delete(&self, id: &ApplicationId) -> Result<(), RegistryError> {
        self.check()?;
        self.deleted
            .lock()
            .expect("registry mutex poisoned")
            .push(id.clone());
        Ok(())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

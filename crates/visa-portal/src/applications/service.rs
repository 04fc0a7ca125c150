use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use super::domain::{
    Application, ApplicationDraft, ApplicationId, ApplicationPatch, ApplicationStatus,
    StatusOverride,
};
use super::store::{ApplicationSnapshot, ApplicationStore, ApplicationStoreError};
use crate::identity::{Caller, CallerRole};
use crate::lock;
use crate::persistence::SnapshotRepository;
use crate::registry::{PushOutcome, RegistryError, RegistryListing, RegistrySync};
use crate::tracking::{TrackingLookup, TrackingProjector};

/// What happened to the registry copy after a local commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum RemoteSync {
    /// No registry is configured.
    Disabled,
    /// The local change did not need to be sent.
    Skipped,
    Acknowledged,
    Deduplicated,
    /// Sent once the registry acknowledges the write already outstanding for this application.
    Queued,
    /// The local change stands; the registry copy is behind until the next push.
    Failed(String),
}

impl From<Result<PushOutcome, RegistryError>> for RemoteSync {
    fn from(result: Result<PushOutcome, RegistryError>) -> Self {
        match result {
            Ok(PushOutcome::Acknowledged) => RemoteSync::Acknowledged,
            Ok(PushOutcome::Deduplicated) => RemoteSync::Deduplicated,
            Ok(PushOutcome::Queued) => RemoteSync::Queued,
            Err(error) => RemoteSync::Failed(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationReceipt {
    pub application: Application,
    pub remote: RemoteSync,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideReceipt {
    pub application: Application,
    #[serde(rename = "override")]
    pub event: StatusOverride,
    pub remote: RemoteSync,
}

/// Role checks around the store, plus registry pushes after each local commit.
///
/// Every mutation takes an optional expected revision, checked under the same lock as the
/// change itself. The store lock is never held across a registry call.
pub struct ApplicationService<S> {
    store: Mutex<ApplicationStore<S>>,
    registry: Option<Arc<RegistrySync>>,
}

impl<S> ApplicationService<S>
where
    S: SnapshotRepository<ApplicationSnapshot>,
{
    pub fn new(store: ApplicationStore<S>, registry: Option<Arc<RegistrySync>>) -> Self {
        Self {
            store: Mutex::new(store),
            registry,
        }
    }

    /// Intake. Signed-in customers always file under their own user id.
    pub async fn submit(
        &self,
        caller: &Caller,
        mut draft: ApplicationDraft,
    ) -> Result<ApplicationReceipt, ApplicationStoreError> {
        match caller.role {
            CallerRole::Anonymous => return Err(ApplicationStoreError::Unauthorized),
            CallerRole::User => draft.user_id = caller.id.clone(),
            CallerRole::Admin | CallerRole::Agent => {}
        }

        let application = {
            let mut store = lock(&self.store);
            let id = store.create(draft, Utc::now().date_naive())?;
            fetch(&store, &id)?
        };

        let remote = match &self.registry {
            Some(registry) => registry.push_create(&application).await.into(),
            None => RemoteSync::Disabled,
        };
        Ok(ApplicationReceipt {
            application,
            remote,
        })
    }

    pub fn get(
        &self,
        caller: &Caller,
        id: &ApplicationId,
    ) -> Result<Application, ApplicationStoreError> {
        require_staff(caller)?;
        fetch(&lock(&self.store), id)
    }

    /// Admins see every application, agents their own queue.
    pub fn list(&self, caller: &Caller) -> Result<Vec<Application>, ApplicationStoreError> {
        let store = lock(&self.store);
        match caller.role {
            CallerRole::Admin => Ok(store.applications().to_vec()),
            CallerRole::Agent => Ok(store.for_agent(&caller.id).into_iter().cloned().collect()),
            CallerRole::User | CallerRole::Anonymous => Err(ApplicationStoreError::Unauthorized),
        }
    }

    pub fn update(
        &self,
        caller: &Caller,
        id: &ApplicationId,
        patch: ApplicationPatch,
    ) -> Result<Application, ApplicationStoreError> {
        require_staff(caller)?;
        lock(&self.store).update(id, patch)
    }

    pub fn assign_agent(
        &self,
        caller: &Caller,
        id: &ApplicationId,
        agent_id: &str,
        expected_revision: Option<u64>,
    ) -> Result<Application, ApplicationStoreError> {
        require_admin(caller)?;
        let mut store = lock(&self.store);
        store.check_revision(id, expected_revision)?;
        store.assign_agent(id, agent_id.trim())?;
        fetch(&store, id)
    }

    pub async fn set_status(
        &self,
        caller: &Caller,
        id: &ApplicationId,
        status: ApplicationStatus,
        expected_revision: Option<u64>,
    ) -> Result<ApplicationReceipt, ApplicationStoreError> {
        require_staff(caller)?;
        let (changed, application) = {
            let mut store = lock(&self.store);
            store.check_revision(id, expected_revision)?;
            let changed = store.set_status(id, status)?;
            (changed, fetch(&store, id)?)
        };

        let remote = match (&self.registry, changed) {
            (None, _) => RemoteSync::Disabled,
            (Some(_), false) => RemoteSync::Skipped,
            (Some(registry), true) => registry.push_status(id, status).await.into(),
        };
        Ok(ApplicationReceipt {
            application,
            remote,
        })
    }

    /// Applied locally only; the registry does not track steps.
    pub fn advance_step(
        &self,
        caller: &Caller,
        id: &ApplicationId,
        expected_revision: Option<u64>,
    ) -> Result<Application, ApplicationStoreError> {
        require_staff(caller)?;
        let mut store = lock(&self.store);
        store.check_revision(id, expected_revision)?;
        store.advance_step(id, Utc::now().date_naive())?;
        fetch(&store, id)
    }

    pub async fn reopen(
        &self,
        caller: &Caller,
        id: &ApplicationId,
        status: ApplicationStatus,
        reason: &str,
        expected_revision: Option<u64>,
    ) -> Result<OverrideReceipt, ApplicationStoreError> {
        require_admin(caller)?;
        let (event, application) = {
            let mut store = lock(&self.store);
            store.check_revision(id, expected_revision)?;
            let event = store.reopen(id, status, caller, reason, Utc::now())?;
            (event, fetch(&store, id)?)
        };

        let remote = match &self.registry {
            Some(registry) => registry.push_status(id, status).await.into(),
            None => RemoteSync::Disabled,
        };
        Ok(OverrideReceipt {
            application,
            event,
            remote,
        })
    }

    pub fn overrides(&self, caller: &Caller) -> Result<Vec<StatusOverride>, ApplicationStoreError> {
        require_admin(caller)?;
        Ok(lock(&self.store).overrides().to_vec())
    }

    pub fn track(&self, caller: &Caller, raw_id: &str) -> TrackingLookup {
        let store = lock(&self.store);
        TrackingProjector::new(store.applications()).lookup_for(caller, raw_id)
    }

    /// Admin hard delete of the registry copy. The local application is kept.
    ///
    /// `None` when no registry is configured.
    pub async fn purge_remote(
        &self,
        caller: &Caller,
        id: &ApplicationId,
    ) -> Result<Option<RemoteSync>, ApplicationStoreError> {
        require_admin(caller)?;
        let Some(registry) = &self.registry else {
            return Ok(None);
        };
        Ok(Some(registry.remove(id).await.into()))
    }

    /// `None` when no registry is configured.
    pub async fn registry_listing(
        &self,
        caller: &Caller,
    ) -> Result<Option<RegistryListing>, ApplicationStoreError> {
        require_staff(caller)?;
        let Some(registry) = &self.registry else {
            return Ok(None);
        };
        Ok(Some(registry.listing().await))
    }
}

fn fetch<S>(
    store: &ApplicationStore<S>,
    id: &ApplicationId,
) -> Result<Application, ApplicationStoreError>
where
    S: SnapshotRepository<ApplicationSnapshot>,
{
    store
        .get(id)
        .cloned()
        .ok_or_else(|| ApplicationStoreError::NotFound(id.clone()))
}

fn require_staff(caller: &Caller) -> Result<(), ApplicationStoreError> {
    if caller.is_staff() {
        Ok(())
    } else {
        warn!(caller = %caller.id, role = caller.role.label(), "back office access refused");
        Err(ApplicationStoreError::Unauthorized)
    }
}

fn require_admin(caller: &Caller) -> Result<(), ApplicationStoreError> {
    if caller.is_admin() {
        Ok(())
    } else {
        warn!(caller = %caller.id, role = caller.role.label(), "admin access refused");
        Err(ApplicationStoreError::Unauthorized)
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{ApplicationRegistry, RegistryError};
use crate::applications::{Application, ApplicationId, ApplicationStatus};
use crate::config::RegistryConfig;
use crate::lock;

const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Bounded exponential backoff for registry reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RegistryConfig) -> Self {
        Self {
            attempts: config.read_attempts.max(1),
            initial_backoff: config.initial_backoff,
            max_backoff: DEFAULT_MAX_BACKOFF.max(config.initial_backoff),
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PushOutcome {
    Acknowledged,
    /// The same write was already outstanding for this application; nothing was sent.
    Deduplicated,
    /// Another write for this application is outstanding; this status goes out once it settles.
    Queued,
}

/// Registry contents as last seen, possibly stale.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryListing {
    pub applications: Vec<Application>,
    pub stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Coordinates registry traffic: one outstanding write per application, retried reads, and
/// a cached listing served when the registry cannot be reached.
pub struct RegistrySync {
    registry: Arc<dyn ApplicationRegistry>,
    policy: RetryPolicy,
    in_flight: Mutex<HashMap<ApplicationId, PendingWrite>>,
    last_good: Mutex<Option<Vec<Application>>>,
}

/// Bookkeeping for an application with a write on the wire.
#[derive(Debug, Default)]
struct PendingWrite {
    /// Status being sent, `None` for creates and deletes.
    sending: Option<ApplicationStatus>,
    /// Newest status requested meanwhile. Older ones are superseded.
    queued: Option<ApplicationStatus>,
}

/// Ownership of an application's write slot. Dropping it frees the slot.
struct InFlight<'a> {
    writes: &'a Mutex<HashMap<ApplicationId, PendingWrite>>,
    id: ApplicationId,
    released: bool,
}

impl InFlight<'_> {
    /// Promote the queued status, or free the slot when nothing is waiting.
    fn next_queued(&mut self) -> Option<ApplicationStatus> {
        let mut writes = lock(self.writes);
        if let Some(pending) = writes.get_mut(&self.id) {
            if let Some(status) = pending.queued.take() {
                pending.sending = Some(status);
                return Some(status);
            }
        }
        writes.remove(&self.id);
        self.released = true;
        None
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.released {
            lock(self.writes).remove(&self.id);
        }
    }
}

impl RegistrySync {
    pub fn new(registry: Arc<dyn ApplicationRegistry>, policy: RetryPolicy) -> Self {
        Self {
            registry,
            policy,
            in_flight: Mutex::new(HashMap::new()),
            last_good: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn is_in_flight(&self, id: &ApplicationId) -> bool {
        lock(&self.in_flight).contains_key(id)
    }

    fn slot(&self, id: &ApplicationId) -> InFlight<'_> {
        InFlight {
            writes: &self.in_flight,
            id: id.clone(),
            released: false,
        }
    }

    fn claim(&self, id: &ApplicationId) -> Option<InFlight<'_>> {
        let mut writes = lock(&self.in_flight);
        if writes.contains_key(id) {
            return None;
        }
        writes.insert(id.clone(), PendingWrite::default());
        Some(self.slot(id))
    }

    /// Send the status requested while the slot owner's write was outstanding.
    ///
    /// Each queued status is a new write, not a retry; a failure is logged and does not stop
    /// a status queued after it.
    async fn flush_queued(&self, mut slot: InFlight<'_>) {
        while let Some(status) = slot.next_queued() {
            match self.registry.update_status(&slot.id, status).await {
                Ok(()) => info!(
                    application_id = %slot.id,
                    status = status.label(),
                    "queued registry status acknowledged"
                ),
                Err(error) => warn!(
                    application_id = %slot.id,
                    status = status.label(),
                    %error,
                    "queued registry status push failed"
                ),
            }
        }
    }

    /// Send a freshly created application. Never retried.
    pub async fn push_create(
        &self,
        application: &Application,
    ) -> Result<PushOutcome, RegistryError> {
        let Some(slot) = self.claim(&application.id) else {
            debug!(application_id = %application.id, "registry create deduplicated");
            return Ok(PushOutcome::Deduplicated);
        };

        let created = self.registry.create(application).await;
        self.flush_queued(slot).await;

        let assigned = created.map_err(|error| {
            warn!(application_id = %application.id, %error, "registry create failed");
            error
        })?;
        if assigned != application.id {
            warn!(
                application_id = %application.id,
                registry_id = %assigned,
                "registry assigned a different id"
            );
        }
        info!(application_id = %application.id, "registry create acknowledged");
        Ok(PushOutcome::Acknowledged)
    }

    /// Send a status change. Never retried.
    ///
    /// While another write for the same id is outstanding, a repeat of the status on the wire
    /// is dropped and any other status is queued behind it, replacing an older queued one.
    pub async fn push_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<PushOutcome, RegistryError> {
        let slot = {
            let mut writes = lock(&self.in_flight);
            if let Some(pending) = writes.get_mut(id) {
                if pending.sending == Some(status) {
                    pending.queued = None;
                    debug!(application_id = %id, "registry status push deduplicated");
                    return Ok(PushOutcome::Deduplicated);
                }
                if pending.queued == Some(status) {
                    debug!(application_id = %id, "registry status push deduplicated");
                    return Ok(PushOutcome::Deduplicated);
                }
                pending.queued = Some(status);
                debug!(application_id = %id, status = status.label(), "registry status queued");
                return Ok(PushOutcome::Queued);
            }
            writes.insert(
                id.clone(),
                PendingWrite {
                    sending: Some(status),
                    queued: None,
                },
            );
            self.slot(id)
        };

        let sent = self.registry.update_status(id, status).await;
        self.flush_queued(slot).await;

        sent.map_err(|error| {
            warn!(application_id = %id, %error, "registry status push failed");
            error
        })?;
        info!(application_id = %id, status = status.label(), "registry status acknowledged");
        Ok(PushOutcome::Acknowledged)
    }

    /// Administrative hard delete on the registry side.
    pub async fn remove(&self, id: &ApplicationId) -> Result<PushOutcome, RegistryError> {
        let Some(slot) = self.claim(id) else {
            return Ok(PushOutcome::Deduplicated);
        };
        let deleted = self.registry.delete(id).await;
        // Deleting supersedes anything queued for the record.
        drop(slot);
        deleted?;
        info!(application_id = %id, "registry record deleted");
        Ok(PushOutcome::Acknowledged)
    }

    /// List the registry, retrying transient failures, and remember the result.
    pub async fn fetch_all(&self) -> Result<Vec<Application>, RegistryError> {
        let mut attempt = 1;
        loop {
            match self.registry.list().await {
                Ok(applications) => {
                    *lock(&self.last_good) = Some(applications.clone());
                    return Ok(applications);
                }
                Err(error) if error.is_transient() && attempt < self.policy.attempts => {
                    let delay = self.policy.delay(attempt);
                    warn!(attempt, ?delay, %error, "registry read failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    warn!(attempt, %error, "registry read failed");
                    return Err(error);
                }
            }
        }
    }

    pub async fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RegistryError> {
        let applications = self.fetch_all().await?;
        Ok(applications
            .into_iter()
            .find(|application| &application.id == id))
    }

    /// Fresh listing when possible, otherwise the last good one with an explanation.
    pub async fn listing(&self) -> RegistryListing {
        match self.fetch_all().await {
            Ok(applications) => RegistryListing {
                applications,
                stale: false,
                notice: None,
            },
            Err(error) => {
                let cached = lock(&self.last_good).clone();
                let notice = match &cached {
                    Some(_) => format!("showing the last known applications; {error}"),
                    None => format!("applications could not be loaded yet; {error}"),
                };
                RegistryListing {
                    applications: cached.unwrap_or_default(),
                    stale: true,
                    notice: Some(notice),
                }
            }
        }
    }
}

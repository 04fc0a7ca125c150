use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{
    Application, ApplicationDraft, ApplicationId, ApplicationPatch, ApplicationStatus,
    LifecycleError, StatusOverride,
};
use crate::identity::Caller;
use crate::persistence::{PersistenceError, SnapshotRepository};

/// Persisted form of the application store, audit log included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSnapshot {
    pub applications: Vec<Application>,
    #[serde(default)]
    pub overrides: Vec<StatusOverride>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApplicationStoreError {
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("invalid application payload: {0}")]
    Validation(String),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error("application {id} changed since revision {expected} (now {actual})")]
    StaleRevision {
        id: ApplicationId,
        expected: u64,
        actual: u64,
    },
    #[error("caller is not allowed to perform this operation")]
    Unauthorized,
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Owner of every [`Application`] and the only place lifecycle rules are enforced.
pub struct ApplicationStore<S> {
    state: ApplicationSnapshot,
    snapshots: Arc<S>,
}

impl<S> ApplicationStore<S>
where
    S: SnapshotRepository<ApplicationSnapshot>,
{
    pub fn open(snapshots: Arc<S>) -> Result<Self, ApplicationStoreError> {
        let state = snapshots.load()?.unwrap_or_default();
        info!(
            applications = state.applications.len(),
            overrides = state.overrides.len(),
            "application store loaded"
        );
        Ok(Self { state, snapshots })
    }

    pub fn get(&self, id: &ApplicationId) -> Option<&Application> {
        self.state
            .applications
            .iter()
            .find(|application| &application.id == id)
    }

    pub fn applications(&self) -> &[Application] {
        &self.state.applications
    }

    pub fn overrides(&self) -> &[StatusOverride] {
        &self.state.overrides
    }

    pub fn for_agent(&self, agent_id: &str) -> Vec<&Application> {
        self.state
            .applications
            .iter()
            .filter(|application| application.agent_id.as_deref() == Some(agent_id))
            .collect()
    }

    /// Register a new application with a fresh tracking token and the two intake steps.
    pub fn create(
        &mut self,
        draft: ApplicationDraft,
        today: NaiveDate,
    ) -> Result<ApplicationId, ApplicationStoreError> {
        draft.validate().map_err(ApplicationStoreError::Validation)?;

        let mut id = ApplicationId::generate();
        while self.get(&id).is_some() {
            id = ApplicationId::generate();
        }

        let application = draft.into_application(id.clone(), today);
        let country = application.country.clone();
        self.transact(|state| {
            state.applications.push(application);
            Ok(())
        })?;
        info!(application_id = %id, %country, "application created");
        Ok(id)
    }

    /// Fails with [`ApplicationStoreError::StaleRevision`] when `expected` is set and differs
    /// from the stored revision.
    pub fn check_revision(
        &self,
        id: &ApplicationId,
        expected: Option<u64>,
    ) -> Result<(), ApplicationStoreError> {
        let actual = self
            .get(id)
            .ok_or_else(|| ApplicationStoreError::NotFound(id.clone()))?
            .revision;
        match expected {
            Some(expected) if expected != actual => Err(ApplicationStoreError::StaleRevision {
                id: id.clone(),
                expected,
                actual,
            }),
            _ => Ok(()),
        }
    }

    pub fn update(
        &mut self,
        id: &ApplicationId,
        patch: ApplicationPatch,
    ) -> Result<Application, ApplicationStoreError> {
        patch.validate().map_err(ApplicationStoreError::Validation)?;
        self.check_revision(id, patch.expected_revision)?;

        self.transact(|state| {
            let application = find_mut(state, id)?;
            patch.apply(application);
            application.revision += 1;
            Ok(application.clone())
        })
    }

    /// Returns `false` when the application already belongs to `agent_id`.
    pub fn assign_agent(
        &mut self,
        id: &ApplicationId,
        agent_id: &str,
    ) -> Result<bool, ApplicationStoreError> {
        if agent_id.trim().is_empty() {
            return Err(ApplicationStoreError::Validation(
                "agent id is required".to_string(),
            ));
        }
        let current = self
            .get(id)
            .ok_or_else(|| ApplicationStoreError::NotFound(id.clone()))?;
        if current.agent_id.as_deref() == Some(agent_id) {
            return Ok(false);
        }

        self.transact(|state| {
            let application = find_mut(state, id)?;
            application.agent_id = Some(agent_id.to_string());
            application.revision += 1;
            Ok(())
        })?;
        info!(application_id = %id, agent_id, "application assigned");
        Ok(true)
    }

    /// Move along the forward-only path. Steps are not touched.
    pub fn set_status(
        &mut self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<bool, ApplicationStoreError> {
        let from = self
            .get(id)
            .ok_or_else(|| ApplicationStoreError::NotFound(id.clone()))?
            .status;
        if !from.check_transition(status)? {
            return Ok(false);
        }

        self.transact(|state| {
            let application = find_mut(state, id)?;
            application.status = status;
            application.revision += 1;
            Ok(())
        })?;
        info!(
            application_id = %id,
            from = from.label(),
            to = status.label(),
            "application status changed"
        );
        Ok(true)
    }

    pub fn advance_step(
        &mut self,
        id: &ApplicationId,
        today: NaiveDate,
    ) -> Result<(), ApplicationStoreError> {
        let completed = self.transact(|state| {
            let application = find_mut(state, id)?;
            application.advance_step(today)?;
            application.revision += 1;
            Ok(application.completed_steps())
        })?;
        info!(application_id = %id, completed, "application step advanced");
        Ok(())
    }

    /// Administrative override outside the forward-only path, recorded in the audit log.
    pub fn reopen(
        &mut self,
        id: &ApplicationId,
        status: ApplicationStatus,
        caller: &Caller,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<StatusOverride, ApplicationStoreError> {
        if !caller.is_admin() {
            warn!(application_id = %id, caller = %caller.id, "status override refused");
            return Err(ApplicationStoreError::Unauthorized);
        }
        if reason.trim().is_empty() {
            return Err(ApplicationStoreError::Validation(
                "override reason is required".to_string(),
            ));
        }

        let event = self.transact(|state| {
            let application = find_mut(state, id)?;
            let from = application.status;
            if from == status {
                return Err(LifecycleError::InvalidTransition { from, to: status }.into());
            }
            application.status = status;
            application.revision += 1;

            let event = StatusOverride {
                application_id: id.clone(),
                from,
                to: status,
                actor_id: caller.id.clone(),
                reason: reason.trim().to_string(),
                at,
            };
            state.overrides.push(event.clone());
            Ok(event)
        })?;
        warn!(
            application_id = %id,
            actor = %caller.id,
            from = event.from.label(),
            to = status.label(),
            "application status overridden"
        );
        Ok(event)
    }

    /// Apply `change` to a copy of the state and adopt it only once the copy is saved.
    fn transact<T>(
        &mut self,
        change: impl FnOnce(&mut ApplicationSnapshot) -> Result<T, ApplicationStoreError>,
    ) -> Result<T, ApplicationStoreError> {
        let mut next = self.state.clone();
        let outcome = change(&mut next)?;
        self.snapshots.save(&next)?;
        self.state = next;
        Ok(outcome)
    }
}

fn find_mut<'a>(
    state: &'a mut ApplicationSnapshot,
    id: &ApplicationId,
) -> Result<&'a mut Application, ApplicationStoreError> {
    state
        .applications
        .iter_mut()
        .find(|application| &application.id == id)
        .ok_or_else(|| ApplicationStoreError::NotFound(id.clone()))
}

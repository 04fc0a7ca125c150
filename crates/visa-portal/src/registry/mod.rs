//! Remote application registry.
//!
//! The registry is the system of record other portal instances read from. Local stores commit
//! first; [`RegistrySync`] then pushes changes and keeps the last good listing around for when
//! the service is down.

mod client;
mod sync;

use async_trait::async_trait;

use crate::applications::{Application, ApplicationId, ApplicationStatus};

pub use client::HttpRegistryClient;
pub use sync::{PushOutcome, RegistryListing, RegistrySync, RetryPolicy};

/// The four operations the registry exposes on its `/applications` collection.
#[async_trait]
pub trait ApplicationRegistry: Send + Sync {
    async fn list(&self) -> Result<Vec<Application>, RegistryError>;
    async fn create(&self, application: &Application) -> Result<ApplicationId, RegistryError>;
    async fn update_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<(), RegistryError>;
    async fn delete(&self, id: &ApplicationId) -> Result<(), RegistryError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("application registry unavailable: {0}")]
    Unavailable(String),
    #[error("application registry rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("application registry returned an unexpected payload: {0}")]
    Malformed(String),
}

impl RegistryError {
    /// Transport failures and server-side errors are worth another read attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            RegistryError::Unavailable(_) => true,
            RegistryError::Rejected { status, .. } => *status >= 500 || *status == 429,
            RegistryError::Malformed(_) => false,
        }
    }
}

//! Visa application lifecycle: intake, back office progression, and audited overrides.

pub mod domain;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationDocument, ApplicationDraft, ApplicationId, ApplicationPatch,
    ApplicationStatus, ApplicationStep, DocumentStatus, LifecycleError, StatusOverride,
    StepStatus, TimelineEntry,
};
pub use router::application_router;
pub use service::{ApplicationReceipt, ApplicationService, OverrideReceipt, RemoteSync};
pub use store::{ApplicationSnapshot, ApplicationStore, ApplicationStoreError};

//! Core of the visa application portal.
//!
//! Two independent halves live here: the country catalog with its faceted filter, and the
//! application lifecycle with its public tracking projection. The HTTP routers in each module
//! are thin adapters over the stores so the service binary only has to wire state together.

pub mod applications;
pub mod catalog;
pub mod config;
pub mod error;
pub mod identity;
pub mod persistence;
pub mod registry;
pub mod telemetry;
pub mod tracking;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a store mutex, recovering the guard if a previous holder panicked.
///
/// Store mutations commit atomically from the caller's point of view, so a poisoned lock still
/// guards a consistent aggregate.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

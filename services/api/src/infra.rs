use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use visa_portal::applications::{ApplicationService, ApplicationSnapshot, ApplicationStore};
use visa_portal::catalog::{
    standard_catalog, CatalogService, CatalogSnapshot, CatalogStore, FilterCriteria, FilterStore,
};
use visa_portal::config::{RegistryConfig, StorageConfig};
use visa_portal::error::AppError;
use visa_portal::persistence::{
    JsonFileSnapshots, MemorySnapshots, PersistenceError, SnapshotKey, SnapshotRepository,
};
use visa_portal::registry::{HttpRegistryClient, RegistrySync, RetryPolicy};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Snapshot storage picked at startup: a data directory when configured, memory otherwise.
pub(crate) enum Snapshots<T> {
    Memory(MemorySnapshots<T>),
    File(JsonFileSnapshots<T>),
}

impl<T> Snapshots<T> {
    pub(crate) fn for_key(data_dir: Option<&Path>, key: SnapshotKey) -> Self {
        match data_dir {
            Some(dir) => Self::File(JsonFileSnapshots::new(dir, key)),
            None => Self::Memory(MemorySnapshots::default()),
        }
    }
}

impl<T> SnapshotRepository<T> for Snapshots<T>
where
    T: Clone + Send + Serialize + DeserializeOwned,
{
    fn load(&self) -> Result<Option<T>, PersistenceError> {
        match self {
            Snapshots::Memory(inner) => inner.load(),
            Snapshots::File(inner) => inner.load(),
        }
    }

    fn save(&self, snapshot: &T) -> Result<(), PersistenceError> {
        match self {
            Snapshots::Memory(inner) => inner.save(snapshot),
            Snapshots::File(inner) => inner.save(snapshot),
        }
    }
}

pub(crate) type PortalCatalog =
    CatalogService<Snapshots<CatalogSnapshot>, Snapshots<FilterCriteria>>;
pub(crate) type PortalApplications = ApplicationService<Snapshots<ApplicationSnapshot>>;

/// Both services, wired against the configured storage and registry.
pub(crate) struct Portal {
    pub(crate) catalog: Arc<PortalCatalog>,
    pub(crate) applications: Arc<PortalApplications>,
}

impl Portal {
    pub(crate) fn open(
        storage: &StorageConfig,
        registry: &RegistryConfig,
    ) -> Result<Self, AppError> {
        let data_dir = storage.data_dir.as_deref();

        let catalog = CatalogStore::open(
            Arc::new(Snapshots::for_key(data_dir, SnapshotKey::Catalog)),
            standard_catalog(),
        )?;
        let filters = FilterStore::open(Arc::new(Snapshots::for_key(
            data_dir,
            SnapshotKey::Filters,
        )))?;
        let applications = ApplicationStore::open(Arc::new(Snapshots::for_key(
            data_dir,
            SnapshotKey::Applications,
        )))?;

        Ok(Self {
            catalog: Arc::new(CatalogService::new(catalog, filters)),
            applications: Arc::new(ApplicationService::new(
                applications,
                registry_sync(registry),
            )),
        })
    }
}

pub(crate) fn registry_sync(config: &RegistryConfig) -> Option<Arc<RegistrySync>> {
    let base_url = config.base_url.as_deref()?;
    let client = Arc::new(HttpRegistryClient::new(base_url));
    Some(Arc::new(RegistrySync::new(
        client,
        RetryPolicy::from_config(config),
    )))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

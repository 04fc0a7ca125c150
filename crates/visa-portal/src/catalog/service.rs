use std::sync::Mutex;

use tracing::warn;

use super::domain::{
    Attraction, Country, CountryDraft, CountryId, CountryPatch, Faq, TimelineStep, VisaTypeDraft,
    VisaTypePatch,
};
use super::filter::{filter_countries, FacetValue, FilterCriteria, FilterStore, FilteredCatalog};
use super::store::{CatalogError, CatalogSnapshot, CatalogStore};
use crate::identity::Caller;
use crate::lock;
use crate::persistence::SnapshotRepository;

/// Shared facade over the catalog, the persisted criteria, and the memoized view.
///
/// There is one criteria set per portal instance, persisted under `filter-storage`. Every
/// visitor of the HTTP surface reads and edits that same set; per-visitor filtering goes
/// through [`search`](Self::search), which takes its criteria from the request instead.
pub struct CatalogService<C, F> {
    catalog: Mutex<CatalogStore<C>>,
    filters: Mutex<FilterStore<F>>,
    view: Mutex<FilteredCatalog>,
}

impl<C, F> CatalogService<C, F>
where
    C: SnapshotRepository<CatalogSnapshot>,
    F: SnapshotRepository<FilterCriteria>,
{
    pub fn new(catalog: CatalogStore<C>, filters: FilterStore<F>) -> Self {
        Self {
            catalog: Mutex::new(catalog),
            filters: Mutex::new(filters),
            view: Mutex::new(FilteredCatalog::new()),
        }
    }

    /// Countries matching the persisted criteria.
    pub fn browse(&self) -> Vec<Country> {
        let criteria = lock(&self.filters).criteria().clone();
        let catalog = lock(&self.catalog);
        let mut view = lock(&self.view);
        view.view(&catalog, &criteria).to_vec()
    }

    /// One-off filter that leaves the persisted criteria and the memoized view untouched.
    pub fn search(&self, criteria: &FilterCriteria) -> Vec<Country> {
        let catalog = lock(&self.catalog);
        filter_countries(catalog.countries(), criteria)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn country(&self, id: &CountryId) -> Option<Country> {
        lock(&self.catalog).get(id).cloned()
    }

    pub fn recomputations(&self) -> u64 {
        lock(&self.view).recomputations()
    }

    pub fn criteria(&self) -> FilterCriteria {
        lock(&self.filters).criteria().clone()
    }

    pub fn toggle_filter(&self, value: FacetValue) -> Result<FilterCriteria, CatalogError> {
        let mut filters = lock(&self.filters);
        filters.toggle(value)?;
        Ok(filters.criteria().clone())
    }

    /// Drop a facet value if it is selected; unselected values leave the criteria as they are.
    pub fn remove_filter(&self, value: &FacetValue) -> Result<FilterCriteria, CatalogError> {
        let mut filters = lock(&self.filters);
        filters.remove(value)?;
        Ok(filters.criteria().clone())
    }

    pub fn set_search(&self, search: String) -> Result<FilterCriteria, CatalogError> {
        let mut filters = lock(&self.filters);
        filters.set_search(search)?;
        Ok(filters.criteria().clone())
    }

    pub fn set_price_range(&self, min: i64, max: i64) -> Result<FilterCriteria, CatalogError> {
        let mut filters = lock(&self.filters);
        filters.set_price_range(min, max)?;
        Ok(filters.criteria().clone())
    }

    pub fn clear_filters(&self) -> Result<FilterCriteria, CatalogError> {
        let mut filters = lock(&self.filters);
        filters.clear()?;
        Ok(filters.criteria().clone())
    }

    pub fn create_country(
        &self,
        caller: &Caller,
        draft: CountryDraft,
    ) -> Result<CountryId, CatalogServiceError> {
        require_admin(caller)?;
        Ok(lock(&self.catalog).create(draft)?)
    }

    pub fn update_country(
        &self,
        caller: &Caller,
        id: &CountryId,
        patch: CountryPatch,
    ) -> Result<bool, CatalogServiceError> {
        require_admin(caller)?;
        Ok(lock(&self.catalog).update(id, patch)?)
    }

    pub fn toggle_country(
        &self,
        caller: &Caller,
        id: &CountryId,
    ) -> Result<Option<bool>, CatalogServiceError> {
        require_admin(caller)?;
        Ok(lock(&self.catalog).toggle_active(id)?)
    }

    pub fn delete_country(
        &self,
        caller: &Caller,
        id: &CountryId,
    ) -> Result<bool, CatalogServiceError> {
        require_admin(caller)?;
        Ok(lock(&self.catalog).delete(id)?)
    }

    /// `None` when the country does not exist.
    pub fn add_visa_type(
        &self,
        caller: &Caller,
        country_id: &CountryId,
        draft: VisaTypeDraft,
    ) -> Result<Option<String>, CatalogServiceError> {
        require_admin(caller)?;
        Ok(lock(&self.catalog).add_visa_type(country_id, draft)?)
    }

    pub fn update_visa_type(
        &self,
        caller: &Caller,
        country_id: &CountryId,
        visa_type_id: &str,
        patch: VisaTypePatch,
    ) -> Result<bool, CatalogServiceError> {
        require_admin(caller)?;
        Ok(lock(&self.catalog).update_visa_type(country_id, visa_type_id, patch)?)
    }

    pub fn delete_visa_type(
        &self,
        caller: &Caller,
        country_id: &CountryId,
        visa_type_id: &str,
    ) -> Result<bool, CatalogServiceError> {
        require_admin(caller)?;
        Ok(lock(&self.catalog).delete_visa_type(country_id, visa_type_id)?)
    }

    pub fn replace_faqs(
        &self,
        caller: &Caller,
        id: &CountryId,
        faqs: Vec<Faq>,
    ) -> Result<bool, CatalogServiceError> {
        require_admin(caller)?;
        Ok(lock(&self.catalog).replace_faqs(id, faqs)?)
    }

    pub fn replace_attractions(
        &self,
        caller: &Caller,
        id: &CountryId,
        attractions: Vec<Attraction>,
    ) -> Result<bool, CatalogServiceError> {
        require_admin(caller)?;
        Ok(lock(&self.catalog).replace_attractions(id, attractions)?)
    }

    pub fn replace_timeline(
        &self,
        caller: &Caller,
        id: &CountryId,
        timeline: Vec<TimelineStep>,
    ) -> Result<bool, CatalogServiceError> {
        require_admin(caller)?;
        Ok(lock(&self.catalog).replace_timeline(id, timeline)?)
    }
}

fn require_admin(caller: &Caller) -> Result<(), CatalogServiceError> {
    if caller.is_admin() {
        Ok(())
    } else {
        warn!(caller = %caller.id, role = caller.role.label(), "catalog change refused");
        Err(CatalogServiceError::Unauthorized)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogServiceError {
    #[error("catalog changes require the admin role")]
    Unauthorized,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

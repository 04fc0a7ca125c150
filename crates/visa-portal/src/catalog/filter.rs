//! Faceted catalog filtering.
//!
//! [`filter_countries`] is a pure function of the country slice and the criteria. The
//! [`FilterStore`] owns the persisted criteria and [`FilteredCatalog`] memoizes the result.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{Country, VisaCategory};
use super::store::{CatalogError, CatalogSnapshot, CatalogStore};
use crate::persistence::SnapshotRepository;

pub const PRICE_DOMAIN_MIN: i64 = 0;
pub const PRICE_DOMAIN_MAX: i64 = 50_000;

/// Set of selected values for one facet. Empty means the facet is not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacetSet<T: Ord>(BTreeSet<T>);

impl<T: Ord> Default for FacetSet<T> {
    fn default() -> Self {
        Self(BTreeSet::new())
    }
}

impl<T: Ord> FacetSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: T) -> bool {
        self.0.insert(value)
    }

    pub fn remove(&mut self, value: &T) -> bool {
        self.0.remove(value)
    }

    pub fn contains(&self, value: &T) -> bool {
        self.0.contains(value)
    }

    /// Add the value if absent, remove it otherwise. Returns whether it is now selected.
    pub fn toggle(&mut self, value: T) -> bool {
        if self.0.remove(&value) {
            false
        } else {
            self.0.insert(value);
            true
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }

    /// Pass-through when empty, otherwise true if any candidate is selected.
    fn admits<'a>(&self, mut candidates: impl Iterator<Item = &'a T>) -> bool
    where
        T: 'a,
    {
        self.is_empty() || candidates.any(|candidate| self.contains(candidate))
    }
}

impl<T: Ord> FromIterator<T> for FacetSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Inclusive price bounds, serialized as `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i64; 2]", into = "[i64; 2]")]
pub struct PriceRange {
    pub min: i64,
    pub max: i64,
}

impl PriceRange {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub const fn full() -> Self {
        Self::new(PRICE_DOMAIN_MIN, PRICE_DOMAIN_MAX)
    }

    pub fn contains(&self, price: i64) -> bool {
        self.min <= price && price <= self.max
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self::full()
    }
}

impl From<[i64; 2]> for PriceRange {
    fn from([min, max]: [i64; 2]) -> Self {
        Self::new(min, max)
    }
}

impl From<PriceRange> for [i64; 2] {
    fn from(range: PriceRange) -> Self {
        [range.min, range.max]
    }
}

/// One selectable facet value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "facet", content = "value", rename_all = "snake_case")]
pub enum FacetValue {
    Continent(String),
    VisaCategory(VisaCategory),
    ProcessingTime(String),
    Tag(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    pub search: String,
    pub continents: FacetSet<String>,
    pub visa_categories: FacetSet<VisaCategory>,
    pub processing_times: FacetSet<String>,
    pub tags: FacetSet<String>,
    pub price_range: PriceRange,
}

impl FilterCriteria {
    pub fn toggle(&mut self, value: FacetValue) -> bool {
        match value {
            FacetValue::Continent(value) => self.continents.toggle(value),
            FacetValue::VisaCategory(value) => self.visa_categories.toggle(value),
            FacetValue::ProcessingTime(value) => self.processing_times.toggle(value),
            FacetValue::Tag(value) => self.tags.toggle(value),
        }
    }

    pub fn remove(&mut self, value: &FacetValue) -> bool {
        match value {
            FacetValue::Continent(value) => self.continents.remove(value),
            FacetValue::VisaCategory(value) => self.visa_categories.remove(value),
            FacetValue::ProcessingTime(value) => self.processing_times.remove(value),
            FacetValue::Tag(value) => self.tags.remove(value),
        }
    }

    pub fn with(mut self, value: FacetValue) -> Self {
        match value {
            FacetValue::Continent(value) => self.continents.insert(value),
            FacetValue::VisaCategory(value) => self.visa_categories.insert(value),
            FacetValue::ProcessingTime(value) => self.processing_times.insert(value),
            FacetValue::Tag(value) => self.tags.insert(value),
        };
        self
    }

    pub fn with_price_range(mut self, min: i64, max: i64) -> Self {
        self.price_range = PriceRange::new(min, max);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn matches(&self, country: &Country) -> bool {
        country.is_active
            && self.matches_search(country)
            && self.continents.admits(std::iter::once(&country.continent))
            && self
                .visa_categories
                .admits(country.visa_types.iter().map(|visa_type| &visa_type.category))
            && self
                .processing_times
                .admits(std::iter::once(&country.processing_time))
            && self.tags.admits(country.tags.iter())
            && self.price_range.contains(country.price)
    }

    fn matches_search(&self, country: &Country) -> bool {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        country.name.to_lowercase().contains(&needle)
            || country
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(&needle))
            || country
                .visa_types
                .iter()
                .any(|visa_type| visa_type.name.to_lowercase().contains(&needle))
    }
}

/// Active countries matching `criteria`, in catalog order.
pub fn filter_countries<'a>(
    countries: &'a [Country],
    criteria: &FilterCriteria,
) -> Vec<&'a Country> {
    countries
        .iter()
        .filter(|country| criteria.matches(country))
        .collect()
}

/// Owner of the portal's current criteria, persisted after every change.
///
/// The criteria are a single instance-wide set, not per visitor: every caller of the
/// `/api/v1/filters` routes sees and edits the same selection.
pub struct FilterStore<S> {
    criteria: FilterCriteria,
    snapshots: Arc<S>,
}

impl<S> FilterStore<S>
where
    S: SnapshotRepository<FilterCriteria>,
{
    pub fn open(snapshots: Arc<S>) -> Result<Self, CatalogError> {
        let criteria = snapshots.load()?.unwrap_or_default();
        Ok(Self {
            criteria,
            snapshots,
        })
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn toggle(&mut self, value: FacetValue) -> Result<bool, CatalogError> {
        let mut next = self.criteria.clone();
        let selected = next.toggle(value);
        self.commit(next)?;
        Ok(selected)
    }

    pub fn remove(&mut self, value: &FacetValue) -> Result<bool, CatalogError> {
        let mut next = self.criteria.clone();
        if !next.remove(value) {
            return Ok(false);
        }
        self.commit(next)?;
        Ok(true)
    }

    pub fn set_search(&mut self, search: impl Into<String>) -> Result<(), CatalogError> {
        let next = self.criteria.clone().with_search(search);
        self.commit(next)
    }

    pub fn set_price_range(&mut self, min: i64, max: i64) -> Result<(), CatalogError> {
        if min < 0 || min > max {
            return Err(CatalogError::Validation(format!(
                "price range [{min}, {max}] is not a valid interval"
            )));
        }
        let next = self.criteria.clone().with_price_range(min, max);
        self.commit(next)
    }

    pub fn clear(&mut self) -> Result<(), CatalogError> {
        self.commit(FilterCriteria::default())
    }

    /// Criteria only change once `next` is saved.
    fn commit(&mut self, next: FilterCriteria) -> Result<(), CatalogError> {
        self.snapshots.save(&next)?;
        self.criteria = next;
        Ok(())
    }
}

/// Memoized filter results keyed on catalog revision and criteria.
///
/// A view is bound to a single catalog; pass the same store on every call.
#[derive(Debug, Default)]
pub struct FilteredCatalog {
    cached: Option<CachedView>,
    recomputations: u64,
}

#[derive(Debug)]
struct CachedView {
    revision: u64,
    criteria: FilterCriteria,
    countries: Vec<Country>,
}

impl FilteredCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view<S>(
        &mut self,
        catalog: &CatalogStore<S>,
        criteria: &FilterCriteria,
    ) -> &[Country]
    where
        S: SnapshotRepository<CatalogSnapshot>,
    {
        let fresh = matches!(
            &self.cached,
            Some(cached) if cached.revision == catalog.revision() && &cached.criteria == criteria
        );

        if !fresh {
            self.recomputations += 1;
            let countries: Vec<Country> = filter_countries(catalog.countries(), criteria)
                .into_iter()
                .cloned()
                .collect();
            debug!(
                revision = catalog.revision(),
                matched = countries.len(),
                "filtered catalog recomputed"
            );
            self.cached = Some(CachedView {
                revision: catalog.revision(),
                criteria: criteria.clone(),
                countries,
            });
        }

        self.cached
            .as_ref()
            .map(|cached| cached.countries.as_slice())
            .unwrap_or_default()
    }

    /// How many times the filter actually ran.
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }
}

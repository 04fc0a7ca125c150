//! Country catalog: the admin-maintained registry and the faceted filter over it.

pub mod domain;
pub mod filter;
pub mod router;
pub mod seed;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    Attraction, Country, CountryDraft, CountryId, CountryPatch, Faq, PeakSeason, TimelineStep,
    VisaCategory, VisaType, VisaTypeDraft, VisaTypePatch,
};
pub use filter::{
    filter_countries, FacetSet, FacetValue, FilterCriteria, FilterStore, FilteredCatalog,
    PriceRange,
};
pub use router::catalog_router;
pub use seed::standard_catalog;
pub use service::{CatalogService, CatalogServiceError};
pub use store::{CatalogError, CatalogSnapshot, CatalogStore};

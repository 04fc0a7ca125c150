use super::common::*;
use crate::catalog::domain::{CountryId, CountryPatch, VisaCategory};
use crate::catalog::filter::{
    filter_countries, FacetSet, FacetValue, FilterCriteria, FilterStore, FilteredCatalog,
    PriceRange,
};
use crate::catalog::store::CatalogError;
use crate::persistence::SwitchableSnapshots;
use std::sync::Arc;

fn continent(value: &str) -> FacetValue {
    FacetValue::Continent(value.to_string())
}

fn tag(value: &str) -> FacetValue {
    FacetValue::Tag(value.to_string())
}

#[test]
fn scenario_asia_under_ten_thousand_yields_only_active_match() {
    let catalog = scenario_catalog();
    let criteria = FilterCriteria::default()
        .with(continent("asia"))
        .with_price_range(0, 10_000);

    let result = filter_countries(&catalog, &criteria);
    assert_eq!(ids(&result), vec!["a"]);
}

#[test]
fn default_criteria_return_active_entries_in_catalog_order() {
    let catalog = varied_catalog();
    let result = filter_countries(&catalog, &FilterCriteria::default());

    assert_eq!(ids(&result), vec!["jp", "ae", "de", "ke"]);
}

#[test]
fn inactive_entries_never_pass_even_when_every_facet_matches() {
    let catalog = varied_catalog();
    let criteria = FilterCriteria::default()
        .with(continent("asia"))
        .with(tag("quick"))
        .with_search("closed");

    assert!(filter_countries(&catalog, &criteria).is_empty());
}

#[test]
fn toggling_the_same_value_twice_restores_the_result() {
    let catalog = varied_catalog();
    let base = FilterCriteria::default().with(tag("tourist"));
    let before = ids(&filter_countries(&catalog, &base));

    let mut criteria = base.clone();
    assert!(criteria.toggle(continent("asia")));
    assert_eq!(ids(&filter_countries(&catalog, &criteria)), vec!["jp"]);
    assert!(!criteria.toggle(continent("asia")));

    assert_eq!(criteria, base);
    assert_eq!(ids(&filter_countries(&catalog, &criteria)), before);
}

#[test]
fn widening_a_facet_never_shrinks_and_adding_a_facet_never_grows() {
    let catalog = varied_catalog();
    let narrow = FilterCriteria::default().with(continent("europe"));
    let wider = narrow.clone().with(continent("africa"));
    let narrow_ids = ids(&filter_countries(&catalog, &narrow));
    let wider_ids = ids(&filter_countries(&catalog, &wider));

    assert!(narrow_ids.iter().all(|id| wider_ids.contains(id)));
    assert_eq!(wider_ids, vec!["de", "ke"]);

    let constrained = wider.clone().with(tag("student"));
    let constrained_ids = ids(&filter_countries(&catalog, &constrained));
    assert!(constrained_ids.iter().all(|id| wider_ids.contains(id)));
    assert_eq!(constrained_ids, vec!["de"]);
}

#[test]
fn search_is_case_insensitive_across_name_tags_and_visa_names() {
    let catalog = varied_catalog();

    let by_name = FilterCriteria::default().with_search("JAPAN");
    assert_eq!(ids(&filter_countries(&catalog, &by_name)), vec!["jp"]);

    let by_tag = FilterCriteria::default().with_search("Stud");
    assert_eq!(ids(&filter_countries(&catalog, &by_tag)), vec!["de"]);

    let by_visa = FilterCriteria::default().with_search("safari");
    assert_eq!(ids(&filter_countries(&catalog, &by_visa)), vec!["ke"]);
}

#[test]
fn visa_category_facet_matches_any_offered_type() {
    let catalog = varied_catalog();
    let criteria = FilterCriteria::default()
        .with(FacetValue::VisaCategory(VisaCategory::OnArrival))
        .with(FacetValue::VisaCategory(VisaCategory::Sticker));

    assert_eq!(
        ids(&filter_countries(&catalog, &criteria)),
        vec!["jp", "ae", "de"]
    );
}

#[test]
fn processing_time_facet_matches_bucket_labels() {
    let catalog = varied_catalog();
    let criteria = FilterCriteria::default()
        .with(FacetValue::ProcessingTime("24h".to_string()))
        .with(FacetValue::ProcessingTime("1w".to_string()));

    assert_eq!(ids(&filter_countries(&catalog, &criteria)), vec!["jp", "ae"]);
}

#[test]
fn price_bounds_are_inclusive() {
    let catalog = varied_catalog();
    let criteria = FilterCriteria::default().with_price_range(6500, 9000);

    assert_eq!(ids(&filter_countries(&catalog, &criteria)), vec!["jp", "ae"]);
}

#[test]
fn facet_set_has_no_duplicates() {
    let mut set: FacetSet<String> = ["asia", "asia", "europe"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(set.len(), 2);
    assert!(!set.insert("asia".to_string()));
    assert!(set.remove(&"asia".to_string()));
    assert!(!set.contains(&"asia".to_string()));
}

#[test]
fn criteria_serialize_in_portal_shape() {
    let criteria = FilterCriteria::default()
        .with(continent("asia"))
        .with(FacetValue::VisaCategory(VisaCategory::EVisa));
    let json = serde_json::to_value(&criteria).expect("serializes");

    assert_eq!(json["priceRange"], serde_json::json!([0, 50000]));
    assert_eq!(json["visaCategories"], serde_json::json!(["e-visa"]));

    let parsed: FilterCriteria =
        serde_json::from_value(serde_json::json!({ "continents": ["europe"] }))
            .expect("partial criteria parse");
    assert_eq!(parsed.price_range, PriceRange::full());
    assert!(parsed.continents.contains(&"europe".to_string()));
}

#[test]
fn memoized_view_recomputes_only_on_criteria_or_catalog_change() {
    let (mut store, _) = open_store(varied_catalog());
    let mut view = FilteredCatalog::new();
    let criteria = FilterCriteria::default().with(continent("asia"));

    assert_eq!(view.view(&store, &criteria).len(), 2);
    assert_eq!(view.view(&store, &criteria).len(), 2);
    assert_eq!(view.recomputations(), 1);

    let wider = criteria.clone().with(continent("africa"));
    assert_eq!(view.view(&store, &wider).len(), 3);
    assert_eq!(view.recomputations(), 2);

    store
        .update(
            &CountryId("ke".to_string()),
            CountryPatch {
                is_active: Some(false),
                ..CountryPatch::default()
            },
        )
        .expect("update");
    assert_eq!(view.view(&store, &wider).len(), 2);
    assert_eq!(view.recomputations(), 3);

    store
        .update(&CountryId("missing".to_string()), CountryPatch::default())
        .expect("no-op");
    view.view(&store, &wider);
    assert_eq!(view.recomputations(), 3);
}

#[test]
fn filter_store_persists_every_change() {
    let snapshots = Arc::new(MemoryFilters::default());
    let mut filters = FilterStore::open(snapshots.clone()).expect("opens");

    assert!(filters.toggle(continent("asia")).expect("toggle"));
    filters.set_search("visa").expect("search");
    filters.set_price_range(1000, 9000).expect("price");
    assert_eq!(snapshots.save_count(), 3);

    let reopened = FilterStore::open(snapshots.clone()).expect("reopens");
    assert_eq!(reopened.criteria(), filters.criteria());

    assert!(!filters.remove(&tag("absent")).expect("remove"));
    assert_eq!(snapshots.save_count(), 3);

    filters.clear().expect("clear");
    assert_eq!(filters.criteria(), &FilterCriteria::default());
}

#[test]
fn filter_store_keeps_criteria_when_a_save_fails() {
    let snapshots = Arc::new(SwitchableSnapshots::<FilterCriteria>::default());
    let mut filters = FilterStore::open(snapshots.clone()).expect("opens");
    assert!(filters.toggle(continent("asia")).expect("toggle"));
    let saved = filters.criteria().clone();

    snapshots.refuse_saves();
    assert!(matches!(
        filters.toggle(continent("europe")),
        Err(CatalogError::Persistence(_))
    ));
    assert!(filters.remove(&continent("asia")).is_err());
    assert!(filters.set_search("japan").is_err());
    assert!(filters.set_price_range(0, 100).is_err());
    assert!(filters.clear().is_err());

    assert_eq!(filters.criteria(), &saved);
    assert_eq!(snapshots.current(), Some(saved));
}

#[test]
fn filter_store_rejects_inverted_price_range() {
    let mut filters = FilterStore::open(Arc::new(MemoryFilters::default())).expect("opens");

    assert!(matches!(
        filters.set_price_range(9000, 1000),
        Err(CatalogError::Validation(_))
    ));
    assert_eq!(filters.criteria().price_range, PriceRange::full());
}

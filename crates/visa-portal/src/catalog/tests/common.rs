use std::collections::BTreeSet;
use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::catalog::domain::{
    Country, CountryDraft, CountryId, PeakSeason, VisaCategory, VisaType, VisaTypeDraft,
};
use crate::catalog::filter::{FilterCriteria, FilterStore};
use crate::catalog::service::CatalogService;
use crate::catalog::store::{CatalogSnapshot, CatalogStore};
use crate::persistence::MemorySnapshots;

pub(super) type MemoryCatalog = MemorySnapshots<CatalogSnapshot>;
pub(super) type MemoryFilters = MemorySnapshots<FilterCriteria>;

pub(super) fn country(
    id: &str,
    continent: &str,
    price: i64,
    tags: &[&str],
    active: bool,
) -> Country {
    Country {
        id: CountryId(id.to_string()),
        name: format!("Country {}", id.to_uppercase()),
        code: id.to_uppercase(),
        flag: String::new(),
        visa_types: vec![visa_type(
            &format!("tourist-{id}"),
            "Tourist Visa",
            VisaCategory::EVisa,
        )],
        processing_time: "3d".to_string(),
        price,
        fees: 500,
        image_url: String::new(),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        continent: continent.to_string(),
        popularity: 80,
        requirements: vec!["passport".to_string()],
        is_active: active,
        success_rate: 95.0,
        peak_season: PeakSeason::default(),
        attractions: Vec::new(),
        timeline: Vec::new(),
        faqs: Vec::new(),
    }
}

pub(super) fn visa_type(id: &str, name: &str, category: VisaCategory) -> VisaType {
    VisaType {
        id: id.to_string(),
        name: name.to_string(),
        duration: "30 days".to_string(),
        price: 4000,
        processing_time: "3d".to_string(),
        category,
        description: None,
        requirements: Vec::new(),
        is_popular: false,
    }
}

/// Three-country catalog: active asia, active europe, inactive asia.
pub(super) fn scenario_catalog() -> Vec<Country> {
    vec![
        country("a", "asia", 5000, &["tourist"], true),
        country("b", "europe", 20000, &["business"], true),
        country("c", "asia", 45000, &["tourist"], false),
    ]
}

pub(super) fn varied_catalog() -> Vec<Country> {
    let mut japan = country("jp", "asia", 9000, &["tourist", "popular"], true);
    japan.name = "Japan".to_string();
    japan.processing_time = "1w".to_string();
    japan.visa_types = vec![visa_type("jp-sticker", "Tourist Visa", VisaCategory::Sticker)];

    let mut dubai = country("ae", "asia", 6500, &["quick"], true);
    dubai.name = "United Arab Emirates".to_string();
    dubai.processing_time = "24h".to_string();
    dubai.visa_types = vec![
        visa_type("ae-evisa", "Tourist e-Visa", VisaCategory::EVisa),
        visa_type("ae-transit", "Transit Visa", VisaCategory::OnArrival),
    ];

    let mut germany = country("de", "europe", 15000, &["business", "student"], true);
    germany.name = "Germany".to_string();
    germany.processing_time = "2w".to_string();
    germany.visa_types = vec![visa_type("de-work", "Work Permit", VisaCategory::Sticker)];

    let mut kenya = country("ke", "africa", 5200, &["tourist"], true);
    kenya.name = "Kenya".to_string();
    kenya.visa_types = vec![visa_type("ke-evisa", "Safari e-Visa", VisaCategory::EVisa)];

    let mut closed = country("xx", "asia", 1000, &["tourist", "quick"], false);
    closed.name = "Closed Borders".to_string();

    vec![japan, dubai, germany, kenya, closed]
}

pub(super) fn draft(name: &str) -> CountryDraft {
    CountryDraft {
        name: name.to_string(),
        code: name.chars().take(2).collect::<String>().to_uppercase(),
        continent: "europe".to_string(),
        processing_time: "1w".to_string(),
        price: 12000,
        fees: 800,
        tags: BTreeSet::from(["tourist".to_string()]),
        success_rate: 90.0,
        visa_types: vec![VisaTypeDraft {
            name: "Schengen Visa".to_string(),
            duration: "90 days".to_string(),
            price: 12000,
            processing_time: "2w".to_string(),
            category: VisaCategory::Sticker,
            description: None,
            requirements: Vec::new(),
            is_popular: true,
        }],
        ..CountryDraft::default()
    }
}

pub(super) fn open_store(
    countries: Vec<Country>,
) -> (CatalogStore<MemoryCatalog>, Arc<MemoryCatalog>) {
    let snapshots = Arc::new(MemoryCatalog::default());
    let store = CatalogStore::open(snapshots.clone(), countries).expect("catalog opens");
    (store, snapshots)
}

pub(super) fn ids(countries: &[&Country]) -> Vec<String> {
    countries.iter().map(|country| country.id.0.clone()).collect()
}

pub(super) fn build_service(
    countries: Vec<Country>,
) -> Arc<CatalogService<MemoryCatalog, MemoryFilters>> {
    let (catalog, _) = open_store(countries);
    let filters = FilterStore::open(Arc::new(MemoryFilters::default())).expect("filters open");
    Arc::new(CatalogService::new(catalog, filters))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

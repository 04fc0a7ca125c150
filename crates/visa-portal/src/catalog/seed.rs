//! Built-in starter catalog used when no snapshot has been saved yet.

use std::collections::BTreeSet;

use super::domain::{Country, CountryId, PeakSeason, TimelineStep, VisaCategory, VisaType};

struct SeedEntry {
    name: &'static str,
    code: &'static str,
    continent: &'static str,
    price: i64,
    fees: i64,
    processing_time: &'static str,
    tags: &'static [&'static str],
    tourist_category: VisaCategory,
    popularity: u32,
    success_rate: f32,
    peak_months: &'static str,
}

const ENTRIES: &[SeedEntry] = &[
    SeedEntry {
        name: "United Arab Emirates",
        code: "AE",
        continent: "asia",
        price: 6500,
        fees: 750,
        processing_time: "24h",
        tags: &["popular", "quick", "tourist"],
        tourist_category: VisaCategory::EVisa,
        popularity: 94,
        success_rate: 98.5,
        peak_months: "November - March",
    },
    SeedEntry {
        name: "Thailand",
        code: "TH",
        continent: "asia",
        price: 4000,
        fees: 500,
        processing_time: "3d",
        tags: &["budget", "family", "tourist"],
        tourist_category: VisaCategory::OnArrival,
        popularity: 91,
        success_rate: 97.0,
        peak_months: "December - February",
    },
    SeedEntry {
        name: "United Kingdom",
        code: "GB",
        continent: "europe",
        price: 18000,
        fees: 1200,
        processing_time: "2w",
        tags: &["business", "student"],
        tourist_category: VisaCategory::Sticker,
        popularity: 88,
        success_rate: 92.0,
        peak_months: "June - August",
    },
    SeedEntry {
        name: "France",
        code: "FR",
        continent: "europe",
        price: 15000,
        fees: 1100,
        processing_time: "2w",
        tags: &["family", "popular", "tourist"],
        tourist_category: VisaCategory::Sticker,
        popularity: 86,
        success_rate: 90.5,
        peak_months: "April - June",
    },
    SeedEntry {
        name: "United States",
        code: "US",
        continent: "americas",
        price: 32000,
        fees: 1500,
        processing_time: "2w",
        tags: &["business", "popular", "student"],
        tourist_category: VisaCategory::Sticker,
        popularity: 90,
        success_rate: 81.0,
        peak_months: "June - August",
    },
    SeedEntry {
        name: "Kenya",
        code: "KE",
        continent: "africa",
        price: 5200,
        fees: 600,
        processing_time: "3d",
        tags: &["quick", "tourist"],
        tourist_category: VisaCategory::EVisa,
        popularity: 72,
        success_rate: 96.0,
        peak_months: "July - October",
    },
    SeedEntry {
        name: "Australia",
        code: "AU",
        continent: "oceania",
        price: 14000,
        fees: 900,
        processing_time: "1w",
        tags: &["family", "student", "tourist"],
        tourist_category: VisaCategory::EVisa,
        popularity: 84,
        success_rate: 93.5,
        peak_months: "December - February",
    },
];

/// Deterministic starter catalog, ordered by descending popularity.
pub fn standard_catalog() -> Vec<Country> {
    let mut countries: Vec<Country> = ENTRIES.iter().map(seed_country).collect();
    countries.sort_by(|a, b| b.popularity.cmp(&a.popularity));
    countries
}

fn slug(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

fn seed_country(entry: &SeedEntry) -> Country {
    let slug = slug(entry.name);
    let tags: BTreeSet<String> = entry.tags.iter().map(|tag| tag.to_string()).collect();

    Country {
        id: CountryId(slug.clone()),
        name: entry.name.to_string(),
        code: entry.code.to_string(),
        flag: format!("https://flagcdn.com/{}.svg", entry.code.to_lowercase()),
        visa_types: vec![
            VisaType {
                id: format!("tourist-{slug}"),
                name: "Tourist Visa".to_string(),
                duration: "30 days".to_string(),
                price: entry.price,
                processing_time: entry.processing_time.to_string(),
                category: entry.tourist_category,
                description: None,
                requirements: Vec::new(),
                is_popular: true,
            },
            VisaType {
                id: format!("business-{slug}"),
                name: "Business Visa".to_string(),
                duration: "90 days".to_string(),
                price: entry.price + 9000,
                processing_time: "2w".to_string(),
                category: VisaCategory::Sticker,
                description: None,
                requirements: Vec::new(),
                is_popular: false,
            },
        ],
        processing_time: entry.processing_time.to_string(),
        price: entry.price,
        fees: entry.fees,
        image_url: String::new(),
        tags,
        continent: entry.continent.to_string(),
        popularity: entry.popularity,
        requirements: vec![
            "passport".to_string(),
            "photo".to_string(),
            "bank_statement".to_string(),
        ],
        is_active: true,
        success_rate: entry.success_rate,
        peak_season: PeakSeason {
            months: entry.peak_months.to_string(),
            temperature: String::new(),
            rainfall: String::new(),
            events: Vec::new(),
        },
        attractions: Vec::new(),
        timeline: vec![
            TimelineStep {
                step: 1,
                title: "Submit documents".to_string(),
                description: "Upload passport scans and photographs".to_string(),
            },
            TimelineStep {
                step: 2,
                title: "Embassy review".to_string(),
                description: "Application is reviewed by the issuing authority".to_string(),
            },
            TimelineStep {
                step: 3,
                title: "Visa issued".to_string(),
                description: "Visa is delivered by e-mail or courier".to_string(),
            },
        ],
        faqs: Vec::new(),
    }
}

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Identifier wrapper for catalog countries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountryId(pub String);

impl CountryId {
    pub fn generate() -> Self {
        Self(nanoid::nanoid!())
    }
}

/// How the visa is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VisaCategory {
    #[serde(rename = "sticker")]
    Sticker,
    #[serde(rename = "e-visa")]
    EVisa,
    #[serde(rename = "on-arrival")]
    OnArrival,
}

impl VisaCategory {
    pub const fn label(self) -> &'static str {
        match self {
            VisaCategory::Sticker => "sticker",
            VisaCategory::EVisa => "e-visa",
            VisaCategory::OnArrival => "on-arrival",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisaType {
    pub id: String,
    pub name: String,
    pub duration: String,
    pub price: i64,
    pub processing_time: String,
    #[serde(rename = "type")]
    pub category: VisaCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub is_popular: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakSeason {
    pub months: String,
    pub temperature: String,
    pub rainfall: String,
    #[serde(default)]
    pub events: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attraction {
    pub name: String,
    pub description: String,
    pub image: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineStep {
    pub step: u32,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faq {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub category: String,
}

/// Catalog aggregate. Only [`CatalogStore`](super::CatalogStore) mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub id: CountryId,
    pub name: String,
    pub code: String,
    pub flag: String,
    #[serde(default)]
    pub visa_types: Vec<VisaType>,
    pub processing_time: String,
    pub price: i64,
    pub fees: i64,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub continent: String,
    #[serde(default)]
    pub popularity: u32,
    #[serde(default)]
    pub requirements: Vec<String>,
    pub is_active: bool,
    #[serde(default)]
    pub success_rate: f32,
    #[serde(default)]
    pub peak_season: PeakSeason,
    #[serde(default)]
    pub attractions: Vec<Attraction>,
    #[serde(default)]
    pub timeline: Vec<TimelineStep>,
    #[serde(default)]
    pub faqs: Vec<Faq>,
}

/// Admin-supplied payload for a new country.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CountryDraft {
    pub name: String,
    pub code: String,
    pub flag: String,
    pub visa_types: Vec<VisaTypeDraft>,
    pub processing_time: String,
    pub price: i64,
    pub fees: i64,
    pub image_url: String,
    pub tags: BTreeSet<String>,
    pub continent: String,
    pub popularity: u32,
    pub requirements: Vec<String>,
    pub is_active: Option<bool>,
    pub success_rate: f32,
    pub peak_season: PeakSeason,
    pub attractions: Vec<Attraction>,
    pub timeline: Vec<TimelineStep>,
    pub faqs: Vec<Faq>,
}

impl CountryDraft {
    pub(crate) fn validate(&self) -> Result<(), String> {
        require_text("name", &self.name)?;
        require_text("code", &self.code)?;
        require_text("continent", &self.continent)?;
        require_non_negative("price", self.price)?;
        require_non_negative("fees", self.fees)?;
        require_success_rate(self.success_rate)?;
        for visa_type in &self.visa_types {
            visa_type.validate()?;
        }
        Ok(())
    }

    pub(crate) fn into_country(self, id: CountryId) -> Country {
        Country {
            id,
            name: self.name.trim().to_string(),
            code: self.code.trim().to_string(),
            flag: self.flag,
            visa_types: self
                .visa_types
                .into_iter()
                .map(VisaTypeDraft::into_visa_type)
                .collect(),
            processing_time: self.processing_time,
            price: self.price,
            fees: self.fees,
            image_url: self.image_url,
            tags: self.tags,
            continent: self.continent.trim().to_string(),
            popularity: self.popularity,
            requirements: self.requirements,
            is_active: self.is_active.unwrap_or(true),
            success_rate: self.success_rate,
            peak_season: self.peak_season,
            attractions: self.attractions,
            timeline: self.timeline,
            faqs: self.faqs,
        }
    }
}

/// Partial country update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CountryPatch {
    pub name: Option<String>,
    pub code: Option<String>,
    pub flag: Option<String>,
    pub processing_time: Option<String>,
    pub price: Option<i64>,
    pub fees: Option<i64>,
    pub image_url: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub continent: Option<String>,
    pub popularity: Option<u32>,
    pub requirements: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub success_rate: Option<f32>,
    pub peak_season: Option<PeakSeason>,
}

impl CountryPatch {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        if let Some(code) = &self.code {
            require_text("code", code)?;
        }
        if let Some(continent) = &self.continent {
            require_text("continent", continent)?;
        }
        if let Some(price) = self.price {
            require_non_negative("price", price)?;
        }
        if let Some(fees) = self.fees {
            require_non_negative("fees", fees)?;
        }
        if let Some(rate) = self.success_rate {
            require_success_rate(rate)?;
        }
        Ok(())
    }

    pub(crate) fn apply(self, country: &mut Country) {
        let CountryPatch {
            name,
            code,
            flag,
            processing_time,
            price,
            fees,
            image_url,
            tags,
            continent,
            popularity,
            requirements,
            is_active,
            success_rate,
            peak_season,
        } = self;

        merge(&mut country.name, name);
        merge(&mut country.code, code);
        merge(&mut country.flag, flag);
        merge(&mut country.processing_time, processing_time);
        merge(&mut country.price, price);
        merge(&mut country.fees, fees);
        merge(&mut country.image_url, image_url);
        merge(&mut country.tags, tags);
        merge(&mut country.continent, continent);
        merge(&mut country.popularity, popularity);
        merge(&mut country.requirements, requirements);
        merge(&mut country.is_active, is_active);
        merge(&mut country.success_rate, success_rate);
        merge(&mut country.peak_season, peak_season);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisaTypeDraft {
    pub name: String,
    pub duration: String,
    pub price: i64,
    pub processing_time: String,
    #[serde(rename = "type")]
    pub category: VisaCategory,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub is_popular: bool,
}

impl VisaTypeDraft {
    pub(crate) fn validate(&self) -> Result<(), String> {
        require_text("visa type name", &self.name)?;
        require_non_negative("visa type price", self.price)
    }

    pub(crate) fn into_visa_type(self) -> VisaType {
        VisaType {
            id: nanoid::nanoid!(),
            name: self.name,
            duration: self.duration,
            price: self.price,
            processing_time: self.processing_time,
            category: self.category,
            description: self.description,
            requirements: self.requirements,
            is_popular: self.is_popular,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisaTypePatch {
    pub name: Option<String>,
    pub duration: Option<String>,
    pub price: Option<i64>,
    pub processing_time: Option<String>,
    #[serde(rename = "type")]
    pub category: Option<VisaCategory>,
    pub description: Option<String>,
    pub requirements: Option<Vec<String>>,
    pub is_popular: Option<bool>,
}

impl VisaTypePatch {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            require_text("visa type name", name)?;
        }
        if let Some(price) = self.price {
            require_non_negative("visa type price", price)?;
        }
        Ok(())
    }

    pub(crate) fn apply(self, visa_type: &mut VisaType) {
        merge(&mut visa_type.name, self.name);
        merge(&mut visa_type.duration, self.duration);
        merge(&mut visa_type.price, self.price);
        merge(&mut visa_type.processing_time, self.processing_time);
        merge(&mut visa_type.category, self.category);
        if self.description.is_some() {
            visa_type.description = self.description;
        }
        merge(&mut visa_type.requirements, self.requirements);
        merge(&mut visa_type.is_popular, self.is_popular);
    }
}

fn merge<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn require_text(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} is required"))
    } else {
        Ok(())
    }
}

fn require_non_negative(field: &str, value: i64) -> Result<(), String> {
    if value < 0 {
        Err(format!("{field} must not be negative (got {value})"))
    } else {
        Ok(())
    }
}

fn require_success_rate(rate: f32) -> Result<(), String> {
    if (0.0..=100.0).contains(&rate) {
        Ok(())
    } else {
        Err(format!("success rate must be between 0 and 100 (got {rate})"))
    }
}

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{
    Attraction, Country, CountryDraft, CountryId, CountryPatch, Faq, TimelineStep, VisaTypeDraft,
    VisaTypePatch,
};
use crate::persistence::{PersistenceError, SnapshotRepository};

/// Persisted form of the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub countries: Vec<Country>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid catalog payload: {0}")]
    Validation(String),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Registry of countries and their visa types.
///
/// Updates addressed to an unknown id are no-ops and report `false`/`None` rather than an
/// error. Each applied mutation bumps [`revision`](Self::revision) and rewrites the snapshot.
pub struct CatalogStore<S> {
    state: CatalogSnapshot,
    revision: u64,
    snapshots: Arc<S>,
}

impl<S> CatalogStore<S>
where
    S: SnapshotRepository<CatalogSnapshot>,
{
    /// Load the persisted catalog, falling back to `seed` when nothing has been saved yet.
    pub fn open(snapshots: Arc<S>, seed: Vec<Country>) -> Result<Self, CatalogError> {
        let state = match snapshots.load()? {
            Some(snapshot) => snapshot,
            None => CatalogSnapshot { countries: seed },
        };
        info!(countries = state.countries.len(), "catalog loaded");

        Ok(Self {
            state,
            revision: 0,
            snapshots,
        })
    }

    pub fn countries(&self) -> &[Country] {
        &self.state.countries
    }

    pub fn get(&self, id: &CountryId) -> Option<&Country> {
        self.state.countries.iter().find(|country| &country.id == id)
    }

    /// Changes on every applied mutation; used to invalidate filtered views.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn create(&mut self, draft: CountryDraft) -> Result<CountryId, CatalogError> {
        draft.validate().map_err(CatalogError::Validation)?;

        let mut id = CountryId::generate();
        while self.get(&id).is_some() {
            id = CountryId::generate();
        }

        let country = draft.into_country(id.clone());
        let name = country.name.clone();
        self.transact(|state| {
            state.countries.push(country);
            Some(())
        })?;
        info!(country_id = %id.0, %name, "country created");
        Ok(id)
    }

    pub fn update(&mut self, id: &CountryId, patch: CountryPatch) -> Result<bool, CatalogError> {
        patch.validate().map_err(CatalogError::Validation)?;

        let updated = self.transact(|state| {
            patch.apply(find_mut(state, id)?);
            Some(())
        })?;
        Ok(updated.is_some())
    }

    /// Flip `is_active`, returning the new value.
    pub fn toggle_active(&mut self, id: &CountryId) -> Result<Option<bool>, CatalogError> {
        let active = self.transact(|state| {
            let country = find_mut(state, id)?;
            country.is_active = !country.is_active;
            Some(country.is_active)
        })?;
        if let Some(active) = active {
            info!(country_id = %id.0, active, "country visibility toggled");
        }
        Ok(active)
    }

    pub fn delete(&mut self, id: &CountryId) -> Result<bool, CatalogError> {
        let deleted = self.transact(|state| {
            let before = state.countries.len();
            state.countries.retain(|country| &country.id != id);
            (state.countries.len() != before).then_some(())
        })?;
        if deleted.is_some() {
            info!(country_id = %id.0, "country deleted");
        }
        Ok(deleted.is_some())
    }

    /// Attach a visa type to a country, returning the generated visa type id.
    pub fn add_visa_type(
        &mut self,
        country_id: &CountryId,
        draft: VisaTypeDraft,
    ) -> Result<Option<String>, CatalogError> {
        draft.validate().map_err(CatalogError::Validation)?;

        self.transact(|state| {
            let country = find_mut(state, country_id)?;
            let visa_type = draft.into_visa_type();
            let visa_type_id = visa_type.id.clone();
            country.visa_types.push(visa_type);
            Some(visa_type_id)
        })
    }

    pub fn update_visa_type(
        &mut self,
        country_id: &CountryId,
        visa_type_id: &str,
        patch: VisaTypePatch,
    ) -> Result<bool, CatalogError> {
        patch.validate().map_err(CatalogError::Validation)?;

        let updated = self.transact(|state| {
            let visa_type = find_mut(state, country_id)?
                .visa_types
                .iter_mut()
                .find(|visa_type| visa_type.id == visa_type_id)?;
            patch.apply(visa_type);
            Some(())
        })?;
        Ok(updated.is_some())
    }

    pub fn delete_visa_type(
        &mut self,
        country_id: &CountryId,
        visa_type_id: &str,
    ) -> Result<bool, CatalogError> {
        let deleted = self.transact(|state| {
            let country = find_mut(state, country_id)?;
            let before = country.visa_types.len();
            country
                .visa_types
                .retain(|visa_type| visa_type.id != visa_type_id);
            (country.visa_types.len() != before).then_some(())
        })?;
        Ok(deleted.is_some())
    }

    pub fn replace_faqs(&mut self, id: &CountryId, faqs: Vec<Faq>) -> Result<bool, CatalogError> {
        self.replace_with(id, |country| country.faqs = faqs)
    }

    pub fn replace_attractions(
        &mut self,
        id: &CountryId,
        attractions: Vec<Attraction>,
    ) -> Result<bool, CatalogError> {
        self.replace_with(id, |country| country.attractions = attractions)
    }

    pub fn replace_timeline(
        &mut self,
        id: &CountryId,
        timeline: Vec<TimelineStep>,
    ) -> Result<bool, CatalogError> {
        self.replace_with(id, |country| country.timeline = timeline)
    }

    fn replace_with(
        &mut self,
        id: &CountryId,
        apply: impl FnOnce(&mut Country),
    ) -> Result<bool, CatalogError> {
        let replaced = self.transact(|state| {
            apply(find_mut(state, id)?);
            Some(())
        })?;
        Ok(replaced.is_some())
    }

    /// Apply `change` to a copy of the catalog. `None` leaves everything untouched; otherwise
    /// the copy is saved and only then adopted, bumping the revision.
    fn transact<T>(
        &mut self,
        change: impl FnOnce(&mut CatalogSnapshot) -> Option<T>,
    ) -> Result<Option<T>, CatalogError> {
        let mut next = self.state.clone();
        let Some(outcome) = change(&mut next) else {
            return Ok(None);
        };
        self.snapshots.save(&next)?;
        self.state = next;
        self.revision += 1;
        Ok(Some(outcome))
    }
}

fn find_mut<'a>(state: &'a mut CatalogSnapshot, id: &CountryId) -> Option<&'a mut Country> {
    state.countries.iter_mut().find(|country| &country.id == id)
}

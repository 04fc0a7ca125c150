//! Public tracking projection.
//!
//! Applicants follow their application with nothing but the tracking token, so the projection
//! carries only what the applicant already knows plus progress. Agent assignment, revision
//! counters, and the override log never leave through here.

use chrono::NaiveDate;
use serde::Serialize;

use crate::applications::{
    Application, ApplicationDocument, ApplicationId, ApplicationStatus, ApplicationStep,
};
use crate::identity::{Caller, CallerRole};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedApplication {
    pub id: ApplicationId,
    pub country: String,
    #[serde(rename = "type")]
    pub visa_type: String,
    pub applicant_name: String,
    pub application_date: NaiveDate,
    pub status: ApplicationStatus,
    pub steps: Vec<ApplicationStep>,
    pub documents: Vec<ApplicationDocument>,
}

impl From<&Application> for TrackedApplication {
    fn from(application: &Application) -> Self {
        Self {
            id: application.id.clone(),
            country: application.country.clone(),
            visa_type: application.visa_type.clone(),
            applicant_name: application.applicant_name.clone(),
            application_date: application.created_on,
            status: application.status,
            steps: application.steps.clone(),
            documents: application.documents.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackingLookup {
    Found(TrackedApplication),
    NotFound,
}

impl TrackingLookup {
    pub fn found(self) -> Option<TrackedApplication> {
        match self {
            TrackingLookup::Found(tracked) => Some(tracked),
            TrackingLookup::NotFound => None,
        }
    }
}

/// Read-only view over the application set.
pub struct TrackingProjector<'a> {
    applications: &'a [Application],
}

impl<'a> TrackingProjector<'a> {
    pub fn new(applications: &'a [Application]) -> Self {
        Self { applications }
    }

    /// Look up by tracking token. Surrounding whitespace and letter case are ignored.
    pub fn lookup(&self, raw_id: &str) -> TrackingLookup {
        match self.find(&ApplicationId::parse(raw_id)) {
            Some(application) => TrackingLookup::Found(application.into()),
            None => TrackingLookup::NotFound,
        }
    }

    /// Same as [`lookup`](Self::lookup), except a signed-in customer only sees their own
    /// applications. Someone else's application reads exactly like an unknown token.
    pub fn lookup_for(&self, caller: &Caller, raw_id: &str) -> TrackingLookup {
        let id = ApplicationId::parse(raw_id);
        match self.find(&id) {
            Some(application)
                if caller.role != CallerRole::User || application.user_id == caller.id =>
            {
                TrackingLookup::Found(application.into())
            }
            _ => TrackingLookup::NotFound,
        }
    }

    fn find(&self, id: &ApplicationId) -> Option<&'a Application> {
        self.applications
            .iter()
            .find(|application| &application.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applications::ApplicationDraft;

    fn sample(id: &str, user_id: &str) -> Application {
        let mut application = ApplicationDraft {
            user_id: user_id.to_string(),
            country: "United States".to_string(),
            visa_type: "Tourist Visa".to_string(),
            applicant_name: "John Doe".to_string(),
            amount: 15000,
            ..ApplicationDraft::default()
        }
        .into_application(
            ApplicationId(id.to_string()),
            NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date"),
        );
        application.agent_id = Some("AGENT001".to_string());
        application
    }

    #[test]
    fn projection_omits_internal_fields() {
        let applications = vec![sample("XK7L9M2NP4", "9876543212")];
        let tracked = TrackingProjector::new(&applications)
            .lookup("XK7L9M2NP4")
            .found()
            .expect("found");

        let payload = serde_json::to_value(&tracked).expect("serialize");
        assert_eq!(payload["type"], "Tourist Visa");
        assert_eq!(payload["applicationDate"], "2024-03-15");
        assert!(payload.get("agentId").is_none());
        assert!(payload.get("revision").is_none());
        assert!(payload.get("userId").is_none());
    }

    #[test]
    fn lookup_normalizes_pasted_tokens() {
        let applications = vec![sample("XK7L9M2NP4", "9876543212")];
        let projector = TrackingProjector::new(&applications);

        assert!(matches!(
            projector.lookup("  xk7l9m2np4 "),
            TrackingLookup::Found(_)
        ));
        assert_eq!(projector.lookup("MISSING000"), TrackingLookup::NotFound);
    }

    #[test]
    fn customers_cannot_tell_foreign_applications_from_missing_ones() {
        let applications = vec![sample("XK7L9M2NP4", "owner")];
        let projector = TrackingProjector::new(&applications);

        let stranger = Caller::new("someone-else", CallerRole::User);
        let owner = Caller::new("owner", CallerRole::User);
        let agent = Caller::new("AGENT002", CallerRole::Agent);

        assert_eq!(
            projector.lookup_for(&stranger, "XK7L9M2NP4"),
            projector.lookup_for(&stranger, "UNKNOWN000")
        );
        assert!(matches!(
            projector.lookup_for(&owner, "XK7L9M2NP4"),
            TrackingLookup::Found(_)
        ));
        assert!(matches!(
            projector.lookup_for(&agent, "XK7L9M2NP4"),
            TrackingLookup::Found(_)
        ));
        assert!(matches!(
            projector.lookup_for(&Caller::anonymous(), "XK7L9M2NP4"),
            TrackingLookup::Found(_)
        ));
    }
}

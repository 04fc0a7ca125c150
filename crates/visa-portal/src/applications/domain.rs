use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

const ID_LENGTH: usize = 10;
const ID_ALPHABET: [char; 36] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
    'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// Public tracking token. Generated once at intake and never reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn generate() -> Self {
        Self(nanoid::nanoid!(ID_LENGTH, &ID_ALPHABET))
    }

    /// Normalize user input such as a pasted tracking number.
    pub fn parse(raw: &str) -> Self {
        Self(raw.trim().to_ascii_uppercase())
    }

    pub fn is_well_formed(&self) -> bool {
        self.0.len() == ID_LENGTH && self.0.chars().all(|c| ID_ALPHABET.contains(&c))
    }
}

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Processing,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Processing => "processing",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ApplicationStatus::Approved | ApplicationStatus::Rejected)
    }

    const fn rank(self) -> u8 {
        match self {
            ApplicationStatus::Pending => 0,
            ApplicationStatus::Processing => 1,
            ApplicationStatus::Approved | ApplicationStatus::Rejected => 2,
        }
    }

    /// Forward-only policy. `Ok(false)` means the status is already `next`.
    pub fn check_transition(self, next: ApplicationStatus) -> Result<bool, LifecycleError> {
        if self == next {
            return Ok(false);
        }
        if self.is_terminal() || next.rank() < self.rank() {
            return Err(LifecycleError::InvalidTransition {
                from: self,
                to: next,
            });
        }
        Ok(true)
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown application status `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Completed,
    Current,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Verified,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationStep {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: StepStatus,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_calendar_date"
    )]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationDocument {
    pub name: String,
    pub status: DocumentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    #[serde(deserialize_with = "calendar_date")]
    pub date: NaiveDate,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("cannot move application from {} to {}", from.label(), to.label())]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("application has no remaining step to advance")]
    NoNextStep,
}

/// Application aggregate as stored locally and exchanged with the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: ApplicationId,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub country: String,
    #[serde(rename = "type")]
    pub visa_type: String,
    pub applicant_name: String,
    #[serde(rename = "applicationDate", deserialize_with = "calendar_date")]
    pub created_on: NaiveDate,
    pub status: ApplicationStatus,
    pub amount: i64,
    #[serde(default)]
    pub steps: Vec<ApplicationStep>,
    #[serde(default)]
    pub documents: Vec<ApplicationDocument>,
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
    #[serde(default)]
    pub revision: u64,
}

impl Application {
    pub fn current_step(&self) -> Option<&ApplicationStep> {
        self.steps
            .iter()
            .find(|step| step.status == StepStatus::Current)
    }

    pub fn completed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| step.status == StepStatus::Completed)
            .count()
    }

    /// Complete the current step and promote its successor, if any.
    ///
    /// Leaves the steps untouched when nothing is current.
    pub fn advance_step(&mut self, today: NaiveDate) -> Result<(), LifecycleError> {
        let index = self
            .steps
            .iter()
            .position(|step| step.status == StepStatus::Current)
            .ok_or(LifecycleError::NoNextStep)?;

        let step = &mut self.steps[index];
        step.status = StepStatus::Completed;
        step.date.get_or_insert(today);

        if let Some(next) = self.steps.get_mut(index + 1) {
            next.status = StepStatus::Current;
            next.date = Some(today);
        }
        Ok(())
    }

    /// Completed prefix, at most one current step, pending suffix.
    pub fn steps_are_ordered(&self) -> bool {
        let mut seen_current = false;
        let mut seen_pending = false;
        for step in &self.steps {
            match step.status {
                StepStatus::Completed if seen_current || seen_pending => return false,
                StepStatus::Current if seen_current || seen_pending => return false,
                StepStatus::Current => seen_current = true,
                StepStatus::Pending => seen_pending = true,
                StepStatus::Completed => {}
            }
        }
        true
    }
}

/// Intake payload. The store assigns the id, status, and seeded steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationDraft {
    pub user_id: String,
    pub agent_id: Option<String>,
    pub country: String,
    #[serde(rename = "type")]
    pub visa_type: String,
    pub applicant_name: String,
    pub amount: i64,
    pub documents: Vec<ApplicationDocument>,
}

impl ApplicationDraft {
    pub(crate) fn validate(&self) -> Result<(), String> {
        require_text("applicant name", &self.applicant_name)?;
        require_text("country", &self.country)?;
        require_text("visa type", &self.visa_type)?;
        require_text("user id", &self.user_id)?;
        require_amount(self.amount)
    }

    pub(crate) fn into_application(self, id: ApplicationId, today: NaiveDate) -> Application {
        let intake = TimelineEntry {
            date: today,
            title: "Application submitted".to_string(),
            description: format!("{} application for {} received", self.visa_type, self.country),
        };

        Application {
            id,
            user_id: self.user_id.trim().to_string(),
            agent_id: self.agent_id.filter(|agent| !agent.trim().is_empty()),
            country: self.country.trim().to_string(),
            visa_type: self.visa_type.trim().to_string(),
            applicant_name: self.applicant_name.trim().to_string(),
            created_on: today,
            status: ApplicationStatus::Pending,
            amount: self.amount,
            steps: seeded_steps(today),
            documents: self.documents,
            timeline: vec![intake],
            revision: 0,
        }
    }
}

/// Accept `2024-03-15` as well as full timestamps such as `2024-03-15T10:00:00.000Z`.
pub fn parse_calendar_date(raw: &str) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|at| at.date_naive()))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|at| at.date())
        })
        .map_err(|_| format!("`{raw}` is neither a date nor an ISO-8601 timestamp"))
}

fn calendar_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_calendar_date(&raw).map_err(de::Error::custom)
}

fn optional_calendar_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_calendar_date(&raw).map(Some).map_err(de::Error::custom),
        None => Ok(None),
    }
}

fn seeded_steps(today: NaiveDate) -> Vec<ApplicationStep> {
    vec![
        ApplicationStep {
            id: "1".to_string(),
            title: "Application Submitted".to_string(),
            description: "Initial application received".to_string(),
            status: StepStatus::Completed,
            date: Some(today),
        },
        ApplicationStep {
            id: "2".to_string(),
            title: "Document Verification".to_string(),
            description: "Verifying submitted documents".to_string(),
            status: StepStatus::Current,
            date: Some(today),
        },
    ]
}

/// Partial update. Identity, applicant, and destination are fixed at intake; status and steps
/// move only through the lifecycle operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationPatch {
    #[serde(rename = "type")]
    pub visa_type: Option<String>,
    pub amount: Option<i64>,
    pub documents: Option<Vec<ApplicationDocument>>,
    pub expected_revision: Option<u64>,
}

impl ApplicationPatch {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if let Some(visa_type) = &self.visa_type {
            require_text("visa type", visa_type)?;
        }
        if let Some(amount) = self.amount {
            require_amount(amount)?;
        }
        Ok(())
    }

    pub(crate) fn apply(self, application: &mut Application) {
        if let Some(visa_type) = self.visa_type {
            application.visa_type = visa_type.trim().to_string();
        }
        if let Some(amount) = self.amount {
            application.amount = amount;
        }
        if let Some(documents) = self.documents {
            application.documents = documents;
        }
    }
}

/// Audit record written for every administrative status override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOverride {
    pub application_id: ApplicationId,
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
    pub actor_id: String,
    pub reason: String,
    pub at: DateTime<Utc>,
}

fn require_text(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} is required"))
    } else {
        Ok(())
    }
}

fn require_amount(amount: i64) -> Result<(), String> {
    if amount < 0 {
        Err(format!("amount must not be negative (got {amount})"))
    } else {
        Ok(())
    }
}

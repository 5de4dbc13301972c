use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    Pending,
    Confirmed,
    Waitlisted,
    Cancelled,
}

impl RegistrationStatus {
    pub const ALL: [RegistrationStatus; 4] = [
        RegistrationStatus::Pending,
        RegistrationStatus::Confirmed,
        RegistrationStatus::Waitlisted,
        RegistrationStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "PENDING",
            RegistrationStatus::Confirmed => "CONFIRMED",
            RegistrationStatus::Waitlisted => "WAITLISTED",
            RegistrationStatus::Cancelled => "CANCELLED",
        }
    }

    /// Whether the registration holds a camping spot and its job slots.
    pub fn occupies_capacity(&self) -> bool {
        matches!(
            self,
            RegistrationStatus::Pending | RegistrationStatus::Confirmed
        )
    }
}

impl FromStr for RegistrationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(RegistrationStatus::Pending),
            "CONFIRMED" => Ok(RegistrationStatus::Confirmed),
            "WAITLISTED" => Ok(RegistrationStatus::Waitlisted),
            "CANCELLED" => Ok(RegistrationStatus::Cancelled),
            other => anyhow::bail!("unknown registration status: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub id: Uuid,
    pub user_id: Uuid,
    pub year: i32,
    pub status: RegistrationStatus,
    pub notes: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct RegistrationJobLink {
    pub job_id: Uuid,
    pub job_name: String,
    pub category_id: Uuid,
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone)]
pub struct CampingOptionRegistration {
    pub camping_option_id: Uuid,
    pub camping_option_name: String,
    /// Object keyed by camping option field id.
    pub field_values: serde_json::Value,
}

/// Registration with its job and camping option links.
#[derive(Debug, Clone)]
pub struct RegistrationDetail {
    pub registration: Registration,
    pub jobs: Vec<RegistrationJobLink>,
    pub camping_options: Vec<CampingOptionRegistration>,
}

impl RegistrationDetail {
    pub fn job_ids(&self) -> Vec<Uuid> {
        self.jobs.iter().map(|j| j.job_id).collect()
    }

    pub fn camping_option_ids(&self) -> Vec<Uuid> {
        self.camping_options
            .iter()
            .map(|c| c.camping_option_id)
            .collect()
    }
}

/// Inputs that decide the status of a new registration.
#[derive(Debug, Clone, Copy)]
pub struct StatusInputs {
    pub any_camping_option_full: bool,
    pub dues_cents: i64,
    pub allow_deferred_dues_payment: bool,
}

/// Full camping options put a registration on the waitlist; owed dues keep it pending
/// until paid unless the user may defer payment.
pub fn initial_status(inputs: StatusInputs) -> RegistrationStatus {
    if inputs.any_camping_option_full {
        RegistrationStatus::Waitlisted
    } else if inputs.dues_cents > 0 && !inputs.allow_deferred_dues_payment {
        RegistrationStatus::Pending
    } else {
        RegistrationStatus::Confirmed
    }
}

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Staff,
    Participant,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Staff => "STAFF",
            UserRole::Participant => "PARTICIPANT",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// STAFF or ADMIN.
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Staff)
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(UserRole::Admin),
            "STAFF" => Ok(UserRole::Staff),
            "PARTICIPANT" => Ok(UserRole::Participant),
            other => anyhow::bail!("unknown user role: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub playa_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state_province: Option<String>,
    pub country: Option<String>,
    pub emergency_contact: Option<String>,
    pub role: UserRole,
    pub is_email_verified: bool,
    pub allow_registration: bool,
    pub allow_early_registration: bool,
    pub allow_deferred_dues_payment: bool,
    pub allow_no_job: bool,
    pub internal_notes: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl User {
    pub fn display_name(&self) -> String {
        match self.playa_name.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => format!("{} \"{}\" {}", self.first_name, p, self.last_name),
            _ => format!("{} {}", self.first_name, self.last_name),
        }
    }

    fn audit_snapshot(&self) -> Map<String, Value> {
        let v = json!({
            "email": self.email,
            "first_name": self.first_name,
            "last_name": self.last_name,
            "playa_name": self.playa_name,
            "phone": self.phone,
            "city": self.city,
            "state_province": self.state_province,
            "country": self.country,
            "emergency_contact": self.emergency_contact,
            "role": self.role,
            "is_email_verified": self.is_email_verified,
            "allow_registration": self.allow_registration,
            "allow_early_registration": self.allow_early_registration,
            "allow_deferred_dues_payment": self.allow_deferred_dues_payment,
            "allow_no_job": self.allow_no_job,
            "internal_notes": self.internal_notes,
        });
        match v {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Old and new values of the fields that differ from `before`, or `None` when nothing changed.
    pub fn changes_since(&self, before: &User) -> Option<(Value, Value)> {
        let old = before.audit_snapshot();
        let mut old_out = Map::new();
        let mut new_out = Map::new();
        for (key, new_value) in self.audit_snapshot() {
            let old_value = old.get(&key).cloned().unwrap_or(Value::Null);
            if old_value != new_value {
                old_out.insert(key.clone(), old_value);
                new_out.insert(key, new_value);
            }
        }
        if new_out.is_empty() {
            None
        } else {
            Some((Value::Object(old_out), Value::Object(new_out)))
        }
    }
}

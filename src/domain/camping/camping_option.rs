use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldDataType {
    String,
    MultilineString,
    Integer,
    Number,
    Boolean,
    Date,
}

impl FieldDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldDataType::String => "STRING",
            FieldDataType::MultilineString => "MULTILINE_STRING",
            FieldDataType::Integer => "INTEGER",
            FieldDataType::Number => "NUMBER",
            FieldDataType::Boolean => "BOOLEAN",
            FieldDataType::Date => "DATE",
        }
    }
}

impl FromStr for FieldDataType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STRING" => Ok(FieldDataType::String),
            "MULTILINE_STRING" => Ok(FieldDataType::MultilineString),
            "INTEGER" => Ok(FieldDataType::Integer),
            "NUMBER" => Ok(FieldDataType::Number),
            "BOOLEAN" => Ok(FieldDataType::Boolean),
            "DATE" => Ok(FieldDataType::Date),
            other => anyhow::bail!("unknown field data type: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CampingOptionField {
    pub id: Uuid,
    pub camping_option_id: Uuid,
    pub display_name: String,
    pub description: Option<String>,
    pub data_type: FieldDataType,
    pub required: bool,
    pub max_length: Option<i32>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub ordinal: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct CampingOption {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub work_shifts_required: i32,
    /// Cents.
    pub participant_dues: i64,
    /// Cents.
    pub staff_dues: i64,
    /// Zero means unlimited.
    pub max_signups: i32,
    pub job_category_ids: Vec<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl CampingOption {
    pub fn dues_for(&self, staff: bool) -> i64 {
        if staff {
            self.staff_dues
        } else {
            self.participant_dues
        }
    }
}

/// Camping option with its ordered fields and live signup count.
#[derive(Debug, Clone)]
pub struct CampingOptionDetail {
    pub option: CampingOption,
    pub fields: Vec<CampingOptionField>,
    pub current_signups: i64,
}

impl CampingOptionDetail {
    pub fn is_full(&self) -> bool {
        self.option.max_signups > 0 && self.current_signups >= i64::from(self.option.max_signups)
    }
}

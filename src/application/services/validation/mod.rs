use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::application::errors::{ServiceError, ServiceResult};
use crate::domain::camping::camping_option::{CampingOptionField, FieldDataType};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub const MIN_PASSWORD_LEN: usize = 8;

/// Trims and lowercases an email address, rejecting malformed input.
pub fn normalize_email(raw: &str) -> ServiceResult<String> {
    let email = raw.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(ServiceError::bad_request("email must be a valid email address"));
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> ServiceResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::bad_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn require_text(field: &str, value: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::bad_request(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Maps an optional text input onto a nullable column update: blank clears the column.
pub fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Blank optional text becomes `None`.
pub fn optional_text(value: Option<String>) -> Option<String> {
    clearable(value).flatten()
}

/// Checks custom field values submitted for a camping option and returns the cleaned
/// object (keyed by field id) that gets stored with the signup.
pub fn validate_field_values(
    fields: &[CampingOptionField],
    values: Option<&Value>,
) -> ServiceResult<Value> {
    let empty = Map::new();
    let submitted = match values {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(ServiceError::bad_request(
                "field_values must be an object keyed by field id",
            ));
        }
    };

    for key in submitted.keys() {
        if !fields.iter().any(|f| f.id.to_string() == *key) {
            return Err(ServiceError::bad_request(format!("unknown field {key}")));
        }
    }

    let mut cleaned = Map::new();
    for field in fields {
        let key = field.id.to_string();
        let value = submitted.get(&key).filter(|v| !is_blank(v));
        let Some(value) = value else {
            if field.required {
                return Err(ServiceError::bad_request(format!(
                    "{} is required",
                    field.display_name
                )));
            }
            continue;
        };
        cleaned.insert(key, check_value(field, value)?);
    }
    Ok(Value::Object(cleaned))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn check_value(field: &CampingOptionField, value: &Value) -> ServiceResult<Value> {
    let name = &field.display_name;
    match field.data_type {
        FieldDataType::String | FieldDataType::MultilineString => {
            let s = value
                .as_str()
                .ok_or_else(|| ServiceError::bad_request(format!("{name} must be text")))?;
            if let Some(max) = field.max_length {
                if s.chars().count() > max.max(0) as usize {
                    return Err(ServiceError::bad_request(format!(
                        "{name} must be at most {max} characters"
                    )));
                }
            }
            Ok(Value::String(s.to_string()))
        }
        FieldDataType::Integer => {
            let n = value
                .as_i64()
                .or_else(|| {
                    value
                        .as_f64()
                        // outside this range `as i64` saturates
                        .filter(|f| f.fract() == 0.0 && f.abs() < 9.2e18)
                        .map(|f| f as i64)
                })
                .ok_or_else(|| ServiceError::bad_request(format!("{name} must be an integer")))?;
            check_range(field, n as f64)?;
            Ok(Value::from(n))
        }
        FieldDataType::Number => {
            let n = value
                .as_f64()
                .ok_or_else(|| ServiceError::bad_request(format!("{name} must be a number")))?;
            check_range(field, n)?;
            Ok(value.clone())
        }
        FieldDataType::Boolean => value
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| ServiceError::bad_request(format!("{name} must be true or false"))),
        FieldDataType::Date => {
            let s = value.as_str().unwrap_or_default();
            chrono::NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                .map_err(|_| {
                    ServiceError::bad_request(format!("{name} must be a date (YYYY-MM-DD)"))
                })
        }
    }
}

fn check_range(field: &CampingOptionField, n: f64) -> ServiceResult<()> {
    let name = &field.display_name;
    if let Some(min) = field.min_value {
        if n < min {
            return Err(ServiceError::bad_request(format!(
                "{name} must be at least {min}"
            )));
        }
    }
    if let Some(max) = field.max_value {
        if n > max {
            return Err(ServiceError::bad_request(format!(
                "{name} must be at most {max}"
            )));
        }
    }
    Ok(())
}

//! Loosely typed access to submitted form fields.
//!
//! The page handlers dispatch on which action key is present, so forms are
//! read as plain string maps and validated field by field.

use std::collections::HashMap;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{} is required", .0.replace('_', " "))]
    Missing(&'static str),
    #[error("{} {reason}", .field.replace('_', " "))]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

impl ValidationError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct FormFields(HashMap<String, String>);

impl From<HashMap<String, String>> for FormFields {
    fn from(fields: HashMap<String, String>) -> Self {
        Self(fields)
    }
}

impl FormFields {
    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Trimmed value; blank counts as absent.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn owned_text(&self, key: &str) -> Option<String> {
        self.text(key).map(str::to_owned)
    }

    pub fn required(&self, key: &'static str) -> Result<&str, ValidationError> {
        self.text(key).ok_or(ValidationError::Missing(key))
    }

    pub fn int(&self, key: &'static str) -> Result<Option<i32>, ValidationError> {
        self.text(key)
            .map(|value| {
                value
                    .parse::<i32>()
                    .map_err(|_| ValidationError::invalid(key, "must be a whole number"))
            })
            .transpose()
    }

    pub fn required_int(&self, key: &'static str) -> Result<i32, ValidationError> {
        self.int(key)?.ok_or(ValidationError::Missing(key))
    }

    pub fn date(&self, key: &'static str) -> Result<Option<jiff::civil::Date>, ValidationError> {
        self.text(key)
            .map(|value| {
                value
                    .parse::<jiff::civil::Date>()
                    .map_err(|_| ValidationError::invalid(key, "must be a date like 2026-10-16"))
            })
            .transpose()
    }

    pub fn required_date(&self, key: &'static str) -> Result<jiff::civil::Date, ValidationError> {
        self.date(key)?.ok_or(ValidationError::Missing(key))
    }

    pub fn required_time(&self, key: &'static str) -> Result<jiff::civil::Time, ValidationError> {
        self.required(key)?
            .parse::<jiff::civil::Time>()
            .map_err(|_| ValidationError::invalid(key, "must be a time like 14:30"))
    }
}

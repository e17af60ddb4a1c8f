//! Field and form validation results.
//!
//! [`validate_field`] answers "is this one value acceptable, and if not, why"
//! with the first violated constraint. [`validate_form`] reports every
//! violation keyed by the dot-joined path of the offending value, which is
//! what a form needs to annotate its inputs.
//!
//! Both functions are total: a malformed schema produces the generic
//! `Validation failed` verdict rather than an error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::{Issue, ObjectSchema, Schema};
use crate::ClassifiedError;

/// Key under which form-wide failures are reported.
pub const FORM_ERROR_KEY: &str = "_form";

/// Message used when validation cannot run to completion.
pub const VALIDATION_FAILED_MESSAGE: &str = "Validation failed";

/// Outcome of validating a single value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidationResult {
    /// No constraint was violated.
    pub is_valid: bool,
    /// First violation, when invalid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FieldValidationResult {
    /// Passing result.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    /// Failing result with `error`.
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(error.into()),
        }
    }
}

/// Outcome of validating a whole record.
///
/// When invalid, `errors` holds at least one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormValidationResult {
    /// No constraint was violated.
    pub is_valid: bool,
    /// Message per dot-joined path, when invalid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

impl FormValidationResult {
    /// Passing result.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: None,
        }
    }

    /// Form-wide failure with no per-field attribution.
    pub fn failed() -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(FORM_ERROR_KEY.to_owned(), VALIDATION_FAILED_MESSAGE.to_owned());
        Self {
            is_valid: false,
            errors: Some(errors),
        }
    }

    /// Later issues at the same path overwrite earlier ones.
    fn from_issues(issues: Vec<Issue>) -> Self {
        if issues.is_empty() {
            return Self::valid();
        }
        let mut errors = BTreeMap::new();
        for issue in issues {
            errors.insert(issue.path_string(), issue.message);
        }
        Self {
            is_valid: false,
            errors: Some(errors),
        }
    }

    /// Message recorded for `path`, if any.
    pub fn error(&self, path: &str) -> Option<&str> {
        self.errors.as_ref()?.get(path).map(String::as_str)
    }

    /// Number of paths with a violation.
    pub fn error_count(&self) -> usize {
        self.errors.as_ref().map_or(0, BTreeMap::len)
    }

    /// Convert a failed result into a `VALIDATION_ERROR` carrying the field
    /// messages under the `fields` detail. `None` when valid.
    pub fn into_error(self) -> Option<ClassifiedError> {
        if self.is_valid {
            return None;
        }
        let fields: Map<String, Value> = self
            .errors
            .unwrap_or_default()
            .into_iter()
            .map(|(path, message)| (path, Value::String(message)))
            .collect();
        let mut details = Map::new();
        details.insert("fields".to_owned(), Value::Object(fields));
        Some(ClassifiedError::validation(VALIDATION_FAILED_MESSAGE, Some(details)))
    }
}

/// Validate one value against `schema`, reporting the first violation.
pub fn validate_field(schema: &Schema, value: &Value) -> FieldValidationResult {
    match schema.check(value) {
        Ok(issues) => match issues.into_iter().next() {
            None => FieldValidationResult::valid(),
            Some(issue) => FieldValidationResult::invalid(issue.message),
        },
        Err(e) => {
            tracing::warn!(error = %e, "schema could not be evaluated");
            FieldValidationResult::invalid(VALIDATION_FAILED_MESSAGE)
        }
    }
}

/// Validate a record against `schema`, reporting every violation by path.
pub fn validate_form(schema: &Schema, data: &Value) -> FormValidationResult {
    match schema.check(data) {
        Ok(issues) => FormValidationResult::from_issues(issues),
        Err(e) => {
            tracing::warn!(error = %e, "schema could not be evaluated");
            FormValidationResult::failed()
        }
    }
}

impl ObjectSchema {
    /// Validate the value of a single field of this record, as a form does on
    /// blur. Names the record does not define are accepted.
    pub fn validate_field(&self, name: &str, value: &Value) -> FieldValidationResult {
        match self.get(name) {
            Some(schema) => validate_field(schema, value),
            None => FieldValidationResult::valid(),
        }
    }
}

impl Schema {
    /// Single-field validation through a record schema. `None` when this is
    /// not a record schema.
    pub fn validate_field_of(&self, name: &str, value: &Value) -> Option<FieldValidationResult> {
        match self {
            Self::Object(record) => Some(record.validate_field(name, value)),
            _ => None,
        }
    }
}

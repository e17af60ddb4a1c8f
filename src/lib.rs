//! # Carefront Errors
//!
//! Error classification, dispatch and form validation for the hospital
//! administration front-end (patient records, diagnosis triage, radiology,
//! emergency tracking, specialist appointments).
//!
//! ## Pipeline
//!
//! 1. A fallible operation (API call, form submit) fails.
//! 2. The raw failure is wrapped into a [`Failure`] and [`classify`]-ed into
//!    exactly one [`ClassifiedError`].
//! 3. The caller renders the message, or forwards the failure to an
//!    [`ErrorDispatcher`] which fans it out to observers (the
//!    [`ErrorLogger`], the [`RingBufferLogger`] history, UI toasts).
//!
//! ## Properties
//!
//! - Classification is total: every input resolves to one taxonomy member
//! - Classification is idempotent: classified errors pass through unchanged
//! - Every [`ErrorKind`] fixes a default [`StatusCode`]
//! - Owned message and detail strings are zeroized on drop (payloads may
//!   carry patient identifiers)
//! - A panicking observer never blocks the rest of the dispatch
//!
//! ## Quick Start
//!
//! ```rust
//! use carefront_errors::{ClassifiedError, ErrorDispatcher, ErrorKind, classify};
//!
//! let dispatcher = ErrorDispatcher::new();
//! let _listener = dispatcher.add_listener(|err| eprintln!("toast: {err}"));
//!
//! let io = std::io::Error::other("connection reset");
//! let err = dispatcher.handle(io);
//! assert_eq!(err.kind(), ErrorKind::Unknown);
//! assert_eq!(err.status_code().value(), 500);
//!
//! let missing = ClassifiedError::not_found("Patient not found");
//! assert_eq!(classify(missing.clone()), missing);
//! ```
//!
//! ## Features
//!
//! - `trusted_debug`: write detail values into log output (debug builds only)

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt;
use std::result;
use std::sync::Arc;
use zeroize::Zeroize;

pub mod classify;
pub mod codes;
pub mod dispatcher;
pub mod logging;
pub mod ring_buffer;
pub mod rules;
pub mod schema;
pub mod schemas;
pub mod settings;
pub mod validation;

pub use classify::*;
pub use codes::*;
pub use dispatcher::*;
pub use logging::*;
pub use ring_buffer::*;
pub use rules::*;
pub use schema::*;
pub use schemas::*;
pub use settings::*;
pub use validation::*;

/// Structured payload attached to a classified error.
pub type Details = Map<String, Value>;

/// Type alias for Results using our error type.
pub type Result<T> = result::Result<T, ClassifiedError>;

/// Shared handle to the error a failure was classified from.
pub type SourceError = Arc<dyn Error + Send + Sync + 'static>;

/// A failure after classification: one kind, one status, a message and
/// optional structured details.
///
/// # Construction
///
/// Call sites that know what went wrong use a typed constructor
/// (`validation`, `authentication`, `authorization`, `not_found`,
/// `conflict`) so the failure is already classified; everything else goes
/// through [`classify`].
///
/// ```rust
/// use carefront_errors::{ClassifiedError, ErrorKind, StatusCode};
///
/// let err = ClassifiedError::conflict("Appointment slot already taken")
///     .with_detail("slot", "2030-01-01T09:00");
/// assert_eq!(err.kind(), ErrorKind::Conflict);
/// assert_eq!(err.status_code(), StatusCode::new(409));
/// assert!(err.is_default_status());
/// ```
///
/// # Equality
///
/// Two errors are equal when message, kind, status and details match. The
/// attached source error is not compared.
#[must_use = "classified errors should be surfaced or dispatched"]
#[derive(Clone)]
pub struct ClassifiedError {
    message: String,
    kind: ErrorKind,
    status_code: StatusCode,
    details: Option<Details>,
    source: Option<SourceError>,
}

impl ClassifiedError {
    /// Create an error of the given kind with the kind's default status.
    #[inline]
    pub fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
            status_code: kind.default_status(),
            details: None,
            source: None,
        }
    }

    /// Create an error of the given kind carrying the kind's default message.
    #[inline]
    pub fn from_kind(kind: ErrorKind) -> Self {
        Self::new(kind.default_message(), kind)
    }

    // Typed constructors, one per kind.

    /// Input rejected by a schema or business rule (400). `details` usually
    /// carries the per-field messages.
    #[inline]
    pub fn validation(message: impl Into<String>, details: Option<Details>) -> Self {
        let mut err = Self::new(message, ErrorKind::Validation);
        err.details = details;
        err
    }

    /// Caller is not authenticated (401).
    #[inline]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(message, ErrorKind::Authentication)
    }

    /// Caller lacks permission (403).
    #[inline]
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(message, ErrorKind::Authorization)
    }

    /// Resource does not exist (404).
    #[inline]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message, ErrorKind::NotFound)
    }

    /// Resource state conflict (409).
    #[inline]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(message, ErrorKind::Conflict)
    }

    /// Unclassifiable failure (500).
    #[inline]
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(message, ErrorKind::Unknown)
    }

    /// Override the kind's default status.
    #[inline]
    pub fn with_status(mut self, status_code: StatusCode) -> Self {
        self.status_code = status_code;
        self
    }

    /// Replace the details payload.
    #[inline]
    pub fn with_details(mut self, details: Details) -> Self {
        self.details = Some(details);
        self
    }

    /// Add a single detail entry, creating the payload if needed.
    #[inline]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Attach the error this one was raised from.
    #[inline]
    pub fn with_source(mut self, source: impl Error + Send + Sync + 'static) -> Self {
        let source: SourceError = Arc::new(source);
        self.source = Some(source);
        self
    }

    #[inline]
    pub(crate) fn with_shared_source(mut self, source: SourceError) -> Self {
        self.source = Some(source);
        self
    }

    /// Human-readable message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Taxonomy kind.
    #[inline]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Stable code of the kind (e.g. `NOT_FOUND_ERROR`).
    #[inline]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Status carried by this error.
    #[inline]
    pub const fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// Structured details, if any.
    #[inline]
    pub fn details(&self) -> Option<&Details> {
        self.details.as_ref()
    }

    /// Look up one detail entry.
    #[inline]
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.as_ref().and_then(|d| d.get(key))
    }

    /// Kind check, the narrowing test call sites branch on.
    #[inline]
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// True unless the status was overridden at construction.
    #[inline]
    pub fn is_default_status(&self) -> bool {
        self.status_code == self.kind.default_status()
    }

    /// Whether the call site can recover locally (re-prompt on validation).
    #[inline]
    pub const fn is_recoverable(&self) -> bool {
        self.kind.is_recoverable()
    }

    /// Shared handle to the source error, if any.
    #[inline]
    pub fn source_error(&self) -> Option<&SourceError> {
        self.source.as_ref()
    }

    /// JSON body for renderers: `{message, code, statusCode, details?}`.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            let mut body = Map::new();
            body.insert("message".into(), Value::String(self.message.clone()));
            body.insert("code".into(), Value::String(self.code().into()));
            Value::Object(body)
        })
    }
}

/// Wipe every owned string inside a JSON value.
pub(crate) fn zeroize_value(value: &mut Value) {
    match value {
        Value::String(s) => s.zeroize(),
        Value::Array(items) => {
            for item in items.iter_mut() {
                zeroize_value(item);
            }
            items.clear();
        }
        Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                zeroize_value(item);
            }
            map.clear();
        }
        _ => {}
    }
}

impl Zeroize for ClassifiedError {
    fn zeroize(&mut self) {
        self.message.zeroize();
        if let Some(details) = self.details.as_mut() {
            for (_, value) in details.iter_mut() {
                zeroize_value(value);
            }
            details.clear();
        }
    }
}

impl Drop for ClassifiedError {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl PartialEq for ClassifiedError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.status_code == other.status_code
            && self.message == other.message
            && self.details == other.details
    }
}

impl fmt::Debug for ClassifiedError {
    /// Detail values are redacted; only their keys are shown.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifiedError")
            .field("message", &self.message)
            .field("kind", &self.kind)
            .field("status_code", &self.status_code)
            .field(
                "details",
                &self.details.as_ref().map(|d| d.keys().collect::<Vec<_>>()),
            )
            .field("source", &self.source.as_ref().map(|_| "<PRESENT>"))
            .finish()
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for ClassifiedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl Serialize for ClassifiedError {
    fn serialize<S: Serializer>(&self, serializer: S) -> result::Result<S::Ok, S::Error> {
        let len = if self.details.is_some() { 4 } else { 3 };
        let mut body = serializer.serialize_struct("ClassifiedError", len)?;
        body.serialize_field("message", &self.message)?;
        body.serialize_field("code", &self.kind)?;
        body.serialize_field("statusCode", &self.status_code)?;
        if let Some(details) = &self.details {
            body.serialize_field("details", details)?;
        }
        body.end()
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_constructors_fix_kind_and_status() {
        let cases = [
            (ClassifiedError::validation("v", None), ErrorKind::Validation, 400),
            (ClassifiedError::authentication("a"), ErrorKind::Authentication, 401),
            (ClassifiedError::authorization("z"), ErrorKind::Authorization, 403),
            (ClassifiedError::not_found("n"), ErrorKind::NotFound, 404),
            (ClassifiedError::conflict("c"), ErrorKind::Conflict, 409),
            (ClassifiedError::unknown("u"), ErrorKind::Unknown, 500),
        ];
        for (err, kind, status) in cases {
            assert_eq!(err.kind(), kind);
            assert_eq!(err.status_code().value(), status);
            assert!(err.is_default_status());
            assert!(err.is(kind));
        }
    }

    #[test]
    fn from_kind_uses_default_message() {
        assert_eq!(
            ClassifiedError::from_kind(ErrorKind::Authentication).message(),
            "Authentication failed"
        );
        assert_eq!(
            ClassifiedError::from_kind(ErrorKind::NotFound).message(),
            "Resource not found"
        );
    }

    #[test]
    fn validation_takes_optional_details() {
        let mut fields = Map::new();
        fields.insert("time".into(), json!("Invalid time format"));
        let err = ClassifiedError::validation("Validation failed", Some(fields));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.detail("time"), Some(&json!("Invalid time format")));
        assert!(ClassifiedError::validation("bad", None).details().is_none());
    }

    #[test]
    fn status_override_is_kept() {
        let err = ClassifiedError::validation("Unprocessable", None).with_status(StatusCode::new(422));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.status_code().value(), 422);
        assert!(!err.is_default_status());
    }

    #[test]
    fn details_accumulate() {
        let err = ClassifiedError::validation("bad form", None)
            .with_detail("fullName", "Name must be at least 2 characters")
            .with_detail("attempt", 2);
        assert_eq!(err.detail("attempt"), Some(&json!(2)));
        assert_eq!(err.details().map(Map::len), Some(2));
    }

    #[test]
    fn equality_ignores_source() {
        let a = ClassifiedError::unknown("boom").with_source(std::io::Error::other("x"));
        let b = ClassifiedError::unknown("boom");
        assert_eq!(a, b);
        assert!(a.source().is_some());
        assert!(b.source().is_none());
    }

    #[test]
    fn debug_redacts_detail_values() {
        let err = ClassifiedError::not_found("Patient not found")
            .with_detail("patientName", "Jane Roe");
        let debug = format!("{:?}", err);
        assert!(debug.contains("patientName"));
        assert!(!debug.contains("Jane Roe"));
    }

    #[test]
    fn display_is_message() {
        let err = ClassifiedError::authorization("Not authorized");
        assert_eq!(err.to_string(), "Not authorized");
    }

    #[test]
    fn zeroize_clears_message_and_details() {
        let mut err = ClassifiedError::validation("MRN 123456 invalid", None)
            .with_detail("mrn", json!({"value": "123456", "tags": ["a"]}));
        err.zeroize();
        assert!(err.message().is_empty());
        assert_eq!(err.details().map(Map::len), Some(0));
    }

    #[test]
    fn json_body_shape() {
        let body = ClassifiedError::conflict("Resource conflict")
            .with_detail("id", "p-1")
            .to_json();
        assert_eq!(
            body,
            json!({
                "message": "Resource conflict",
                "code": "CONFLICT_ERROR",
                "statusCode": 409,
                "details": {"id": "p-1"}
            })
        );
    }

    #[test]
    fn json_body_omits_absent_details() {
        let body = ClassifiedError::unknown("x").to_json();
        assert!(body.get("details").is_none());
    }
}

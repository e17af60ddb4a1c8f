//! Classification - the total mapping from any failure to one taxonomy member.
//!
//! Callers never raise and catch to classify. They wrap whatever went wrong in
//! a [`Failure`] and get a [`ClassifiedError`] back:
//!
//! | Input                    | Result                                                  |
//! |--------------------------|---------------------------------------------------------|
//! | `Failure::Classified(e)` | `e`, unchanged                                          |
//! | `Failure::Error(e)`      | `Unknown`, 500, `e`'s message, `originalFailure` detail |
//! | `Failure::Opaque(v)`     | `Unknown`, 500, fixed message, `originalFailure: v`     |
//!
//! Classification is pure. Side effects (logging, toasts) belong to the
//! [`ErrorDispatcher`](crate::ErrorDispatcher).
//!
//! ```rust
//! use carefront_errors::{classify, ErrorKind, UNKNOWN_FAILURE_MESSAGE};
//! use serde_json::json;
//!
//! let err = classify(json!({"status": "weird"}));
//! assert_eq!(err.kind(), ErrorKind::Unknown);
//! assert_eq!(err.message(), UNKNOWN_FAILURE_MESSAGE);
//! assert_eq!(err.detail("originalFailure"), Some(&json!({"status": "weird"})));
//! ```

use crate::{ClassifiedError, ErrorKind, SourceError, StatusCode};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt;
use std::io;
use std::sync::Arc;

/// Message given to failures that carry no message of their own.
pub const UNKNOWN_FAILURE_MESSAGE: &str = "An unknown error occurred";

/// Detail key under which the pre-classification failure is preserved.
pub const ORIGINAL_FAILURE_KEY: &str = "originalFailure";

/// Anything a fallible operation can hand to the classifier.
#[derive(Clone)]
pub enum Failure {
    /// Already classified (built through a typed constructor).
    Classified(ClassifiedError),
    /// An error value with a message of its own.
    Error(SourceError),
    /// Any other value (a bare string, a number, an unexpected payload).
    Opaque(Value),
}

impl Failure {
    /// Wrap any error value. A [`ClassifiedError`] stays classified.
    #[inline]
    pub fn from_error(error: impl Error + Send + Sync + 'static) -> Self {
        let boxed: Box<dyn Error + Send + Sync + 'static> = Box::new(error);
        Self::from(boxed)
    }

    /// Whether this failure is already classified.
    #[inline]
    pub fn is_classified(&self) -> bool {
        matches!(self, Self::Classified(_))
    }

    /// Message of the failure, or the fixed fallback for opaque values.
    pub fn message(&self) -> String {
        match self {
            Self::Classified(err) => err.message().to_owned(),
            Self::Error(err) => err.to_string(),
            Self::Opaque(_) => UNKNOWN_FAILURE_MESSAGE.to_owned(),
        }
    }

    /// Details of a classified failure; `None` for anything else.
    #[inline]
    pub fn details(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Classified(err) => err.details(),
            _ => None,
        }
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classified(err) => f.debug_tuple("Classified").field(err).finish(),
            Self::Error(err) => f.debug_tuple("Error").field(&err.to_string()).finish(),
            Self::Opaque(_) => f.debug_tuple("Opaque").field(&"<REDACTED>").finish(),
        }
    }
}

impl From<ClassifiedError> for Failure {
    fn from(err: ClassifiedError) -> Self {
        Self::Classified(err)
    }
}

impl From<Value> for Failure {
    fn from(value: Value) -> Self {
        Self::Opaque(value)
    }
}

/// A bare string is not an error value: it classifies through the fallback.
impl From<String> for Failure {
    fn from(value: String) -> Self {
        Self::Opaque(Value::String(value))
    }
}

impl From<&str> for Failure {
    fn from(value: &str) -> Self {
        Self::Opaque(Value::String(value.to_owned()))
    }
}

impl From<io::Error> for Failure {
    fn from(err: io::Error) -> Self {
        Self::from_error(err)
    }
}

impl From<serde_json::Error> for Failure {
    fn from(err: serde_json::Error) -> Self {
        Self::from_error(err)
    }
}

/// The usual `?` target. A boxed [`ClassifiedError`] is unboxed, not wrapped.
impl From<Box<dyn Error + Send + Sync + 'static>> for Failure {
    fn from(err: Box<dyn Error + Send + Sync + 'static>) -> Self {
        match err.downcast::<ClassifiedError>() {
            Ok(classified) => Self::Classified(*classified),
            Err(err) => Self::Error(Arc::from(err)),
        }
    }
}

impl From<SourceError> for Failure {
    fn from(err: SourceError) -> Self {
        match err.downcast_ref::<ClassifiedError>() {
            Some(classified) => Self::Classified(classified.clone()),
            None => Self::Error(err),
        }
    }
}

/// Classify any failure into exactly one taxonomy member.
///
/// Total and idempotent: `classify(classify(x))` equals `classify(x)`.
pub fn classify(failure: impl Into<Failure>) -> ClassifiedError {
    match failure.into() {
        Failure::Classified(err) => err,
        Failure::Error(err) => {
            if let Some(classified) = err.downcast_ref::<ClassifiedError>() {
                return classified.clone();
            }
            let message = err.to_string();
            ClassifiedError::unknown(message.clone())
                .with_detail(ORIGINAL_FAILURE_KEY, describe_error(&message, err.as_ref()))
                .with_shared_source(err)
        }
        Failure::Opaque(value) => ClassifiedError::unknown(UNKNOWN_FAILURE_MESSAGE)
            .with_detail(ORIGINAL_FAILURE_KEY, value),
    }
}

/// `{message, chain}` where `chain` lists the messages of the source chain.
fn describe_error(message: &str, err: &(dyn Error + 'static)) -> Value {
    let mut chain = Vec::new();
    let mut cursor = err.source();
    while let Some(source) = cursor {
        chain.push(Value::String(source.to_string()));
        cursor = source.source();
    }

    let mut described = Map::new();
    described.insert("message".into(), Value::String(message.to_owned()));
    if !chain.is_empty() {
        described.insert("chain".into(), Value::Array(chain));
    }
    Value::Object(described)
}

/// Classify a non-2xx response the network client received.
///
/// The kind follows the status ([`ErrorKind::from_status`]), the received
/// status is kept as-is, and the server's message wins over the kind's
/// default message when present. Statuses outside 100-599 fall back to the
/// kind's default status.
///
/// ```rust
/// use carefront_errors::{classify_http_status, ErrorKind};
///
/// let err = classify_http_status(401, None);
/// assert_eq!(err.kind(), ErrorKind::Authentication);
/// assert_eq!(err.message(), "Authentication failed");
///
/// let err = classify_http_status(503, Some("Imaging service down"));
/// assert_eq!(err.kind(), ErrorKind::Unknown);
/// assert_eq!(err.status_code().value(), 503);
/// ```
pub fn classify_http_status(status: u16, message: Option<&str>) -> ClassifiedError {
    let kind = ErrorKind::from_status(status);
    let message = message
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(kind.default_message());
    let err = ClassifiedError::new(message, kind).with_detail("httpStatus", status);
    match StatusCode::checked_new(status) {
        Ok(status_code) => err.with_status(status_code),
        Err(_) => err,
    }
}

//! Error kind taxonomy - the closed set every failure is classified into.
//!
//! Each kind carries a stable code (for logs and client-side matching) and a
//! default HTTP-like status. The kind set is closed: there is no way to create
//! a new kind at runtime, and every classified error has exactly one.
//!
//! # Taxonomy
//!
//! | Kind             | Code                   | Status |
//! |------------------|------------------------|--------|
//! | `Validation`     | `VALIDATION_ERROR`     | 400    |
//! | `Authentication` | `AUTHENTICATION_ERROR` | 401    |
//! | `Authorization`  | `AUTHORIZATION_ERROR`  | 403    |
//! | `NotFound`       | `NOT_FOUND_ERROR`      | 404    |
//! | `Conflict`       | `CONFLICT_ERROR`       | 409    |
//! | `Unknown`        | `UNKNOWN_ERROR`        | 500    |
//!
//! # Example
//!
//! ```rust
//! use carefront_errors::{ErrorKind, StatusCode};
//!
//! assert_eq!(ErrorKind::NotFound.code(), "NOT_FOUND_ERROR");
//! assert_eq!(ErrorKind::NotFound.default_status(), StatusCode::new(404));
//! assert_eq!(ErrorKind::from_status(409), ErrorKind::Conflict);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Status Code Type (Validates Range)
// ============================================================================

/// Validated HTTP-like status code (100-599).
///
/// Construction enforces the range once; downstream consumers receive a
/// pre-validated value.
///
/// ```rust
/// # use carefront_errors::StatusCode;
/// const TEAPOT: StatusCode = StatusCode::new(418);
/// assert_eq!(TEAPOT.value(), 418);
/// assert!(StatusCode::checked_new(42).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct StatusCode(u16);

impl StatusCode {
    /// Lowest accepted status.
    pub const MIN: u16 = 100;
    /// Highest accepted status.
    pub const MAX: u16 = 599;

    /// Create a status code with compile-time validation.
    ///
    /// # Panics
    ///
    /// Panics at compile time (in const contexts) or at runtime if the value
    /// is outside 100-599.
    #[inline]
    pub const fn new(code: u16) -> Self {
        assert!(
            code >= Self::MIN && code <= Self::MAX,
            "Status code must be 100-599"
        );
        Self(code)
    }

    /// Create a status code with runtime validation.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the value is outside 100-599.
    #[inline]
    pub fn checked_new(code: u16) -> Result<Self, StatusCodeError> {
        if (Self::MIN..=Self::MAX).contains(&code) {
            Ok(Self(code))
        } else {
            Err(StatusCodeError::OutOfRange { value: code })
        }
    }

    /// Get the raw numeric value.
    #[inline]
    pub const fn value(self) -> u16 {
        self.0
    }

    /// True for 4xx statuses.
    #[inline]
    pub const fn is_client_error(self) -> bool {
        self.0 >= 400 && self.0 < 500
    }

    /// True for 5xx statuses.
    #[inline]
    pub const fn is_server_error(self) -> bool {
        self.0 >= 500
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for StatusCode {
    type Error = StatusCodeError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::checked_new(value)
    }
}

impl From<StatusCode> for u16 {
    fn from(status: StatusCode) -> Self {
        status.0
    }
}

/// Error type for status code validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusCodeError {
    /// Value outside the 100-599 range.
    #[error("status code {value} is outside 100-599")]
    OutOfRange {
        /// The rejected value.
        value: u16,
    },
}

// ============================================================================
// Error Kind (Closed Taxonomy)
// ============================================================================

/// Taxonomy category of a classified failure.
///
/// Small fieldless enum, Copy so call sites can match and pass it by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Input rejected by a schema or business rule.
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    /// Caller is not authenticated (missing or expired session).
    #[serde(rename = "AUTHENTICATION_ERROR")]
    Authentication,
    /// Caller is authenticated but lacks permission.
    #[serde(rename = "AUTHORIZATION_ERROR")]
    Authorization,
    /// Requested resource does not exist.
    #[serde(rename = "NOT_FOUND_ERROR")]
    NotFound,
    /// Request conflicts with current resource state.
    #[serde(rename = "CONFLICT_ERROR")]
    Conflict,
    /// Anything that could not be classified more precisely.
    #[serde(rename = "UNKNOWN_ERROR")]
    Unknown,
}

impl ErrorKind {
    /// Every kind, in taxonomy order.
    pub const ALL: [ErrorKind; 6] = [
        Self::Validation,
        Self::Authentication,
        Self::Authorization,
        Self::NotFound,
        Self::Conflict,
        Self::Unknown,
    ];

    /// Stable machine-readable code.
    #[inline]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Authentication => "AUTHENTICATION_ERROR",
            Self::Authorization => "AUTHORIZATION_ERROR",
            Self::NotFound => "NOT_FOUND_ERROR",
            Self::Conflict => "CONFLICT_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Status a classified error of this kind carries unless overridden.
    #[inline]
    pub const fn default_status(self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::new(400),
            Self::Authentication => StatusCode::new(401),
            Self::Authorization => StatusCode::new(403),
            Self::NotFound => StatusCode::new(404),
            Self::Conflict => StatusCode::new(409),
            Self::Unknown => StatusCode::new(500),
        }
    }

    /// Message used when a constructor is called without one.
    #[inline]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::Validation => "Validation failed",
            Self::Authentication => "Authentication failed",
            Self::Authorization => "Not authorized",
            Self::NotFound => "Resource not found",
            Self::Conflict => "Resource conflict",
            Self::Unknown => "An unknown error occurred",
        }
    }

    /// Map a received HTTP status to a kind.
    ///
    /// 422 (request-body schema violation) maps to `Validation`.
    #[inline]
    pub const fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => Self::Validation,
            401 => Self::Authentication,
            403 => Self::Authorization,
            404 => Self::NotFound,
            409 => Self::Conflict,
            _ => Self::Unknown,
        }
    }

    /// Whether the call site can recover locally (re-prompt the user).
    ///
    /// Every other kind is surfaced with a generic message and dispatched.
    #[inline]
    pub const fn is_recoverable(self) -> bool {
        matches!(self, Self::Validation)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

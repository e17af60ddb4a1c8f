//! Structured error logging.
//!
//! [`ErrorLogger`] turns a classified error into a [`LogRecord`]
//! `{message, code, status, details, context, timestamp}` and emits it through
//! `tracing`. Attach it to an [`ErrorDispatcher`](crate::ErrorDispatcher) with
//! [`ErrorLogger::observer`] so every handled failure is logged once.
//!
//! # Patient Data
//!
//! Details may carry patient identifiers. Text output therefore lists only
//! detail *keys*, unless the `trusted_debug` feature is enabled in a debug
//! build. Records zeroize their owned strings on drop.
//!
//! # Bounded Output
//!
//! Every field written by [`LogRecord::write_to`] is capped at
//! `MAX_FIELD_OUTPUT_LEN` bytes on a UTF-8 boundary with a visible
//! truncation indicator.

use crate::{ClassifiedError, Details, Failure, Observer, StatusCode, classify, zeroize_value};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt as subscriber_fmt};
use zeroize::Zeroize;

/// Maximum length for any individual field in formatted output.
const MAX_FIELD_OUTPUT_LEN: usize = 1024;

/// Truncation indicator appended to truncated strings.
const TRUNCATION_INDICATOR: &str = "...[TRUNCATED]";

/// One logged failure.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    message: String,
    code: &'static str,
    status_code: StatusCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Details>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<Value>,
    timestamp: DateTime<Utc>,
}

impl LogRecord {
    /// Build a record for `err`, stamped now.
    pub fn new(err: &ClassifiedError, context: Option<&Value>) -> Self {
        Self::at(err, context, Utc::now())
    }

    /// Build a record for `err` with an explicit timestamp.
    pub fn at(err: &ClassifiedError, context: Option<&Value>, timestamp: DateTime<Utc>) -> Self {
        Self {
            message: err.message().to_owned(),
            code: err.code(),
            status_code: err.status_code(),
            details: err.details().cloned(),
            context: context.cloned(),
            timestamp,
        }
    }

    /// Error message at the time of logging.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Wire code, e.g. `NOT_FOUND_ERROR`.
    #[inline]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// Effective HTTP status.
    #[inline]
    pub const fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// Copy of the error's details.
    #[inline]
    pub fn details(&self) -> Option<&Details> {
        self.details.as_ref()
    }

    /// Caller-supplied context, such as the current page.
    #[inline]
    pub fn context(&self) -> Option<&Value> {
        self.context.as_ref()
    }

    /// When the record was built.
    #[inline]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// RFC 3339 timestamp with millisecond precision.
    pub fn timestamp_rfc3339(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Write the record as one bounded line.
    ///
    /// ```rust
    /// # use carefront_errors::{ClassifiedError, LogRecord};
    /// let err = ClassifiedError::not_found("Patient not found").with_detail("patientId", "p-9");
    /// let mut line = String::new();
    /// LogRecord::new(&err, None).write_to(&mut line).unwrap();
    /// assert!(line.contains("[NOT_FOUND_ERROR 404]"));
    /// assert!(line.contains("patientId"));
    /// ```
    pub fn write_to(&self, f: &mut impl fmt::Write) -> fmt::Result {
        write!(
            f,
            "{} [{} {}] message='{}'",
            self.timestamp_rfc3339(),
            self.code,
            self.status_code,
            truncate_with_indicator(&self.message)
        )?;

        if let Some(details) = &self.details {
            write!(f, " details='{}'", truncate_with_indicator(&render_details(details)))?;
        }

        if let Some(context) = &self.context {
            write!(f, " context='{}'", truncate_with_indicator(&context.to_string()))?;
        }

        Ok(())
    }

    /// Format with detail values included, for trusted local debugging.
    ///
    /// Only available with the `trusted_debug` feature in debug builds.
    #[cfg(all(feature = "trusted_debug", debug_assertions))]
    pub fn format_for_trusted_debug(&self) -> String {
        let mut output = String::new();
        // Writing to a String cannot fail.
        let _ = self.write_to(&mut output);
        output
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f)
    }
}

impl Zeroize for LogRecord {
    fn zeroize(&mut self) {
        self.message.zeroize();
        if let Some(details) = self.details.as_mut() {
            for (_, value) in details.iter_mut() {
                zeroize_value(value);
            }
            details.clear();
        }
        if let Some(context) = self.context.as_mut() {
            zeroize_value(context);
        }
    }
}

impl Drop for LogRecord {
    fn drop(&mut self) {
        self.zeroize();
    }
}

#[cfg(all(feature = "trusted_debug", debug_assertions))]
fn render_details(details: &Details) -> String {
    Value::Object(details.clone()).to_string()
}

#[cfg(not(all(feature = "trusted_debug", debug_assertions)))]
fn render_details(details: &Details) -> String {
    let keys: Vec<&str> = details.keys().map(String::as_str).collect();
    format!("<keys: {}>", keys.join(","))
}

/// Emits classified errors as structured `tracing` events.
///
/// Server-side failures (5xx) are logged at `error`, everything else at
/// `warn`. Clones share the logged-record counter.
#[derive(Debug, Clone, Default)]
pub struct ErrorLogger {
    logged: Arc<AtomicU64>,
}

impl ErrorLogger {
    /// Logger with a fresh counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Log an already classified error.
    pub fn log_error(&self, err: &ClassifiedError, context: Option<&Value>) -> LogRecord {
        let record = LogRecord::new(err, context);
        self.emit(&record);
        record
    }

    /// Classify `failure` and log it.
    pub fn log_failure(&self, failure: impl Into<Failure>, context: Option<&Value>) -> LogRecord {
        let err = classify(failure);
        self.log_error(&err, context)
    }

    fn emit(&self, record: &LogRecord) {
        self.logged.fetch_add(1, Ordering::Relaxed);

        let message = truncate_with_indicator(&record.message);
        let details = record
            .details
            .as_ref()
            .map(|d| truncate_with_indicator(&render_details(d)).into_owned());
        let context = record
            .context
            .as_ref()
            .map(|c| truncate_with_indicator(&c.to_string()).into_owned());
        let timestamp = record.timestamp_rfc3339();

        if record.status_code.is_server_error() {
            tracing::error!(
                code = record.code,
                status = record.status_code.value(),
                details = details.as_deref(),
                context = context.as_deref(),
                timestamp = %timestamp,
                "{message}"
            );
        } else {
            tracing::warn!(
                code = record.code,
                status = record.status_code.value(),
                details = details.as_deref(),
                context = context.as_deref(),
                timestamp = %timestamp,
                "{message}"
            );
        }
    }

    /// Dispatcher observer logging every handled error without context.
    pub fn observer(&self) -> Observer {
        let logger = self.clone();
        Arc::new(move |err: &ClassifiedError| {
            logger.log_error(err, None);
        })
    }

    /// Number of records emitted by this logger and its clones.
    #[inline]
    pub fn logged_count(&self) -> u64 {
        self.logged.load(Ordering::Relaxed)
    }
}

/// Failure to install the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// A global subscriber is already installed.
    #[error("failed to init logging: {0}")]
    Init(String),
}

/// Filter for `level`, or `info` when the directive does not parse.
///
/// The process environment is not consulted: [`Settings`](crate::Settings)
/// has already resolved `CAREFRONT_LOG_LEVEL` against `RUST_LOG`.
pub(crate) fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a compact `tracing` subscriber filtered by `level`, typically
/// [`Settings::log_level`](crate::Settings::log_level).
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(level: &str) -> Result<(), LoggingError> {
    let filter = log_filter(level);

    subscriber_fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))
}

/// Truncate a string for display, keeping UTF-8 boundaries intact.
///
/// Returns a borrowed value when no truncation is needed.
pub(crate) fn truncate_with_indicator(s: &str) -> Cow<'_, str> {
    if s.len() <= MAX_FIELD_OUTPUT_LEN {
        return Cow::Borrowed(s);
    }

    let max_content_len = MAX_FIELD_OUTPUT_LEN.saturating_sub(TRUNCATION_INDICATOR.len());

    let mut idx = max_content_len;
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }

    if idx == 0 {
        return Cow::Borrowed(TRUNCATION_INDICATOR);
    }

    let mut result = String::with_capacity(idx + TRUNCATION_INDICATOR.len());
    result.push_str(&s[..idx]);
    result.push_str(TRUNCATION_INDICATOR);
    Cow::Owned(result)
}

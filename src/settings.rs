//! Environment-driven settings.

use thiserror::Error;

use crate::ring_buffer::RingBufferLogger;

/// Log filter; `RUST_LOG` is consulted when unset or blank.
pub const LOG_LEVEL_VAR: &str = "CAREFRONT_LOG_LEVEL";
/// Error history capacity.
pub const HISTORY_CAPACITY_VAR: &str = "CAREFRONT_ERROR_HISTORY_CAPACITY";
/// Error history per-entry byte cap.
pub const HISTORY_ENTRY_BYTES_VAR: &str = "CAREFRONT_ERROR_HISTORY_ENTRY_BYTES";

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_HISTORY_CAPACITY: usize = 256;
const DEFAULT_HISTORY_ENTRY_BYTES: usize = 2048;
const MIN_HISTORY_ENTRY_BYTES: usize = 64;

/// Invalid environment value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// The value is not an unsigned integer.
    #[error("failed to parse {key}, expecting a positive integer (got {value:?})")]
    NotAnInteger {
        /// Variable name.
        key: &'static str,
        /// Raw value as read.
        value: String,
    },

    /// The value is below the accepted minimum.
    #[error("{key} must be >= {min} (got {value})")]
    TooSmall {
        /// Variable name.
        key: &'static str,
        /// Smallest accepted value.
        min: usize,
        /// Parsed value.
        value: usize,
    },
}

/// Runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// `tracing-subscriber` filter directive, already resolved against
    /// `RUST_LOG`. Pass it to [`init_logging`](crate::init_logging).
    pub log_level: String,
    /// Entries kept by the error history.
    pub error_history_capacity: usize,
    /// Byte cap per error history entry.
    pub error_history_entry_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            error_history_capacity: DEFAULT_HISTORY_CAPACITY,
            error_history_entry_bytes: DEFAULT_HISTORY_ENTRY_BYTES,
        }
    }
}

impl Settings {
    /// Load from the process environment, after merging a `.env` file if one
    /// is present.
    pub fn from_env() -> Result<Self, SettingsError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|level| level.trim().to_owned())
                .filter(|level| !level.is_empty())
        };
        let log_level = non_blank(LOG_LEVEL_VAR)
            .or_else(|| non_blank("RUST_LOG"))
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let error_history_capacity =
            parse_usize(&lookup, HISTORY_CAPACITY_VAR, DEFAULT_HISTORY_CAPACITY, 1)?;
        let error_history_entry_bytes = parse_usize(
            &lookup,
            HISTORY_ENTRY_BYTES_VAR,
            DEFAULT_HISTORY_ENTRY_BYTES,
            MIN_HISTORY_ENTRY_BYTES,
        )?;

        Ok(Self {
            log_level,
            error_history_capacity,
            error_history_entry_bytes,
        })
    }

    /// Error history sized by these settings.
    pub fn history(&self) -> RingBufferLogger {
        RingBufferLogger::new(self.error_history_capacity, self.error_history_entry_bytes)
    }
}

fn parse_usize<F>(lookup: &F, key: &'static str, default: usize, min: usize) -> Result<usize, SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let value = raw
        .trim()
        .parse::<usize>()
        .map_err(|_| SettingsError::NotAnInteger { key, value: raw.clone() })?;
    if value < min {
        return Err(SettingsError::TooSmall { key, min, value });
    }
    Ok(value)
}

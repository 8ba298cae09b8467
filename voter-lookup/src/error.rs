//! Error types for input validation and configuration loading.

use serde::Serialize;
use thiserror::Error;

/// Name of the request field every [`ValidationError`] refers to.
pub const NATIONAL_ID_FIELD: &str = "national_id";

/// A national ID failed structural validation.
///
/// Validation failures are terminal: they are reported to the caller
/// immediately and never consume a lookup attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct ValidationError {
    /// Human-readable reason for the rejection.
    pub message: String,
    /// The offending field, always [`NATIONAL_ID_FIELD`].
    pub field: &'static str,
    /// The raw input exactly as supplied, before trimming.
    pub input: String,
}

impl ValidationError {
    pub(crate) fn new(message: impl Into<String>, input: &str) -> Self {
        Self {
            message: message.into(),
            field: NATIONAL_ID_FIELD,
            input: input.to_string(),
        }
    }
}

/// Errors raised while reading lookup configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        /// Variable name.
        name: String,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The target-district allow-list resolved to no entries.
    #[error("Target district list must contain at least one district")]
    EmptyDistrictList,
}

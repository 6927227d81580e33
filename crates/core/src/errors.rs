//! Error types for the repository event notifier.
//!
//! Each step of an invocation has its own error type derived with
//! `thiserror`, and a top-level [`RelayError`] enum unifies them for the
//! fatal path of an invocation.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error for the fatal path of an invocation.
///
/// Delivery failures are not fatal and therefore have no variant here.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Event errors
// ---------------------------------------------------------------------------

/// Errors raised while decoding or validating an inbound change event.
#[derive(Debug, Error)]
pub enum EventError {
    /// The envelope is not valid JSON or does not have the expected shape.
    #[error("invalid event envelope: {0}")]
    InvalidEnvelope(String),

    /// The envelope carries no records.
    #[error("event contains no records")]
    NoRecords,

    /// A record's resource name does not carry a repository identifier.
    #[error("record {index}: malformed resource name '{resource_name}': {detail}")]
    MalformedResourceName {
        index: usize,
        resource_name: String,
        detail: String,
    },

    /// A record's event time could not be parsed.
    #[error("record {index}: unparseable event time '{value}'")]
    InvalidEventTime { index: usize, value: String },
}

// ---------------------------------------------------------------------------
// Lookup errors
// ---------------------------------------------------------------------------

/// Errors from the repository metadata lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The repository does not exist in the lookup region.
    #[error("repository '{0}' does not exist")]
    RepositoryNotFound(String),

    /// The lookup service rejected the call or could not be reached.
    #[error("repository lookup for '{repository}' failed: {detail}")]
    Service { repository: String, detail: String },

    /// The service answered without a metadata block.
    #[error("repository lookup for '{0}' returned no metadata")]
    MissingMetadata(String),
}

// ---------------------------------------------------------------------------
// Notification errors
// ---------------------------------------------------------------------------

/// Errors from chat notification delivery.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Slack webhook answered with a non-success status.
    #[error("Slack notification failed: {0}")]
    SlackError(String),

    /// HTTP error during notification delivery.
    #[error("notification HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

//! Core error types for selstudy-core.
//!
//! Nothing in this crate is fatal to the interaction flow. Delivery and
//! persistence errors are recovered locally (offline session id, retry,
//! outbox); they are typed here so callers and logs can tell them apart.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for selstudy-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Telemetry delivery errors
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// Outbox persistence errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Failure of a single call to the remote collector.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// Destination path could not be joined onto the collector base URL
    #[error("Invalid destination: {0}")]
    BadDestination(String),

    /// Collector answered with a non-2xx status
    #[error("Server returned {0}.")]
    BadStatus(u16),

    /// Request payload could not be serialized
    #[error("Encode failed: {0}")]
    Encoding(String),

    /// Response body could not be decoded
    #[error("Decode failed: {0}")]
    Decoding(String),

    /// Connection, timeout or other transport-level failure
    #[error("Network error: {0}")]
    Transport(String),

    /// Retry schedule was cancelled before delivery succeeded
    #[error("Delivery cancelled")]
    Cancelled,
}

impl DeliveryError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Encoding failures are deterministic; everything else is worth retrying.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DeliveryError::Encoding(_) | DeliveryError::Cancelled)
    }
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DeliveryError::Decoding(err.to_string())
        } else if let Some(status) = err.status() {
            DeliveryError::BadStatus(status.as_u16())
        } else if err.is_builder() {
            DeliveryError::BadDestination(err.to_string())
        } else {
            DeliveryError::Transport(err.to_string())
        }
    }
}

/// Outbox store errors. Always swallowed by the telemetry layer after logging.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Store exists but could not be read
    #[error("Failed to read outbox at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Store could not be written or atomically replaced
    #[error("Failed to write outbox at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Store content is not a valid entry list
    #[error("Outbox at {path} is corrupt: {message}")]
    Corrupt { path: PathBuf, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Task target does not occur in the task text; such a task can never complete
    #[error("Target '{target}' not found in text of task '{task}'")]
    TargetNotFound { task: String, target: String },
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Out of bounds
    #[error("Index {index} out of bounds for {collection} (length: {len})")]
    OutOfBounds {
        collection: String,
        index: usize,
        len: usize,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

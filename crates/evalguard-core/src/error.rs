//! Core error types for evalguard-core.
//!
//! This module defines the error hierarchy using thiserror. Each concern
//! (configuration, persisted timer state, the server oracle, input
//! validation) has its own enum; `CoreError` wraps them all.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for evalguard-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Persisted timer state errors
    #[error("Timer store error: {0}")]
    Store(#[from] StoreError),

    /// Server oracle errors
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The data directory could not be determined or created
    #[error("Cannot prepare data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file exists but could not be read
    #[error("Cannot read configuration at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Unknown dotted configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised by a [`TimerStore`](crate::timer::TimerStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// The stored record exists but cannot be decoded
    #[error("Malformed timer record: {0}")]
    Malformed(String),

    /// Reading or writing the backing file failed
    #[error("Timer store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The record could not be encoded
    #[error("Failed to encode timer record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors talking to the server time oracle.
#[derive(Error, Debug)]
pub enum OracleError {
    /// Transport failure (connection refused, reset, DNS...)
    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status
    #[error("{endpoint} answered HTTP {status}")]
    Status { endpoint: String, status: u16 },

    /// The payload could not be decoded
    #[error("Malformed response from {endpoint}: {message}")]
    Malformed { endpoint: String, message: String },

    /// The server answered but reported `success: false`
    #[error("{endpoint} rejected the request: {message}")]
    Rejected { endpoint: String, message: String },

    /// The base URL plus endpoint path does not form a valid URL
    #[error("Invalid oracle URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Time limit must be strictly positive
    #[error("Time limit must be positive, got {minutes} minutes")]
    NonPositiveTimeLimit { minutes: f64 },

    /// Session identifier must not be blank
    #[error("Session identifier is empty")]
    EmptySessionId,
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

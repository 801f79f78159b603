//! Error types for the application.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Errors raised by an endpoint or its transport.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("{endpoint}: missing required config field '{field}'")]
    MissingConfig {
        endpoint: &'static str,
        field: &'static str,
    },

    #[error("{endpoint}: not connected")]
    NotConnected { endpoint: String },

    #[error("{endpoint}: failed to connect to {address}: {source}")]
    ConnectFailed {
        endpoint: &'static str,
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{endpoint}: authentication failed: {reason}")]
    AuthFailed {
        endpoint: &'static str,
        reason: String,
    },

    #[error("{endpoint}: timed out during {operation}")]
    Timeout {
        endpoint: &'static str,
        operation: &'static str,
    },

    #[error("{endpoint}: {operation} is not supported")]
    Unsupported {
        endpoint: &'static str,
        operation: &'static str,
    },

    #[error("{endpoint}: invalid destination channel '{channel_id}'")]
    InvalidChannel {
        endpoint: &'static str,
        channel_id: String,
    },

    #[error("{endpoint}: I/O error: {source}")]
    Io {
        endpoint: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{endpoint}: unexpected response to {request}")]
    UnexpectedResponse {
        endpoint: String,
        request: &'static str,
    },

    #[error("Discord error: {0}")]
    Discord(#[from] serenity::Error),
}

impl EndpointError {
    /// Whether the error means the underlying connection is no longer usable.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, EndpointError::Io { .. })
    }
}

/// Route template errors, at compile or render time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder '%{name}' at offset {offset}")]
    UnknownPlaceholder { name: String, offset: usize },

    #[error("dangling '%' at offset {offset} (use '%%' for a literal percent)")]
    DanglingPercent { offset: usize },

    #[error("placeholder '%{placeholder}' has no value for this message")]
    MissingValue { placeholder: &'static str },
}

/// A route that cannot be compiled from its configuration.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route {index}: trigger needs at least one of regex, channel_id or custom")]
    MissingTrigger { index: usize },

    #[error("route {index}: target must not be empty")]
    MissingTarget { index: usize },

    #[error("route {index}: invalid regex '{pattern}': {message}")]
    InvalidRegex {
        index: usize,
        pattern: String,
        message: String,
    },

    #[error("route {index}: {field} = {value} but the regex has only {groups} capture groups")]
    CaptureOutOfRange {
        index: usize,
        field: &'static str,
        value: usize,
        groups: usize,
    },

    #[error("route {index}: {field} requires a regex trigger")]
    CaptureWithoutRegex { index: usize, field: &'static str },

    #[error("route {index}: invalid message_pattern: {source}")]
    InvalidTemplate {
        index: usize,
        #[source]
        source: TemplateError,
    },
}

/// File-backed store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access store '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse store '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to watch store: {0}")]
    Watch(#[from] notify_debouncer_full::notify::Error),
}

/// Manager (dispatcher) errors.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("an endpoint named '{name}' is already registered")]
    DuplicateEndpoint { name: String },
}

/// Result type alias for endpoint operations.
pub type EndpointResult<T> = std::result::Result<T, EndpointError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

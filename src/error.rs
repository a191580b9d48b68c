//! Error types for the live-link client library.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LiveLinkError>;

/// Errors surfaced by live-link operations.
///
/// Faults reaching an active subscription are delivered once through the
/// observer's `error` callback; the bridge never retries.
#[derive(Error, Debug)]
pub enum LiveLinkError {
    /// Invalid client or operation configuration.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The initial HTTP-style request was rejected by the transport.
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),

    /// The server answered the initial request with a non-success status.
    #[error("Server error ({status_code}): {message}")]
    ServerError {
        /// HTTP status code returned by the server.
        status_code: u16,
        /// Error message extracted from the response body, if any.
        message: String,
    },

    /// A body or frame could not be serialized or parsed as JSON.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A fault in the realtime delivery connection or channel plumbing.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// An operation exceeded its configured timeout.
    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// Unexpected internal state.
    #[error("Internal error: {0}")]
    InternalError(String),
}

//! Timeout configuration for live-link client operations.
//!
//! These govern the default HTTP requester and the bundled socket registry
//! only. The subscription bridge itself carries no timeouts: a hung initial
//! request or a silent channel is the outer client's concern.

use std::time::Duration;

/// Timeout configuration for client operations.
///
/// # Examples
///
/// ```rust
/// use live_link::LiveLinkTimeouts;
/// use std::time::Duration;
///
/// // Use defaults (recommended for most cases)
/// let timeouts = LiveLinkTimeouts::default();
///
/// // Aggressive timeouts for local development
/// let timeouts = LiveLinkTimeouts::fast();
///
/// // Custom
/// let timeouts = LiveLinkTimeouts {
///     connection_timeout: Duration::from_secs(60),
///     ..LiveLinkTimeouts::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct LiveLinkTimeouts {
    /// Timeout for establishing connections (TCP + TLS handshake).
    /// Default: 10 seconds
    pub connection_timeout: Duration,

    /// Timeout for the initial HTTP request, send to full response.
    /// Default: 30 seconds
    pub request_timeout: Duration,

    /// Keep-alive ping interval for the bundled socket registry.
    /// Set to 0 to disable keep-alive pings.
    /// Default: 10 seconds
    pub keepalive_interval: Duration,
}

impl Default for LiveLinkTimeouts {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            keepalive_interval: Duration::from_secs(10),
        }
    }
}

impl LiveLinkTimeouts {
    /// Create timeouts optimized for fast local development.
    pub fn fast() -> Self {
        Self {
            connection_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(5),
            keepalive_interval: Duration::from_secs(15),
        }
    }

    /// Returns `true` if `timeout` means "wait indefinitely".
    pub fn is_no_timeout(timeout: Duration) -> bool {
        timeout.is_zero()
    }
}

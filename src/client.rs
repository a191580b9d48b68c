//! Main live-link client with builder pattern.
//!
//! Ties the initial-request transport and the channel registry together and
//! hands out subscription bridges.

use crate::{
    bridge::ChannelBridge,
    error::{LiveLinkError, Result},
    models::Operation,
    registry::ChannelRegistry,
    request::{HttpRequester, Requester},
    socket::SocketRegistry,
    timeouts::LiveLinkTimeouts,
};
use std::sync::{Arc, OnceLock};

const DEFAULT_QUERY_PATH: &str = "/graphql";

/// Main live-link client.
///
/// Use [`LiveLinkClientBuilder`] to construct instances with custom
/// configuration.
///
/// # Examples
///
/// ```rust,no_run
/// use live_link::{LiveLinkClient, Observer, Operation};
/// use serde_json::json;
///
/// # async fn example() -> live_link::Result<()> {
/// let client = LiveLinkClient::builder()
///     .base_url("http://localhost:3000")
///     .build()?;
/// client.connect_realtime().await?;
///
/// let bridge = client.subscription(Operation::new(
///     "subscription { candidateUpdated { id } }",
///     json!({}),
/// ))?;
/// let subscription = bridge.subscribe(Observer::new().on_next(|d| println!("{}", d)));
/// # subscription.unsubscribe();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LiveLinkClient {
    base_url: String,
    requester: Arc<dyn Requester>,
    registry: Arc<OnceLock<Arc<dyn ChannelRegistry>>>,
    timeouts: LiveLinkTimeouts,
}

impl LiveLinkClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> LiveLinkClientBuilder {
        LiveLinkClientBuilder::new()
    }

    /// Establish the bundled WebSocket registry, unless a registry was
    /// injected or a previous call already connected. Subsequent calls are
    /// no-ops.
    pub async fn connect_realtime(&self) -> Result<()> {
        if self.registry.get().is_some() {
            return Ok(());
        }
        let socket = SocketRegistry::connect(&self.base_url, &self.timeouts).await?;
        // A lost race closes the redundant socket via Drop; first one wins.
        let _ = self.registry.set(Arc::new(socket));
        Ok(())
    }

    /// Build a subscription-sink bridge for `operation`.
    ///
    /// Requires a realtime registry: either injected through the builder or
    /// established via [`connect_realtime`](LiveLinkClient::connect_realtime).
    pub fn subscription(&self, operation: Operation) -> Result<ChannelBridge> {
        let registry = self.registry.get().cloned().ok_or_else(|| {
            LiveLinkError::ConfigurationError(
                "No realtime registry: call connect_realtime() or inject one via the builder"
                    .to_string(),
            )
        })?;
        Ok(ChannelBridge::new(
            operation,
            self.requester.clone(),
            registry,
        ))
    }

    /// Get the configured timeouts.
    pub fn timeouts(&self) -> &LiveLinkTimeouts {
        &self.timeouts
    }
}

/// Builder for configuring [`LiveLinkClient`] instances.
pub struct LiveLinkClientBuilder {
    base_url: Option<String>,
    query_path: String,
    requester: Option<Arc<dyn Requester>>,
    registry: Option<Arc<dyn ChannelRegistry>>,
    timeouts: LiveLinkTimeouts,
}

impl LiveLinkClientBuilder {
    fn new() -> Self {
        Self {
            base_url: None,
            query_path: DEFAULT_QUERY_PATH.to_string(),
            requester: None,
            registry: None,
            timeouts: LiveLinkTimeouts::default(),
        }
    }

    /// Set the base URL of the query server.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the path the initial request is posted to (default `/graphql`).
    pub fn query_path(mut self, path: impl Into<String>) -> Self {
        self.query_path = path.into();
        self
    }

    /// Replace the default HTTP requester with a custom one.
    pub fn requester(mut self, requester: Arc<dyn Requester>) -> Self {
        self.requester = Some(requester);
        self
    }

    /// Inject a channel registry instead of the bundled socket registry.
    pub fn registry(mut self, registry: Arc<dyn ChannelRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set timeout configuration for the default transports.
    pub fn timeouts(mut self, timeouts: LiveLinkTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<LiveLinkClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| LiveLinkError::ConfigurationError("base_url is required".into()))?;

        let requester = match self.requester {
            Some(requester) => requester,
            None => {
                let endpoint = format!(
                    "{}{}",
                    base_url.trim_end_matches('/'),
                    self.query_path
                );
                Arc::new(HttpRequester::new(endpoint, &self.timeouts)?)
            }
        };

        let registry = Arc::new(OnceLock::new());
        if let Some(injected) = self.registry {
            let _ = registry.set(injected);
        }

        Ok(LiveLinkClient {
            base_url,
            requester,
            registry,
            timeouts: self.timeouts,
        })
    }
}

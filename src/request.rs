//! Initial request transport: the pluggable HTTP-style seam and its default
//! reqwest-backed implementation.

use crate::error::{LiveLinkError, Result};
use crate::models::{RawResponse, RequestOverrides};
use crate::timeouts::LiveLinkTimeouts;
use async_trait::async_trait;
use log::{debug, warn};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Request header carrying the operation's correlation key.
pub const HEADER_OPERATION_KEY: &str = "x-operation-key";

/// Response header that may carry the realtime channel name.
pub const HEADER_CHANNEL: &str = "x-subscription-channel";

/// The composed initial request: serialized `{query, variables}` body plus
/// merged headers.
#[derive(Debug, Clone)]
pub struct InitialRequest {
    /// JSON request body.
    pub body: String,
    /// Merged headers: caller overrides plus content-type and key headers.
    pub headers: HashMap<String, String>,
}

/// The pluggable HTTP-style request function.
///
/// Implementations send one POST and return status, headers (lowercased
/// names), and the unparsed body. They must not retry; retry policy belongs
/// to the outer client.
#[async_trait]
pub trait Requester: Send + Sync {
    /// Send the initial request and return the raw response.
    async fn send(&self, request: InitialRequest) -> Result<RawResponse>;
}

/// Merge caller overrides with the fixed headers every initial request
/// carries. Fixed headers win on collision.
pub(crate) fn compose_headers(
    overrides: &RequestOverrides,
    operation_key: &str,
) -> HashMap<String, String> {
    let mut headers = overrides.headers.clone();
    headers.insert("content-type".to_string(), "application/json".to_string());
    headers.insert(HEADER_OPERATION_KEY.to_string(), operation_key.to_string());
    headers
}

/// Default requester: POST over a pooled reqwest client.
pub struct HttpRequester {
    endpoint: String,
    http_client: reqwest::Client,
}

impl HttpRequester {
    /// Build a requester posting to `endpoint`.
    pub fn new(endpoint: impl Into<String>, timeouts: &LiveLinkTimeouts) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(timeouts.connection_timeout)
            // Keep-alive connections reduce TCP handshake overhead
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90));

        if !LiveLinkTimeouts::is_no_timeout(timeouts.request_timeout) {
            builder = builder.timeout(timeouts.request_timeout);
        }

        let http_client = builder
            .build()
            .map_err(|e| LiveLinkError::ConfigurationError(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            http_client,
        })
    }
}

#[async_trait]
impl Requester for HttpRequester {
    async fn send(&self, request: InitialRequest) -> Result<RawResponse> {
        let mut builder = self.http_client.post(&self.endpoint).body(request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        debug!("[LINK_HTTP] Sending POST to {}", self.endpoint);
        let start = Instant::now();
        let response = builder.send().await?;
        let status = response.status();
        debug!(
            "[LINK_HTTP] Response received: status={} duration_ms={}",
            status,
            start.elapsed().as_millis()
        );

        // Capture headers before the body consumes the response.
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = response.text().await?;

        if !status.is_success() {
            warn!(
                "[LINK_HTTP] Server error: status={} duration_ms={}",
                status,
                start.elapsed().as_millis()
            );
            return Err(LiveLinkError::ServerError {
                status_code: status.as_u16(),
                message: if body.is_empty() {
                    "Unknown error".to_string()
                } else {
                    body
                },
            });
        }

        Ok(RawResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }
}

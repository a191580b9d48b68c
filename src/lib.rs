//! live-link: client bridge between a request/response query call and a
//! channel-based realtime delivery service.
//!
//! A subscription starts with an ordinary POST that both returns the first
//! result and names a realtime channel (via response extensions, a response
//! header, or the operation's own key as a last resort). Further results
//! arrive as `{result, more}` envelopes on that channel and are
//! demultiplexed into the caller's `{next, error, complete}` observer.
//!
//! The crate is organized by concern:
//! - [`bridge`]: the transport bridge orchestrating one subscription.
//! - [`client`]: builder-based entry point tying the transports together.
//! - [`registry`]: adapter contracts over the realtime delivery client.
//! - [`socket`]: bundled WebSocket-backed registry implementation.
//! - [`request`]: the pluggable initial-request seam and reqwest default.
//! - [`models`]: operation descriptor, envelopes, response shapes.

pub mod bridge;
pub mod client;
pub mod error;
pub mod models;
pub mod observer;
pub mod registry;
pub mod request;
pub mod socket;
pub mod timeouts;

pub use bridge::{ChannelBridge, Subscription};
pub use client::{LiveLinkClient, LiveLinkClientBuilder};
pub use error::{LiveLinkError, Result};
pub use models::{
    InitialResponse, Operation, RawResponse, RequestOptions, RequestOverrides, UpdateEnvelope,
};
pub use observer::Observer;
pub use registry::{ChannelHandle, ChannelRegistry, UpdateHandler, UPDATE_EVENT};
pub use request::{HttpRequester, InitialRequest, Requester, HEADER_CHANNEL, HEADER_OPERATION_KEY};
pub use socket::SocketRegistry;
pub use timeouts::LiveLinkTimeouts;

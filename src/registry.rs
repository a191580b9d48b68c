//! Channel Registry Adapter: thin contracts over the realtime delivery
//! client.
//!
//! The bridge never talks to a concrete delivery client directly; it goes
//! through these pass-through traits. The bundled implementation lives in
//! [`socket`](crate::socket), and callers may inject their own.

use crate::error::Result;
use crate::models::UpdateEnvelope;
use std::sync::Arc;

/// Event name on which update envelopes are delivered.
pub const UPDATE_EVENT: &str = "update";

/// Callback bound to a channel event; invoked once per inbound message.
pub type UpdateHandler = Arc<dyn Fn(UpdateEnvelope) + Send + Sync>;

/// A live handle to one named channel.
pub trait ChannelHandle: Send + Sync {
    /// Bind `handler` to `event` on this channel.
    fn bind(&self, event: &str, handler: UpdateHandler) -> Result<()>;

    /// Unbind a previously bound handler, compared by `Arc` identity.
    ///
    /// Unbinding a handler that is not bound is a no-op, not an error.
    fn unbind(&self, event: &str, handler: &UpdateHandler) -> Result<()>;
}

/// Pass-through adapter isolating the bridge from the concrete delivery
/// client's API surface. No business logic lives here.
///
/// Contract: a handle returned by [`subscribe_to_channel`] is usable for
/// [`ChannelHandle::bind`] immediately.
///
/// [`subscribe_to_channel`]: ChannelRegistry::subscribe_to_channel
pub trait ChannelRegistry: Send + Sync {
    /// Resolve a live channel handle for `name`, subscribing if needed.
    fn subscribe_to_channel(&self, name: &str) -> Result<Arc<dyn ChannelHandle>>;

    /// Release the subscription for `name`.
    ///
    /// Unsubscribing a channel that is not subscribed must not error.
    fn unsubscribe_from_channel(&self, name: &str) -> Result<()>;
}

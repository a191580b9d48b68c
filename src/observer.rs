//! Observer contract for streamed subscription results.
//!
//! The calling client supplies the `{next, error, complete}` callback triple;
//! the bridge dispatches into it as the initial response and channel
//! envelopes arrive:
//!
//! - [`on_next`](Observer::on_next): one result payload (initial or update)
//! - [`on_error`](Observer::on_error): a terminal fault; no retry follows
//! - [`on_complete`](Observer::on_complete): the logical stream finished
//!
//! # Example
//!
//! ```rust
//! use live_link::Observer;
//!
//! let observer = Observer::new()
//!     .on_next(|data| println!("result: {}", data))
//!     .on_error(|err| eprintln!("subscription failed: {}", err))
//!     .on_complete(|| println!("done"));
//! ```

use crate::error::LiveLinkError;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

/// Type alias for the next callback.
pub type OnNextCallback = Arc<dyn Fn(JsonValue) + Send + Sync>;

/// Type alias for the error callback.
pub type OnErrorCallback = Arc<dyn Fn(LiveLinkError) + Send + Sync>;

/// Type alias for the complete callback.
pub type OnCompleteCallback = Arc<dyn Fn() + Send + Sync>;

/// The callback triple supplied by the calling client to receive streamed
/// results.
///
/// All callbacks are optional; unset slots are skipped on dispatch.
/// Callbacks are `Send + Sync` so they can be invoked from the background
/// tasks delivering channel events.
#[derive(Clone, Default)]
pub struct Observer {
    pub(crate) on_next: Option<OnNextCallback>,
    pub(crate) on_error: Option<OnErrorCallback>,
    pub(crate) on_complete: Option<OnCompleteCallback>,
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("on_next", &self.on_next.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

impl Observer {
    /// Create an empty observer (no callbacks registered).
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the callback invoked once per streamed result payload.
    pub fn on_next(mut self, f: impl Fn(JsonValue) + Send + Sync + 'static) -> Self {
        self.on_next = Some(Arc::new(f));
        self
    }

    /// Register the callback invoked when the subscription fails.
    ///
    /// A fault is surfaced exactly once and the subscription is dead
    /// afterwards; retrying is the calling client's decision.
    pub fn on_error(mut self, f: impl Fn(LiveLinkError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Register the callback invoked when the logical stream finishes.
    pub fn on_complete(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(f));
        self
    }

    pub(crate) fn emit_next(&self, data: JsonValue) {
        if let Some(cb) = &self.on_next {
            cb(data);
        }
    }

    pub(crate) fn emit_error(&self, error: LiveLinkError) {
        if let Some(cb) = &self.on_error {
            cb(error);
        }
    }

    pub(crate) fn emit_complete(&self) {
        if let Some(cb) = &self.on_complete {
            cb();
        }
    }
}

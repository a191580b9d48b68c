//! Transport Bridge: merges the initial request/response call with the
//! channel-based delivery mechanism into one observer stream.
//!
//! One `subscribe()` call owns one independent [`BindingState`]; there is no
//! shared mutable state across subscriptions. Lifecycle:
//!
//! ```text
//! Idle -> RequestInFlight -> ChannelBound -> StreamingEnvelopes
//!      -> Completed | Errored        (TornDown reachable from any
//!                                     non-terminal state via unsubscribe())
//! ```
//!
//! Envelopes that arrive between the channel bind and the initial `next`
//! are held back and flushed in order once the snapshot has been forwarded,
//! so observers always see "initial snapshot, then updates".

use crate::{
    error::{LiveLinkError, Result},
    models::{InitialResponse, Operation, UpdateEnvelope},
    observer::Observer,
    registry::{ChannelHandle, ChannelRegistry, UpdateHandler, UPDATE_EVENT},
    request::{compose_headers, InitialRequest, Requester, HEADER_CHANNEL},
};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

/// Mutable state exclusively owned by one logical subscription.
#[derive(Default)]
struct BindingState {
    /// Resolved channel name; `None` until the initial response arrives.
    channel_name: Option<String>,
    /// Live channel handle; `None` until resolution completes.
    channel: Option<Arc<dyn ChannelHandle>>,
    /// Bound event callback; `None` until binding completes.
    /// Bound at most once, unbound at most once.
    handler: Option<UpdateHandler>,
    /// Envelopes held back until the initial snapshot has been forwarded.
    pending: Vec<UpdateEnvelope>,
    /// Set once the initial `next` has fired; envelopes then flow directly.
    ready: bool,
    /// Terminal flag: set by teardown or completion; stops all delivery.
    torn_down: bool,
}

fn lock(state: &Mutex<BindingState>) -> MutexGuard<'_, BindingState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The subscription-sink factory for one operation.
///
/// Created via [`LiveLinkClient::subscription`](crate::client::LiveLinkClient::subscription)
/// or directly from parts. Each [`subscribe`](ChannelBridge::subscribe) call
/// starts an independent subscription.
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
/// let operation = Operation::new(
///     "subscription { jobApplications { id status } }",
///     json!({}),
/// );
/// let bridge = client.subscription(operation)?;
///
/// let subscription = bridge.subscribe(
///     Observer::new()
///         .on_next(|data| println!("update: {}", data))
///         .on_complete(|| println!("stream finished")),
/// );
///
/// // ... later
/// subscription.unsubscribe();
/// # Ok(())
/// # }
/// ```
pub struct ChannelBridge {
    operation: Operation,
    requester: Arc<dyn Requester>,
    registry: Arc<dyn ChannelRegistry>,
}

impl ChannelBridge {
    /// Assemble a bridge from an operation and its injected transports.
    pub fn new(
        operation: Operation,
        requester: Arc<dyn Requester>,
        registry: Arc<dyn ChannelRegistry>,
    ) -> Self {
        Self {
            operation,
            requester,
            registry,
        }
    }

    /// The operation this bridge was built for.
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Start the subscription: resolve request options, issue the initial
    /// request, bind the resolved channel, and stream envelopes to
    /// `observer`.
    ///
    /// Returns the teardown handle. Dropping the handle also tears down.
    pub fn subscribe(&self, observer: Observer) -> Subscription {
        // Options resolve exactly once, before the request is sent.
        let overrides = self.operation.options().resolve();
        let headers = compose_headers(&overrides, self.operation.key());

        let state = Arc::new(Mutex::new(BindingState::default()));
        let setup = SubscriptionSetup {
            operation: self.operation.clone(),
            requester: self.requester.clone(),
            registry: self.registry.clone(),
            state: state.clone(),
            observer,
        };
        let task = tokio::spawn(setup.run(headers));

        Subscription {
            state,
            registry: self.registry.clone(),
            _setup: task,
        }
    }
}

/// Everything the spawned setup task needs to drive one subscription from
/// "request in flight" to "channel bound".
struct SubscriptionSetup {
    operation: Operation,
    requester: Arc<dyn Requester>,
    registry: Arc<dyn ChannelRegistry>,
    state: Arc<Mutex<BindingState>>,
    observer: Observer,
}

impl SubscriptionSetup {
    async fn run(self, headers: HashMap<String, String>) {
        let key = self.operation.key().to_string();

        if self.operation.query().trim().is_empty() {
            self.observer.emit_error(LiveLinkError::ConfigurationError(
                "operation query text is empty".to_string(),
            ));
            return;
        }

        let body = match self.operation.to_body() {
            Ok(body) => body,
            Err(e) => {
                self.observer.emit_error(e);
                return;
            }
        };

        debug!("[BRIDGE] key={} sending initial request", key);
        let raw = match self.requester.send(InitialRequest { body, headers }).await {
            Ok(raw) => raw,
            Err(e) => {
                // Request failure is terminal; no channel state exists yet.
                warn!("[BRIDGE] key={} initial request failed: {}", key, e);
                self.observer.emit_error(e);
                return;
            }
        };

        let parsed: JsonValue = match serde_json::from_str(&raw.body) {
            Ok(value) => value,
            Err(e) => {
                warn!("[BRIDGE] key={} unparseable initial response: {}", key, e);
                self.observer.emit_error(e.into());
                return;
            }
        };

        let channel_name = resolve_channel_name(&parsed, &raw.headers, &key);
        debug!("[BRIDGE] key={} resolved channel '{}'", key, channel_name);

        // Torn down while the request was in flight: stop before any
        // registry call so no bind ever happens.
        if lock(&self.state).torn_down {
            debug!("[BRIDGE] key={} torn down before bind; skipping", key);
            return;
        }

        let handler = make_update_handler(
            self.state.clone(),
            self.observer.clone(),
            self.registry.clone(),
        );

        let channel = match self.bind_channel(&channel_name, handler.clone()) {
            Ok(Some(channel)) => channel,
            Ok(None) => return, // lost the race against unsubscribe()
            Err(e) => {
                self.observer.emit_error(e);
                return;
            }
        };

        {
            let mut st = lock(&self.state);
            if st.torn_down {
                // unsubscribe() ran between bind and here; undo symmetrically.
                drop(st);
                let _ = channel.unbind(UPDATE_EVENT, &handler);
                let _ = self.registry.unsubscribe_from_channel(&channel_name);
                return;
            }
            st.channel_name = Some(channel_name.clone());
            st.channel = Some(channel);
            st.handler = Some(handler);
        }

        // Initial snapshot goes out first; gated envelopes follow in order.
        if !emit_initial_snapshot(&self.state, &self.observer, parsed) {
            return;
        }
        // Drain the buffer before opening the direct path: an envelope
        // arriving mid-flush still sees `ready == false`, gets buffered, and
        // is picked up by the next pass. Delivery order matches arrival
        // order; nothing overtakes the buffer.
        loop {
            let batch = {
                let mut st = lock(&self.state);
                if st.pending.is_empty() {
                    st.ready = true;
                    break;
                }
                std::mem::take(&mut st.pending)
            };
            for envelope in batch {
                deliver(&self.state, &self.observer, &self.registry, envelope);
            }
        }
    }

    /// Subscribe to the channel and bind the handler. Returns `Ok(None)` if
    /// teardown won the race, unwinding the partial subscription.
    fn bind_channel(
        &self,
        channel_name: &str,
        handler: UpdateHandler,
    ) -> Result<Option<Arc<dyn ChannelHandle>>> {
        if lock(&self.state).torn_down {
            return Ok(None);
        }

        let channel = self.registry.subscribe_to_channel(channel_name)?;
        if let Err(e) = channel.bind(UPDATE_EVENT, handler) {
            let _ = self.registry.unsubscribe_from_channel(channel_name);
            return Err(e);
        }
        Ok(Some(channel))
    }
}

/// Three-tier channel name resolution: body extensions, then response
/// header, then the operation key. A name is always determined.
fn resolve_channel_name(
    body: &JsonValue,
    headers: &HashMap<String, String>,
    operation_key: &str,
) -> String {
    if let Ok(meta) = InitialResponse::deserialize(body) {
        if let Some(channel) = meta.channel_hint() {
            if !channel.is_empty() {
                return channel.to_string();
            }
        }
    }
    if let Some(channel) = headers.get(HEADER_CHANNEL) {
        if !channel.is_empty() {
            return channel.clone();
        }
    }
    operation_key.to_string()
}

/// Forward the initial snapshot to the observer unless teardown already
/// happened. Returns `false` when the subscription is dead and setup should
/// stop.
fn emit_initial_snapshot(
    state: &Arc<Mutex<BindingState>>,
    observer: &Observer,
    parsed: JsonValue,
) -> bool {
    if lock(state).torn_down {
        return false;
    }
    observer.emit_next(parsed);
    true
}

/// Build the update handler bound to the channel's `"update"` event.
///
/// Envelopes arriving before the initial snapshot has been forwarded are
/// buffered; everything else is delivered directly.
fn make_update_handler(
    state: Arc<Mutex<BindingState>>,
    observer: Observer,
    registry: Arc<dyn ChannelRegistry>,
) -> UpdateHandler {
    Arc::new(move |envelope: UpdateEnvelope| {
        {
            let mut st = lock(&state);
            if st.torn_down {
                return;
            }
            if !st.ready {
                st.pending.push(envelope);
                return;
            }
        }
        deliver(&state, &observer, &registry, envelope);
    })
}

/// Forward one envelope to the observer. An envelope without a `result` is
/// a no-op tick; `more == false` fires `complete()` and then tears the
/// channel down so cleanup never depends on caller discipline.
fn deliver(
    state: &Arc<Mutex<BindingState>>,
    observer: &Observer,
    registry: &Arc<dyn ChannelRegistry>,
    envelope: UpdateEnvelope,
) {
    if lock(state).torn_down {
        return;
    }
    if let Some(result) = envelope.result {
        observer.emit_next(result);
    }
    if !envelope.more {
        observer.emit_complete();
        teardown(state, registry);
    }
}

/// Unbind the handler and unsubscribe the channel, each at most once.
/// Safe at any lifecycle stage, including before the channel exists.
fn teardown(state: &Arc<Mutex<BindingState>>, registry: &Arc<dyn ChannelRegistry>) {
    let (channel, handler, name) = {
        let mut st = lock(state);
        st.torn_down = true;
        st.pending.clear();
        (st.channel.take(), st.handler.take(), st.channel_name.take())
    };

    if let (Some(channel), Some(handler)) = (channel, handler) {
        if let Err(e) = channel.unbind(UPDATE_EVENT, &handler) {
            warn!("[BRIDGE] unbind failed: {}", e);
        }
        if let Some(name) = name {
            if let Err(e) = registry.unsubscribe_from_channel(&name) {
                warn!("[BRIDGE] unsubscribe '{}' failed: {}", name, e);
            }
        }
    }
}

/// Teardown handle returned by [`ChannelBridge::subscribe`].
pub struct Subscription {
    state: Arc<Mutex<BindingState>>,
    registry: Arc<dyn ChannelRegistry>,
    _setup: JoinHandle<()>,
}

impl Subscription {
    /// Tear down the channel binding.
    ///
    /// Idempotent and safe at any stage: before the initial request
    /// resolves (nothing bound yet, so nothing happens), after completion,
    /// or twice in a row.
    pub fn unsubscribe(&self) {
        teardown(&self.state, &self.registry);
    }

    /// `true` once the subscription reached a terminal state (completion or
    /// teardown).
    pub fn is_torn_down(&self) -> bool {
        lock(&self.state).torn_down
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        teardown(&self.state, &self.registry);
    }
}

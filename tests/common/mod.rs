//! Shared test doubles: a scriptable requester, a recording channel
//! registry, and an observer that logs everything it sees.

use async_trait::async_trait;
use live_link::{
    ChannelHandle, ChannelRegistry, InitialRequest, LiveLinkError, Observer, RawResponse,
    Requester, UpdateEnvelope, UpdateHandler,
};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ── observer log ──────────────────────────────────────────────────────────────

/// One observer callback invocation, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    Next(JsonValue),
    Error(String),
    Complete,
}

/// Records every observer callback for later assertions.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Observed>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an observer that appends to this log.
    pub fn observer(&self) -> Observer {
        let next_log = self.events.clone();
        let error_log = self.events.clone();
        let complete_log = self.events.clone();
        Observer::new()
            .on_next(move |data| next_log.lock().unwrap().push(Observed::Next(data)))
            .on_error(move |err| {
                error_log
                    .lock()
                    .unwrap()
                    .push(Observed::Error(err.to_string()))
            })
            .on_complete(move || complete_log.lock().unwrap().push(Observed::Complete))
    }

    pub fn events(&self) -> Vec<Observed> {
        self.events.lock().unwrap().clone()
    }

    pub fn nexts(&self) -> Vec<JsonValue> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Observed::Next(data) => Some(data),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Observed::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn completes(&self) -> usize {
        self.events()
            .into_iter()
            .filter(|e| *e == Observed::Complete)
            .count()
    }
}

// ── requester double ──────────────────────────────────────────────────────────

/// A requester that replays one scripted response, optionally gated so the
/// test controls when the "network" answers.
pub struct MockRequester {
    response: Mutex<Option<live_link::Result<RawResponse>>>,
    gate: Option<Arc<Notify>>,
    pub seen: Mutex<Vec<InitialRequest>>,
}

impl MockRequester {
    pub fn ok(response: RawResponse) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Some(Ok(response))),
            gate: None,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn error(err: LiveLinkError) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Some(Err(err))),
            gate: None,
            seen: Mutex::new(Vec::new()),
        })
    }

    /// The response is withheld until the returned `Notify` is triggered.
    pub fn gated(response: RawResponse) -> (Arc<Self>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        (
            Arc::new(Self {
                response: Mutex::new(Some(Ok(response))),
                gate: Some(gate.clone()),
                seen: Mutex::new(Vec::new()),
            }),
            gate,
        )
    }
}

#[async_trait]
impl Requester for MockRequester {
    async fn send(&self, request: InitialRequest) -> live_link::Result<RawResponse> {
        self.seen.lock().unwrap().push(request);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let response = self.response.lock().unwrap().take();
        response.unwrap_or_else(|| {
            Err(LiveLinkError::InternalError(
                "mock requester called twice".to_string(),
            ))
        })
    }
}

/// Successful response with the given JSON body and no headers.
pub fn raw_response(body: &str) -> RawResponse {
    RawResponse {
        status: 200,
        headers: HashMap::new(),
        body: body.to_string(),
    }
}

/// Successful response carrying one (lowercased) header.
pub fn raw_response_with_header(body: &str, name: &str, value: &str) -> RawResponse {
    let mut response = raw_response(body);
    response.headers.insert(name.to_string(), value.to_string());
    response
}

// ── registry double ───────────────────────────────────────────────────────────

/// Registry that records every call and lets tests dispatch envelopes into
/// bound handlers.
#[derive(Default)]
pub struct RecordingRegistry {
    pub subscribes: Mutex<Vec<String>>,
    pub unsubscribes: Mutex<Vec<String>>,
    channels: Mutex<HashMap<String, Arc<RecordingChannel>>>,
    /// Envelopes delivered synchronously inside `bind`, in queue order,
    /// simulating messages racing the initial response.
    dispatch_on_bind: Mutex<Vec<UpdateEnvelope>>,
}

impl RecordingRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue `envelope` to hit the handler the moment it is bound. Multiple
    /// queued envelopes are dispatched in queue order.
    pub fn dispatch_on_bind(&self, envelope: UpdateEnvelope) {
        self.dispatch_on_bind.lock().unwrap().push(envelope);
    }

    pub fn channel(&self, name: &str) -> Option<Arc<RecordingChannel>> {
        self.channels.lock().unwrap().get(name).cloned()
    }

    pub fn subscribed_names(&self) -> Vec<String> {
        self.subscribes.lock().unwrap().clone()
    }

    pub fn unsubscribed_names(&self) -> Vec<String> {
        self.unsubscribes.lock().unwrap().clone()
    }
}

impl ChannelRegistry for RecordingRegistry {
    fn subscribe_to_channel(&self, name: &str) -> live_link::Result<Arc<dyn ChannelHandle>> {
        self.subscribes.lock().unwrap().push(name.to_string());
        let channel = Arc::new(RecordingChannel {
            binds: Mutex::new(Vec::new()),
            unbinds: Mutex::new(Vec::new()),
            handlers: Mutex::new(Vec::new()),
            on_bind: Mutex::new(std::mem::take(&mut *self.dispatch_on_bind.lock().unwrap())),
        });
        self.channels
            .lock()
            .unwrap()
            .insert(name.to_string(), channel.clone());
        Ok(channel)
    }

    fn unsubscribe_from_channel(&self, name: &str) -> live_link::Result<()> {
        self.unsubscribes.lock().unwrap().push(name.to_string());
        self.channels.lock().unwrap().remove(name);
        Ok(())
    }
}

/// Channel double recording bind/unbind symmetry and holding live handlers.
pub struct RecordingChannel {
    pub binds: Mutex<Vec<String>>,
    pub unbinds: Mutex<Vec<String>>,
    handlers: Mutex<Vec<(String, UpdateHandler)>>,
    on_bind: Mutex<Vec<UpdateEnvelope>>,
}

impl RecordingChannel {
    /// Deliver an envelope to every handler bound for `event`.
    pub fn dispatch(&self, event: &str, envelope: UpdateEnvelope) {
        let handlers: Vec<UpdateHandler> = self
            .handlers
            .lock()
            .unwrap()
            .iter()
            .filter(|(bound, _)| bound == event)
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler(envelope.clone());
        }
    }

    pub fn bind_count(&self) -> usize {
        self.binds.lock().unwrap().len()
    }

    pub fn unbind_count(&self) -> usize {
        self.unbinds.lock().unwrap().len()
    }
}

impl ChannelHandle for RecordingChannel {
    fn bind(&self, event: &str, handler: UpdateHandler) -> live_link::Result<()> {
        self.binds.lock().unwrap().push(event.to_string());
        self.handlers
            .lock()
            .unwrap()
            .push((event.to_string(), handler.clone()));
        let queued = std::mem::take(&mut *self.on_bind.lock().unwrap());
        for envelope in queued {
            handler(envelope);
        }
        Ok(())
    }

    fn unbind(&self, event: &str, handler: &UpdateHandler) -> live_link::Result<()> {
        self.unbinds.lock().unwrap().push(event.to_string());
        self.handlers
            .lock()
            .unwrap()
            .retain(|(bound, h)| !(bound == event && Arc::ptr_eq(h, handler)));
        Ok(())
    }
}

// ── logging ───────────────────────────────────────────────────────────────────

/// Route crate logs into the test harness output. Safe to call repeatedly.
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ── polling helper ────────────────────────────────────────────────────────────

/// Poll `cond` until it holds or `deadline` elapses.
pub async fn wait_until(deadline: Duration, cond: impl Fn() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    loop {
        if cond() {
            return true;
        }
        if start.elapsed() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

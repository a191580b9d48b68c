use super::request_options::RequestOptions;
use crate::error::Result;
use serde_json::{json, Value as JsonValue};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static OPERATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One logical subscription request: query text, variables, and the
/// correlation key used to match channel messages back to this operation.
///
/// The key must stay unique per concurrently active subscription from the
/// same caller; reusing an expired key after teardown is fine.
#[derive(Debug, Clone)]
pub struct Operation {
    key: String,
    query: String,
    variables: JsonValue,
    request_options: RequestOptions,
}

impl Operation {
    /// Create an operation with a generated correlation key.
    pub fn new(query: impl Into<String>, variables: JsonValue) -> Self {
        Self::with_key(generate_key(), query, variables)
    }

    /// Create an operation with a caller-assigned correlation key.
    pub fn with_key(
        key: impl Into<String>,
        query: impl Into<String>,
        variables: JsonValue,
    ) -> Self {
        Self {
            key: key.into(),
            query: query.into(),
            variables,
            request_options: RequestOptions::default(),
        }
    }

    /// Attach per-request overrides (static or factory-produced).
    pub fn request_options(mut self, options: RequestOptions) -> Self {
        self.request_options = options;
        self
    }

    /// Stable correlation key for this operation.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Serialized query text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Query variables; shape is opaque to this layer.
    pub fn variables(&self) -> &JsonValue {
        &self.variables
    }

    /// The attached request options.
    pub fn options(&self) -> &RequestOptions {
        &self.request_options
    }

    /// Serialized body `{query, variables}` for the initial request.
    pub fn to_body(&self) -> Result<String> {
        let body = json!({
            "query": self.query,
            "variables": self.variables,
        });
        Ok(serde_json::to_string(&body)?)
    }
}

fn generate_key() -> String {
    let counter = OPERATION_COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("op_{}_{}", nanos, counter)
}

use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Raw initial response as returned by a [`Requester`](crate::request::Requester):
/// status, headers, and the unparsed body text.
///
/// Header names are lowercased so lookups are case-insensitive; custom
/// `Requester` implementations must follow the same convention.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, names lowercased.
    pub headers: HashMap<String, String>,
    /// Unparsed response body.
    pub body: String,
}

/// Structured view of the initial response body.
///
/// The bridge forwards the full parsed body to the observer verbatim; this
/// type only exists to pull the realtime channel metadata out of
/// `extensions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitialResponse {
    /// Query result payload.
    #[serde(default)]
    pub data: JsonValue,
    /// Server-supplied extension metadata, if any.
    #[serde(default)]
    pub extensions: Option<ResponseExtensions>,
}

/// Extension block of the initial response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseExtensions {
    /// Realtime channel metadata.
    #[serde(default)]
    pub realtime: Option<RealtimeExtension>,
}

/// Server-assigned realtime channel for this operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RealtimeExtension {
    /// Channel name update messages will be published on.
    #[serde(default)]
    pub channel: Option<String>,
}

impl InitialResponse {
    /// Channel name carried in the body's extensions, if any.
    pub fn channel_hint(&self) -> Option<&str> {
        self.extensions
            .as_ref()?
            .realtime
            .as_ref()?
            .channel
            .as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_hint_present() {
        let body = r#"{"data": {"foo": 1}, "extensions": {"realtime": {"channel": "chan-1"}}}"#;
        let parsed: InitialResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.channel_hint(), Some("chan-1"));
    }

    #[test]
    fn test_channel_hint_absent_extensions() {
        let parsed: InitialResponse = serde_json::from_str(r#"{"data": {"foo": 1}}"#).unwrap();
        assert_eq!(parsed.channel_hint(), None);
    }

    #[test]
    fn test_channel_hint_empty_realtime_block() {
        let parsed: InitialResponse =
            serde_json::from_str(r#"{"data": null, "extensions": {"realtime": {}}}"#).unwrap();
        assert_eq!(parsed.channel_hint(), None);
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Message shape delivered once per channel `"update"` event.
///
/// Validation is soft: a missing `result` means "nothing to forward this
/// tick" rather than a fault, and a missing `more` means the stream
/// continues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEnvelope {
    /// Opaque payload forwarded verbatim to the observer's `next`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,

    /// `false` signals the logical stream is finished and `complete` fires.
    #[serde(default = "default_more")]
    pub more: bool,
}

fn default_more() -> bool {
    true
}

impl UpdateEnvelope {
    /// An envelope carrying a result with the stream still open.
    pub fn next(result: JsonValue) -> Self {
        Self {
            result: Some(result),
            more: true,
        }
    }

    /// The final envelope of a stream.
    pub fn last(result: JsonValue) -> Self {
        Self {
            result: Some(result),
            more: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_result_is_none() {
        let env: UpdateEnvelope = serde_json::from_str(r#"{"more": true}"#).unwrap();
        assert!(env.result.is_none());
        assert!(env.more);
    }

    #[test]
    fn test_missing_more_means_stream_continues() {
        let env: UpdateEnvelope = serde_json::from_str(r#"{"result": {"foo": 1}}"#).unwrap();
        assert_eq!(env.result, Some(json!({"foo": 1})));
        assert!(env.more);
    }

    #[test]
    fn test_empty_object_is_a_noop_tick() {
        let env: UpdateEnvelope = serde_json::from_str("{}").unwrap();
        assert!(env.result.is_none());
        assert!(env.more);
    }

    #[test]
    fn test_final_envelope() {
        let env: UpdateEnvelope =
            serde_json::from_str(r#"{"result": {"foo": 2}, "more": false}"#).unwrap();
        assert_eq!(env.result, Some(json!({"foo": 2})));
        assert!(!env.more);
    }
}

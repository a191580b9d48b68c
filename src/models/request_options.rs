use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Caller-supplied overrides applied to the initial request.
#[derive(Debug, Clone, Default)]
pub struct RequestOverrides {
    /// Extra request headers (credentials, tenant hints, etc.).
    pub headers: HashMap<String, String>,
}

impl RequestOverrides {
    /// Overrides carrying only the given headers.
    pub fn with_headers(headers: HashMap<String, String>) -> Self {
        Self { headers }
    }
}

/// Either a static set of overrides or a zero-argument factory producing one.
///
/// A factory is invoked exactly once per `subscribe()` call, before the
/// initial request is sent.
#[derive(Clone)]
pub enum RequestOptions {
    /// Fixed overrides reused as-is for every subscribe.
    Static(RequestOverrides),
    /// Factory evaluated once per subscribe (fresh tokens, per-call headers).
    Factory(Arc<dyn Fn() -> RequestOverrides + Send + Sync>),
}

impl Default for RequestOptions {
    fn default() -> Self {
        RequestOptions::Static(RequestOverrides::default())
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestOptions::Static(overrides) => {
                f.debug_tuple("Static").field(overrides).finish()
            }
            RequestOptions::Factory(_) => f.debug_tuple("Factory").field(&"<fn>").finish(),
        }
    }
}

impl RequestOptions {
    /// Static options carrying only headers.
    pub fn from_headers(headers: HashMap<String, String>) -> Self {
        RequestOptions::Static(RequestOverrides::with_headers(headers))
    }

    /// Options produced by a factory, re-evaluated on every subscribe.
    pub fn factory(f: impl Fn() -> RequestOverrides + Send + Sync + 'static) -> Self {
        RequestOptions::Factory(Arc::new(f))
    }

    /// Resolve to a concrete override set. Factories run here.
    pub fn resolve(&self) -> RequestOverrides {
        match self {
            RequestOptions::Static(overrides) => overrides.clone(),
            RequestOptions::Factory(f) => f(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_default_resolves_empty() {
        let overrides = RequestOptions::default().resolve();
        assert!(overrides.headers.is_empty());
    }

    #[test]
    fn test_static_headers_round_trip() {
        let mut headers = HashMap::new();
        headers.insert("authorization".to_string(), "Bearer tok".to_string());
        let options = RequestOptions::from_headers(headers);
        let overrides = options.resolve();
        assert_eq!(
            overrides.headers.get("authorization").map(String::as_str),
            Some("Bearer tok")
        );
    }

    #[test]
    fn test_factory_runs_per_resolve() {
        let calls = Arc::new(AtomicU32::new(0));
        let counted = calls.clone();
        let options = RequestOptions::factory(move || {
            counted.fetch_add(1, Ordering::SeqCst);
            RequestOverrides::default()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        options.resolve();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        options.resolve();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

//! Side-effect table for stepline
//!
//! This crate provides the CallbackRegistry, which maps names to external
//! functions. `callback` steps invoke them for their effect, and any dynamic
//! operand that names a function is resolved by calling it with no argument.

use dashmap::DashMap;
use serde_json::Value;
use sl_core::{CallbackError, CallbackFn, CallbackFuture, CallbackResult};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// The callback registry holds every named side-effect function
///
/// The CallbackRegistry is responsible for:
/// - Registering sync and async functions under a name
/// - Calling a function by name, awaiting its result
/// - Reporting which names exist, for compile-time reference checks
pub struct CallbackRegistry {
    callbacks: DashMap<String, CallbackFn>,
}

impl CallbackRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            callbacks: DashMap::new(),
        }
    }

    /// Register an async function
    #[instrument(skip(self, name, handler))]
    pub fn register<F, Fut>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallbackResult> + Send + 'static,
    {
        let name = name.into();
        debug!(name = %name, "Registering callback");

        let handler: CallbackFn = Arc::new(move |arg| Box::pin(handler(arg)) as CallbackFuture);
        self.callbacks.insert(name, handler);
    }

    /// Register a synchronous function
    pub fn register_sync<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(Option<Value>) -> Value + Send + Sync + 'static,
    {
        self.register(name, move |arg| {
            let result = handler(arg);
            async move { Ok(result) }
        });
    }

    /// Builder form of [`register`](Self::register)
    pub fn with<F, Fut>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallbackResult> + Send + 'static,
    {
        self.register(name, handler);
        self
    }

    /// Call a function by name
    #[instrument(skip(self, arg))]
    pub async fn call(&self, name: &str, arg: Option<Value>) -> CallbackResult {
        let handler = self
            .callbacks
            .get(name)
            .map(|h| h.value().clone())
            .ok_or_else(|| {
                warn!(name = %name, "Callback not found");
                CallbackError::NotFound(name.to_string())
            })?;

        debug!(name = %name, "Calling callback");
        // The map guard is released before awaiting the handler
        handler(arg).await
    }

    /// Check if a function exists
    pub fn contains(&self, name: &str) -> bool {
        self.callbacks.contains_key(name)
    }

    /// All registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.callbacks.iter().map(|c| c.key().clone()).collect();
        names.sort();
        names
    }

    /// Remove a function
    #[instrument(skip(self))]
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.callbacks.remove(name).is_some();
        if removed {
            debug!(name = %name, "Unregistered callback");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe wrapper for CallbackRegistry
pub type SharedCallbackRegistry = Arc<CallbackRegistry>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_register_and_call() {
        let registry = CallbackRegistry::new();
        registry.register("echo", |arg: Option<Value>| async move {
            Ok(arg.unwrap_or(Value::Null))
        });

        let result = registry.call("echo", Some(json!({"msg": "hello"}))).await;
        assert_eq!(result, Ok(json!({"msg": "hello"})));

        let result = registry.call("echo", None).await;
        assert_eq!(result, Ok(Value::Null));
    }

    #[tokio::test]
    async fn test_callback_not_found() {
        let registry = CallbackRegistry::new();
        let result = registry.call("missing", None).await;
        assert_eq!(result, Err(CallbackError::NotFound("missing".to_string())));
    }

    #[tokio::test]
    async fn test_sync_callback() {
        let registry = CallbackRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        registry.register_sync("count", move |_| {
            json!(counter.fetch_add(1, Ordering::SeqCst) + 1)
        });

        assert_eq!(registry.call("count", None).await, Ok(json!(1)));
        assert_eq!(registry.call("count", None).await, Ok(json!(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_callback_error() {
        let registry = CallbackRegistry::new().with("fail", |_| async move {
            Err(CallbackError::Failed("intentional failure".to_string()))
        });

        let result = registry.call("fail", None).await;
        assert!(matches!(result, Err(CallbackError::Failed(_))));
    }

    #[test]
    fn test_names_and_unregister() {
        let registry = CallbackRegistry::new();
        registry.register_sync("b", |_| Value::Null);
        registry.register_sync("a", |_| Value::Null);

        assert_eq!(registry.names(), vec!["a", "b"]);
        assert!(registry.contains("a"));
        assert!(registry.unregister("a"));
        assert!(!registry.unregister("a"));
        assert_eq!(registry.len(), 1);
    }
}

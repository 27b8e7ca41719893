//! The method table: the named set of callables a client exposes.
//!
//! Methods are registered explicitly by the embedding application: a
//! plain `name → handler` mapping. Handlers take the request's positional
//! JSON parameters and either return a JSON result or fail with a
//! message; a failure is reported to the server as a protocol-level
//! exception reply, never allowed to tear down the dispatch loop.

use std::collections::HashMap;

use futures_util::future::BoxFuture;
use serde_json::Value;

/// A registered method implementation.
///
/// Boxed so sync and async handlers of any concrete type share one table.
type Handler =
    Box<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, String>> + Send + Sync>;

/// Mapping from method name to callable.
#[derive(Default)]
pub struct MethodTable {
    methods: HashMap<String, Handler>,
}

impl MethodTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an async method handler.
    ///
    /// The handler receives the request's `params` (empty vec when the
    /// request carried none). Returning `Err(msg)` makes the client reply
    /// `ERROR_METHOD_EXCEPTION` with `msg` as the stringified error.
    ///
    /// Registering a name twice replaces the earlier handler.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, String>> + Send + 'static,
    {
        self.methods
            .insert(name.into(), Box::new(move |params| Box::pin(handler(params))));
    }

    /// Registers a synchronous method handler.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(Vec<Value>) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.register(name, move |params| std::future::ready(handler(params)));
    }

    /// Looks up a handler by method name.
    pub(crate) fn get(&self, name: &str) -> Option<&Handler> {
        self.methods.get(name)
    }

    /// Returns `true` if a method with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Number of registered methods.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns `true` if no methods are registered.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl std::fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodTable")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_register_async_handler_is_invocable() {
        let mut table = MethodTable::new();
        table.register("double", |params| async move {
            let n = params
                .first()
                .and_then(Value::as_i64)
                .ok_or("expected a number")?;
            Ok(json!(n * 2))
        });

        let handler = table.get("double").unwrap();
        assert_eq!(handler(vec![json!(21)]).await, Ok(json!(42)));
    }

    #[tokio::test]
    async fn test_register_fn_sync_handler_is_invocable() {
        let mut table = MethodTable::new();
        table.register_fn("greet", |_| Ok(json!("hi")));

        let handler = table.get("greet").unwrap();
        assert_eq!(handler(vec![]).await, Ok(json!("hi")));
    }

    #[tokio::test]
    async fn test_handler_error_surfaces_as_string() {
        let mut table = MethodTable::new();
        table.register_fn("boom", |_| Err("it broke".into()));

        let handler = table.get("boom").unwrap();
        assert_eq!(handler(vec![]).await, Err("it broke".to_string()));
    }

    #[test]
    fn test_register_twice_replaces_handler() {
        let mut table = MethodTable::new();
        table.register_fn("x", |_| Ok(json!(1)));
        table.register_fn("x", |_| Ok(json!(2)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_contains_and_is_empty() {
        let mut table = MethodTable::new();
        assert!(table.is_empty());
        table.register_fn("a", |_| Ok(Value::Null));
        assert!(table.contains("a"));
        assert!(!table.contains("b"));
    }
}

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use courier_contract::{Kwargs, Value};
use courier_middleware::BoxError;

/// A callable served over the bus.
#[async_trait]
pub trait Function
where
    Self: Send + Sync + 'static,
{
    /// Runs the function.
    async fn call(&self, args: Vec<Value>, kwargs: Kwargs) -> Result<Value, BoxError>;
}

/// Resolves function names to callables.
pub trait Registry
where
    Self: Send + Sync + 'static,
{
    /// The function registered under `name`, if any.
    fn resolve(&self, name: &str) -> Option<Arc<dyn Function>>;
}

struct SyncFunction<F>(F);

#[async_trait]
impl<F> Function for SyncFunction<F>
where
    F: Fn(Vec<Value>, Kwargs) -> Result<Value, BoxError> + Send + Sync + 'static,
{
    async fn call(&self, args: Vec<Value>, kwargs: Kwargs) -> Result<Value, BoxError> {
        (self.0)(args, kwargs)
    }
}

struct AsyncFunction<F>(F);

#[async_trait]
impl<F, Fut> Function for AsyncFunction<F>
where
    F: Fn(Vec<Value>, Kwargs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
{
    async fn call(&self, args: Vec<Value>, kwargs: Kwargs) -> Result<Value, BoxError> {
        (self.0)(args, kwargs).await
    }
}

/// A map-backed [`Registry`].
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn Function>>,
}

impl FunctionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a synchronous closure, replacing any function of the same name.
    pub fn register<K, F>(&mut self, name: K, function: F) -> &mut Self
    where
        K: Into<String>,
        F: Fn(Vec<Value>, Kwargs) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.insert(name, Arc::new(SyncFunction(function)))
    }

    /// Registers an async closure, replacing any function of the same name.
    pub fn register_async<K, F, Fut>(&mut self, name: K, function: F) -> &mut Self
    where
        K: Into<String>,
        F: Fn(Vec<Value>, Kwargs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        self.insert(name, Arc::new(AsyncFunction(function)))
    }

    /// Registers any [`Function`] implementation.
    pub fn insert<K>(&mut self, name: K, function: Arc<dyn Function>) -> &mut Self
    where
        K: Into<String>,
    {
        self.functions.insert(name.into(), function);
        self
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

impl Registry for FunctionRegistry {
    fn resolve(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.functions.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use courier_contract::{args, kwargs};

    struct Echo;

    #[async_trait]
    impl Function for Echo {
        async fn call(&self, args: Vec<Value>, _kwargs: Kwargs) -> Result<Value, BoxError> {
            Ok(Value::Array(args))
        }
    }

    #[tokio::test]
    async fn test_registered_functions_resolve() {
        let mut registry = FunctionRegistry::new();
        registry
            .register("clock", |_, _| Ok(Value::from("12:00")))
            .register_async("later", |_, _| async { Ok::<_, BoxError>(Value::from("13:00")) })
            .insert("echo", Arc::new(Echo));

        assert_eq!(registry.names(), vec!["clock", "echo", "later"]);
        assert!(registry.resolve("missing").is_none());

        let clock = registry.resolve("clock").unwrap();
        assert_eq!(
            clock.call(args![], kwargs! {}).await.unwrap(),
            Value::from("12:00")
        );

        let later = registry.resolve("later").unwrap();
        assert_eq!(
            later.call(args![], kwargs! {}).await.unwrap(),
            Value::from("13:00")
        );

        let echo = registry.resolve("echo").unwrap();
        assert_eq!(
            echo.call(args![1, 2], kwargs! {}).await.unwrap(),
            Value::Array(args![1, 2])
        );
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = FunctionRegistry::new();
        registry.register("clock", |_, _| Ok(Value::from("12:00")));
        registry.register("clock", |_, _| Ok(Value::from("00:00")));

        assert_eq!(registry.names(), vec!["clock"]);
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Expression parser facade: compile cache, function registry and context.

use crate::ast::Expr;
use crate::context::ReactiveContext;
use crate::error::ExpressionResult;
use crate::eval::Evaluator;
use crate::functions::{Callable, FunctionRegistry};
use crate::grammar;
use futures::future::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Compiles and evaluates expressions against a [`ReactiveContext`].
///
/// Clones share the registry, the compile cache and the context.
#[derive(Debug, Clone)]
pub struct ExpressionParser {
    context: ReactiveContext,
    registry: Arc<RwLock<Arc<FunctionRegistry>>>,
    cache: Arc<Mutex<HashMap<String, Arc<Expr>>>>,
}

impl ExpressionParser {
    /// Create a parser with the utility library preloaded
    pub fn new(context: ReactiveContext) -> Self {
        Self {
            context,
            registry: Arc::new(RwLock::new(Arc::new(FunctionRegistry::with_library()))),
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The context expressions are evaluated against
    pub fn context(&self) -> &ReactiveContext {
        &self.context
    }

    /// Parse an expression, reusing a cached tree when available
    pub fn compile(&self, expression: &str) -> ExpressionResult<Arc<Expr>> {
        if let Some(expr) = self.cache.lock().get(expression) {
            return Ok(Arc::clone(expr));
        }
        let expr = Arc::new(grammar::parse(expression)?);
        self.cache
            .lock()
            .insert(expression.to_string(), Arc::clone(&expr));
        Ok(expr)
    }

    fn registry(&self) -> Arc<FunctionRegistry> {
        Arc::clone(&self.registry.read())
    }

    /// Evaluate synchronously against the shared context
    pub fn eval_sync(&self, expression: &str) -> ExpressionResult<Value> {
        let expr = self.compile(expression)?;
        let registry = self.registry();
        self.context
            .with(|root| Evaluator::new(&registry, root).eval(&expr))
    }

    /// Evaluate synchronously against an explicit root
    pub fn eval_sync_with(&self, expression: &str, root: &Value) -> ExpressionResult<Value> {
        let expr = self.compile(expression)?;
        let registry = self.registry();
        Evaluator::new(&registry, root).eval(&expr)
    }

    /// Evaluate against a snapshot of the shared context, awaiting async
    /// functions and transforms
    pub async fn eval(&self, expression: &str) -> ExpressionResult<Value> {
        self.eval_with(expression, self.context.snapshot()).await
    }

    /// Evaluate asynchronously against an explicit root
    pub async fn eval_with(&self, expression: &str, root: Value) -> ExpressionResult<Value> {
        let expr = self.compile(expression)?;
        let registry = self.registry();
        let evaluator = Evaluator::new(&registry, &root);
        evaluator.eval_async(&expr).await
    }

    fn register(&self, name: String, callable: Callable, transform: bool) {
        let mut guard = self.registry.write();
        let registry = Arc::make_mut(&mut *guard);
        if transform {
            registry.add_transform(name, callable);
        } else {
            registry.add_function(name, callable);
        }
    }

    /// Register a function callable as `name(args)`
    pub fn add_function(
        &self,
        name: impl Into<String>,
        f: impl Fn(&[Value]) -> ExpressionResult<Value> + Send + Sync + 'static,
    ) {
        self.register(name.into(), Callable::Sync(Arc::new(f)), false);
    }

    /// Register a transform callable as `value | name(args)`
    pub fn add_transform(
        &self,
        name: impl Into<String>,
        f: impl Fn(&[Value]) -> ExpressionResult<Value> + Send + Sync + 'static,
    ) {
        self.register(name.into(), Callable::Sync(Arc::new(f)), true);
    }

    /// Register an async function; only usable from [`Self::eval`]
    pub fn add_async_function<F, Fut>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ExpressionResult<Value>> + Send + 'static,
    {
        let callable = Callable::Async(Arc::new(move |args| f(args).boxed()));
        self.register(name.into(), callable, false);
    }

    /// Register an async transform; only usable from [`Self::eval`]
    pub fn add_async_transform<F, Fut>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ExpressionResult<Value>> + Send + 'static,
    {
        let callable = Callable::Async(Arc::new(move |args| f(args).boxed()));
        self.register(name.into(), callable, true);
    }

    /// Check if a function is registered
    pub fn has_function(&self, name: &str) -> bool {
        self.registry.read().has_function(name)
    }

    /// Check if a transform is registered
    pub fn has_transform(&self, name: &str) -> bool {
        self.registry.read().has_transform(name)
    }
}

impl Default for ExpressionParser {
    fn default() -> Self {
        Self::new(ReactiveContext::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExpressionError;
    use serde_json::json;

    #[test]
    fn test_eval_sync_against_context() {
        let parser = ExpressionParser::new(ReactiveContext::new(json!({ "a": { "b": 2 } })));
        assert_eq!(parser.eval_sync("a.b * 10").unwrap(), json!(20));
        parser.context().set("a.b", json!(5));
        assert_eq!(parser.eval_sync("a.b * 10").unwrap(), json!(50));
        assert_eq!(parser.eval_sync_with("a", &json!({ "a": 1 })).unwrap(), json!(1));
    }

    #[test]
    fn test_custom_functions_are_shared_by_clones() {
        let parser = ExpressionParser::default();
        let clone = parser.clone();
        parser.add_function("double", |args| Ok(json!(crate::value::to_number(&args[0]) * 2.0)));
        parser.add_transform("suffix", |args| {
            Ok(json!(format!("{}!", crate::value::to_display(&args[0]))))
        });
        assert_eq!(clone.eval_sync("double(4)").unwrap(), json!(8.0));
        assert_eq!(clone.eval_sync("'hi' | suffix").unwrap(), json!("hi!"));
    }

    #[tokio::test]
    async fn test_async_and_sync_agree() {
        let parser = ExpressionParser::new(ReactiveContext::new(json!({ "items": [1, 2, 3] })));
        for expression in ["sum(items) / 2", "items | join('+')", "items | reverse | first"] {
            let sync = parser.eval_sync(expression);
            let asynchronous = parser.eval(expression).await;
            assert_eq!(sync, asynchronous, "{expression}");
        }
    }

    #[tokio::test]
    async fn test_async_functions() {
        let parser = ExpressionParser::default();
        parser.add_async_function("fetchValue", |args: Vec<Value>| async move {
            Ok(json!({ "echo": args }))
        });
        assert_eq!(parser.eval("fetchValue(1).echo[0]").await.unwrap(), json!(1));
        assert_eq!(
            parser.eval_sync("fetchValue(1)"),
            Err(ExpressionError::AsyncInSync("fetchValue".to_string()))
        );
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Expression bindings.
//!
//! A binding watches the dependency paths of an expression (and of its
//! optional condition) in the shared [`ReactiveContext`]. Writes are only
//! recorded; [`ExpressionBinding::flush`] is the quiescent point where
//! affected bindings re-evaluate, so several writes in one batch produce a
//! single callback per binding.

use crate::context::ReactiveContext;
use crate::deps::DependencyExtractor;
use crate::error::ExpressionResult;
use crate::parser::ExpressionParser;
use crate::value::truthy;
use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};
use topo_editor_utils::path::paths_overlap;

/// Flush rounds before giving up on callbacks that keep writing
const MAX_FLUSH_ROUNDS: usize = 100;

/// An expression with an optional guard and fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expression {
    /// Main expression
    pub expression: String,
    /// Guard; when falsy the fallback is delivered instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Value used when the guard fails or evaluation errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Value>,
}

impl Expression {
    /// Create a bare expression
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            condition: None,
            fallback: None,
        }
    }

    /// Add a guard condition
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Add a fallback value
    pub fn with_fallback(mut self, fallback: Value) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

impl From<&str> for Expression {
    fn from(expression: &str) -> Self {
        Self::new(expression)
    }
}

impl From<String> for Expression {
    fn from(expression: String) -> Self {
        Self::new(expression)
    }
}

/// What a binding delivers for one evaluation
enum Outcome {
    Deliver(Value),
    Skip,
}

fn decide(
    expression: &Expression,
    condition: Option<ExpressionResult<Value>>,
    evaluate: impl FnOnce() -> ExpressionResult<Value>,
) -> Outcome {
    let fallback = || expression.fallback.clone().unwrap_or(Value::Null);

    let passed = match condition {
        None => true,
        Some(Ok(value)) => truthy(&value),
        Some(Err(error)) => {
            tracing::error!(condition = ?expression.condition, %error, "Expression condition failed");
            return Outcome::Deliver(fallback());
        }
    };

    if !passed {
        return match &expression.fallback {
            Some(value) => Outcome::Deliver(value.clone()),
            None => Outcome::Skip,
        };
    }

    match evaluate() {
        Ok(value) => Outcome::Deliver(value),
        Err(error) => {
            tracing::error!(expression = %expression.expression, %error, "Expression evaluation failed");
            Outcome::Deliver(fallback())
        }
    }
}

fn resolve(parser: &ExpressionParser, expression: &Expression) -> Outcome {
    let condition = expression.condition.as_deref().map(|c| parser.eval_sync(c));
    decide(expression, condition, || parser.eval_sync(&expression.expression))
}

async fn resolve_async(parser: &ExpressionParser, expression: &Expression) -> Outcome {
    let condition = match expression.condition.as_deref() {
        Some(c) => Some(parser.eval(c).await),
        None => None,
    };
    let passed = match &condition {
        None => true,
        Some(Ok(value)) => truthy(value),
        Some(Err(_)) => false,
    };
    let result = if passed {
        Some(parser.eval(&expression.expression).await)
    } else {
        None
    };
    decide(expression, condition, move || {
        result.unwrap_or(Ok(Value::Null))
    })
}

type Callback = Box<dyn FnMut(Value) + Send>;

struct BindingEntry {
    expression: Expression,
    dependencies: Vec<String>,
    snapshot: Mutex<Vec<Option<Value>>>,
    callback: Mutex<Callback>,
}

impl BindingEntry {
    fn affected_by(&self, changes: &[String]) -> bool {
        self.dependencies
            .iter()
            .any(|dep| changes.iter().any(|changed| paths_overlap(dep, changed)))
    }

    /// Refresh the dependency snapshot; true when any value differs
    fn refresh(&self, context: &ReactiveContext) -> bool {
        let current = read_dependencies(context, &self.dependencies);
        let mut snapshot = self.snapshot.lock();
        if *snapshot == current {
            return false;
        }
        *snapshot = current;
        true
    }

    fn deliver(&self, outcome: Outcome) {
        if let Outcome::Deliver(value) = outcome {
            let mut callback = self.callback.lock();
            (*callback)(value);
        }
    }
}

fn read_dependencies(context: &ReactiveContext, dependencies: &[String]) -> Vec<Option<Value>> {
    dependencies.iter().map(|dep| context.get(dep)).collect()
}

#[derive(Default)]
struct BindingTable {
    next_id: u64,
    entries: IndexMap<u64, Arc<BindingEntry>>,
}

/// Disposer returned by [`ExpressionBinding::bind_expression`]
#[derive(Debug, Clone)]
pub struct Unsubscribe {
    table: Weak<Mutex<BindingTable>>,
    id: u64,
}

impl Unsubscribe {
    /// Stop the binding. Returns whether it was still active.
    pub fn unsubscribe(self) -> bool {
        self.table
            .upgrade()
            .is_some_and(|table| table.lock().entries.shift_remove(&self.id).is_some())
    }
}

/// Creates and drives expression bindings over one parser's context
#[derive(Clone)]
pub struct ExpressionBinding {
    parser: ExpressionParser,
    extractor: Arc<DependencyExtractor>,
    table: Arc<Mutex<BindingTable>>,
}

impl fmt::Debug for ExpressionBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionBinding")
            .field("bindings", &self.binding_count())
            .finish_non_exhaustive()
    }
}

impl ExpressionBinding {
    /// Create a binding manager for `parser`
    pub fn new(parser: ExpressionParser) -> Self {
        Self {
            parser,
            extractor: Arc::new(DependencyExtractor::new()),
            table: Arc::new(Mutex::new(BindingTable::default())),
        }
    }

    /// The underlying parser
    pub fn parser(&self) -> &ExpressionParser {
        &self.parser
    }

    /// The shared context
    pub fn context(&self) -> &ReactiveContext {
        self.parser.context()
    }

    /// Dependency paths of an expression and its condition, deduplicated
    pub fn dependencies(&self, expression: &Expression) -> Vec<String> {
        let mut paths: IndexSet<String> = self
            .extractor
            .extract(&expression.expression)
            .variables
            .iter()
            .cloned()
            .collect();
        if let Some(condition) = &expression.condition {
            paths.extend(self.extractor.extract(condition).variables.iter().cloned());
        }
        paths.into_iter().collect()
    }

    fn register(&self, expression: Expression, callback: Callback) -> (Arc<BindingEntry>, Unsubscribe) {
        let dependencies = self.dependencies(&expression);
        let snapshot = read_dependencies(self.context(), &dependencies);
        let entry = Arc::new(BindingEntry {
            expression,
            dependencies,
            snapshot: Mutex::new(snapshot),
            callback: Mutex::new(callback),
        });

        let mut table = self.table.lock();
        let id = table.next_id;
        table.next_id += 1;
        table.entries.insert(id, Arc::clone(&entry));
        tracing::debug!(id, expression = %entry.expression.expression, "Expression bound");

        let unsubscribe = Unsubscribe {
            table: Arc::downgrade(&self.table),
            id,
        };
        (entry, unsubscribe)
    }

    /// Bind an expression. The callback runs immediately with the current
    /// result and again at each flush where a dependency changed.
    pub fn bind_expression(
        &self,
        expression: impl Into<Expression>,
        callback: impl FnMut(Value) + Send + 'static,
    ) -> Unsubscribe {
        let (entry, unsubscribe) = self.register(expression.into(), Box::new(callback));
        entry.deliver(resolve(&self.parser, &entry.expression));
        unsubscribe
    }

    /// Like [`Self::bind_expression`], evaluating with async functions
    pub async fn bind_expression_async(
        &self,
        expression: impl Into<Expression>,
        callback: impl FnMut(Value) + Send + 'static,
    ) -> Unsubscribe {
        let (entry, unsubscribe) = self.register(expression.into(), Box::new(callback));
        entry.deliver(resolve_async(&self.parser, &entry.expression).await);
        unsubscribe
    }

    /// Bindings whose dependencies overlap `changes`, in registration order
    fn affected(&self, changes: &[String]) -> Vec<Arc<BindingEntry>> {
        self.table
            .lock()
            .entries
            .values()
            .filter(|entry| entry.affected_by(changes))
            .cloned()
            .collect()
    }

    /// Re-evaluate bindings affected by writes since the last flush.
    ///
    /// Each affected binding runs at most once per round; rounds repeat
    /// while callbacks keep writing. Returns the number of callbacks run.
    pub fn flush(&self) -> usize {
        let mut delivered = 0;
        for _ in 0..MAX_FLUSH_ROUNDS {
            let changes = self.context().take_changes();
            if changes.is_empty() {
                return delivered;
            }
            for entry in self.affected(&changes) {
                if entry.refresh(self.context()) {
                    entry.deliver(resolve(&self.parser, &entry.expression));
                    delivered += 1;
                }
            }
        }
        tracing::warn!(rounds = MAX_FLUSH_ROUNDS, "Binding flush did not settle");
        delivered
    }

    /// [`Self::flush`] using asynchronous evaluation
    pub async fn flush_async(&self) -> usize {
        let mut delivered = 0;
        for _ in 0..MAX_FLUSH_ROUNDS {
            let changes = self.context().take_changes();
            if changes.is_empty() {
                return delivered;
            }
            for entry in self.affected(&changes) {
                if entry.refresh(self.context()) {
                    let outcome = resolve_async(&self.parser, &entry.expression).await;
                    entry.deliver(outcome);
                    delivered += 1;
                }
            }
        }
        tracing::warn!(rounds = MAX_FLUSH_ROUNDS, "Binding flush did not settle");
        delivered
    }

    /// Pull-based variant of a binding
    pub fn computed_expression(&self, expression: impl Into<Expression>) -> ComputedExpression {
        let expression = expression.into();
        ComputedExpression {
            parser: self.parser.clone(),
            dependencies: self.dependencies(&expression),
            expression,
            cache: Mutex::new(None),
        }
    }

    /// Number of active bindings
    pub fn binding_count(&self) -> usize {
        self.table.lock().entries.len()
    }

    /// Stop every binding
    pub fn clear(&self) {
        self.table.lock().entries.clear();
    }

    /// Register a function on the underlying parser
    pub fn add_function(
        &self,
        name: impl Into<String>,
        f: impl Fn(&[Value]) -> ExpressionResult<Value> + Send + Sync + 'static,
    ) {
        self.parser.add_function(name, f);
    }

    /// Register a transform on the underlying parser
    pub fn add_transform(
        &self,
        name: impl Into<String>,
        f: impl Fn(&[Value]) -> ExpressionResult<Value> + Send + Sync + 'static,
    ) {
        self.parser.add_transform(name, f);
    }
}

/// Lazily recomputed expression value.
///
/// The result is cached against a snapshot of the dependency values and
/// recomputed on read when any of them changed.
pub struct ComputedExpression {
    parser: ExpressionParser,
    expression: Expression,
    dependencies: Vec<String>,
    cache: Mutex<Option<(Vec<Option<Value>>, Value)>>,
}

impl fmt::Debug for ComputedExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedExpression")
            .field("expression", &self.expression)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

impl ComputedExpression {
    fn cached(&self, snapshot: &[Option<Value>]) -> Option<Value> {
        match &*self.cache.lock() {
            Some((deps, value)) if deps.as_slice() == snapshot => Some(value.clone()),
            _ => None,
        }
    }

    fn store(&self, snapshot: Vec<Option<Value>>, outcome: Outcome) -> Value {
        let value = match outcome {
            Outcome::Deliver(value) => value,
            Outcome::Skip => Value::Null,
        };
        *self.cache.lock() = Some((snapshot, value.clone()));
        value
    }

    /// Current value; the fallback (or `null`) when the guard fails
    pub fn get(&self) -> Value {
        let snapshot = read_dependencies(self.parser.context(), &self.dependencies);
        if let Some(value) = self.cached(&snapshot) {
            return value;
        }
        self.store(snapshot, resolve(&self.parser, &self.expression))
    }

    /// Current value using asynchronous evaluation
    pub async fn get_async(&self) -> Value {
        let snapshot = read_dependencies(self.parser.context(), &self.dependencies);
        if let Some(value) = self.cached(&snapshot) {
            return value;
        }
        let outcome = resolve_async(&self.parser, &self.expression).await;
        self.store(snapshot, outcome)
    }

    /// Dependency paths being watched
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn setup(root: Value) -> ExpressionBinding {
        ExpressionBinding::new(ExpressionParser::new(ReactiveContext::new(root)))
    }

    fn recorder() -> (Arc<Mutex<Vec<Value>>>, impl FnMut(Value) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |value| sink.lock().push(value))
    }

    #[test]
    fn test_initial_and_batched_updates() {
        let binding = setup(json!({ "a": 1, "b": 2 }));
        let (seen, callback) = recorder();
        let _stop = binding.bind_expression("a + b", callback);
        assert_eq!(*seen.lock(), vec![json!(3)]);

        binding.context().set("a", json!(10));
        binding.context().set("b", json!(20));
        assert_eq!(binding.flush(), 1);
        assert_eq!(*seen.lock(), vec![json!(3), json!(30)]);
    }

    #[test]
    fn test_unrelated_or_identical_writes_do_not_fire() {
        let binding = setup(json!({ "a": 1, "other": 0 }));
        let (seen, callback) = recorder();
        let _stop = binding.bind_expression("a", callback);

        binding.context().set("other", json!(5));
        binding.context().set("a", json!(1));
        assert_eq!(binding.flush(), 0);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_nested_writes_reach_parent_dependency() {
        let binding = setup(json!({ "user": { "name": "a" } }));
        let (seen, callback) = recorder();
        let _stop = binding.bind_expression("user.name | toUpper", callback);
        binding.context().set("user", json!({ "name": "b" }));
        binding.flush();
        assert_eq!(*seen.lock(), vec![json!("A"), json!("B")]);
    }

    #[test]
    fn test_condition_and_fallback() {
        let binding = setup(json!({ "on": false, "v": 7 }));
        let (seen, callback) = recorder();
        let exp = Expression::new("v * 2").with_condition("on").with_fallback(json!("off"));
        let _stop = binding.bind_expression(exp, callback);

        binding.context().set("on", json!(true));
        binding.flush();
        assert_eq!(*seen.lock(), vec![json!("off"), json!(14)]);

        // Without a fallback a failed guard delivers nothing
        let (quiet, callback) = recorder();
        let _stop = binding.bind_expression(Expression::new("v").with_condition("!on"), callback);
        assert!(quiet.lock().is_empty());
    }

    #[test]
    fn test_errors_deliver_fallback() {
        let binding = setup(json!({}));
        let (seen, callback) = recorder();
        let _stop = binding.bind_expression(
            Expression::new("missingFn(1)").with_fallback(json!(0)),
            callback,
        );
        let (bare, callback) = recorder();
        let _stop = binding.bind_expression("missingFn(1)", callback);
        assert_eq!(*seen.lock(), vec![json!(0)]);
        assert_eq!(*bare.lock(), vec![Value::Null]);
    }

    #[test]
    fn test_unsubscribe() {
        let binding = setup(json!({ "a": 1 }));
        let (seen, callback) = recorder();
        let stop = binding.bind_expression("a", callback);
        assert!(stop.clone().unsubscribe());
        assert!(!stop.unsubscribe());

        binding.context().set("a", json!(2));
        binding.flush();
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(binding.binding_count(), 0);
    }

    #[test]
    fn test_cascading_writes_settle() {
        let binding = setup(json!({ "a": 1, "b": 0 }));
        let context = binding.context().clone();
        let _stop = binding.bind_expression("a * 2", move |value| context.set("b", value));
        let (seen, callback) = recorder();
        let _stop = binding.bind_expression("b", callback);

        binding.context().set("a", json!(5));
        binding.flush();
        assert_eq!(seen.lock().last(), Some(&json!(10)));
    }

    #[test]
    fn test_computed_expression() {
        let binding = setup(json!({ "price": 2, "qty": 3 }));
        let total = binding.computed_expression("price * qty");
        assert_eq!(total.get(), json!(6));
        binding.context().set("qty", json!(4));
        assert_eq!(total.get(), json!(8));

        let guarded = binding.computed_expression(
            Expression::new("price").with_condition("qty > 10").with_fallback(json!(-1)),
        );
        assert_eq!(guarded.get(), json!(-1));
    }

    #[tokio::test]
    async fn test_async_binding() {
        let binding = setup(json!({ "id": 1 }));
        binding.parser().add_async_function("lookup", |args: Vec<Value>| async move {
            Ok(json!(format!("item-{}", args[0])))
        });
        let (seen, callback) = recorder();
        let _stop = binding.bind_expression_async("lookup(id)", callback).await;
        binding.context().set("id", json!(2));
        binding.flush_async().await;
        assert_eq!(*seen.lock(), vec![json!("item-1"), json!("item-2")]);
    }
}

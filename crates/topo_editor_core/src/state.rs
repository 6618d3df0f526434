// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reactive state store.
//!
//! Writing an expression object stores its source text and keeps the path
//! bound: the evaluated result is written back now and after every flush
//! where one of its dependencies changed. Object values are written key by
//! key so each leaf can carry its own binding.

use indexmap::IndexMap;
use serde_json::Value;
use topo_editor_expression::{
    Expression, ExpressionBinding, ExpressionParser, ReactiveContext, Unsubscribe,
};

/// Parse `{"expression": ...}` objects
pub fn as_expression(value: &Value) -> Option<Expression> {
    let object = value.as_object()?;
    if !object.get("expression").is_some_and(Value::is_string) {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}

fn covers(prefix: &str, path: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
}

/// Write without binding; non-empty objects are split per key
fn write(context: &ReactiveContext, path: &str, value: Value) {
    match value {
        Value::Object(object) if !object.is_empty() => {
            for (key, value) in object {
                write(context, &format!("{path}.{key}"), value);
            }
        }
        value => context.set(path, value),
    }
}

/// Path-addressed state with expression bindings
#[derive(Debug)]
pub struct StateManager {
    binding: ExpressionBinding,
    subscriptions: IndexMap<String, Unsubscribe>,
}

impl StateManager {
    /// Store over a fresh, empty context
    pub fn new() -> Self {
        Self::with_parser(ExpressionParser::new(ReactiveContext::default()))
    }

    /// Store over an existing parser and its context
    pub fn with_parser(parser: ExpressionParser) -> Self {
        Self {
            binding: ExpressionBinding::new(parser),
            subscriptions: IndexMap::new(),
        }
    }

    /// Shared context
    pub fn context(&self) -> &ReactiveContext {
        self.binding.context()
    }

    /// Parser evaluating against the context
    pub fn parser(&self) -> &ExpressionParser {
        self.binding.parser()
    }

    /// Binding manager
    pub fn binding(&self) -> &ExpressionBinding {
        &self.binding
    }

    /// Read a value
    pub fn get_state(&self, path: &str) -> Option<Value> {
        self.context().get(path)
    }

    /// Read a value, or `default` when missing
    pub fn get_state_or(&self, path: &str, default: Value) -> Value {
        self.get_state(path).unwrap_or(default)
    }

    /// Write a value and return what ended up at `path`.
    ///
    /// Bindings previously attached at or below `path` are dropped.
    pub fn set_state(&mut self, path: &str, value: Value) -> Value {
        self.unbind(path);
        self.assign(path, value);
        self.get_state(path).unwrap_or(Value::Null)
    }

    fn assign(&mut self, path: &str, value: Value) {
        if let Some(expression) = as_expression(&value) {
            self.context().set(path, Value::String(expression.expression.clone()));

            let context = self.context().clone();
            let target = path.to_string();
            let unsubscribe = self
                .binding
                .bind_expression(expression, move |value| write(&context, &target, value));
            self.subscriptions.insert(path.to_string(), unsubscribe);
            return;
        }

        match value {
            Value::Object(object) if !object.is_empty() => {
                for (key, value) in object {
                    self.assign(&format!("{path}.{key}"), value);
                }
            }
            value => self.context().set(path, value),
        }
    }

    /// Remove a value and any bindings at or below it
    pub fn delete_state(&mut self, path: &str) -> bool {
        self.unbind(path);
        self.context().unset(path)
    }

    fn unbind(&mut self, path: &str) {
        let stale: Vec<String> = self
            .subscriptions
            .keys()
            .filter(|bound| covers(path, bound))
            .cloned()
            .collect();
        for bound in stale {
            if let Some(unsubscribe) = self.subscriptions.shift_remove(&bound) {
                unsubscribe.unsubscribe();
            }
        }
    }

    /// Paths currently kept by a binding
    pub fn bound_paths(&self) -> impl Iterator<Item = &str> {
        self.subscriptions.keys().map(String::as_str)
    }

    /// Re-evaluate bindings affected by writes since the last flush
    pub fn flush(&self) -> usize {
        self.binding.flush()
    }

    /// Async variant of [`Self::flush`]
    pub async fn flush_async(&self) -> usize {
        self.binding.flush_async().await
    }

    /// Drop every binding and empty the store
    pub fn clear(&mut self) {
        self.subscriptions.clear();
        self.binding.clear();
        self.context().clear();
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_plain_values() {
        let mut state = StateManager::new();
        assert_eq!(state.set_state("a.b", json!(1)), json!(1));
        assert_eq!(state.get_state("a"), Some(json!({"b": 1})));
        assert_eq!(state.get_state_or("missing", json!("x")), json!("x"));
    }

    #[test]
    fn test_objects_merge_per_key() {
        let mut state = StateManager::new();
        state.set_state("form", json!({"name": "a", "age": 3}));
        state.set_state("form", json!({"name": "b"}));

        assert_eq!(state.get_state("form"), Some(json!({"name": "b", "age": 3})));
    }

    #[test]
    fn test_expression_is_bound() {
        let mut state = StateManager::new();
        state.set_state("price", json!(2));
        let total = state.set_state("total", json!({"expression": "price * 3"}));
        assert_eq!(total, json!(6));
        assert_eq!(state.bound_paths().collect::<Vec<_>>(), vec!["total"]);

        state.set_state("price", json!(5));
        assert_eq!(state.get_state("total"), Some(json!(6)));
        state.flush();
        assert_eq!(state.get_state("total"), Some(json!(15)));
    }

    #[test]
    fn test_nested_expression_is_bound() {
        let mut state = StateManager::new();
        state.set_state("user", json!({"first": "Ada"}));
        state.set_state("card", json!({"title": {"expression": "user.first"}, "size": 2}));

        assert_eq!(state.get_state("card"), Some(json!({"title": "Ada", "size": 2})));

        state.set_state("user.first", json!("Grace"));
        state.flush();
        assert_eq!(state.get_state("card.title"), Some(json!("Grace")));
    }

    #[test]
    fn test_overwrite_drops_binding() {
        let mut state = StateManager::new();
        state.set_state("n", json!(1));
        state.set_state("double", json!({"expression": "n * 2"}));
        state.set_state("double", json!(0));

        state.set_state("n", json!(4));
        state.flush();
        assert_eq!(state.get_state("double"), Some(json!(0)));
        assert_eq!(state.bound_paths().count(), 0);
    }

    #[test]
    fn test_false_condition_keeps_source() {
        let mut state = StateManager::new();
        state.set_state("ready", json!(false));
        let value = state.set_state("label", json!({"expression": "'done'", "condition": "ready"}));
        assert_eq!(value, json!("'done'"));

        state.set_state("ready", json!(true));
        state.flush();
        assert_eq!(state.get_state("label"), Some(json!("done")));
    }

    #[test]
    fn test_delete_state() {
        let mut state = StateManager::new();
        state.set_state("a", json!({"b": {"expression": "1 + 1"}}));
        assert!(state.delete_state("a"));
        assert_eq!(state.get_state("a"), None);
        assert_eq!(state.bound_paths().count(), 0);
        assert!(!state.delete_state("a"));
    }

    #[test]
    fn test_covers() {
        assert!(covers("a", "a"));
        assert!(covers("a", "a.b"));
        assert!(covers("a", "a[0]"));
        assert!(!covers("a", "ab"));
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Function and transform registry plus the preloaded utility library.
//!
//! Every library entry is tagged with a [`Usage`] deciding whether it is
//! callable as `name(args)`, as a pipe transform `value | name(args)`, or
//! both. For transforms the piped value becomes the first argument.

pub mod array;
pub mod date;
pub mod javascript;
pub mod math;
pub mod numeral;
pub mod object;
pub mod string;

use crate::error::{ExpressionError, ExpressionResult};
use crate::value::{same_value, to_display, to_number, truthy, type_name};
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Synchronous callable
pub type SyncFunction = Arc<dyn Fn(&[Value]) -> ExpressionResult<Value> + Send + Sync>;

/// Asynchronous callable
pub type AsyncFunction =
    Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, ExpressionResult<Value>> + Send + Sync>;

/// A registered function or transform
#[derive(Clone)]
pub enum Callable {
    /// Usable from both evaluation modes
    Sync(SyncFunction),
    /// Only usable from asynchronous evaluation
    Async(AsyncFunction),
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("Callable::Sync"),
            Self::Async(_) => f.write_str("Callable::Async"),
        }
    }
}

/// Where a library function may be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    /// `name(args)` only
    Function,
    /// `value | name(args)` only
    Transform,
    /// Both forms
    Both,
}

impl Usage {
    /// Callable as a function
    pub fn is_function(self) -> bool {
        matches!(self, Self::Function | Self::Both)
    }

    /// Callable as a transform
    pub fn is_transform(self) -> bool {
        matches!(self, Self::Transform | Self::Both)
    }
}

/// A preloaded library entry
#[derive(Debug, Clone, Copy)]
pub struct LibraryFunction {
    /// Registered name
    pub name: &'static str,
    /// Function / transform tagging
    pub usage: Usage,
    /// Implementation
    pub call: fn(&[Value]) -> ExpressionResult<Value>,
}

/// Registered functions and transforms
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Callable>,
    transforms: HashMap<String, Callable>,
}

impl FunctionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the utility library loaded
    pub fn with_library() -> Self {
        let mut registry = Self::new();
        registry.load_library(array::FUNCTIONS);
        registry.load_library(math::FUNCTIONS);
        registry.load_library(string::FUNCTIONS);
        registry.load_library(object::FUNCTIONS);
        registry.load_library(javascript::FUNCTIONS);
        registry.load_library(date::FUNCTIONS);
        registry.load_library(numeral::FUNCTIONS);
        registry
    }

    /// Register library entries according to their usage tags
    pub fn load_library(&mut self, entries: &[LibraryFunction]) {
        for entry in entries {
            let call = entry.call;
            let callable = Callable::Sync(Arc::new(move |args: &[Value]| call(args)));
            if entry.usage.is_function() {
                self.functions.insert(entry.name.to_string(), callable.clone());
            }
            if entry.usage.is_transform() {
                self.transforms.insert(entry.name.to_string(), callable);
            }
        }
    }

    /// Register a function
    pub fn add_function(&mut self, name: impl Into<String>, callable: Callable) {
        self.functions.insert(name.into(), callable);
    }

    /// Register a transform
    pub fn add_transform(&mut self, name: impl Into<String>, callable: Callable) {
        self.transforms.insert(name.into(), callable);
    }

    /// Look up a function
    pub fn function(&self, name: &str) -> ExpressionResult<&Callable> {
        self.functions
            .get(name)
            .ok_or_else(|| ExpressionError::UnknownFunction(name.to_string()))
    }

    /// Look up a transform
    pub fn transform(&self, name: &str) -> ExpressionResult<&Callable> {
        self.transforms
            .get(name)
            .ok_or_else(|| ExpressionError::UnknownTransform(name.to_string()))
    }

    /// Check if a function exists
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Check if a transform exists
    pub fn has_transform(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }
}

// Argument helpers shared by the library modules

/// Argument `index`, `null` when missing
pub(crate) fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&Value::Null)
}

/// Whether argument `index` was passed and is not `null`
pub(crate) fn has_arg(args: &[Value], index: usize) -> bool {
    !arg(args, index).is_null()
}

/// Array argument; `null` counts as empty
pub(crate) fn array_arg(function: &str, args: &[Value], index: usize) -> ExpressionResult<Vec<Value>> {
    match arg(args, index) {
        Value::Array(items) => Ok(items.clone()),
        Value::Null => Ok(Vec::new()),
        other => Err(type_error(function, "array", other)),
    }
}

/// Numeric argument
pub(crate) fn number_arg(args: &[Value], index: usize) -> f64 {
    to_number(arg(args, index))
}

/// Integer argument with a default for missing values
pub(crate) fn int_arg(args: &[Value], index: usize, default: i64) -> i64 {
    if has_arg(args, index) {
        let n = number_arg(args, index);
        if n.is_nan() {
            0
        } else {
            n.trunc() as i64
        }
    } else {
        default
    }
}

/// String argument; `null` counts as empty
pub(crate) fn string_arg(args: &[Value], index: usize) -> String {
    match arg(args, index) {
        Value::Null => String::new(),
        other => to_display(other),
    }
}

/// Numbers from either one array argument or all arguments
pub(crate) fn numbers(args: &[Value]) -> Vec<f64> {
    match args {
        [Value::Array(items)] => items.iter().map(to_number).collect(),
        _ => args.iter().map(to_number).collect(),
    }
}

pub(crate) fn type_error(function: &str, expected: &'static str, actual: &Value) -> ExpressionError {
    ExpressionError::Type {
        function: function.to_string(),
        expected,
        actual: type_name(actual),
    }
}

pub(crate) fn contains(items: &[Value], value: &Value) -> bool {
    items.iter().any(|item| same_value(item, value))
}

/// Shorthand predicate matching: an object matches by partial deep
/// equality, `[key, value]` matches a property value, a string tests a
/// property for truthiness.
pub(crate) fn matches_predicate(item: &Value, predicate: &Value) -> bool {
    match predicate {
        Value::Object(expected) => match item {
            Value::Object(actual) => expected
                .iter()
                .all(|(k, v)| actual.get(k).is_some_and(|a| same_value(a, v))),
            _ => false,
        },
        Value::Array(pair) if pair.len() == 2 => {
            let key = to_display(&pair[0]);
            item.get(key.as_str()).is_some_and(|a| same_value(a, &pair[1]))
        }
        Value::String(key) => item.get(key.as_str()).is_some_and(truthy),
        Value::Null => truthy(item),
        other => same_value(item, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_library_usage_tags() {
        let registry = FunctionRegistry::with_library();
        assert!(registry.has_function("now"));
        assert!(!registry.has_transform("now"));
        assert!(registry.has_function("upperFirst"));
        assert!(registry.has_transform("upperFirst"));
        assert!(matches!(
            registry.function("nope"),
            Err(ExpressionError::UnknownFunction(_))
        ));
    }

    #[test]
    fn test_predicate_shorthands() {
        let item = json!({ "id": 3, "active": true });
        assert!(matches_predicate(&item, &json!({ "id": 3 })));
        assert!(matches_predicate(&item, &json!(["id", 3])));
        assert!(matches_predicate(&item, &json!("active")));
        assert!(!matches_predicate(&item, &json!({ "id": 4 })));
    }
}

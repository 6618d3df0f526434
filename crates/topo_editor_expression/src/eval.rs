// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tree-walking evaluator.
//!
//! Both evaluation modes share the operator semantics below; they differ
//! only in how registered callables are invoked. Missing data never errors:
//! unknown identifiers and properties evaluate to `null`.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::{ExpressionError, ExpressionResult};
use crate::functions::{Callable, FunctionRegistry};
use crate::value::{compare, loose_eq, number, same_value, to_display, to_number, truthy};
use futures::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Evaluates expressions against a root context
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    registry: &'a FunctionRegistry,
    root: &'a Value,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator over a registry and a context root
    pub fn new(registry: &'a FunctionRegistry, root: &'a Value) -> Self {
        Self { registry, root }
    }

    /// Evaluate synchronously; async callables are rejected
    pub fn eval(&self, expr: &Expr) -> ExpressionResult<Value> {
        self.eval_in(expr, None)
    }

    fn eval_in(&self, expr: &Expr, relative: Option<&Value>) -> ExpressionResult<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Array(items) => items
                .iter()
                .map(|item| self.eval_in(item, relative))
                .collect::<ExpressionResult<Vec<_>>>()
                .map(Value::Array),
            Expr::Object(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key.clone(), self.eval_in(value, relative)?);
                }
                Ok(Value::Object(map))
            }
            Expr::Identifier(name) => Ok(member(self.root, name)),
            Expr::Relative(name) => Ok(relative.map_or(Value::Null, |r| member(r, name))),
            Expr::Member { object, property } => {
                Ok(member(&self.eval_in(object, relative)?, property))
            }
            Expr::Index { object, index } => {
                let subject = self.eval_in(object, relative)?;
                let key = self.eval_in(index, relative)?;
                Ok(index_value(&subject, &key))
            }
            Expr::Filter { object, predicate } => {
                let Some(items) = filter_subject(self.eval_in(object, relative)?) else {
                    return Ok(Value::Null);
                };
                let mut kept = Vec::new();
                for item in items {
                    if truthy(&self.eval_in(predicate, Some(&item))?) {
                        kept.push(item);
                    }
                }
                Ok(Value::Array(kept))
            }
            Expr::Unary { op, operand } => Ok(unary(*op, &self.eval_in(operand, relative)?)),
            Expr::Binary { op, left, right } => {
                let left = self.eval_in(left, relative)?;
                match short_circuit(*op, &left) {
                    Some(done) => Ok(done),
                    None => binary(*op, left, self.eval_in(right, relative)?),
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if truthy(&self.eval_in(test, relative)?) {
                    self.eval_in(consequent, relative)
                } else {
                    self.eval_in(alternate, relative)
                }
            }
            Expr::Call { name, args } => {
                let callable = self.registry.function(name)?;
                let args = self.eval_args(None, args, relative)?;
                call_sync(name, callable, &args)
            }
            Expr::Transform {
                name,
                subject,
                args,
            } => {
                let callable = self.registry.transform(name)?;
                let args = self.eval_args(Some(&**subject), args, relative)?;
                call_sync(name, callable, &args)
            }
        }
    }

    fn eval_args(
        &self,
        subject: Option<&Expr>,
        args: &[Expr],
        relative: Option<&Value>,
    ) -> ExpressionResult<Vec<Value>> {
        subject
            .into_iter()
            .chain(args)
            .map(|arg| self.eval_in(arg, relative))
            .collect()
    }

    /// Evaluate asynchronously, awaiting async callables
    pub fn eval_async<'b>(&'b self, expr: &'b Expr) -> BoxFuture<'b, ExpressionResult<Value>> {
        self.eval_async_in(expr, None)
    }

    fn eval_async_in<'b>(
        &'b self,
        expr: &'b Expr,
        relative: Option<&'b Value>,
    ) -> BoxFuture<'b, ExpressionResult<Value>> {
        async move {
            match expr {
                Expr::Literal(value) => Ok(value.clone()),
                Expr::Array(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        out.push(self.eval_async_in(item, relative).await?);
                    }
                    Ok(Value::Array(out))
                }
                Expr::Object(entries) => {
                    let mut map = Map::new();
                    for (key, value) in entries {
                        map.insert(key.clone(), self.eval_async_in(value, relative).await?);
                    }
                    Ok(Value::Object(map))
                }
                Expr::Identifier(name) => Ok(member(self.root, name)),
                Expr::Relative(name) => Ok(relative.map_or(Value::Null, |r| member(r, name))),
                Expr::Member { object, property } => {
                    Ok(member(&self.eval_async_in(object, relative).await?, property))
                }
                Expr::Index { object, index } => {
                    let subject = self.eval_async_in(object, relative).await?;
                    let key = self.eval_async_in(index, relative).await?;
                    Ok(index_value(&subject, &key))
                }
                Expr::Filter { object, predicate } => {
                    let Some(items) = filter_subject(self.eval_async_in(object, relative).await?)
                    else {
                        return Ok(Value::Null);
                    };
                    let mut kept = Vec::new();
                    for item in items {
                        let keep = truthy(&self.eval_async_in(predicate, Some(&item)).await?);
                        if keep {
                            kept.push(item);
                        }
                    }
                    Ok(Value::Array(kept))
                }
                Expr::Unary { op, operand } => {
                    Ok(unary(*op, &self.eval_async_in(operand, relative).await?))
                }
                Expr::Binary { op, left, right } => {
                    let left = self.eval_async_in(left, relative).await?;
                    match short_circuit(*op, &left) {
                        Some(done) => Ok(done),
                        None => binary(*op, left, self.eval_async_in(right, relative).await?),
                    }
                }
                Expr::Conditional {
                    test,
                    consequent,
                    alternate,
                } => {
                    if truthy(&self.eval_async_in(test, relative).await?) {
                        self.eval_async_in(consequent, relative).await
                    } else {
                        self.eval_async_in(alternate, relative).await
                    }
                }
                Expr::Call { name, args } => {
                    let callable = self.registry.function(name)?;
                    let mut values = Vec::with_capacity(args.len());
                    for arg in args {
                        values.push(self.eval_async_in(arg, relative).await?);
                    }
                    call_async(callable, values).await
                }
                Expr::Transform {
                    name,
                    subject,
                    args,
                } => {
                    let callable = self.registry.transform(name)?;
                    let mut values = Vec::with_capacity(args.len() + 1);
                    values.push(self.eval_async_in(subject, relative).await?);
                    for arg in args {
                        values.push(self.eval_async_in(arg, relative).await?);
                    }
                    call_async(callable, values).await
                }
            }
        }
        .boxed()
    }
}

fn call_sync(name: &str, callable: &Callable, args: &[Value]) -> ExpressionResult<Value> {
    match callable {
        Callable::Sync(f) => f(args),
        Callable::Async(_) => Err(ExpressionError::AsyncInSync(name.to_string())),
    }
}

async fn call_async(callable: &Callable, args: Vec<Value>) -> ExpressionResult<Value> {
    match callable {
        Callable::Sync(f) => f(&args),
        Callable::Async(f) => f(args).await,
    }
}

/// Property access. Arrays expose `length` and otherwise delegate to
/// their first element; strings expose `length`.
pub fn member(subject: &Value, property: &str) -> Value {
    match subject {
        Value::Object(map) => map.get(property).cloned().unwrap_or(Value::Null),
        Value::Array(items) if property == "length" => Value::from(items.len()),
        Value::Array(items) => items.first().map_or(Value::Null, |first| member(first, property)),
        Value::String(s) if property == "length" => Value::from(s.chars().count()),
        _ => Value::Null,
    }
}

fn index_value(subject: &Value, key: &Value) -> Value {
    match (subject, key) {
        (Value::Array(items), Value::Number(n)) => n
            .as_f64()
            .filter(|i| *i >= 0.0 && i.fract() == 0.0)
            .and_then(|i| items.get(i as usize))
            .cloned()
            .unwrap_or(Value::Null),
        (Value::String(s), Value::Number(n)) => n
            .as_f64()
            .filter(|i| *i >= 0.0 && i.fract() == 0.0)
            .and_then(|i| s.chars().nth(i as usize))
            .map_or(Value::Null, |c| Value::String(c.to_string())),
        (_, Value::Null) => Value::Null,
        (subject, key) => member(subject, &to_display(key)),
    }
}

/// Filters apply to arrays; a single value is treated as a one-element array
fn filter_subject(subject: Value) -> Option<Vec<Value>> {
    match subject {
        Value::Null => None,
        Value::Array(items) => Some(items),
        other => Some(vec![other]),
    }
}

fn unary(op: UnaryOp, operand: &Value) -> Value {
    match op {
        UnaryOp::Not => Value::Bool(!truthy(operand)),
        UnaryOp::Neg => number(-to_number(operand)),
    }
}

/// `&&` and `||` return an operand, not a boolean
fn short_circuit(op: BinaryOp, left: &Value) -> Option<Value> {
    match op {
        BinaryOp::And if !truthy(left) => Some(left.clone()),
        BinaryOp::Or if truthy(left) => Some(left.clone()),
        _ => None,
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> ExpressionResult<Value> {
    let arithmetic = |f: fn(f64, f64) -> f64| number(f(to_number(&left), to_number(&right)));
    let relation = |accept: fn(Ordering) -> bool| {
        Value::Bool(compare(&left, &right).is_some_and(accept))
    };

    Ok(match op {
        BinaryOp::Add => match (&left, &right) {
            (Value::String(_), _) | (_, Value::String(_)) => {
                Value::String(format!("{}{}", to_display(&left), to_display(&right)))
            }
            _ => arithmetic(|a, b| a + b),
        },
        BinaryOp::Sub => arithmetic(|a, b| a - b),
        BinaryOp::Mul => arithmetic(|a, b| a * b),
        BinaryOp::Div => arithmetic(|a, b| a / b),
        BinaryOp::FloorDiv => arithmetic(|a, b| (a / b).floor()),
        BinaryOp::Mod => arithmetic(|a, b| a % b),
        BinaryOp::Pow => arithmetic(f64::powf),
        BinaryOp::Eq => Value::Bool(loose_eq(&left, &right)),
        BinaryOp::Ne => Value::Bool(!loose_eq(&left, &right)),
        BinaryOp::Lt => relation(Ordering::is_lt),
        BinaryOp::Le => relation(Ordering::is_le),
        BinaryOp::Gt => relation(Ordering::is_gt),
        BinaryOp::Ge => relation(Ordering::is_ge),
        BinaryOp::In => Value::Bool(match &right {
            Value::Array(items) => items.iter().any(|item| same_value(item, &left)),
            Value::String(haystack) => haystack.contains(&to_display(&left)),
            Value::Object(map) => map.contains_key(&to_display(&left)),
            _ => false,
        }),
        // Short-circuit already handled the left operand deciding the result
        BinaryOp::And | BinaryOp::Or => right,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::parse;
    use serde_json::json;

    fn eval(source: &str, root: &Value) -> ExpressionResult<Value> {
        let registry = FunctionRegistry::with_library();
        let expr = parse(source)?;
        Evaluator::new(&registry, root).eval(&expr)
    }

    #[test]
    fn test_arithmetic_and_strings() {
        let root = json!({ "a": 6, "name": "pump" });
        assert_eq!(eval("a * 2 + 1", &root).unwrap(), json!(13));
        assert_eq!(eval("7 // 2", &root).unwrap(), json!(3));
        assert_eq!(eval("2 ^ 10", &root).unwrap(), json!(1024));
        assert_eq!(eval("name + '-' + a", &root).unwrap(), json!("pump-6"));
        assert_eq!(eval("-a", &root).unwrap(), json!(-6));
    }

    #[test]
    fn test_members_and_filters() {
        let root = json!({
            "employees": [
                { "first": "Sterling", "age": 36 },
                { "first": "Malory", "age": 62 },
                { "first": "Cheryl", "age": 28 }
            ]
        });
        assert_eq!(eval("employees[.age < 30].first", &root).unwrap(), json!("Cheryl"));
        assert_eq!(eval("employees[1].first", &root).unwrap(), json!("Malory"));
        assert_eq!(eval("employees.length", &root).unwrap(), json!(3));
        assert_eq!(eval("employees[.age > 30]", &root).unwrap().as_array().map(Vec::len), Some(2));
        assert_eq!(eval("missing.deep.path", &root).unwrap(), Value::Null);
    }

    #[test]
    fn test_logic() {
        let root = json!({ "x": 0, "y": "set", "tags": ["a", "b"] });
        assert_eq!(eval("x || y", &root).unwrap(), json!("set"));
        assert_eq!(eval("x && y", &root).unwrap(), json!(0));
        assert_eq!(eval("'a' in tags", &root).unwrap(), json!(true));
        assert_eq!(eval("'et' in y", &root).unwrap(), json!(true));
        assert_eq!(eval("x == '0' ? 'zero' : 'other'", &root).unwrap(), json!("zero"));
        assert_eq!(eval("!y", &root).unwrap(), json!(false));
    }

    #[test]
    fn test_calls_and_transforms() {
        let root = json!({ "values": [3, 1, 2], "label": "hello world" });
        assert_eq!(eval("max(values)", &root).unwrap(), json!(3));
        assert_eq!(eval("label | upperFirst", &root).unwrap(), json!("Hello world"));
        assert_eq!(eval("values | join('-')", &root).unwrap(), json!("3-1-2"));
        assert!(matches!(eval("nope(1)", &root), Err(ExpressionError::UnknownFunction(_))));
        assert!(matches!(eval("1 | nope", &root), Err(ExpressionError::UnknownTransform(_))));
        // now() is a function only
        assert!(matches!(eval("1 | now", &root), Err(ExpressionError::UnknownTransform(_))));
    }
}

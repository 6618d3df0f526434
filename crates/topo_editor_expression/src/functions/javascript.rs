// SPDX-License-Identifier: MIT OR Apache-2.0
//! Type checks, comparisons and conversions.

use super::{arg, LibraryFunction, Usage};
use crate::error::ExpressionResult;
use crate::value::{compare, number, same_value, to_display, to_number};
use serde_json::Value;
use std::cmp::Ordering;

/// Conversion entries of the library
pub const FUNCTIONS: &[LibraryFunction] = &[
    LibraryFunction { name: "castArray", usage: Usage::Both, call: cast_array },
    LibraryFunction { name: "clone", usage: Usage::Both, call: clone },
    LibraryFunction { name: "cloneDeep", usage: Usage::Both, call: clone },
    LibraryFunction { name: "eq", usage: Usage::Both, call: eq },
    LibraryFunction { name: "gt", usage: Usage::Both, call: gt },
    LibraryFunction { name: "gte", usage: Usage::Both, call: gte },
    LibraryFunction { name: "lt", usage: Usage::Both, call: lt },
    LibraryFunction { name: "lte", usage: Usage::Both, call: lte },
    LibraryFunction { name: "isArray", usage: Usage::Both, call: is_array },
    LibraryFunction { name: "isBoolean", usage: Usage::Both, call: is_boolean },
    LibraryFunction { name: "isEmpty", usage: Usage::Both, call: is_empty },
    LibraryFunction { name: "isEqual", usage: Usage::Both, call: eq },
    LibraryFunction { name: "isInteger", usage: Usage::Both, call: is_integer },
    LibraryFunction { name: "isNil", usage: Usage::Both, call: is_null },
    LibraryFunction { name: "isNull", usage: Usage::Both, call: is_null },
    LibraryFunction { name: "isNumber", usage: Usage::Both, call: is_number },
    LibraryFunction { name: "isObject", usage: Usage::Both, call: is_object },
    LibraryFunction { name: "isString", usage: Usage::Both, call: is_string },
    LibraryFunction { name: "toArray", usage: Usage::Both, call: to_array },
    LibraryFunction { name: "toFinite", usage: Usage::Both, call: to_finite },
    LibraryFunction { name: "toInteger", usage: Usage::Both, call: to_integer },
    LibraryFunction { name: "toNumber", usage: Usage::Both, call: to_number_fn },
    LibraryFunction { name: "toString", usage: Usage::Both, call: to_string_fn },
];

/// `castArray(value)`
pub fn cast_array(args: &[Value]) -> ExpressionResult<Value> {
    Ok(match args.first() {
        Some(Value::Array(items)) => Value::Array(items.clone()),
        Some(other) => Value::Array(vec![other.clone()]),
        None => Value::Array(Vec::new()),
    })
}

/// `clone(value)` / `cloneDeep(value)`; values are already owned trees
pub fn clone(args: &[Value]) -> ExpressionResult<Value> {
    Ok(arg(args, 0).clone())
}

/// `eq(a, b)` / `isEqual(a, b)`: deep value equality
pub fn eq(args: &[Value]) -> ExpressionResult<Value> {
    Ok(Value::Bool(same_value(arg(args, 0), arg(args, 1))))
}

fn ordering(args: &[Value], accept: fn(Ordering) -> bool) -> Value {
    Value::Bool(compare(arg(args, 0), arg(args, 1)).is_some_and(accept))
}

/// `gt(a, b)`
pub fn gt(args: &[Value]) -> ExpressionResult<Value> {
    Ok(ordering(args, Ordering::is_gt))
}

/// `gte(a, b)`
pub fn gte(args: &[Value]) -> ExpressionResult<Value> {
    Ok(ordering(args, Ordering::is_ge))
}

/// `lt(a, b)`
pub fn lt(args: &[Value]) -> ExpressionResult<Value> {
    Ok(ordering(args, Ordering::is_lt))
}

/// `lte(a, b)`
pub fn lte(args: &[Value]) -> ExpressionResult<Value> {
    Ok(ordering(args, Ordering::is_le))
}

/// `isArray(value)`
pub fn is_array(args: &[Value]) -> ExpressionResult<Value> {
    Ok(Value::Bool(arg(args, 0).is_array()))
}

/// `isBoolean(value)`
pub fn is_boolean(args: &[Value]) -> ExpressionResult<Value> {
    Ok(Value::Bool(arg(args, 0).is_boolean()))
}

/// `isEmpty(value)`: empty collections, empty strings and scalars
pub fn is_empty(args: &[Value]) -> ExpressionResult<Value> {
    Ok(Value::Bool(match arg(args, 0) {
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => true,
    }))
}

/// `isInteger(value)`
pub fn is_integer(args: &[Value]) -> ExpressionResult<Value> {
    Ok(Value::Bool(match arg(args, 0) {
        Value::Number(n) => n.as_f64().is_some_and(|f| f.fract() == 0.0),
        _ => false,
    }))
}

/// `isNull(value)` / `isNil(value)`
pub fn is_null(args: &[Value]) -> ExpressionResult<Value> {
    Ok(Value::Bool(arg(args, 0).is_null()))
}

/// `isNumber(value)`
pub fn is_number(args: &[Value]) -> ExpressionResult<Value> {
    Ok(Value::Bool(arg(args, 0).is_number()))
}

/// `isObject(value)`: objects and arrays
pub fn is_object(args: &[Value]) -> ExpressionResult<Value> {
    let value = arg(args, 0);
    Ok(Value::Bool(value.is_object() || value.is_array()))
}

/// `isString(value)`
pub fn is_string(args: &[Value]) -> ExpressionResult<Value> {
    Ok(Value::Bool(arg(args, 0).is_string()))
}

/// `toArray(value)`
pub fn to_array(args: &[Value]) -> ExpressionResult<Value> {
    Ok(Value::Array(match arg(args, 0) {
        Value::Array(items) => items.clone(),
        Value::Object(map) => map.values().cloned().collect(),
        Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
        _ => Vec::new(),
    }))
}

/// `toFinite(value)`
pub fn to_finite(args: &[Value]) -> ExpressionResult<Value> {
    let n = to_number(arg(args, 0));
    let n = if n.is_nan() {
        0.0
    } else {
        n.clamp(f64::MIN, f64::MAX)
    };
    Ok(number(n))
}

/// `toInteger(value)`
pub fn to_integer(args: &[Value]) -> ExpressionResult<Value> {
    let n = to_number(arg(args, 0));
    let n = if n.is_nan() {
        0.0
    } else {
        n.clamp(f64::MIN, f64::MAX).trunc()
    };
    Ok(number(n))
}

/// `toNumber(value)`; unparseable input yields `null`
pub fn to_number_fn(args: &[Value]) -> ExpressionResult<Value> {
    Ok(number(to_number(arg(args, 0))))
}

/// `toString(value)`; `null` becomes `""`
pub fn to_string_fn(args: &[Value]) -> ExpressionResult<Value> {
    Ok(Value::String(match arg(args, 0) {
        Value::Null => String::new(),
        other => to_display(other),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checks() {
        assert_eq!(is_empty(&[json!(1)]).unwrap(), json!(true));
        assert_eq!(is_empty(&[json!([1])]).unwrap(), json!(false));
        assert_eq!(is_integer(&[json!(3.0)]).unwrap(), json!(true));
        assert_eq!(is_object(&[json!([])]).unwrap(), json!(true));
        assert_eq!(eq(&[json!({ "a": [1] }), json!({ "a": [1.0] })]).unwrap(), json!(true));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(cast_array(&[json!(1)]).unwrap(), json!([1]));
        assert_eq!(to_integer(&[json!("3.7")]).unwrap(), json!(3));
        assert_eq!(to_number_fn(&[json!("abc")]).unwrap(), Value::Null);
        assert_eq!(to_string_fn(&[json!([1, 2])]).unwrap(), json!("1,2"));
        assert_eq!(gt(&[json!(3), json!(1)]).unwrap(), json!(true));
        assert_eq!(lte(&[json!("a"), json!("b")]).unwrap(), json!(true));
    }
}

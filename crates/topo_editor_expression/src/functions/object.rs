// SPDX-License-Identifier: MIT OR Apache-2.0
//! Object utilities built on the shared dot-path helpers.

use super::{arg, has_arg, string_arg, LibraryFunction, Usage};
use crate::error::ExpressionResult;
use crate::value::to_display;
use serde_json::{Map, Value};
use topo_editor_utils::path;

/// Object entries of the library
pub const FUNCTIONS: &[LibraryFunction] = &[
    LibraryFunction { name: "get", usage: Usage::Both, call: get },
    LibraryFunction { name: "has", usage: Usage::Both, call: has },
    LibraryFunction { name: "invert", usage: Usage::Both, call: invert },
    LibraryFunction { name: "keys", usage: Usage::Both, call: keys },
    LibraryFunction { name: "merge", usage: Usage::Both, call: merge },
    LibraryFunction { name: "omit", usage: Usage::Both, call: omit },
    LibraryFunction { name: "pick", usage: Usage::Both, call: pick },
    LibraryFunction { name: "set", usage: Usage::Both, call: set },
    LibraryFunction { name: "unset", usage: Usage::Both, call: unset },
    LibraryFunction { name: "values", usage: Usage::Both, call: values },
];

/// Path argument given either as a string or as an array of keys
fn path_arg(args: &[Value], index: usize) -> String {
    match arg(args, index) {
        Value::Array(parts) => parts
            .iter()
            .map(|p| format!("[\"{}\"]", to_display(p)))
            .collect(),
        _ => string_arg(args, index),
    }
}

/// Key list argument: an array of keys or a single key
fn key_list(args: &[Value], index: usize) -> Vec<String> {
    match arg(args, index) {
        Value::Array(keys) => keys.iter().map(to_display).collect(),
        Value::Null => Vec::new(),
        other => vec![to_display(other)],
    }
}

/// `get(object, path, default)`
pub fn get(args: &[Value]) -> ExpressionResult<Value> {
    let found = path::get_path(arg(args, 0), &path_arg(args, 1));
    Ok(found.cloned().unwrap_or_else(|| arg(args, 2).clone()))
}

/// `has(object, path)`
pub fn has(args: &[Value]) -> ExpressionResult<Value> {
    let p = path_arg(args, 1);
    Ok(Value::Bool(
        !p.is_empty() && path::get_path(arg(args, 0), &p).is_some(),
    ))
}

/// `invert(object)`: swap keys and values
pub fn invert(args: &[Value]) -> ExpressionResult<Value> {
    let mut out = Map::new();
    if let Value::Object(map) = arg(args, 0) {
        for (key, value) in map {
            out.insert(to_display(value), Value::String(key.clone()));
        }
    }
    Ok(Value::Object(out))
}

/// `keys(object)`; arrays and strings yield their indices
pub fn keys(args: &[Value]) -> ExpressionResult<Value> {
    let keys: Vec<Value> = match arg(args, 0) {
        Value::Object(map) => map.keys().map(|k| Value::String(k.clone())).collect(),
        Value::Array(items) => (0..items.len()).map(|i| Value::String(i.to_string())).collect(),
        Value::String(s) => (0..s.chars().count()).map(|i| Value::String(i.to_string())).collect(),
        _ => Vec::new(),
    };
    Ok(Value::Array(keys))
}

fn deep_merge(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                let nested = target
                    .get(key)
                    .is_some_and(|existing| existing.is_object() || existing.is_array());
                if nested {
                    if let Some(existing) = target.get_mut(key) {
                        deep_merge(existing, value);
                    }
                } else if !(value.is_null() && target.contains_key(key)) {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
        (Value::Array(target), Value::Array(source)) => {
            for (i, value) in source.iter().enumerate() {
                match target.get_mut(i) {
                    Some(existing) => deep_merge(existing, value),
                    None => target.push(value.clone()),
                }
            }
        }
        (target, source) => {
            if !source.is_null() {
                *target = source.clone();
            }
        }
    }
}

/// `merge(object, ...sources)`: recursive merge, later sources win
pub fn merge(args: &[Value]) -> ExpressionResult<Value> {
    let mut out = match arg(args, 0) {
        Value::Null => Value::Object(Map::new()),
        other => other.clone(),
    };
    for source in args.iter().skip(1) {
        deep_merge(&mut out, source);
    }
    Ok(out)
}

/// `omit(object, keys)`
pub fn omit(args: &[Value]) -> ExpressionResult<Value> {
    let mut out = match arg(args, 0) {
        Value::Object(map) => Value::Object(map.clone()),
        _ => return Ok(Value::Object(Map::new())),
    };
    for key in key_list(args, 1) {
        path::unset_path(&mut out, &key);
    }
    Ok(out)
}

/// `pick(object, keys)`
pub fn pick(args: &[Value]) -> ExpressionResult<Value> {
    let source = arg(args, 0);
    let mut out = Value::Object(Map::new());
    for key in key_list(args, 1) {
        if let Some(value) = path::get_path(source, &key) {
            path::set_path(&mut out, &key, value.clone());
        }
    }
    Ok(out)
}

/// `set(object, path, value)`: returns the updated copy
pub fn set(args: &[Value]) -> ExpressionResult<Value> {
    let mut out = match arg(args, 0) {
        Value::Null => Value::Object(Map::new()),
        other => other.clone(),
    };
    if has_arg(args, 1) {
        path::set_path(&mut out, &path_arg(args, 1), arg(args, 2).clone());
    }
    Ok(out)
}

/// `unset(object, path)`: whether the property is absent afterwards
pub fn unset(args: &[Value]) -> ExpressionResult<Value> {
    let mut copy = arg(args, 0).clone();
    path::unset_path(&mut copy, &path_arg(args, 1));
    Ok(Value::Bool(true))
}

/// `values(object)`
pub fn values(args: &[Value]) -> ExpressionResult<Value> {
    let values = match arg(args, 0) {
        Value::Object(map) => map.values().cloned().collect(),
        Value::Array(items) => items.clone(),
        Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
        _ => Vec::new(),
    };
    Ok(Value::Array(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_get_has() {
        let object = json!({ "a": [{ "b": { "c": 3 } }] });
        assert_eq!(get(&[object.clone(), json!("a[0].b.c")]).unwrap(), json!(3));
        assert_eq!(get(&[object.clone(), json!(["a", "0", "b", "c"])]).unwrap(), json!(3));
        assert_eq!(get(&[object.clone(), json!("a.b.c"), json!("default")]).unwrap(), json!("default"));
        assert_eq!(has(&[object.clone(), json!("a[0].b")]).unwrap(), json!(true));
        assert_eq!(has(&[object, json!("x")]).unwrap(), json!(false));
    }

    #[test]
    fn test_merge() {
        let object = json!({ "a": [{ "b": 2 }, { "d": 4 }] });
        let other = json!({ "a": [{ "c": 3 }, { "e": 5 }] });
        assert_eq!(
            merge(&[object, other]).unwrap(),
            json!({ "a": [{ "b": 2, "c": 3 }, { "d": 4, "e": 5 }] })
        );
    }

    #[test]
    fn test_pick_omit_set() {
        let object = json!({ "a": 1, "b": "2", "c": 3 });
        assert_eq!(pick(&[object.clone(), json!(["a", "c"])]).unwrap(), json!({ "a": 1, "c": 3 }));
        assert_eq!(omit(&[object.clone(), json!(["a", "c"])]).unwrap(), json!({ "b": "2" }));
        assert_eq!(set(&[json!({}), json!("x.y"), json!(1)]).unwrap(), json!({ "x": { "y": 1 } }));
        assert_eq!(invert(&[json!({ "a": 1 })]).unwrap(), json!({ "1": "a" }));
        assert_eq!(keys(&[object.clone()]).unwrap(), json!(["a", "b", "c"]));
        assert_eq!(values(&[object]).unwrap(), json!([1, "2", 3]));
    }
}

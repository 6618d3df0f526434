// SPDX-License-Identifier: MIT OR Apache-2.0
//! Array utilities.

use super::{arg, array_arg, contains, has_arg, int_arg, matches_predicate, string_arg, LibraryFunction, Usage};
use crate::error::ExpressionResult;
use crate::value::{compare, number, same_value, to_display, truthy};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Array entries of the library
pub const FUNCTIONS: &[LibraryFunction] = &[
    LibraryFunction { name: "chunk", usage: Usage::Both, call: chunk },
    LibraryFunction { name: "compact", usage: Usage::Both, call: compact },
    LibraryFunction { name: "concat", usage: Usage::Both, call: concat },
    LibraryFunction { name: "difference", usage: Usage::Both, call: difference },
    LibraryFunction { name: "drop", usage: Usage::Both, call: drop },
    LibraryFunction { name: "dropRight", usage: Usage::Both, call: drop_right },
    LibraryFunction { name: "fill", usage: Usage::Both, call: fill },
    LibraryFunction { name: "findIndex", usage: Usage::Both, call: find_index },
    LibraryFunction { name: "findLastIndex", usage: Usage::Both, call: find_last_index },
    LibraryFunction { name: "first", usage: Usage::Both, call: first },
    LibraryFunction { name: "flatten", usage: Usage::Both, call: flatten },
    LibraryFunction { name: "flattenDeep", usage: Usage::Both, call: flatten_deep },
    LibraryFunction { name: "fromPairs", usage: Usage::Both, call: from_pairs },
    LibraryFunction { name: "initial", usage: Usage::Both, call: initial },
    LibraryFunction { name: "intersection", usage: Usage::Both, call: intersection },
    LibraryFunction { name: "join", usage: Usage::Both, call: join },
    LibraryFunction { name: "last", usage: Usage::Both, call: last },
    LibraryFunction { name: "pull", usage: Usage::Both, call: pull },
    LibraryFunction { name: "reverse", usage: Usage::Both, call: reverse },
    LibraryFunction { name: "slice", usage: Usage::Both, call: slice },
    LibraryFunction { name: "sortedIndex", usage: Usage::Both, call: sorted_index },
    LibraryFunction { name: "sortedUniq", usage: Usage::Both, call: sorted_uniq },
    LibraryFunction { name: "take", usage: Usage::Both, call: take },
    LibraryFunction { name: "takeRight", usage: Usage::Both, call: take_right },
    LibraryFunction { name: "union", usage: Usage::Both, call: union },
    LibraryFunction { name: "uniq", usage: Usage::Both, call: uniq },
];

/// Resolve a possibly negative index against `len`
fn resolve_index(index: i64, len: usize) -> usize {
    if index < 0 {
        len.saturating_sub(index.unsigned_abs() as usize)
    } else {
        (index as usize).min(len)
    }
}

fn count_arg(args: &[Value], index: usize, default: i64) -> usize {
    int_arg(args, index, default).max(0) as usize
}

fn dedupe(items: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for item in items {
        if !contains(&out, &item) {
            out.push(item);
        }
    }
    out
}

/// `chunk(array, size = 1)`
pub fn chunk(args: &[Value]) -> ExpressionResult<Value> {
    let items = array_arg("chunk", args, 0)?;
    let size = count_arg(args, 1, 1);
    if size == 0 {
        return Ok(Value::Array(Vec::new()));
    }
    Ok(Value::Array(
        items.chunks(size).map(|c| Value::Array(c.to_vec())).collect(),
    ))
}

/// `compact(array)`: drop falsy values
pub fn compact(args: &[Value]) -> ExpressionResult<Value> {
    let items = array_arg("compact", args, 0)?;
    Ok(Value::Array(items.into_iter().filter(truthy).collect()))
}

/// `concat(array, ...values)`: array arguments are spliced one level
pub fn concat(args: &[Value]) -> ExpressionResult<Value> {
    let mut out = match arg(args, 0) {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    };
    for value in args.iter().skip(1) {
        match value {
            Value::Array(items) => out.extend(items.iter().cloned()),
            other => out.push(other.clone()),
        }
    }
    Ok(Value::Array(out))
}

/// `difference(array, ...others)`
pub fn difference(args: &[Value]) -> ExpressionResult<Value> {
    let items = array_arg("difference", args, 0)?;
    let mut excluded = Vec::new();
    for index in 1..args.len() {
        excluded.extend(array_arg("difference", args, index)?);
    }
    Ok(Value::Array(
        items.into_iter().filter(|v| !contains(&excluded, v)).collect(),
    ))
}

/// `drop(array, n = 1)`
pub fn drop(args: &[Value]) -> ExpressionResult<Value> {
    let items = array_arg("drop", args, 0)?;
    let n = count_arg(args, 1, 1);
    Ok(Value::Array(items.into_iter().skip(n).collect()))
}

/// `dropRight(array, n = 1)`
pub fn drop_right(args: &[Value]) -> ExpressionResult<Value> {
    let mut items = array_arg("dropRight", args, 0)?;
    let n = count_arg(args, 1, 1);
    items.truncate(items.len().saturating_sub(n));
    Ok(Value::Array(items))
}

/// `fill(array, value, start = 0, end = length)`
pub fn fill(args: &[Value]) -> ExpressionResult<Value> {
    let mut items = array_arg("fill", args, 0)?;
    let len = items.len();
    let start = resolve_index(int_arg(args, 2, 0), len);
    let end = resolve_index(int_arg(args, 3, len as i64), len);
    let value = arg(args, 1);
    for item in items.iter_mut().take(end).skip(start) {
        *item = value.clone();
    }
    Ok(Value::Array(items))
}

/// `findIndex(array, predicate, fromIndex = 0)`
pub fn find_index(args: &[Value]) -> ExpressionResult<Value> {
    let items = array_arg("findIndex", args, 0)?;
    let from = resolve_index(int_arg(args, 2, 0), items.len());
    let found = items
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, item)| matches_predicate(item, arg(args, 1)))
        .map_or(-1, |(i, _)| i as i64);
    Ok(Value::from(found))
}

/// `findLastIndex(array, predicate)`
pub fn find_last_index(args: &[Value]) -> ExpressionResult<Value> {
    let items = array_arg("findLastIndex", args, 0)?;
    let found = items
        .iter()
        .enumerate()
        .rev()
        .find(|(_, item)| matches_predicate(item, arg(args, 1)))
        .map_or(-1, |(i, _)| i as i64);
    Ok(Value::from(found))
}

/// `first(array)`
pub fn first(args: &[Value]) -> ExpressionResult<Value> {
    let items = array_arg("first", args, 0)?;
    Ok(items.into_iter().next().unwrap_or(Value::Null))
}

/// `flatten(array)`: one level
pub fn flatten(args: &[Value]) -> ExpressionResult<Value> {
    let items = array_arg("flatten", args, 0)?;
    let mut out = Vec::new();
    for item in items {
        match item {
            Value::Array(inner) => out.extend(inner),
            other => out.push(other),
        }
    }
    Ok(Value::Array(out))
}

fn flatten_into(items: Vec<Value>, out: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::Array(inner) => flatten_into(inner, out),
            other => out.push(other),
        }
    }
}

/// `flattenDeep(array)`
pub fn flatten_deep(args: &[Value]) -> ExpressionResult<Value> {
    let mut out = Vec::new();
    flatten_into(array_arg("flattenDeep", args, 0)?, &mut out);
    Ok(Value::Array(out))
}

/// `fromPairs([[key, value], ...])`
pub fn from_pairs(args: &[Value]) -> ExpressionResult<Value> {
    let mut map = Map::new();
    for pair in array_arg("fromPairs", args, 0)? {
        if let Value::Array(pair) = pair {
            let key = pair.first().map(to_display).unwrap_or_default();
            map.insert(key, pair.get(1).cloned().unwrap_or(Value::Null));
        }
    }
    Ok(Value::Object(map))
}

/// `initial(array)`: all but the last element
pub fn initial(args: &[Value]) -> ExpressionResult<Value> {
    let mut items = array_arg("initial", args, 0)?;
    items.pop();
    Ok(Value::Array(items))
}

/// `intersection(...arrays)`
pub fn intersection(args: &[Value]) -> ExpressionResult<Value> {
    let first = array_arg("intersection", args, 0)?;
    let mut others = Vec::new();
    for index in 1..args.len() {
        others.push(array_arg("intersection", args, index)?);
    }
    Ok(Value::Array(dedupe(
        first
            .into_iter()
            .filter(|v| others.iter().all(|other| contains(other, v))),
    )))
}

/// `join(array, separator = ",")`
pub fn join(args: &[Value]) -> ExpressionResult<Value> {
    let items = array_arg("join", args, 0)?;
    let separator = if has_arg(args, 1) {
        string_arg(args, 1)
    } else {
        ",".to_string()
    };
    let parts: Vec<String> = items
        .iter()
        .map(|v| if v.is_null() { String::new() } else { to_display(v) })
        .collect();
    Ok(Value::String(parts.join(&separator)))
}

/// `last(array)`
pub fn last(args: &[Value]) -> ExpressionResult<Value> {
    let mut items = array_arg("last", args, 0)?;
    Ok(items.pop().unwrap_or(Value::Null))
}

/// `pull(array, ...values)`
pub fn pull(args: &[Value]) -> ExpressionResult<Value> {
    let items = array_arg("pull", args, 0)?;
    let removed = &args[1.min(args.len())..];
    Ok(Value::Array(
        items.into_iter().filter(|v| !contains(removed, v)).collect(),
    ))
}

/// `reverse(array)`
pub fn reverse(args: &[Value]) -> ExpressionResult<Value> {
    let mut items = array_arg("reverse", args, 0)?;
    items.reverse();
    Ok(Value::Array(items))
}

/// `slice(array, start = 0, end = length)`
pub fn slice(args: &[Value]) -> ExpressionResult<Value> {
    let items = array_arg("slice", args, 0)?;
    let len = items.len();
    let start = resolve_index(int_arg(args, 1, 0), len);
    let end = resolve_index(int_arg(args, 2, len as i64), len);
    if start >= end {
        return Ok(Value::Array(Vec::new()));
    }
    Ok(Value::Array(items[start..end].to_vec()))
}

/// `sortedIndex(array, value)`: lowest index keeping the array sorted
pub fn sorted_index(args: &[Value]) -> ExpressionResult<Value> {
    let items = array_arg("sortedIndex", args, 0)?;
    let value = arg(args, 1);
    let index = items.partition_point(|item| compare(item, value) == Some(Ordering::Less));
    Ok(number(index as f64))
}

/// `sortedUniq(array)`: drop adjacent duplicates
pub fn sorted_uniq(args: &[Value]) -> ExpressionResult<Value> {
    let mut items = array_arg("sortedUniq", args, 0)?;
    items.dedup_by(|a, b| same_value(a, b));
    Ok(Value::Array(items))
}

/// `take(array, n = 1)`
pub fn take(args: &[Value]) -> ExpressionResult<Value> {
    let items = array_arg("take", args, 0)?;
    let n = count_arg(args, 1, 1);
    Ok(Value::Array(items.into_iter().take(n).collect()))
}

/// `takeRight(array, n = 1)`
pub fn take_right(args: &[Value]) -> ExpressionResult<Value> {
    let items = array_arg("takeRight", args, 0)?;
    let n = count_arg(args, 1, 1);
    let start = items.len().saturating_sub(n);
    Ok(Value::Array(items[start..].to_vec()))
}

/// `union(...arrays)`
pub fn union(args: &[Value]) -> ExpressionResult<Value> {
    let mut all = Vec::new();
    for index in 0..args.len() {
        all.extend(array_arg("union", args, index)?);
    }
    Ok(Value::Array(dedupe(all)))
}

/// `uniq(array)`
pub fn uniq(args: &[Value]) -> ExpressionResult<Value> {
    Ok(Value::Array(dedupe(array_arg("uniq", args, 0)?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chunk_and_flatten() {
        assert_eq!(chunk(&[json!([1, 2, 3, 4, 5]), json!(2)]).unwrap(), json!([[1, 2], [3, 4], [5]]));
        assert_eq!(flatten(&[json!([1, [2, [3]]])]).unwrap(), json!([1, 2, [3]]));
        assert_eq!(flatten_deep(&[json!([1, [2, [3]]])]).unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn test_set_operations() {
        assert_eq!(difference(&[json!([2, 1]), json!([2, 3])]).unwrap(), json!([1]));
        assert_eq!(intersection(&[json!([2, 1]), json!([2, 3])]).unwrap(), json!([2]));
        assert_eq!(union(&[json!([2]), json!([1, 2])]).unwrap(), json!([2, 1]));
        assert_eq!(uniq(&[json!([1, 1, 2])]).unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_slicing() {
        let list = json!([1, 2, 3, 4]);
        assert_eq!(slice(&[list.clone(), json!(1), json!(-1)]).unwrap(), json!([2, 3]));
        assert_eq!(take_right(&[list.clone(), json!(2)]).unwrap(), json!([3, 4]));
        assert_eq!(drop(&[list.clone()]).unwrap(), json!([2, 3, 4]));
        assert_eq!(fill(&[list, json!(0), json!(1), json!(3)]).unwrap(), json!([1, 0, 0, 4]));
    }

    #[test]
    fn test_find_index() {
        let users = json!([{ "name": "a", "active": false }, { "name": "b", "active": true }]);
        assert_eq!(find_index(&[users.clone(), json!("active")]).unwrap(), json!(1));
        assert_eq!(find_index(&[users.clone(), json!({ "name": "z" })]).unwrap(), json!(-1));
        assert_eq!(find_last_index(&[users, json!(["name", "a"])]).unwrap(), json!(0));
    }

    #[test]
    fn test_misc() {
        assert_eq!(join(&[json!(["a", null, 1]), json!("-")]).unwrap(), json!("a--1"));
        assert_eq!(from_pairs(&[json!([["a", 1], ["b", 2]])]).unwrap(), json!({ "a": 1, "b": 2 }));
        assert_eq!(sorted_index(&[json!([30, 50]), json!(40)]).unwrap(), json!(1));
        assert_eq!(compact(&[json!([0, 1, false, "", "x", null])]).unwrap(), json!([1, "x"]));
        assert!(chunk(&[json!("nope")]).is_err());
    }
}

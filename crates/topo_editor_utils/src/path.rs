// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dot-path access over JSON values.
//!
//! Paths use the familiar `a.b[0].c` form; bracketed segments may be numeric
//! indices or quoted keys (`a["x y"]`). The empty path addresses the root.

use serde_json::{Map, Value};

/// Split a path into its segments
pub fn segments(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
            '[' => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
                let quote = match chars.peek() {
                    Some(&q @ ('"' | '\'')) => {
                        chars.next();
                        Some(q)
                    }
                    _ => None,
                };
                let mut inner = String::new();
                while let Some(c) = chars.next() {
                    if Some(c) == quote && chars.peek() == Some(&']') {
                        chars.next();
                        break;
                    }
                    if quote.is_none() && c == ']' {
                        break;
                    }
                    inner.push(c);
                }
                out.push(inner);
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn step_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        _ => None,
    }
}

/// Read the value at `path`
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path)
        .iter()
        .try_fold(root, |value, segment| step(value, segment))
}

/// Mutable access to the value at `path`
pub fn get_path_mut<'a>(root: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut current = root;
    for segment in segments(path) {
        current = step_mut(current, &segment)?;
    }
    Some(current)
}

/// Write `value` at `path`, creating intermediate containers.
///
/// Missing or scalar intermediates become arrays when the following segment
/// is an index and objects otherwise.
pub fn set_path(root: &mut Value, path: &str, value: Value) {
    let segs = segments(path);
    if segs.is_empty() {
        *root = value;
        return;
    }
    if !root.is_object() && !root.is_array() {
        *root = Value::Object(Map::new());
    }

    let mut current = root;
    for (i, segment) in segs.iter().enumerate() {
        let slot = match current {
            Value::Array(items) => {
                let Ok(index) = segment.parse::<usize>() else {
                    tracing::debug!(path, segment = %segment, "non-index segment on array, skipping write");
                    return;
                };
                if index >= items.len() {
                    items.resize(index + 1, Value::Null);
                }
                &mut items[index]
            }
            Value::Object(map) => map.entry(segment.clone()).or_insert(Value::Null),
            _ => return,
        };

        match segs.get(i + 1) {
            None => {
                *slot = value;
                return;
            }
            Some(next) => {
                if !slot.is_object() && !slot.is_array() {
                    *slot = if is_index(next) {
                        Value::Array(Vec::new())
                    } else {
                        Value::Object(Map::new())
                    };
                }
            }
        }
        current = slot;
    }
}

/// Remove the value at `path`. Array slots are reset to `null`.
pub fn unset_path(root: &mut Value, path: &str) -> bool {
    let mut segs = segments(path);
    let Some(last) = segs.pop() else {
        return false;
    };

    let mut parent = root;
    for segment in &segs {
        match step_mut(parent, segment) {
            Some(next) => parent = next,
            None => return false,
        }
    }

    match parent {
        Value::Object(map) => map.shift_remove(&last).is_some(),
        Value::Array(items) => match last.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
            Some(slot) => {
                *slot = Value::Null;
                true
            }
            None => false,
        },
        _ => false,
    }
}

/// Whether one path is a prefix of the other (a write to either affects both)
pub fn paths_overlap(a: &str, b: &str) -> bool {
    let a = segments(a);
    let b = segments(b);
    let n = a.len().min(b.len());
    a[..n] == b[..n]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_segments() {
        assert_eq!(segments("a.b[0].c"), vec!["a", "b", "0", "c"]);
        assert_eq!(segments("a[\"x.y\"]"), vec!["a", "x.y"]);
        assert!(segments("").is_empty());
    }

    #[test]
    fn test_get_and_set() {
        let mut root = json!({ "a": { "list": [1, 2] } });
        assert_eq!(get_path(&root, "a.list[1]"), Some(&json!(2)));
        assert_eq!(get_path(&root, "a.missing.x"), None);

        set_path(&mut root, "a.list[3]", json!(4));
        assert_eq!(root["a"]["list"], json!([1, 2, null, 4]));

        set_path(&mut root, "b.items[0].name", json!("x"));
        assert_eq!(root["b"], json!({ "items": [{ "name": "x" }] }));

        set_path(&mut root, "a.list", json!("scalar"));
        set_path(&mut root, "a.list.deep", json!(true));
        assert_eq!(root["a"]["list"], json!({ "deep": true }));
    }

    #[test]
    fn test_unset() {
        let mut root = json!({ "a": { "b": 1, "c": [1, 2] } });
        assert!(unset_path(&mut root, "a.b"));
        assert!(!unset_path(&mut root, "a.b"));
        assert!(unset_path(&mut root, "a.c[0]"));
        assert_eq!(root, json!({ "a": { "c": [null, 2] } }));
    }

    #[test]
    fn test_paths_overlap() {
        assert!(paths_overlap("state.user", "state.user.name"));
        assert!(paths_overlap("state.user.name", "state"));
        assert!(!paths_overlap("state.user", "state.users"));
        assert!(paths_overlap("", "anything"));
    }
}

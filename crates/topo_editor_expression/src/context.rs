// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared, change-tracking evaluation context.
//!
//! Every write records its dot-path; bindings consume the recorded paths
//! at their next flush to decide what to re-evaluate.

use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;
use topo_editor_utils::path;

#[derive(Debug, Default)]
struct ContextState {
    root: Value,
    changes: Vec<String>,
}

/// A JSON object shared between evaluators, bindings and writers
#[derive(Debug, Clone)]
pub struct ReactiveContext {
    inner: Arc<RwLock<ContextState>>,
}

impl ReactiveContext {
    /// Create a context; non-object roots are replaced by `{}`
    pub fn new(root: Value) -> Self {
        let root = if root.is_object() {
            root
        } else {
            Value::Object(Map::new())
        };
        Self {
            inner: Arc::new(RwLock::new(ContextState {
                root,
                changes: Vec::new(),
            })),
        }
    }

    /// Read a value by path
    pub fn get(&self, path: &str) -> Option<Value> {
        path::get_path(&self.inner.read().root, path).cloned()
    }

    /// Write a value by path, creating intermediate containers
    pub fn set(&self, path: &str, value: Value) {
        let mut state = self.inner.write();
        path::set_path(&mut state.root, path, value);
        state.changes.push(path.to_string());
    }

    /// Remove a value by path
    pub fn unset(&self, path: &str) -> bool {
        let mut state = self.inner.write();
        let removed = path::unset_path(&mut state.root, path);
        if removed {
            state.changes.push(path.to_string());
        }
        removed
    }

    /// Replace the whole root; every binding is considered affected
    pub fn replace(&self, root: Value) {
        let mut state = self.inner.write();
        state.root = if root.is_object() {
            root
        } else {
            Value::Object(Map::new())
        };
        state.changes.push(String::new());
    }

    /// Reset to an empty object
    pub fn clear(&self) {
        self.replace(Value::Object(Map::new()));
    }

    /// Clone of the whole root
    pub fn snapshot(&self) -> Value {
        self.inner.read().root.clone()
    }

    /// Run `f` against the root without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.inner.read_recursive().root)
    }

    /// Drain the paths written since the last call
    pub fn take_changes(&self) -> Vec<String> {
        std::mem::take(&mut self.inner.write().changes)
    }

    /// Whether writes are pending a flush
    pub fn has_changes(&self) -> bool {
        !self.inner.read().changes.is_empty()
    }
}

impl Default for ReactiveContext {
    fn default() -> Self {
        Self::new(Value::Object(Map::new()))
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runtime components and their render instances.

use crate::error::MethodError;
use crate::schema::{EffectConfig, MComponent, MethodConfig};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Event emitted when a component mounts
pub const EVENT_MOUNTED: &str = "mounted";
/// Event emitted when a component instance updates
pub const EVENT_UPDATE: &str = "update";

/// Callable a render instance exposes by name
pub type NodeMethod = Arc<dyn Fn(&[Value]) -> Result<Value, MethodError> + Send + Sync>;

/// Live render instance of a component
#[derive(Clone, Default)]
pub struct NodeInstance {
    /// Methods reachable from control effects
    pub methods: IndexMap<String, NodeMethod>,
}

impl NodeInstance {
    /// Instance without methods
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a method
    pub fn with_method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&[Value]) -> Result<Value, MethodError> + Send + Sync + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Arc::new(method));
        self
    }

    /// Look up a method
    pub fn method(&self, name: &str) -> Option<NodeMethod> {
        self.methods.get(name).cloned()
    }
}

impl fmt::Debug for NodeInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeInstance")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Where a component is in its render lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NodeLifecycle {
    /// No instance yet
    #[default]
    Unmounted,
    /// Instance created, not yet in the tree
    Created,
    /// Instance mounted; control effects are delivered directly
    Mounted,
    /// Instance torn down
    Destroyed,
}

/// A component inside a page
#[derive(Debug, Clone)]
pub struct Node {
    /// Component id
    pub id: String,
    /// Parent component; `None` for the page root
    pub parent: Option<String>,
    /// Event name to effects
    pub events: IndexMap<String, Vec<EffectConfig>>,
    /// Declared methods
    pub methods: Vec<MethodConfig>,
    instance: Option<NodeInstance>,
    lifecycle: NodeLifecycle,
}

impl Node {
    /// Build from its description
    pub fn new(config: &MComponent, parent: Option<&str>) -> Self {
        Self {
            id: config.id.clone(),
            parent: parent.map(str::to_string),
            events: config.event.clone(),
            methods: config.method.clone(),
            instance: None,
            lifecycle: NodeLifecycle::Unmounted,
        }
    }

    /// Current render instance
    pub fn instance(&self) -> Option<&NodeInstance> {
        self.instance.as_ref()
    }

    /// Current lifecycle stage
    pub fn lifecycle(&self) -> NodeLifecycle {
        self.lifecycle
    }

    /// Instance created
    pub fn created(&mut self, instance: NodeInstance) {
        self.instance = Some(instance);
        self.lifecycle = NodeLifecycle::Created;
    }

    /// Instance mounted
    pub fn mounted(&mut self, instance: NodeInstance) {
        self.instance = Some(instance);
        self.lifecycle = NodeLifecycle::Mounted;
    }

    /// Instance replaced or dropped by a re-render
    pub fn updated(&mut self, instance: Option<NodeInstance>) {
        if instance.is_none() {
            self.lifecycle = NodeLifecycle::Unmounted;
        }
        self.instance = instance;
    }

    /// Instance destroyed; the node may be created again
    pub fn destroyed(&mut self) {
        self.instance = None;
        self.lifecycle = NodeLifecycle::Destroyed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lifecycle() {
        let mut node = Node::new(&MComponent::new("btn", "button"), Some("page"));
        assert_eq!(node.lifecycle(), NodeLifecycle::Unmounted);
        assert!(node.instance().is_none());

        node.created(NodeInstance::new());
        assert_eq!(node.lifecycle(), NodeLifecycle::Created);

        node.mounted(NodeInstance::new().with_method("ping", |_| Ok(json!("pong"))));
        assert_eq!(node.lifecycle(), NodeLifecycle::Mounted);

        node.updated(None);
        assert_eq!(node.lifecycle(), NodeLifecycle::Unmounted);

        node.destroyed();
        assert_eq!(node.lifecycle(), NodeLifecycle::Destroyed);
        assert!(node.instance().is_none());
    }

    #[test]
    fn test_method_lookup() {
        let instance = NodeInstance::new().with_method("sum", |args| {
            Ok(json!(args.iter().filter_map(Value::as_i64).sum::<i64>()))
        });

        let sum = instance.method("sum").unwrap();
        assert_eq!(sum(&[json!(1), json!(2)]).unwrap(), json!(3));
        assert!(instance.method("missing").is_none());
    }
}

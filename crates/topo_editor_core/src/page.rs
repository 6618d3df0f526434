// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pages: a flat index over a component tree.

use crate::node::Node;
use crate::schema::{MComponent, MPage};
use indexmap::IndexMap;

/// A page and every component beneath it
#[derive(Debug, Clone)]
pub struct Page {
    /// Page id
    pub id: String,
    nodes: IndexMap<String, Node>,
}

impl Page {
    /// Index the tree in pre-order; the page itself is the first node
    pub fn new(config: &MPage) -> Self {
        let mut page = Self {
            id: config.id.clone(),
            nodes: IndexMap::new(),
        };
        page.init_node(config, None);
        page
    }

    fn init_node(&mut self, config: &MComponent, parent: Option<&str>) {
        if self.nodes.contains_key(&config.id) {
            tracing::warn!(page = %self.id, node = %config.id, "Duplicate component id, later one wins");
        }
        self.set_node(Node::new(config, parent));
        for item in &config.items {
            self.init_node(item, Some(&config.id));
        }
    }

    /// Look up a component
    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Mutable lookup
    pub fn get_node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Insert or replace a component
    pub fn set_node(&mut self, node: Node) {
        self.nodes.insert(node.id.clone(), node);
    }

    /// Remove a component
    pub fn delete_node(&mut self, id: &str) -> Option<Node> {
        self.nodes.shift_remove(id)
    }

    /// Components in pre-order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Number of components, the page included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the page has no components
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

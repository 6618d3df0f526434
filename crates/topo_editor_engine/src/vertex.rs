// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph vertices.

use crate::element::{ElementBase, ElementId};
use crate::error::GraphError;
use crate::port::VertexPort;
use crate::schema::{MVertex, MVertexPort, State};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use topo_editor_expression::ExpressionParser;

/// Expanded size of a group vertex when none is given
pub const DEFAULT_EXPAND_SIZE: f64 = 400.0;

/// Vertex category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VertexTag {
    /// Whole system group
    System,
    /// Station group
    Station,
    /// Unit group
    Unit,
    /// Pipe segment
    Pipe,
    /// Equipment
    Equipment,
    /// Circle shape
    Circle,
    /// Rectangle shape
    Rect,
    /// Image
    Image,
}

impl VertexTag {
    /// Collapsible group tags
    pub fn is_group(self) -> bool {
        matches!(self, Self::System | Self::Station | Self::Unit)
    }
}

/// How a new port list differs from the current one, matched by id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortDiff {
    /// Ports only in the new list
    pub added: Vec<MVertexPort>,
    /// Ports in both lists, with their new declaration
    pub updated: Vec<MVertexPort>,
    /// Ids only in the old list
    pub removed: Vec<String>,
}

/// Classify `new` ports against `old` ones
pub fn diff_ports(old: &[VertexPort], new: &[MVertexPort]) -> PortDiff {
    let mut remaining: IndexSet<&str> = old.iter().map(|port| port.id.as_str()).collect();
    let mut diff = PortDiff::default();
    for port in new {
        if remaining.shift_remove(port.id.as_str()) {
            diff.updated.push(port.clone());
        } else {
            diff.added.push(port.clone());
        }
    }
    diff.removed = remaining.into_iter().map(str::to_string).collect();
    diff
}

fn check_unique_ports(vertex: &ElementId, ports: &[MVertexPort]) -> Result<(), GraphError> {
    let mut seen = IndexSet::new();
    for port in ports {
        if !seen.insert(port.id.as_str()) {
            return Err(GraphError::DuplicatePort {
                vertex: vertex.clone(),
                port: port.id.clone(),
            });
        }
    }
    Ok(())
}

/// A graph node with geometry and ports
#[derive(Debug, Clone)]
pub struct Vertex {
    /// Shared element fields
    pub element: ElementBase,
    /// Component type
    pub vertex_type: String,
    /// Category
    pub tag: VertexTag,
    /// Interaction disabled
    pub disabled: Option<bool>,
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
    /// Rotation in degrees
    pub angle: f64,
    ports: Vec<VertexPort>,
    /// Parent group
    pub parent: Option<ElementId>,
    /// Child vertices in order
    pub children: Vec<ElementId>,
    /// Target vertex to the links leading there
    pub out_degrees: IndexMap<ElementId, Vec<ElementId>>,
    /// Vertices with a link into this one
    pub in_degrees: Vec<ElementId>,
    /// Group collapsed
    pub is_collapsed: Option<bool>,
    /// Group width when expanded
    pub expand_width: Option<f64>,
    /// Group height when expanded
    pub expand_height: Option<f64>,
    /// Name of the visual state currently shown
    pub cur_state: Option<String>,
}

impl Vertex {
    /// Build from a declaration. Children are not materialized here.
    pub fn new(config: &MVertex, parent: Option<ElementId>) -> Result<Self, GraphError> {
        check_unique_ports(config.id(), &config.ports)?;
        let group = config.tag.is_group();
        let mut vertex = Self {
            element: ElementBase::new(&config.element),
            vertex_type: config.vertex_type.clone(),
            tag: config.tag,
            disabled: config.disabled,
            x: config.x,
            y: config.y,
            width: config.width,
            height: config.height,
            angle: config.angle,
            ports: config.ports.iter().map(VertexPort::new).collect(),
            parent,
            children: Vec::new(),
            out_degrees: IndexMap::new(),
            in_degrees: Vec::new(),
            is_collapsed: group.then(|| config.is_collapsed.unwrap_or(false)),
            expand_width: group.then(|| config.expand_width.unwrap_or(DEFAULT_EXPAND_SIZE)),
            expand_height: group.then(|| config.expand_height.unwrap_or(DEFAULT_EXPAND_SIZE)),
            cur_state: None,
        };
        vertex.cur_state = vertex
            .default_state()
            .filter(|state| state.src.is_some())
            .map(|state| state.name.clone());
        Ok(vertex)
    }

    /// Vertex id
    pub fn id(&self) -> &ElementId {
        &self.element.id
    }

    /// Ports in order
    pub fn ports(&self) -> &[VertexPort] {
        &self.ports
    }

    /// Whether a port with this id exists
    pub fn has_port(&self, id: &str) -> bool {
        self.ports.iter().any(|port| port.id == id)
    }

    /// Port by id
    pub fn port(&self, id: &str) -> Option<&VertexPort> {
        self.ports.iter().find(|port| port.id == id)
    }

    /// Mutable port by id
    pub fn port_mut(&mut self, id: &str) -> Option<&mut VertexPort> {
        self.ports.iter_mut().find(|port| port.id == id)
    }

    /// Append a port; an existing id is refused
    pub fn add_port(&mut self, config: &MVertexPort) -> Result<(), GraphError> {
        if self.has_port(&config.id) {
            return Err(GraphError::DuplicatePort {
                vertex: self.id().clone(),
                port: config.id.clone(),
            });
        }
        self.ports.push(VertexPort::new(config));
        Ok(())
    }

    /// Remove a port. Links on it must be removed by the project first.
    pub fn remove_port(&mut self, id: &str) -> Option<VertexPort> {
        let index = self.ports.iter().position(|port| port.id == id)?;
        Some(self.ports.remove(index))
    }

    /// Update a port's attributes; false when absent
    pub fn update_port(&mut self, config: &MVertexPort) -> bool {
        match self.port_mut(&config.id) {
            Some(port) => {
                port.update(config);
                true
            }
            None => false,
        }
    }

    /// Links occupying any port, without duplicates
    pub fn linked(&self) -> Vec<ElementId> {
        let mut links: IndexSet<ElementId> = IndexSet::new();
        for port in &self.ports {
            if let Some(link) = port.link() {
                links.insert(link.clone());
            }
        }
        links.into_iter().collect()
    }

    /// Apply a declaration in place. Returns the port diff that was applied;
    /// links on removed ports must already be gone.
    pub fn update(&mut self, config: &MVertex) -> Result<PortDiff, GraphError> {
        check_unique_ports(self.id(), &config.ports)?;
        let diff = diff_ports(&self.ports, &config.ports);

        self.element.update(&config.element);
        self.disabled = config.disabled;
        for id in &diff.removed {
            self.remove_port(id);
        }
        for port in &diff.updated {
            self.update_port(port);
        }
        for port in &diff.added {
            self.add_port(port)?;
        }
        // Keep declaration order
        let order: Vec<&str> = config.ports.iter().map(|port| port.id.as_str()).collect();
        self.ports
            .sort_by_key(|port| order.iter().position(|id| *id == port.id));

        self.x = config.x;
        self.y = config.y;
        self.width = config.width;
        self.height = config.height;
        self.angle = config.angle;
        if self.tag.is_group() {
            self.is_collapsed = config.is_collapsed.or(self.is_collapsed);
            self.expand_width = config.expand_width.or(self.expand_width);
            self.expand_height = config.expand_height.or(self.expand_height);
        }
        Ok(diff)
    }

    /// State flagged default, else the first one
    pub fn default_state(&self) -> Option<&State> {
        self.element
            .states
            .iter()
            .find(|state| state.default)
            .or_else(|| self.element.states.first())
    }

    /// First state whose rule holds against the store
    pub fn evaluate_state(&self, store: &Map<String, Value>, parser: &ExpressionParser) -> Option<&State> {
        self.element.matching_state(store, parser)
    }

    /// Re-evaluate rules and switch the shown state. Returns the new state
    /// name when it changed.
    pub fn refresh_state(&mut self, store: &Map<String, Value>, parser: &ExpressionParser) -> Option<String> {
        let state = self.evaluate_state(store, parser)?;
        if state.src.is_none() || self.cur_state.as_deref() == Some(state.name.as_str()) {
            return None;
        }
        let name = state.name.clone();
        self.cur_state = Some(name.clone());
        Some(name)
    }

    /// Content of the shown state
    pub fn content(&self) -> Option<&str> {
        let name = self.cur_state.as_deref()?;
        self.element
            .states
            .iter()
            .find(|state| state.name == name)
            .and_then(|state| state.src.as_deref())
    }

    /// Declaration form with the given serialized children
    pub fn to_config(&self, children: Vec<MVertex>) -> MVertex {
        MVertex {
            element: self.element.to_config(),
            vertex_type: self.vertex_type.clone(),
            tag: self.tag,
            disabled: self.disabled,
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            angle: self.angle,
            ports: self.ports.iter().map(|port| port.to_config(self.tag)).collect(),
            parent_id: self.parent.clone(),
            children,
            is_collapsed: self.is_collapsed,
            expand_width: self.expand_width,
            expand_height: self.expand_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{PortEnergyType, PortTnodeIo};

    fn port(id: &str) -> MVertexPort {
        MVertexPort {
            id: id.into(),
            tnode_io: PortTnodeIo::Normal,
            energy_type: PortEnergyType::Hot,
            ..MVertexPort::default()
        }
    }

    fn vertex_config(ports: &[&str]) -> MVertex {
        let mut config = MVertex::new("v1", "boiler", VertexTag::Equipment);
        config.ports = ports.iter().map(|id| port(id)).collect();
        config
    }

    #[test]
    fn test_duplicate_ports_rejected() {
        let result = Vertex::new(&vertex_config(&["a", "a"]), None);
        assert!(matches!(result, Err(GraphError::DuplicatePort { port, .. }) if port == "a"));

        let mut vertex = Vertex::new(&vertex_config(&["a"]), None).unwrap();
        assert!(vertex.add_port(&port("a")).is_err());
        assert!(vertex.add_port(&port("b")).is_ok());
        assert_eq!(vertex.ports().len(), 2);
    }

    #[test]
    fn test_diff_ports() {
        let vertex = Vertex::new(&vertex_config(&["a", "b", "c"]), None).unwrap();
        let diff = diff_ports(vertex.ports(), &[port("c"), port("d"), port("a")]);
        let ids = |ports: &[MVertexPort]| ports.iter().map(|p| p.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&diff.added), vec!["d"]);
        assert_eq!(ids(&diff.updated), vec!["c", "a"]);
        assert_eq!(diff.removed, vec!["b".to_string()]);
    }

    #[test]
    fn test_update_applies_diff_in_declared_order() {
        let mut vertex = Vertex::new(&vertex_config(&["a", "b"]), None).unwrap();
        let mut config = vertex_config(&["c", "a"]);
        config.x = 30.0;
        config.element.name = "renamed".into();
        vertex.update(&config).unwrap();

        let ids: Vec<&str> = vertex.ports().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert_eq!(vertex.x, 30.0);
        assert_eq!(vertex.element.name, "renamed");
    }

    #[test]
    fn test_group_defaults() {
        let group = Vertex::new(&MVertex::new("g", "group", VertexTag::Station), None).unwrap();
        assert_eq!(group.is_collapsed, Some(false));
        assert_eq!(group.expand_width, Some(DEFAULT_EXPAND_SIZE));

        let plain = Vertex::new(&MVertex::new("p", "pipe", VertexTag::Pipe), None).unwrap();
        assert_eq!(plain.is_collapsed, None);
    }

    #[test]
    fn test_default_state_content() {
        let mut config = vertex_config(&[]);
        config.element.states = vec![
            State { name: "off".into(), src: Some("<off/>".into()), ..State::default() },
            State { name: "on".into(), src: Some("<on/>".into()), default: true, ..State::default() },
        ];
        let vertex = Vertex::new(&config, None).unwrap();
        assert_eq!(vertex.cur_state.as_deref(), Some("on"));
        assert_eq!(vertex.content(), Some("<on/>"));
    }
}

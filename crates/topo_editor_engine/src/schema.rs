// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persisted JSON shapes.
//!
//! These mirror the project file format and the option payloads of the
//! built-in commands. Keys are camelCase on the wire.

use crate::element::ElementId;
use crate::port::{PortEnergyType, PortTnodeIo};
use crate::vertex::VertexTag;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Point on the canvas
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

/// Grid pattern drawn behind the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GridType {
    /// No grid
    None,
    /// Dots
    Dot,
    /// Dots that keep their size when zooming
    FixedDot,
    /// Lines
    Mesh,
    /// Main and secondary lines
    DoubleMesh,
}

/// Style attributes shared by vertices and links
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementStyle {
    /// Fill color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    /// Fill opacity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
    /// Stroke color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    /// Stroke width
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    /// Stroke dash pattern length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_dasharray: Option<f64>,
    /// Stroke opacity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_opacity: Option<f64>,
    /// Text color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Text opacity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_opacity: Option<f64>,
    /// Font size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    /// Stacking order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i64>,
}

/// Named visual state of an element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    /// State name
    pub name: String,
    /// Boolean expression over the element's variables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    /// Used when no rule matches at load time
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub default: bool,
    /// Vertex content shown in this state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Link attributes applied in this state, keyed by attribute path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<IndexMap<String, Value>>,
}

/// Store location read by a variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyPath {
    /// Single store key
    Key(String),
    /// Hierarchy of keys; the last one is read
    Path(Vec<String>),
}

impl PropertyPath {
    /// Store key actually read
    pub fn leaf(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key.as_str()),
            Self::Path(path) => path.last().map(String::as_str),
        }
    }
}

/// Rule variable bound to a store key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    /// Name used inside rules
    pub key: String,
    /// Store key to read
    pub property: PropertyPath,
    /// Value when the store lacks the key
    #[serde(default)]
    pub default_value: Value,
}

/// Common element fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MElement {
    /// Element id, generated when empty
    #[serde(default)]
    pub id: ElementId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Style attributes
    #[serde(flatten)]
    pub style: ElementStyle,
    /// Visual states
    #[serde(default)]
    pub states: Vec<State>,
    /// Rule variables
    #[serde(default)]
    pub variables: Vec<Variable>,
}

/// Relative port position, each coordinate in `[0, 1]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortPosition {
    /// Horizontal fraction of the vertex width
    pub ref_x: f64,
    /// Vertical fraction of the vertex height
    pub ref_y: f64,
}

fn port_position<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PortPosition, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Value(PortPosition),
        Encoded(String),
        Missing(()),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Value(position) => Ok(position),
        Repr::Encoded(text) => serde_json::from_str(&text).map_err(serde::de::Error::custom),
        Repr::Missing(()) => Ok(PortPosition::default()),
    }
}

/// Port declaration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MVertexPort {
    /// Port id, unique within the vertex
    pub id: String,
    /// Topology node name
    #[serde(default)]
    pub tnode_name: String,
    /// Topology node code
    #[serde(default)]
    pub tnode_code: String,
    /// 0 for pipe and equipment vertices, 1 otherwise
    #[serde(rename = "virtual", default, skip_serializing_if = "Option::is_none")]
    pub is_virtual: Option<u8>,
    /// 1 when the port must be connected
    #[serde(default)]
    pub need_con: u8,
    /// Display label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Direction
    pub tnode_io: PortTnodeIo,
    /// Energy domain
    pub energy_type: PortEnergyType,
    /// Description
    #[serde(default)]
    pub descr: String,
    /// Relative position; also accepted as an encoded JSON string
    #[serde(default, deserialize_with = "port_position")]
    pub position: PortPosition,
}

/// Vertex declaration, children nested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MVertex {
    /// Shared element fields
    #[serde(flatten)]
    pub element: MElement,
    /// Component type
    #[serde(rename = "type")]
    pub vertex_type: String,
    /// Category
    pub tag: VertexTag,
    /// Interaction disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    /// Left edge
    #[serde(default)]
    pub x: f64,
    /// Top edge
    #[serde(default)]
    pub y: f64,
    /// Width
    #[serde(default)]
    pub width: f64,
    /// Height
    #[serde(default)]
    pub height: f64,
    /// Rotation in degrees
    #[serde(default)]
    pub angle: f64,
    /// Ports in order
    #[serde(default)]
    pub ports: Vec<MVertexPort>,
    /// Parent group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ElementId>,
    /// Nested vertices
    #[serde(default)]
    pub children: Vec<MVertex>,
    /// Group collapsed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_collapsed: Option<bool>,
    /// Group width when expanded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand_width: Option<f64>,
    /// Group height when expanded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand_height: Option<f64>,
}

impl MVertex {
    /// Minimal vertex declaration
    pub fn new(id: impl Into<ElementId>, vertex_type: impl Into<String>, tag: VertexTag) -> Self {
        Self {
            element: MElement {
                id: id.into(),
                ..MElement::default()
            },
            vertex_type: vertex_type.into(),
            tag,
            disabled: None,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            angle: 0.0,
            ports: Vec::new(),
            parent_id: None,
            children: Vec::new(),
            is_collapsed: None,
            expand_width: None,
            expand_height: None,
        }
    }

    /// Vertex id
    pub fn id(&self) -> &ElementId {
        &self.element.id
    }

    /// Ids of this vertex and all descendants, pre-order
    pub fn subtree_ids(&self) -> Vec<&ElementId> {
        let mut ids = vec![self.id()];
        for child in &self.children {
            ids.extend(child.subtree_ids());
        }
        ids
    }
}

/// Link endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MLinkPoint {
    /// Vertex id
    pub vertex: ElementId,
    /// Tag of the vertex, informational
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<VertexTag>,
    /// Port id
    pub port: String,
}

impl MLinkPoint {
    /// Endpoint without tag
    pub fn new(vertex: impl Into<ElementId>, port: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            tag: None,
            port: port.into(),
        }
    }
}

/// Link declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MLink {
    /// Shared element fields
    #[serde(flatten)]
    pub element: MElement,
    /// Start
    pub source: MLinkPoint,
    /// End
    pub target: MLinkPoint,
    /// Routing waypoints
    #[serde(default)]
    pub vertices: Vec<Position>,
    /// Flow animation runs backwards
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_reverse: Option<bool>,
    /// Flow animation enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_running: Option<bool>,
}

impl MLink {
    /// Minimal link declaration
    pub fn new(id: impl Into<ElementId>, source: MLinkPoint, target: MLinkPoint) -> Self {
        Self {
            element: MElement {
                id: id.into(),
                ..MElement::default()
            },
            source,
            target,
            vertices: Vec::new(),
            is_reverse: None,
            is_running: None,
        }
    }

    /// Link id
    pub fn id(&self) -> &ElementId {
        &self.element.id
    }
}

/// Either element kind, told apart by shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementConfig {
    /// Has `type` and `tag`
    Vertex(MVertex),
    /// Has `source` and `target`
    Link(MLink),
}

impl ElementConfig {
    /// Element id
    pub fn id(&self) -> &ElementId {
        match self {
            Self::Vertex(vertex) => vertex.id(),
            Self::Link(link) => link.id(),
        }
    }

    /// Mutable element id
    pub fn id_mut(&mut self) -> &mut ElementId {
        match self {
            Self::Vertex(vertex) => &mut vertex.element.id,
            Self::Link(link) => &mut link.element.id,
        }
    }
}

impl From<MVertex> for ElementConfig {
    fn from(vertex: MVertex) -> Self {
        Self::Vertex(vertex)
    }
}

impl From<MLink> for ElementConfig {
    fn from(link: MLink) -> Self {
        Self::Link(link)
    }
}

/// Canvas grid settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSettings {
    /// Grid pattern, `None` hides the grid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_type: Option<GridType>,
    /// Grid color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_color: Option<String>,
    /// Grid cell size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_size: Option<f64>,
}

/// Persisted project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MProject {
    /// Project id
    pub id: String,
    /// Project name
    #[serde(default)]
    pub name: String,
    /// Grid pattern
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_type: Option<GridType>,
    /// Grid cell size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_size: Option<f64>,
    /// Grid color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_color: Option<String>,
    /// Top-level vertices with nested children
    #[serde(default)]
    pub vertexes: Vec<MVertex>,
    /// Links
    #[serde(default)]
    pub links: Vec<MLink>,
    /// Values read by element rules
    #[serde(default)]
    pub store: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_port_position_forms() {
        let port: MVertexPort = serde_json::from_value(json!({
            "id": "p1",
            "tnodeIo": "Out",
            "energyType": "Electricity",
            "position": "{\"refX\":0.5,\"refY\":1}"
        }))
        .unwrap();
        assert_eq!(port.position, PortPosition { ref_x: 0.5, ref_y: 1.0 });

        let port: MVertexPort = serde_json::from_value(json!({
            "id": "p2",
            "tnodeIo": "In",
            "energyType": "Water"
        }))
        .unwrap();
        assert_eq!(port.position, PortPosition::default());
    }

    #[test]
    fn test_element_config_shape() {
        let vertex: ElementConfig = serde_json::from_value(json!({
            "id": "v1", "type": "breaker", "tag": "equipment", "fill": "#000"
        }))
        .unwrap();
        assert!(matches!(&vertex, ElementConfig::Vertex(v) if v.element.style.fill.as_deref() == Some("#000")));

        let link: ElementConfig = serde_json::from_value(json!({
            "id": "l1",
            "source": { "vertex": "a", "port": "p1" },
            "target": { "vertex": "b", "port": "p2" }
        }))
        .unwrap();
        assert!(matches!(link, ElementConfig::Link(_)));
    }

    #[test]
    fn test_property_path_leaf() {
        let single: PropertyPath = serde_json::from_value(json!("temp")).unwrap();
        let nested: PropertyPath = serde_json::from_value(json!(["site", "temp"])).unwrap();
        assert_eq!(single.leaf(), Some("temp"));
        assert_eq!(nested.leaf(), Some("temp"));
    }

    #[test]
    fn test_subtree_ids() {
        let mut root = MVertex::new("g", "group", VertexTag::System);
        let mut child = MVertex::new("c", "group", VertexTag::Unit);
        child.children.push(MVertex::new("leaf", "pump", VertexTag::Equipment));
        root.children.push(child);
        let ids: Vec<&str> = root.subtree_ids().into_iter().map(ElementId::as_str).collect();
        assert_eq!(ids, vec!["g", "c", "leaf"]);
    }
}

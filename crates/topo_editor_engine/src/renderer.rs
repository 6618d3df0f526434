// SPDX-License-Identifier: MIT OR Apache-2.0
//! Boundary toward the graph rendering layer.
//!
//! The model is the source of truth; a renderer mirrors it. Geometry the
//! engine writes must be visible through the getters, and changes made by
//! the user inside the renderer come back as [`RenderEvent`]s.

use crate::element::ElementId;
use crate::link::LinkPoint;
use crate::schema::{GridType, PortPosition, Position};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Width and height
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

/// Axis-aligned bounds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BBox {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

/// Node to draw for a vertex
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    /// Vertex id
    pub id: ElementId,
    /// Label
    pub label: String,
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
    /// Stacking order
    pub z_index: i64,
    /// Port ids and their relative positions
    pub ports: Vec<(String, PortPosition)>,
    /// Content markup of the shown state
    pub content: Option<String>,
}

/// Edge to draw for a link
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSpec {
    /// Link id
    pub id: ElementId,
    /// Start
    pub source: LinkPoint,
    /// End
    pub target: LinkPoint,
    /// Routing waypoints
    pub vertices: Vec<Position>,
    /// Stacking order
    pub z_index: i64,
}

/// Change originating in the renderer
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    /// Node moved
    Position {
        /// Vertex id
        id: ElementId,
        /// New left edge
        x: f64,
        /// New top edge
        y: f64,
    },
    /// Node resized
    Size {
        /// Vertex id
        id: ElementId,
        /// New width
        width: f64,
        /// New height
        height: f64,
    },
    /// Node rotated
    Angle {
        /// Vertex id
        id: ElementId,
        /// New angle in degrees
        angle: f64,
    },
    /// Node dropped into another group, or out of every group
    Parent {
        /// Vertex id
        id: ElementId,
        /// New parent, `None` for top level
        parent: Option<ElementId>,
    },
}

/// Operations the engine performs on the rendering layer
pub trait RenderLayer: Send {
    /// Draw a node
    fn add_node(&mut self, node: NodeSpec);
    /// Remove a node
    fn remove_node(&mut self, id: &ElementId);
    /// Draw an edge
    fn add_edge(&mut self, edge: EdgeSpec);
    /// Remove an edge
    fn remove_edge(&mut self, id: &ElementId);
    /// Set a node's size
    fn resize(&mut self, id: &ElementId, width: f64, height: f64);
    /// Move a node by an offset
    fn translate(&mut self, id: &ElementId, dx: f64, dy: f64);
    /// Rotate a node by a delta in degrees
    fn rotate(&mut self, id: &ElementId, delta: f64);
    /// Add a port to a node
    fn add_port(&mut self, id: &ElementId, port: &str, position: PortPosition);
    /// Remove a port from a node
    fn remove_port(&mut self, id: &ElementId, port: &str);
    /// Move a port of a node
    fn set_port_position(&mut self, id: &ElementId, port: &str, position: PortPosition);
    /// Set an attribute, `/`-separated path
    fn set_attr_by_path(&mut self, id: &ElementId, path: &str, value: Value);
    /// Attribute previously set by path
    fn get_attr_by_path(&self, id: &ElementId, path: &str) -> Option<Value>;
    /// Set stacking order
    fn set_z_index(&mut self, id: &ElementId, z_index: i64);
    /// Whether a node is drawn
    fn has_node(&self, id: &ElementId) -> bool;
    /// Whether an edge is drawn
    fn has_edge(&self, id: &ElementId) -> bool;
    /// Node position
    fn get_position(&self, id: &ElementId) -> Option<Position>;
    /// Node size
    fn get_size(&self, id: &ElementId) -> Option<Size>;
    /// Node angle
    fn get_angle(&self, id: &ElementId) -> Option<f64>;
    /// Node bounds
    fn get_bbox(&self, id: &ElementId) -> Option<BBox>;
    /// Nest a node inside a group node
    fn add_child(&mut self, parent: &ElementId, child: &ElementId);
    /// Remove everything
    fn clear(&mut self);
    /// Show the grid
    fn show_grid(&mut self);
    /// Hide the grid
    fn hide_grid(&mut self);
    /// Configure the grid pattern
    fn draw_grid(&mut self, grid_type: GridType, color: &str, size: f64);
    /// Drain renderer-originated changes
    fn take_events(&mut self) -> Vec<RenderEvent>;
}

/// Node state held by [`MemoryRenderer`]
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedNode {
    /// Spec the node was created from
    pub spec: NodeSpec,
    /// Attributes set by path
    pub attrs: IndexMap<String, Value>,
    /// Enclosing group
    pub parent: Option<ElementId>,
}

/// Edge state held by [`MemoryRenderer`]
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEdge {
    /// Spec the edge was created from
    pub spec: EdgeSpec,
    /// Attributes set by path
    pub attrs: IndexMap<String, Value>,
}

/// Grid state held by [`MemoryRenderer`]
#[derive(Debug, Clone, PartialEq)]
pub struct GridState {
    /// Grid shown
    pub visible: bool,
    /// Pattern
    pub grid_type: Option<GridType>,
    /// Line color
    pub color: String,
    /// Cell size
    pub size: f64,
}

impl Default for GridState {
    fn default() -> Self {
        Self {
            visible: false,
            grid_type: None,
            color: "#323232".to_string(),
            size: 6.0,
        }
    }
}

/// In-process renderer used headless and in tests
#[derive(Debug, Default)]
pub struct MemoryRenderer {
    nodes: IndexMap<ElementId, RenderedNode>,
    edges: IndexMap<ElementId, RenderedEdge>,
    grid: GridState,
    events: Vec<RenderEvent>,
}

impl MemoryRenderer {
    /// Empty renderer
    pub fn new() -> Self {
        Self::default()
    }

    /// Node by id
    pub fn node(&self, id: &ElementId) -> Option<&RenderedNode> {
        self.nodes.get(id)
    }

    /// Edge by id
    pub fn edge(&self, id: &ElementId) -> Option<&RenderedEdge> {
        self.edges.get(id)
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Grid state
    pub fn grid(&self) -> &GridState {
        &self.grid
    }

    /// Move a node as a user drag would
    pub fn drag(&mut self, id: &ElementId, x: f64, y: f64) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.spec.x = x;
            node.spec.y = y;
            self.events.push(RenderEvent::Position { id: id.clone(), x, y });
        }
    }

    /// Resize a node as a user would
    pub fn drag_resize(&mut self, id: &ElementId, width: f64, height: f64) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.spec.width = width;
            node.spec.height = height;
            self.events.push(RenderEvent::Size { id: id.clone(), width, height });
        }
    }

    /// Rotate a node as a user would
    pub fn drag_rotate(&mut self, id: &ElementId, angle: f64) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.spec.angle = angle;
            self.events.push(RenderEvent::Angle { id: id.clone(), angle });
        }
    }

    /// Drop a node into a group, or out of every group
    pub fn drop_into(&mut self, id: &ElementId, parent: Option<ElementId>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = parent.clone();
            self.events.push(RenderEvent::Parent { id: id.clone(), parent });
        }
    }
}

impl RenderLayer for MemoryRenderer {
    fn add_node(&mut self, node: NodeSpec) {
        self.nodes.insert(
            node.id.clone(),
            RenderedNode {
                spec: node,
                attrs: IndexMap::new(),
                parent: None,
            },
        );
    }

    fn remove_node(&mut self, id: &ElementId) {
        self.nodes.shift_remove(id);
    }

    fn add_edge(&mut self, edge: EdgeSpec) {
        self.edges.insert(
            edge.id.clone(),
            RenderedEdge {
                spec: edge,
                attrs: IndexMap::new(),
            },
        );
    }

    fn remove_edge(&mut self, id: &ElementId) {
        self.edges.shift_remove(id);
    }

    fn resize(&mut self, id: &ElementId, width: f64, height: f64) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.spec.width = width;
            node.spec.height = height;
        }
    }

    fn translate(&mut self, id: &ElementId, dx: f64, dy: f64) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.spec.x += dx;
            node.spec.y += dy;
        }
    }

    fn rotate(&mut self, id: &ElementId, delta: f64) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.spec.angle += delta;
        }
    }

    fn add_port(&mut self, id: &ElementId, port: &str, position: PortPosition) {
        if let Some(node) = self.nodes.get_mut(id) {
            if !node.spec.ports.iter().any(|(existing, _)| existing == port) {
                node.spec.ports.push((port.to_string(), position));
            }
        }
    }

    fn remove_port(&mut self, id: &ElementId, port: &str) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.spec.ports.retain(|(existing, _)| existing != port);
        }
    }

    fn set_port_position(&mut self, id: &ElementId, port: &str, position: PortPosition) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if let Some((_, current)) = node.spec.ports.iter_mut().find(|(existing, _)| existing == port) {
            *current = position;
        }
    }

    fn set_attr_by_path(&mut self, id: &ElementId, path: &str, value: Value) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.attrs.insert(path.to_string(), value);
        } else if let Some(edge) = self.edges.get_mut(id) {
            edge.attrs.insert(path.to_string(), value);
        }
    }

    fn get_attr_by_path(&self, id: &ElementId, path: &str) -> Option<Value> {
        self.nodes
            .get(id)
            .map(|node| &node.attrs)
            .or_else(|| self.edges.get(id).map(|edge| &edge.attrs))
            .and_then(|attrs| attrs.get(path).cloned())
    }

    fn set_z_index(&mut self, id: &ElementId, z_index: i64) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.spec.z_index = z_index;
        } else if let Some(edge) = self.edges.get_mut(id) {
            edge.spec.z_index = z_index;
        }
    }

    fn has_node(&self, id: &ElementId) -> bool {
        self.nodes.contains_key(id)
    }

    fn has_edge(&self, id: &ElementId) -> bool {
        self.edges.contains_key(id)
    }

    fn get_position(&self, id: &ElementId) -> Option<Position> {
        self.nodes.get(id).map(|node| Position { x: node.spec.x, y: node.spec.y })
    }

    fn get_size(&self, id: &ElementId) -> Option<Size> {
        self.nodes.get(id).map(|node| Size {
            width: node.spec.width,
            height: node.spec.height,
        })
    }

    fn get_angle(&self, id: &ElementId) -> Option<f64> {
        self.nodes.get(id).map(|node| node.spec.angle)
    }

    fn get_bbox(&self, id: &ElementId) -> Option<BBox> {
        self.nodes.get(id).map(|node| BBox {
            x: node.spec.x,
            y: node.spec.y,
            width: node.spec.width,
            height: node.spec.height,
        })
    }

    fn add_child(&mut self, parent: &ElementId, child: &ElementId) {
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent.clone());
        }
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.events.clear();
    }

    fn show_grid(&mut self) {
        self.grid.visible = true;
    }

    fn hide_grid(&mut self) {
        self.grid.visible = false;
    }

    fn draw_grid(&mut self, grid_type: GridType, color: &str, size: f64) {
        self.grid.grid_type = Some(grid_type);
        self.grid.color = color.to_string();
        self.grid.size = size;
    }

    fn take_events(&mut self) -> Vec<RenderEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Renderer shared between the engine and the code feeding user input
pub type SharedRenderer<R> = Arc<Mutex<R>>;

impl<R: RenderLayer> RenderLayer for Arc<Mutex<R>> {
    fn add_node(&mut self, node: NodeSpec) {
        self.lock().add_node(node);
    }
    fn remove_node(&mut self, id: &ElementId) {
        self.lock().remove_node(id);
    }
    fn add_edge(&mut self, edge: EdgeSpec) {
        self.lock().add_edge(edge);
    }
    fn remove_edge(&mut self, id: &ElementId) {
        self.lock().remove_edge(id);
    }
    fn resize(&mut self, id: &ElementId, width: f64, height: f64) {
        self.lock().resize(id, width, height);
    }
    fn translate(&mut self, id: &ElementId, dx: f64, dy: f64) {
        self.lock().translate(id, dx, dy);
    }
    fn rotate(&mut self, id: &ElementId, delta: f64) {
        self.lock().rotate(id, delta);
    }
    fn add_port(&mut self, id: &ElementId, port: &str, position: PortPosition) {
        self.lock().add_port(id, port, position);
    }
    fn remove_port(&mut self, id: &ElementId, port: &str) {
        self.lock().remove_port(id, port);
    }
    fn set_port_position(&mut self, id: &ElementId, port: &str, position: PortPosition) {
        self.lock().set_port_position(id, port, position);
    }
    fn set_attr_by_path(&mut self, id: &ElementId, path: &str, value: Value) {
        self.lock().set_attr_by_path(id, path, value);
    }
    fn get_attr_by_path(&self, id: &ElementId, path: &str) -> Option<Value> {
        self.lock().get_attr_by_path(id, path)
    }
    fn set_z_index(&mut self, id: &ElementId, z_index: i64) {
        self.lock().set_z_index(id, z_index);
    }
    fn has_node(&self, id: &ElementId) -> bool {
        self.lock().has_node(id)
    }
    fn has_edge(&self, id: &ElementId) -> bool {
        self.lock().has_edge(id)
    }
    fn get_position(&self, id: &ElementId) -> Option<Position> {
        self.lock().get_position(id)
    }
    fn get_size(&self, id: &ElementId) -> Option<Size> {
        self.lock().get_size(id)
    }
    fn get_angle(&self, id: &ElementId) -> Option<f64> {
        self.lock().get_angle(id)
    }
    fn get_bbox(&self, id: &ElementId) -> Option<BBox> {
        self.lock().get_bbox(id)
    }
    fn add_child(&mut self, parent: &ElementId, child: &ElementId) {
        self.lock().add_child(parent, child);
    }
    fn clear(&mut self) {
        self.lock().clear();
    }
    fn show_grid(&mut self) {
        self.lock().show_grid();
    }
    fn hide_grid(&mut self) {
        self.lock().hide_grid();
    }
    fn draw_grid(&mut self, grid_type: GridType, color: &str, size: f64) {
        self.lock().draw_grid(grid_type, color, size);
    }
    fn take_events(&mut self) -> Vec<RenderEvent> {
        self.lock().take_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: &str) -> NodeSpec {
        NodeSpec {
            id: id.into(),
            label: id.to_string(),
            x: 10.0,
            y: 20.0,
            width: 100.0,
            height: 50.0,
            angle: 0.0,
            z_index: 1,
            ports: Vec::new(),
            content: None,
        }
    }

    #[test]
    fn test_geometry_mirrors_writes() {
        let mut renderer = MemoryRenderer::new();
        let id = ElementId::from("n1");
        renderer.add_node(spec("n1"));
        renderer.translate(&id, 5.0, -5.0);
        renderer.resize(&id, 80.0, 40.0);
        renderer.rotate(&id, 90.0);

        assert_eq!(renderer.get_position(&id), Some(Position { x: 15.0, y: 15.0 }));
        assert_eq!(renderer.get_size(&id), Some(Size { width: 80.0, height: 40.0 }));
        assert_eq!(renderer.get_angle(&id), Some(90.0));
        assert!(renderer.take_events().is_empty());
    }

    #[test]
    fn test_user_changes_become_events() {
        let mut renderer = MemoryRenderer::new();
        let id = ElementId::from("n1");
        renderer.add_node(spec("n1"));
        renderer.drag(&id, 1.0, 2.0);
        renderer.drop_into(&id, Some("g".into()));

        let events = renderer.take_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], RenderEvent::Position { id: id.clone(), x: 1.0, y: 2.0 });
        assert!(renderer.take_events().is_empty());
    }

    #[test]
    fn test_port_operations() {
        let mut renderer = MemoryRenderer::new();
        let id = ElementId::from("n1");
        renderer.add_node(spec("n1"));
        let bottom = PortPosition { ref_x: 0.5, ref_y: 1.0 };

        renderer.add_port(&id, "p", PortPosition::default());
        renderer.add_port(&id, "q", PortPosition::default());
        renderer.add_port(&id, "q", bottom);
        renderer.set_port_position(&id, "p", bottom);
        renderer.remove_port(&id, "q");

        let ports = &renderer.node(&id).unwrap().spec.ports;
        assert_eq!(ports, &vec![("p".to_string(), bottom)]);
    }
}

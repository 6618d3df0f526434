// SPDX-License-Identifier: MIT OR Apache-2.0
//! The project: single owner of every vertex and link.
//!
//! Elements live in one flat map keyed by id. Vertices, ports and links
//! refer to each other by id only. Every structural operation either
//! succeeds completely or returns an error with the graph unchanged.

use crate::element::{Element, ElementId};
use crate::error::GraphError;
use crate::link::{Link, LinkEnd, LinkPoint};
use crate::renderer::RenderEvent;
use crate::schema::{GridType, MLink, MProject, MVertex};
use crate::validation::{check_link, LinkRejection};
use crate::vertex::{diff_ports, PortDiff, Vertex};
use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};
use std::borrow::Cow;
use topo_editor_expression::ExpressionParser;
use topo_editor_utils::{EventArgs, EventBus, ListenerId};

/// Variables bound to measurement points are not store properties
const MEASUREMENT_POINT_MARKER: &str = "_MP0000000";

/// Project lifecycle events
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectEvent {
    /// Project was (re)initialized
    Reset {
        /// Project id
        id: String,
        /// Project name
        name: String,
    },
    /// Project was initialized without vertices
    VertexCreated,
    /// Vertex registered
    VertexAdded {
        /// Vertex id
        vertex: ElementId,
        /// Parent group
        parent: Option<ElementId>,
    },
    /// Vertex removed
    VertexRemoved {
        /// Vertex as it was
        vertex: MVertex,
    },
    /// Vertex changed in place
    VertexUpdated {
        /// Before
        old_vertex: MVertex,
        /// After
        new_vertex: MVertex,
    },
    /// Link registered
    LinkAdded {
        /// Link id
        link: ElementId,
    },
    /// Link removed
    LinkRemoved {
        /// Link as it was
        link: MLink,
    },
    /// Link changed in place
    LinkUpdated {
        /// Before
        old_link: MLink,
        /// After
        new_link: MLink,
    },
}

impl EventArgs for ProjectEvent {
    fn event_name(&self) -> &str {
        match self {
            Self::Reset { .. } => "project:reset",
            Self::VertexCreated => "project:vertex:created",
            Self::VertexAdded { .. } => "project:vertex:added",
            Self::VertexRemoved { .. } => "project:vertex:removed",
            Self::VertexUpdated { .. } => "project:vertex:updated",
            Self::LinkAdded { .. } => "project:link:added",
            Self::LinkRemoved { .. } => "project:link:removed",
            Self::LinkUpdated { .. } => "project:link:updated",
        }
    }
}

/// Vertex and link arena with project metadata
#[derive(Debug, Default)]
pub struct Project {
    /// Project id
    pub id: String,
    /// Project name
    pub name: String,
    /// Grid pattern
    pub grid_type: Option<GridType>,
    /// Grid cell size
    pub grid_size: Option<f64>,
    /// Grid color
    pub grid_color: Option<String>,
    vertexes: Vec<ElementId>,
    links: Vec<ElementId>,
    elements: IndexMap<ElementId, Element>,
    store: Map<String, Value>,
    parser: ExpressionParser,
    events: EventBus<ProjectEvent>,
}

impl Project {
    /// Empty project
    pub fn new() -> Self {
        Self::default()
    }

    /// Project loaded from a declaration
    pub fn from_config(config: &MProject) -> Result<Self, GraphError> {
        let mut project = Self::new();
        project.load(config)?;
        Ok(project)
    }

    /// Subscribe to a project event by name
    pub fn on(&mut self, name: &str, listener: impl Fn(&ProjectEvent) + Send + Sync + 'static) -> ListenerId {
        self.events.on(name, listener)
    }

    /// Unsubscribe a listener
    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    /// Drop every listener
    pub fn remove_all_listeners(&mut self) {
        self.events.remove_all_listeners();
    }

    fn emit(&mut self, event: ProjectEvent) {
        tracing::trace!(event = event.event_name(), "Project event");
        self.events.emit(&event);
    }

    /// Parser used for state rules
    pub fn parser(&self) -> &ExpressionParser {
        &self.parser
    }

    /// Replace the contents with a declaration: vertices first, then links.
    /// A declaration that fails to load leaves the project untouched.
    pub fn init(&mut self, config: &MProject) -> Result<(), GraphError> {
        Self::new().load(config)?;
        self.load(config)
    }

    fn load(&mut self, config: &MProject) -> Result<(), GraphError> {
        self.clear();
        if config.vertexes.is_empty() {
            self.emit(ProjectEvent::VertexCreated);
        }
        self.id = config.id.clone();
        self.name = config.name.clone();
        self.grid_type = config.grid_type;
        self.grid_size = config.grid_size;
        self.grid_color = config.grid_color.clone();
        self.store = config.store.clone();

        for vertex in &config.vertexes {
            self.add_vertex(vertex, None)?;
        }
        for link in &config.links {
            self.add_link(link)?;
        }
        tracing::debug!(
            id = %self.id,
            vertexes = self.vertexes.len(),
            links = self.links.len(),
            "Project initialized"
        );
        self.emit(ProjectEvent::Reset {
            id: self.id.clone(),
            name: self.name.clone(),
        });
        Ok(())
    }

    /// Empty every collection and the store
    pub fn clear(&mut self) {
        self.elements.clear();
        self.vertexes.clear();
        self.links.clear();
        self.store.clear();
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Element by id
    pub fn get_element(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    /// Whether the id is taken
    pub fn contains(&self, id: &ElementId) -> bool {
        self.elements.contains_key(id)
    }

    /// Number of elements, vertices and links
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Vertex by id
    pub fn get_vertex(&self, id: &ElementId) -> Option<&Vertex> {
        self.elements.get(id).and_then(Element::as_vertex)
    }

    fn vertex_mut(&mut self, id: &ElementId) -> Option<&mut Vertex> {
        match self.elements.get_mut(id) {
            Some(Element::Vertex(vertex)) => Some(vertex),
            _ => None,
        }
    }

    /// Link by id
    pub fn get_link(&self, id: &ElementId) -> Option<&Link> {
        self.elements.get(id).and_then(Element::as_link)
    }

    fn link_mut(&mut self, id: &ElementId) -> Option<&mut Link> {
        match self.elements.get_mut(id) {
            Some(Element::Link(link)) => Some(link),
            _ => None,
        }
    }

    /// Whether a link with this id is registered
    pub fn has_link(&self, id: &ElementId) -> bool {
        self.links.contains(id)
    }

    /// Top-level vertex ids in order
    pub fn vertexes(&self) -> &[ElementId] {
        &self.vertexes
    }

    /// Link ids in order
    pub fn links(&self) -> &[ElementId] {
        &self.links
    }

    /// Every vertex at any depth
    pub fn all_vertexes(&self) -> impl Iterator<Item = &Vertex> {
        self.elements.values().filter_map(Element::as_vertex)
    }

    /// Every link
    pub fn all_links(&self) -> impl Iterator<Item = &Link> {
        self.elements.values().filter_map(Element::as_link)
    }

    /// Values read by state rules
    pub fn store(&self) -> &Map<String, Value> {
        &self.store
    }

    // ------------------------------------------------------------------
    // Vertices
    // ------------------------------------------------------------------

    fn build_subtree(config: &MVertex, parent: Option<ElementId>, out: &mut Vec<Vertex>) -> Result<(), GraphError> {
        out.push(Vertex::new(config, parent)?);
        for child in &config.children {
            Self::build_subtree(child, Some(config.id().clone()), out)?;
        }
        Ok(())
    }

    /// Register a vertex and its nested children.
    ///
    /// The parent comes from `parent` or else `config.parent_id`. Children
    /// are registered before their own children, and one added event per
    /// vertex follows once the whole subtree is in place.
    pub fn add_vertex(&mut self, config: &MVertex, parent: Option<&ElementId>) -> Result<ElementId, GraphError> {
        let parent = parent.cloned().or_else(|| config.parent_id.clone());
        if let Some(parent) = &parent {
            if self.get_vertex(parent).is_none() {
                return Err(GraphError::VertexNotExist(parent.clone()));
            }
        }

        let mut seen = IndexSet::new();
        for id in config.subtree_ids() {
            if self.elements.contains_key(id) || !seen.insert(id) {
                return Err(GraphError::VertexAlreadyExist(id.clone()));
            }
        }

        let mut built = Vec::new();
        Self::build_subtree(config, parent, &mut built)?;

        let mut added = Vec::with_capacity(built.len());
        for vertex in built {
            let id = vertex.id().clone();
            match vertex.parent.clone() {
                Some(parent) => {
                    if let Some(parent) = self.vertex_mut(&parent) {
                        parent.children.push(id.clone());
                    }
                }
                None => self.vertexes.push(id.clone()),
            }
            added.push((id.clone(), vertex.parent.clone()));
            self.elements.insert(id, Element::Vertex(vertex));
        }

        for (vertex, parent) in added {
            tracing::debug!(vertex = %vertex, "Vertex added");
            self.emit(ProjectEvent::VertexAdded { vertex, parent });
        }
        Ok(config.id().clone())
    }

    /// Remove a vertex, its links and its children. `None` when the id is
    /// not a vertex.
    pub fn remove_vertex(&mut self, id: &ElementId) -> Option<Vertex> {
        let snapshot = self.vertex_config(id)?;

        for link in self.get_vertex_relations(id) {
            self.remove_link(&link);
        }
        let children = self.get_vertex(id)?.children.clone();
        for child in &children {
            self.remove_vertex(child);
        }

        let Some(Element::Vertex(vertex)) = self.elements.shift_remove(id) else {
            return None;
        };
        match &vertex.parent {
            Some(parent) => {
                if let Some(parent) = self.vertex_mut(parent) {
                    parent.children.retain(|child| child != id);
                }
            }
            None => self.vertexes.retain(|top| top != id),
        }

        tracing::debug!(vertex = %id, "Vertex removed");
        self.emit(ProjectEvent::VertexRemoved { vertex: snapshot });
        Some(vertex)
    }

    /// Update a vertex in place. Links on ports that disappear are removed.
    /// `Ok(None)` when the vertex does not exist.
    pub fn update_vertex(&mut self, config: &MVertex) -> Result<Option<PortDiff>, GraphError> {
        let id = config.id().clone();
        let Some(old_vertex) = self.vertex_config(&id) else {
            return Ok(None);
        };
        let removed = match self.get_vertex(&id) {
            Some(vertex) => {
                // Validate up front so a bad port list changes nothing
                Vertex::new(config, None)?;
                diff_ports(vertex.ports(), &config.ports).removed
            }
            None => return Ok(None),
        };

        for port in removed {
            self.remove_link_by_point(&LinkPoint::new(id.clone(), port));
        }

        let diff = match self.elements.get_mut(&id) {
            Some(Element::Vertex(vertex)) => {
                let diff = vertex.update(config)?;
                vertex.refresh_state(&self.store, &self.parser);
                diff
            }
            _ => return Ok(None),
        };

        if let Some(new_vertex) = self.vertex_config(&id) {
            self.emit(ProjectEvent::VertexUpdated { old_vertex, new_vertex });
        }
        Ok(Some(diff))
    }

    /// Links attached to any port of the vertex, or naming it as an endpoint
    pub fn get_vertex_relations(&self, id: &ElementId) -> Vec<ElementId> {
        let Some(vertex) = self.get_vertex(id) else {
            return Vec::new();
        };
        let mut relations: IndexSet<ElementId> = vertex.linked().into_iter().collect();
        for link in self.all_links() {
            if link.source.vertex == *id || link.target.vertex == *id {
                relations.insert(link.id().clone());
            }
        }
        relations.into_iter().collect()
    }

    /// Vertices one link away
    pub fn neighbors(&self, id: &ElementId) -> Result<Vec<ElementId>, GraphError> {
        if self.get_vertex(id).is_none() {
            return Err(GraphError::VertexNotExist(id.clone()));
        }
        let mut found = IndexSet::new();
        for link_id in self.get_vertex_relations(id) {
            if let Some(link) = self.get_link(&link_id) {
                found.insert(link.opposite(id)?.vertex.clone());
            }
        }
        Ok(found.into_iter().collect())
    }

    // ------------------------------------------------------------------
    // Links
    // ------------------------------------------------------------------

    fn reconnecting(&self, link: &ElementId) -> Option<LinkEnd> {
        self.get_link(link).and_then(|link| link.reconnecting)
    }

    /// Resolve and validate endpoints. `ignore` is a link treated as absent,
    /// used when re-validating a link against the graph without itself.
    fn check_endpoints(
        &self,
        source: &LinkPoint,
        target: &LinkPoint,
        ignore: Option<&ElementId>,
    ) -> Result<(), GraphError> {
        let resolve = |point: &LinkPoint| -> Result<Cow<'_, Vertex>, GraphError> {
            let vertex = self
                .get_vertex(&point.vertex)
                .ok_or_else(|| GraphError::VertexNotExist(point.vertex.clone()))?;
            if !vertex.has_port(&point.port) {
                return Err(GraphError::PortNotExist {
                    vertex: point.vertex.clone(),
                    port: point.port.clone(),
                });
            }
            let Some(ignore) = ignore else {
                return Ok(Cow::Borrowed(vertex));
            };
            let mut vertex = vertex.clone();
            let ports: Vec<String> = vertex.ports().iter().map(|p| p.id.clone()).collect();
            for port in ports {
                if let Some(port) = vertex.port_mut(&port) {
                    port.release(ignore);
                }
            }
            Ok(Cow::Owned(vertex))
        };

        let source_vertex = resolve(source)?;
        let target_vertex = resolve(target)?;
        check_link(
            &source_vertex,
            &source.port,
            &target_vertex,
            &target.port,
            |link| self.reconnecting(link),
        )
        .and_then(|()| {
            // Committed links keep ports exclusive; only a link being
            // reconnected may hand its port over
            let occupied = [
                source_vertex.port(&source.port),
                target_vertex.port(&target.port),
            ]
            .into_iter()
            .flatten()
            .filter_map(|port| port.link())
            .any(|link| self.reconnecting(link).is_none());
            if occupied {
                Err(LinkRejection::PortOccupied)
            } else {
                Ok(())
            }
        })
        .map_err(|reason| GraphError::IllegalLink {
            source_vertex: source.vertex.clone(),
            source_port: source.port.clone(),
            target_vertex: target.vertex.clone(),
            target_port: target.port.clone(),
            reason,
        })
    }

    /// Whether the two ports may be linked in the current graph
    pub fn validate_link(
        &self,
        source_vertex: &ElementId,
        source_port: &str,
        target_vertex: &ElementId,
        target_port: &str,
    ) -> bool {
        self.check_link_points(
            &LinkPoint::new(source_vertex.clone(), source_port),
            &LinkPoint::new(target_vertex.clone(), target_port),
        )
        .is_ok()
    }

    /// Like [`Self::validate_link`], reporting why the link is refused
    pub fn check_link_points(&self, source: &LinkPoint, target: &LinkPoint) -> Result<(), GraphError> {
        self.check_endpoints(source, target, None)
    }

    fn attach(&mut self, id: &ElementId, source: &LinkPoint, target: &LinkPoint) {
        for point in [source, target] {
            if let Some(port) = self.vertex_mut(&point.vertex).and_then(|v| v.port_mut(&point.port)) {
                port.set_link(id.clone());
            }
        }
        if let Some(vertex) = self.vertex_mut(&source.vertex) {
            vertex
                .out_degrees
                .entry(target.vertex.clone())
                .or_default()
                .push(id.clone());
        }
        if let Some(vertex) = self.vertex_mut(&target.vertex) {
            if !vertex.in_degrees.contains(&source.vertex) {
                vertex.in_degrees.push(source.vertex.clone());
            }
        }
    }

    fn detach(&mut self, id: &ElementId, source: &LinkPoint, target: &LinkPoint) {
        for point in [source, target] {
            if let Some(port) = self.vertex_mut(&point.vertex).and_then(|v| v.port_mut(&point.port)) {
                port.release(id);
            }
        }
        let mut still_linked = false;
        if let Some(vertex) = self.vertex_mut(&source.vertex) {
            if let Some(links) = vertex.out_degrees.get_mut(&target.vertex) {
                links.retain(|link| link != id);
                still_linked = !links.is_empty();
                if !still_linked {
                    vertex.out_degrees.shift_remove(&target.vertex);
                }
            }
        }
        if !still_linked {
            if let Some(vertex) = self.vertex_mut(&target.vertex) {
                vertex.in_degrees.retain(|v| *v != source.vertex);
            }
        }
    }

    /// Register a link. Endpoints are resolved and validated first; only a
    /// valid link touches the ports.
    pub fn add_link(&mut self, config: &MLink) -> Result<ElementId, GraphError> {
        let source = LinkPoint::from(&config.source);
        let target = LinkPoint::from(&config.target);
        self.check_endpoints(&source, &target, None)?;

        let id = config.id().clone();
        if self.elements.contains_key(&id) {
            return Err(GraphError::VertexAlreadyExist(id));
        }

        let link = Link::new(config);
        self.attach(&id, &source, &target);
        self.elements.insert(id.clone(), Element::Link(link));
        self.links.push(id.clone());

        tracing::debug!(link = %id, source = %source.vertex, target = %target.vertex, "Link added");
        self.emit(ProjectEvent::LinkAdded { link: id.clone() });
        Ok(id)
    }

    /// Update a link. New endpoints are validated against the graph without
    /// this link; on failure nothing changes. `Ok(false)` when absent.
    pub fn update_link(&mut self, config: &MLink) -> Result<bool, GraphError> {
        let id = config.id().clone();
        let Some(old_link) = self.link_config(&id) else {
            return Ok(false);
        };
        let source = LinkPoint::from(&config.source);
        let target = LinkPoint::from(&config.target);
        self.check_endpoints(&source, &target, Some(&id))?;

        let (old_source, old_target) = match self.get_link(&id) {
            Some(link) => (link.source.clone(), link.target.clone()),
            None => return Ok(false),
        };
        self.detach(&id, &old_source, &old_target);
        if let Some(link) = self.link_mut(&id) {
            link.update(config);
            link.source = source.clone();
            link.target = target.clone();
        }
        self.attach(&id, &source, &target);

        if let Some(new_link) = self.link_config(&id) {
            self.emit(ProjectEvent::LinkUpdated { old_link, new_link });
        }
        Ok(true)
    }

    /// Remove a link and release its ports
    pub fn remove_link(&mut self, id: &ElementId) -> Option<Link> {
        let index = self.links.iter().position(|link| link == id)?;
        let snapshot = self.link_config(id)?;
        let (source, target) = {
            let link = self.get_link(id)?;
            (link.source.clone(), link.target.clone())
        };

        self.detach(id, &source, &target);
        self.links.remove(index);
        let Some(Element::Link(link)) = self.elements.shift_remove(id) else {
            return None;
        };

        tracing::debug!(link = %id, "Link removed");
        self.emit(ProjectEvent::LinkRemoved { link: snapshot });
        Some(link)
    }

    /// Remove every link whose source or target is exactly this vertex+port
    pub fn remove_link_by_point(&mut self, point: &LinkPoint) -> Vec<Link> {
        let matching: Vec<ElementId> = self
            .links
            .iter()
            .filter(|id| self.get_link(id).is_some_and(|link| link.touches(point)))
            .cloned()
            .collect();
        matching.iter().filter_map(|id| self.remove_link(id)).collect()
    }

    /// Mark a link as having one end dragged in the renderer
    pub fn set_reconnecting(&mut self, id: &ElementId, end: Option<LinkEnd>) -> bool {
        match self.link_mut(id) {
            Some(link) => {
                link.reconnecting = end;
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Store and states
    // ------------------------------------------------------------------

    /// Replace the store and re-evaluate every element's state. Returns the
    /// elements whose shown state changed.
    pub fn set_store(&mut self, store: Map<String, Value>) -> Vec<ElementId> {
        self.store = store;
        let mut changed = Vec::new();
        for (id, element) in &mut self.elements {
            let switched = match element {
                Element::Vertex(vertex) => vertex.refresh_state(&self.store, &self.parser).is_some(),
                Element::Link(link) => link.refresh_state(&self.store, &self.parser).is_some(),
            };
            if switched {
                changed.push(id.clone());
            }
        }
        changed
    }

    /// Distinct store keys read by any element's variables
    pub fn watch_properties(&self) -> Vec<String> {
        let mut keys = IndexSet::new();
        for element in self.elements.values() {
            for variable in &element.base().variables {
                match variable.property.leaf() {
                    Some(leaf) if !leaf.is_empty() && !leaf.contains(MEASUREMENT_POINT_MARKER) => {
                        keys.insert(leaf.to_string());
                    }
                    _ => {}
                }
            }
        }
        keys.into_iter().collect()
    }

    /// Highest z-index in use, at least 1
    pub fn front_z_index(&self) -> i64 {
        self.elements
            .values()
            .map(|element| element.base().z_index())
            .fold(1, i64::max)
    }

    // ------------------------------------------------------------------
    // Renderer feedback
    // ------------------------------------------------------------------

    fn is_descendant(&self, id: &ElementId, ancestor: &ElementId) -> bool {
        let mut current = self.get_vertex(id).and_then(|v| v.parent.clone());
        while let Some(parent) = current {
            if parent == *ancestor {
                return true;
            }
            current = self.get_vertex(&parent).and_then(|v| v.parent.clone());
        }
        false
    }

    /// Pull a renderer-originated change into the model. Returns false when
    /// the event names no known vertex.
    pub fn apply_render_event(&mut self, event: &RenderEvent) -> bool {
        match event {
            RenderEvent::Position { id, x, y } => self.vertex_mut(id).map(|v| {
                v.x = *x;
                v.y = *y;
            }),
            RenderEvent::Size { id, width, height } => self.vertex_mut(id).map(|v| {
                v.width = *width;
                v.height = *height;
            }),
            RenderEvent::Angle { id, angle } => self.vertex_mut(id).map(|v| v.angle = *angle),
            RenderEvent::Parent { id, parent } => self.reparent(id, parent.as_ref()),
        }
        .is_some()
    }

    fn reparent(&mut self, id: &ElementId, parent: Option<&ElementId>) -> Option<()> {
        let previous = self.get_vertex(id)?.parent.clone();
        match &previous {
            Some(old) => {
                if let Some(old) = self.vertex_mut(old) {
                    old.children.retain(|child| child != id);
                }
            }
            None => self.vertexes.retain(|top| top != id),
        }

        let parent = parent.filter(|p| {
            *p != id && self.get_vertex(p).is_some() && !self.is_descendant(p, id)
        });
        match parent {
            Some(parent) => {
                if let Some(group) = self.vertex_mut(parent) {
                    group.children.push(id.clone());
                }
                self.vertex_mut(id)?.parent = Some(parent.clone());
            }
            None => {
                self.vertexes.push(id.clone());
                self.vertex_mut(id)?.parent = None;
            }
        }
        Some(())
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Declaration of a vertex with its children nested
    pub fn vertex_config(&self, id: &ElementId) -> Option<MVertex> {
        let vertex = self.get_vertex(id)?;
        let children = vertex
            .children
            .iter()
            .filter_map(|child| self.vertex_config(child))
            .collect();
        Some(vertex.to_config(children))
    }

    /// Declaration of a link
    pub fn link_config(&self, id: &ElementId) -> Option<MLink> {
        let link = self.get_link(id)?;
        let tag = |point: &LinkPoint| self.get_vertex(&point.vertex).map(|v| v.tag);
        Some(link.to_config(tag(&link.source), tag(&link.target)))
    }

    /// Persisted form; `Project::from_config(&p.to_json())` reproduces it
    pub fn to_json(&self) -> MProject {
        MProject {
            id: self.id.clone(),
            name: self.name.clone(),
            grid_type: self.grid_type,
            grid_size: self.grid_size,
            grid_color: self.grid_color.clone(),
            vertexes: self.vertexes.iter().filter_map(|id| self.vertex_config(id)).collect(),
            links: self.links.iter().filter_map(|id| self.link_config(id)).collect(),
            store: self.store.clone(),
        }
    }
}

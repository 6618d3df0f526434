// SPDX-License-Identifier: MIT OR Apache-2.0
//! Links between vertex ports.

use crate::element::{ElementBase, ElementId};
use crate::error::GraphError;
use crate::schema::{MLink, MLinkPoint, Position, State};
use crate::vertex::VertexTag;
use serde_json::{Map, Value};
use topo_editor_expression::ExpressionParser;

/// One end of a link
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkPoint {
    /// Vertex id
    pub vertex: ElementId,
    /// Port id on that vertex
    pub port: String,
}

impl LinkPoint {
    /// Create an endpoint
    pub fn new(vertex: impl Into<ElementId>, port: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            port: port.into(),
        }
    }

    /// Declaration form
    pub fn to_config(&self, tag: Option<VertexTag>) -> MLinkPoint {
        MLinkPoint {
            vertex: self.vertex.clone(),
            tag,
            port: self.port.clone(),
        }
    }
}

impl From<&MLinkPoint> for LinkPoint {
    fn from(point: &MLinkPoint) -> Self {
        Self::new(point.vertex.clone(), point.port.clone())
    }
}

/// End of a link being dragged in the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEnd {
    /// Source is being moved
    Source,
    /// Target is being moved
    Target,
}

/// A graph edge
#[derive(Debug, Clone)]
pub struct Link {
    /// Shared element fields
    pub element: ElementBase,
    /// Start
    pub source: LinkPoint,
    /// End
    pub target: LinkPoint,
    /// Routing waypoints
    pub vertices: Vec<Position>,
    /// Flow animation runs backwards
    pub is_reverse: bool,
    /// Flow animation enabled
    pub is_running: bool,
    /// End currently being reconnected, runtime only
    pub reconnecting: Option<LinkEnd>,
    /// Name of the visual state currently applied
    pub cur_state: Option<String>,
}

impl Link {
    /// Build from a declaration. Endpoints are not checked here.
    pub fn new(config: &MLink) -> Self {
        Self {
            element: ElementBase::new(&config.element),
            source: LinkPoint::from(&config.source),
            target: LinkPoint::from(&config.target),
            vertices: config.vertices.clone(),
            is_reverse: config.is_reverse.unwrap_or(false),
            is_running: config.is_running.unwrap_or(false),
            reconnecting: None,
            cur_state: None,
        }
    }

    /// Link id
    pub fn id(&self) -> &ElementId {
        &self.element.id
    }

    /// Whether either end is this vertex+port
    pub fn touches(&self, point: &LinkPoint) -> bool {
        self.source == *point || self.target == *point
    }

    /// The endpoint on the other side of `vertex`
    pub fn opposite(&self, vertex: &ElementId) -> Result<&LinkPoint, GraphError> {
        if self.source.vertex == *vertex {
            Ok(&self.target)
        } else if self.target.vertex == *vertex {
            Ok(&self.source)
        } else {
            Err(GraphError::IrrelevantLink {
                vertex: vertex.clone(),
                link: self.id().clone(),
            })
        }
    }

    /// Apply a declaration's attributes. Endpoints are handled by the project.
    pub fn update(&mut self, config: &MLink) {
        self.element.update(&config.element);
        self.vertices = config.vertices.clone();
        self.is_running = config.is_running.unwrap_or(false);
        self.is_reverse = config.is_reverse.unwrap_or(false);
    }

    /// First state whose rule holds against the store
    pub fn evaluate_state(&self, store: &Map<String, Value>, parser: &ExpressionParser) -> Option<&State> {
        self.element.matching_state(store, parser)
    }

    /// Re-evaluate rules. Returns the style to apply when a styled state
    /// becomes current.
    pub fn refresh_state(
        &mut self,
        store: &Map<String, Value>,
        parser: &ExpressionParser,
    ) -> Option<Vec<(String, Value)>> {
        let state = self.evaluate_state(store, parser)?;
        let style = state.style.as_ref()?;
        if self.cur_state.as_deref() == Some(state.name.as_str()) {
            return None;
        }
        let attrs = style.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        self.cur_state = Some(state.name.clone());
        Some(attrs)
    }

    /// Declaration form with the endpoint vertex tags
    pub fn to_config(&self, source_tag: Option<VertexTag>, target_tag: Option<VertexTag>) -> MLink {
        MLink {
            element: self.element.to_config(),
            source: self.source.to_config(source_tag),
            target: self.target.to_config(target_tag),
            vertices: self.vertices.clone(),
            is_reverse: Some(self.is_reverse),
            is_running: Some(self.is_running),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link() -> Link {
        Link::new(&MLink::new(
            "l1",
            MLinkPoint::new("a", "p1"),
            MLinkPoint::new("b", "p2"),
        ))
    }

    #[test]
    fn test_opposite() {
        let link = link();
        assert_eq!(link.opposite(&"a".into()).unwrap(), &LinkPoint::new("b", "p2"));
        assert_eq!(link.opposite(&"b".into()).unwrap(), &LinkPoint::new("a", "p1"));
        assert!(matches!(
            link.opposite(&"c".into()),
            Err(GraphError::IrrelevantLink { .. })
        ));
    }

    #[test]
    fn test_touches_exact_point() {
        let link = link();
        assert!(link.touches(&LinkPoint::new("a", "p1")));
        assert!(!link.touches(&LinkPoint::new("a", "p2")));
    }

    #[test]
    fn test_flags_default_false() {
        let link = link();
        assert!(!link.is_reverse && !link.is_running);
        let config = link.to_config(Some(VertexTag::Pipe), None);
        assert_eq!(config.is_running, Some(false));
        assert_eq!(config.source.tag, Some(VertexTag::Pipe));
    }
}

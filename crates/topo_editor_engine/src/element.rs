// SPDX-License-Identifier: MIT OR Apache-2.0
//! Attributes shared by every graph element.

use crate::link::Link;
use crate::schema::{ElementStyle, MElement, State, Variable};
use crate::vertex::Vertex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use topo_editor_expression::{value::truthy, ExpressionParser};

/// Unique identifier of a vertex or link within a project
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Wrap an id string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Random id for elements created without one
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The id text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ElementId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Style values applied when an element is created without them
pub mod defaults {
    /// Fill and stroke color
    pub const PAINT: &str = "rgba(255,255,255,1)";
    /// Every opacity
    pub const OPACITY: f64 = 1.0;
    /// Stroke width
    pub const STROKE_WIDTH: f64 = 4.0;
    /// Stroke dash pattern
    pub const STROKE_DASHARRAY: f64 = 0.0;
    /// Text color
    pub const COLOR: &str = "#fff";
    /// Font size
    pub const FONT_SIZE: f64 = 14.0;
}

/// Fill in missing style values with the defaults
pub fn with_default_style(style: &ElementStyle) -> ElementStyle {
    ElementStyle {
        fill: style.fill.clone().or_else(|| Some(defaults::PAINT.to_string())),
        fill_opacity: style.fill_opacity.or(Some(defaults::OPACITY)),
        stroke: style.stroke.clone().or_else(|| Some(defaults::PAINT.to_string())),
        stroke_width: style.stroke_width.or(Some(defaults::STROKE_WIDTH)),
        stroke_dasharray: style.stroke_dasharray.or(Some(defaults::STROKE_DASHARRAY)),
        stroke_opacity: style.stroke_opacity.or(Some(defaults::OPACITY)),
        color: style.color.clone().or_else(|| Some(defaults::COLOR.to_string())),
        color_opacity: style.color_opacity.or(Some(defaults::OPACITY)),
        font_size: style.font_size.or(Some(defaults::FONT_SIZE)),
        z_index: style.z_index,
    }
}

/// Fields every element carries
#[derive(Debug, Clone, PartialEq)]
pub struct ElementBase {
    /// Element id
    pub id: ElementId,
    /// Display name
    pub name: String,
    /// Style attributes
    pub style: ElementStyle,
    /// Visual states
    pub states: Vec<State>,
    /// Rule variables
    pub variables: Vec<Variable>,
}

impl ElementBase {
    /// Build from a declaration, filling style defaults
    pub fn new(config: &MElement) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            style: with_default_style(&config.style),
            states: config.states.clone(),
            variables: config.variables.clone(),
        }
    }

    /// Copy attributes from a declaration as given
    pub fn update(&mut self, config: &MElement) {
        self.name = config.name.clone();
        self.style = config.style.clone();
        self.states = config.states.clone();
        self.variables = config.variables.clone();
    }

    /// Stacking order, 0 when unset
    pub fn z_index(&self) -> i64 {
        self.style.z_index.unwrap_or(0)
    }

    /// CSS custom properties pushed to the render node
    pub fn style_string(&self) -> String {
        fn show<T: ToString>(value: &Option<T>) -> String {
            value.as_ref().map_or_else(|| "undefined".to_string(), ToString::to_string)
        }
        let s = &self.style;
        format!(
            "--fill: {}; --fillOpacity: {}; --stroke: {}; --strokeWidth: {}; --strokeOpacity: {}; \
             --strokeDasharray: {}; --color: {}; --colorOpacity: {}; --fontSize: {};",
            show(&s.fill),
            show(&s.fill_opacity),
            show(&s.stroke),
            show(&s.stroke_width),
            show(&s.stroke_opacity),
            show(&s.stroke_dasharray),
            show(&s.color),
            show(&s.color_opacity),
            show(&s.font_size),
        )
    }

    /// Variable values for rule evaluation: the store value at each
    /// variable's leaf key, or its default
    pub fn rule_values(&self, store: &Map<String, Value>) -> Value {
        let values: Map<String, Value> = self
            .variables
            .iter()
            .map(|variable| {
                let value = variable
                    .property
                    .leaf()
                    .and_then(|leaf| store.get(leaf))
                    .unwrap_or(&variable.default_value)
                    .clone();
                (variable.key.clone(), value)
            })
            .collect();
        Value::Object(values)
    }

    /// First state whose rule holds against the store
    pub fn matching_state(&self, store: &Map<String, Value>, parser: &ExpressionParser) -> Option<&State> {
        let values = self.rule_values(store);
        self.states.iter().find(|state| {
            let Some(rule) = state.rule.as_deref().filter(|r| !r.trim().is_empty()) else {
                return false;
            };
            match parser.eval_sync_with(rule, &values) {
                Ok(result) => truthy(&result),
                Err(error) => {
                    tracing::debug!(element = %self.id, rule, %error, "State rule failed");
                    false
                }
            }
        })
    }

    /// Declaration form
    pub fn to_config(&self) -> MElement {
        MElement {
            id: self.id.clone(),
            name: self.name.clone(),
            style: self.style.clone(),
            states: self.states.clone(),
            variables: self.variables.clone(),
        }
    }
}

/// Element stored in a project
#[derive(Debug, Clone)]
pub enum Element {
    /// Graph node
    Vertex(Vertex),
    /// Graph edge
    Link(Link),
}

impl Element {
    /// Shared fields
    pub fn base(&self) -> &ElementBase {
        match self {
            Self::Vertex(vertex) => &vertex.element,
            Self::Link(link) => &link.element,
        }
    }

    /// Element id
    pub fn id(&self) -> &ElementId {
        &self.base().id
    }

    /// The vertex, if this is one
    pub fn as_vertex(&self) -> Option<&Vertex> {
        match self {
            Self::Vertex(vertex) => Some(vertex),
            Self::Link(_) => None,
        }
    }

    /// The link, if this is one
    pub fn as_link(&self) -> Option<&Link> {
        match self {
            Self::Link(link) => Some(link),
            Self::Vertex(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PropertyPath;
    use serde_json::json;

    fn element_with_rules() -> ElementBase {
        ElementBase::new(&MElement {
            id: "e1".into(),
            name: "pump".into(),
            states: vec![
                State {
                    name: "alarm".into(),
                    rule: Some("temp > 80".into()),
                    ..State::default()
                },
                State {
                    name: "normal".into(),
                    rule: Some("temp <= 80".into()),
                    default: true,
                    ..State::default()
                },
            ],
            variables: vec![Variable {
                key: "temp".into(),
                property: PropertyPath::Path(vec!["site".into(), "T1".into()]),
                default_value: json!(20),
            }],
            ..MElement::default()
        })
    }

    #[test]
    fn test_defaults_on_create_not_on_update() {
        let mut element = ElementBase::new(&MElement::default());
        assert_eq!(element.style.fill.as_deref(), Some(defaults::PAINT));
        assert_eq!(element.style.stroke_width, Some(4.0));
        assert_eq!(element.style.font_size, Some(14.0));

        element.update(&MElement::default());
        assert_eq!(element.style.fill, None);
    }

    #[test]
    fn test_style_string() {
        let element = ElementBase::new(&MElement::default());
        let css = element.style_string();
        assert!(css.contains("--fill: rgba(255,255,255,1);"));
        assert!(css.contains("--fontSize: 14;"));
    }

    #[test]
    fn test_matching_state() {
        let element = element_with_rules();
        let parser = ExpressionParser::default();

        let mut store = Map::new();
        assert_eq!(element.matching_state(&store, &parser).map(|s| s.name.as_str()), Some("normal"));

        store.insert("T1".into(), json!(95));
        assert_eq!(element.matching_state(&store, &parser).map(|s| s.name.as_str()), Some("alarm"));
    }
}

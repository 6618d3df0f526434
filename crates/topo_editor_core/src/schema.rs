// SPDX-License-Identifier: MIT OR Apache-2.0
//! Page description format.
//!
//! An [`MApp`] holds pages, each page is a tree of [`MComponent`]s. Values
//! in `property` and `style` may be literals or expression objects
//! (`{"expression": "..."}`), which the state store keeps bound.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Ids are strings on the wire but numbers are accepted
fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Text(text) => text,
        Repr::Number(number) => number.to_string(),
    })
}

/// Named expression feeding one argument or query parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingStruct {
    /// Key the result is stored under
    pub target: String,
    /// Expression to evaluate; absent means `null`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

/// Where a navigation opens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigateTarget {
    /// Current window
    #[default]
    #[serde(rename = "_self")]
    SelfWindow,
    /// New window
    #[serde(rename = "_blank")]
    Blank,
}

/// Severity of an alert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// Neutral or positive
    #[default]
    Success,
    /// Failure
    Error,
    /// Caution
    Warning,
}

/// What an effect does
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EffectKind {
    /// Call a method on another component
    ControlComponent {
        /// Target component id
        #[serde(deserialize_with = "id")]
        component: String,
        /// Method name on the target instance
        method: String,
        /// Positional arguments; expression objects are evaluated
        #[serde(default)]
        mappings: Vec<Value>,
    },
    /// Open a page
    Navigate {
        /// Page id
        #[serde(deserialize_with = "id")]
        page: String,
        /// Query parameters
        #[serde(default)]
        params: Vec<MappingStruct>,
        /// Window to open in
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<NavigateTarget>,
    },
    /// Run an executor
    Executor {
        /// Executor id
        #[serde(deserialize_with = "id")]
        executor: String,
        /// Extra props merged over the event payload
        #[serde(default)]
        mappings: Vec<MappingStruct>,
    },
    /// Show a toast
    ShowAlert {
        /// Text to show
        message: String,
        /// Severity
        #[serde(rename = "messageType", default, skip_serializing_if = "Option::is_none")]
        message_type: Option<AlertKind>,
    },
    /// Post a message to the embedding window
    PostMessage {
        /// Message body
        data: String,
        /// Allowed target origin
        origins: String,
    },
}

/// An effect bound to a component event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectConfig {
    /// Effect body
    #[serde(flatten)]
    pub kind: EffectKind,
    /// Guard expression; a falsy result skips the effect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl EffectConfig {
    /// Unconditional effect
    pub fn new(kind: EffectKind) -> Self {
        Self { kind, condition: None }
    }

    /// Add a guard
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Shorthand for a [`EffectKind::ControlComponent`] effect
    pub fn control(component: impl Into<String>, method: impl Into<String>, mappings: Vec<Value>) -> Self {
        Self::new(EffectKind::ControlComponent {
            component: component.into(),
            method: method.into(),
            mappings,
        })
    }

    /// Component targeted by a control effect
    pub fn target_component(&self) -> Option<&str> {
        match &self.kind {
            EffectKind::ControlComponent { component, .. } => Some(component),
            _ => None,
        }
    }
}

/// Method a component exposes to effects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodConfig {
    /// Method name
    pub method: String,
    /// Display label
    #[serde(default)]
    pub label: String,
    /// Argument names
    #[serde(default)]
    pub props: Vec<String>,
}

/// A component, container or page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MComponent {
    /// Component id, unique within the app
    #[serde(deserialize_with = "id")]
    pub id: String,
    /// Component type (`page` for pages)
    #[serde(rename = "type")]
    pub kind: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Component version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Visibility, literal or expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<Value>,
    /// Disabled flag, literal or expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<Value>,
    /// Required permissions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
    /// Properties, literal or expression
    #[serde(default)]
    pub property: Map<String, Value>,
    /// Event name to effects
    #[serde(default)]
    pub event: IndexMap<String, Vec<EffectConfig>>,
    /// Exposed methods
    #[serde(default)]
    pub method: Vec<MethodConfig>,
    /// Style values, literal or expression
    #[serde(default)]
    pub style: Map<String, Value>,
    /// Layout of a container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Value>,
    /// Children of a container or page
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<MComponent>,
}

/// Container with children
pub type MContainer = MComponent;

/// Page root
pub type MPage = MComponent;

impl MComponent {
    /// Component with no properties, events or children
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            ..Default::default()
        }
    }
}

/// Declared executor argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorProp {
    /// Argument name
    pub name: String,
    /// JSON type name
    #[serde(rename = "type")]
    pub kind: String,
    /// Default value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Executor declaration. Handler-specific fields stay in `options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MExecutorConfig {
    /// Executor id, also its state path
    #[serde(deserialize_with = "id")]
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Handler type (e.g. `restApi`)
    #[serde(rename = "type")]
    pub kind: String,
    /// Declared arguments
    #[serde(default)]
    pub props: Vec<ExecutorProp>,
    /// Executor to run afterwards
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    /// Remaining handler fields
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

/// Whole application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MApp {
    /// App id
    #[serde(deserialize_with = "id")]
    pub id: String,
    /// Always `app`
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Pages
    #[serde(default)]
    pub items: Vec<MPage>,
    /// Owning tenant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Executors available to effects
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub executors: Vec<MExecutorConfig>,
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Page runtime for Topo Editor.
//!
//! This crate provides:
//! - A reactive state store whose values may be bound expressions
//! - Pages and components with a render lifecycle
//! - Effect dispatch from component events to other components, pages,
//!   executors and the host
//! - Executors: pluggable async tasks recorded in the state store
//!
//! Rendering stays outside: the host reports component instances through
//! the `node_*` lifecycle calls on [`App`].

pub mod app;
pub mod effect;
pub mod error;
pub mod executor;
pub mod node;
pub mod page;
pub mod schema;
pub mod state;

pub use app::{App, AppEvent, AppOptions, Env};
pub use effect::{EffectCache, EffectOutcome, EffectQueue, HostBindings, NavigationTarget};
pub use error::{EffectError, ExecutorError, HttpError, MethodError};
pub use executor::{
    ExecutorHandler, ExecutorManager, ExecutorState, HttpMethod, HttpRequest, HttpTransport, RestApiConfig,
    RestApiHandler, REST_API,
};
pub use node::{Node, NodeInstance, NodeLifecycle, NodeMethod};
pub use page::Page;
pub use schema::{
    AlertKind, EffectConfig, EffectKind, ExecutorProp, MApp, MComponent, MContainer, MExecutorConfig, MPage,
    MappingStruct, MethodConfig, NavigateTarget,
};
pub use state::StateManager;

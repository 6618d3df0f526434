// SPDX-License-Identifier: MIT OR Apache-2.0
//! Topology graph engine for Topo Editor.
//!
//! This crate provides:
//! - The element model: vertices with typed ports, links between ports
//! - A project arena owning every element, with link validity rules
//! - An undo/redo command engine and the six graph commands
//! - A render-layer boundary with an in-memory renderer
//!
//! ## Architecture
//!
//! [`Project`] is the single source of truth. [`EngineContext`] applies
//! each mutation to the project and then to the [`RenderLayer`], and
//! [`App`] adds the command history on top.

pub mod app;
pub mod command;
pub mod commands;
pub mod config;
pub mod element;
pub mod error;
pub mod link;
pub mod port;
pub mod project;
pub mod renderer;
pub mod schema;
pub mod validation;
pub mod vertex;

pub use app::{App, EngineContext};
pub use command::{Command, CommandEvent, CommandJson, CommandService, History};
pub use config::EngineConfig;
pub use element::{Element, ElementBase, ElementId};
pub use error::{CommandError, ConfigError, GraphError};
pub use link::{Link, LinkEnd, LinkPoint};
pub use port::{PortEnergyType, PortTnodeIo, VertexPort};
pub use project::{Project, ProjectEvent};
pub use renderer::{MemoryRenderer, RenderEvent, RenderLayer, SharedRenderer};
pub use schema::{ElementConfig, GridSettings, GridType, MLink, MLinkPoint, MProject, MVertex, MVertexPort};
pub use validation::{check_link, validate_link, LinkRejection};
pub use vertex::{Vertex, VertexTag};

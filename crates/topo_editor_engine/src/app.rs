// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor application: project, renderer and command history together.

use crate::command::{CommandService, History};
use crate::commands::{
    AddElementCmd, ClearGraphCmd, DelElementCmd, UpdateCanvasCmd, UpdateLinkCmd, UpdateVertexCmd,
};
use crate::config::EngineConfig;
use crate::element::ElementId;
use crate::error::{CommandError, GraphError};
use crate::link::Link;
use crate::project::Project;
use crate::renderer::{EdgeSpec, NodeSpec, RenderLayer};
use crate::schema::{GridSettings, GridType, MLink, MProject, MVertex};
use crate::vertex::Vertex;
use serde_json::{Map, Value};

/// Grid color used when the project sets none
pub const DEFAULT_GRID_COLOR: &str = "#323232";
/// Grid size used when the project sets none
pub const DEFAULT_GRID_SIZE: f64 = 6.0;

/// Attribute path of a node's inline style
const STYLE_ATTR: &str = "container/style";
/// Attribute path of a node's state content
const CONTENT_ATTR: &str = "content";

/// Project plus the renderer mirroring it. Every mutation made through
/// here is applied to both.
pub struct EngineContext {
    project: Project,
    renderer: Box<dyn RenderLayer>,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("project", &self.project)
            .finish_non_exhaustive()
    }
}

fn node_spec(vertex: &Vertex) -> NodeSpec {
    NodeSpec {
        id: vertex.id().clone(),
        label: vertex.element.name.clone(),
        x: vertex.x,
        y: vertex.y,
        width: vertex.width,
        height: vertex.height,
        angle: vertex.angle,
        z_index: vertex.element.z_index(),
        ports: vertex
            .ports()
            .iter()
            .map(|port| (port.id.clone(), port.position))
            .collect(),
        content: vertex.content().map(str::to_string),
    }
}

impl EngineContext {
    /// Empty project drawn on `renderer`
    pub fn new(renderer: Box<dyn RenderLayer>) -> Self {
        Self {
            project: Project::new(),
            renderer,
        }
    }

    /// The model
    pub fn project(&self) -> &Project {
        &self.project
    }

    /// The model, for listeners and queries. Changes made here are not
    /// mirrored to the renderer.
    pub fn project_mut(&mut self) -> &mut Project {
        &mut self.project
    }

    /// The renderer
    pub fn renderer(&self) -> &dyn RenderLayer {
        self.renderer.as_ref()
    }

    /// The renderer, for simulating user input
    pub fn renderer_mut(&mut self) -> &mut dyn RenderLayer {
        self.renderer.as_mut()
    }

    fn edge_spec(&self, link: &Link) -> EdgeSpec {
        let z = |id: &ElementId| {
            self.project
                .get_vertex(id)
                .map_or(0, |vertex| vertex.element.z_index())
        };
        EdgeSpec {
            id: link.id().clone(),
            source: link.source.clone(),
            target: link.target.clone(),
            vertices: link.vertices.clone(),
            z_index: z(&link.source.vertex).min(z(&link.target.vertex)) - 1,
        }
    }

    fn draw_vertex(&mut self, id: &ElementId) {
        let Some(vertex) = self.project.get_vertex(id) else {
            return;
        };
        let spec = node_spec(vertex);
        let parent = vertex.parent.clone();
        let style = vertex.element.style_string();
        self.renderer.add_node(spec);
        self.renderer.set_attr_by_path(id, STYLE_ATTR, Value::String(style));
        if let Some(parent) = parent {
            self.renderer.add_child(&parent, id);
        }
    }

    fn draw_link(&mut self, id: &ElementId) {
        if let Some(link) = self.project.get_link(id) {
            let spec = self.edge_spec(link);
            self.renderer.add_edge(spec);
        }
    }

    /// Add a vertex subtree and draw every node of it
    pub fn add_vertex(&mut self, config: &MVertex) -> Result<ElementId, GraphError> {
        let id = self.project.add_vertex(config, None)?;
        for vertex in config.subtree_ids() {
            self.draw_vertex(vertex);
        }
        Ok(id)
    }

    /// Remove a vertex with its links and children, nodes and edges included
    pub fn remove_vertex(&mut self, id: &ElementId) -> Option<Vertex> {
        let subtree: Vec<ElementId> = self
            .project
            .vertex_config(id)?
            .subtree_ids()
            .into_iter()
            .cloned()
            .collect();
        let links: Vec<ElementId> = subtree
            .iter()
            .flat_map(|vertex| self.project.get_vertex_relations(vertex))
            .collect();

        let removed = self.project.remove_vertex(id)?;
        for link in &links {
            self.renderer.remove_edge(link);
        }
        for vertex in subtree.iter().rev() {
            self.renderer.remove_node(vertex);
        }
        Some(removed)
    }

    /// Update a vertex and push its geometry, stacking and style to the node
    pub fn update_vertex(&mut self, config: &MVertex) -> Result<bool, GraphError> {
        let id = config.id().clone();
        let before = self.project.get_vertex_relations(&id);
        let Some(diff) = self.project.update_vertex(config)? else {
            return Ok(false);
        };
        for link in before.iter().filter(|link| !self.project.has_link(link)) {
            self.renderer.remove_edge(link);
        }
        for port in &diff.removed {
            self.renderer.remove_port(&id, port);
        }
        for port in &diff.updated {
            self.renderer.set_port_position(&id, &port.id, port.position);
        }
        for port in &diff.added {
            self.renderer.add_port(&id, &port.id, port.position);
        }
        tracing::debug!(
            vertex = %id,
            added = diff.added.len(),
            updated = diff.updated.len(),
            removed = diff.removed.len(),
            "Vertex ports updated"
        );

        let Some(vertex) = self.project.get_vertex(&id) else {
            return Ok(true);
        };
        let (x, y, width, height, angle) = (vertex.x, vertex.y, vertex.width, vertex.height, vertex.angle);
        let z_index = vertex.element.z_index();
        let style = vertex.element.style_string();
        let content = vertex.content().map(str::to_string);

        if let Some(size) = self.renderer.get_size(&id) {
            if size.width != width || size.height != height {
                self.renderer.resize(&id, width, height);
            }
        }
        if let Some(position) = self.renderer.get_position(&id) {
            if position.x != x || position.y != y {
                self.renderer.translate(&id, x - position.x, y - position.y);
            }
        }
        if let Some(current) = self.renderer.get_angle(&id) {
            if current != angle {
                self.renderer.rotate(&id, angle - current);
            }
        }
        self.renderer.set_z_index(&id, z_index);
        self.renderer.set_attr_by_path(&id, STYLE_ATTR, Value::String(style));
        if let Some(content) = content {
            self.renderer.set_attr_by_path(&id, CONTENT_ATTR, Value::String(content));
        }
        Ok(true)
    }

    /// Add a link and draw its edge
    pub fn add_link(&mut self, config: &MLink) -> Result<ElementId, GraphError> {
        let id = self.project.add_link(config)?;
        self.draw_link(&id);
        Ok(id)
    }

    /// Remove a link and its edge
    pub fn remove_link(&mut self, id: &ElementId) -> Option<Link> {
        let link = self.project.remove_link(id)?;
        self.renderer.remove_edge(id);
        Some(link)
    }

    /// Update a link and redraw its edge
    pub fn update_link(&mut self, config: &MLink) -> Result<bool, GraphError> {
        if !self.project.update_link(config)? {
            return Ok(false);
        }
        let id = config.id();
        self.renderer.remove_edge(id);
        self.draw_link(id);
        Ok(true)
    }

    /// Current grid settings of the project
    pub fn grid(&self) -> GridSettings {
        GridSettings {
            grid_type: self.project.grid_type,
            grid_color: self.project.grid_color.clone(),
            grid_size: self.project.grid_size,
        }
    }

    /// Store grid settings on the project and redraw the grid
    pub fn update_grid(&mut self, grid: &GridSettings) {
        self.project.grid_type = grid.grid_type;
        self.project.grid_color = grid.grid_color.clone();
        self.project.grid_size = grid.grid_size;

        match grid.grid_type {
            None | Some(GridType::None) => self.renderer.hide_grid(),
            Some(grid_type) => {
                self.renderer.show_grid();
                self.renderer.draw_grid(
                    grid_type,
                    grid.grid_color.as_deref().unwrap_or(DEFAULT_GRID_COLOR),
                    grid.grid_size.unwrap_or(DEFAULT_GRID_SIZE),
                );
            }
        }
    }

    /// Empty the project and the renderer
    pub fn clear_graph(&mut self) {
        self.project.clear();
        self.renderer.clear();
    }

    /// Replace the whole project and redraw it
    pub fn reset_project(&mut self, config: &MProject) -> Result<(), GraphError> {
        self.project.init(config)?;
        self.renderer.clear();

        let vertexes: Vec<ElementId> = self.project.all_vertexes().map(|v| v.id().clone()).collect();
        for vertex in &vertexes {
            self.draw_vertex(vertex);
        }
        let links = self.project.links().to_vec();
        for link in &links {
            self.draw_link(link);
        }
        self.update_grid(&GridSettings {
            grid_type: config.grid_type,
            grid_color: config.grid_color.clone(),
            grid_size: config.grid_size,
        });
        Ok(())
    }

    /// Replace the store and push switched states to the renderer
    pub fn set_store(&mut self, store: Map<String, Value>) -> Vec<ElementId> {
        let changed = self.project.set_store(store);
        for id in &changed {
            if let Some(vertex) = self.project.get_vertex(id) {
                if let Some(content) = vertex.content() {
                    self.renderer
                        .set_attr_by_path(id, CONTENT_ATTR, Value::String(content.to_string()));
                }
            } else if let Some(link) = self.project.get_link(id) {
                let style = link
                    .cur_state
                    .as_deref()
                    .and_then(|name| link.element.states.iter().find(|state| state.name == name))
                    .and_then(|state| state.style.clone())
                    .unwrap_or_default();
                for (path, value) in style {
                    self.renderer.set_attr_by_path(id, &path, value);
                }
            }
        }
        changed
    }

    /// Pull changes the user made in the renderer into the model
    pub fn sync_renderer(&mut self) -> usize {
        self.renderer
            .take_events()
            .iter()
            .filter(|event| self.project.apply_render_event(event))
            .count()
    }
}

/// Editor application
#[derive(Debug)]
pub struct App {
    /// Settings the app was created with
    pub config: EngineConfig,
    context: EngineContext,
    commands: CommandService,
}

impl App {
    /// App with the six graph commands registered
    pub fn new(config: EngineConfig, renderer: Box<dyn RenderLayer>) -> Self {
        let mut commands = CommandService::new(config.command.max_stack_size, config.command.disabled);
        commands.register::<AddElementCmd>();
        commands.register::<DelElementCmd>();
        commands.register::<UpdateVertexCmd>();
        commands.register::<UpdateLinkCmd>();
        commands.register::<UpdateCanvasCmd>();
        commands.register::<ClearGraphCmd>();

        tracing::info!(
            width = config.width,
            height = config.height,
            max_stack_size = config.command.max_stack_size,
            "Editor app created"
        );
        Self {
            config,
            context: EngineContext::new(renderer),
            commands,
        }
    }

    /// Project and renderer
    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    /// Project and renderer, mutable
    pub fn context_mut(&mut self) -> &mut EngineContext {
        &mut self.context
    }

    /// The model
    pub fn project(&self) -> &Project {
        self.context.project()
    }

    /// Command history
    pub fn commands(&self) -> &CommandService {
        &self.commands
    }

    /// Command history, for listeners and settings
    pub fn commands_mut(&mut self) -> &mut CommandService {
        &mut self.commands
    }

    /// Execute a registered command by name
    pub fn execute(&mut self, name: &str, options: Value) -> Result<u64, CommandError> {
        self.commands.execute(&mut self.context, name, options)
    }

    /// Execute a built command
    pub fn execute_command<C: crate::command::Command>(&mut self, command: C) -> Result<u64, CommandError> {
        self.commands.execute_command(&mut self.context, command)
    }

    /// Undo `steps` commands
    pub fn undo(&mut self, steps: usize) -> Result<Option<u64>, CommandError> {
        self.commands.undo(&mut self.context, steps)
    }

    /// Redo `steps` commands
    pub fn redo(&mut self, steps: usize) -> Result<Option<u64>, CommandError> {
        self.commands.redo(&mut self.context, steps)
    }

    /// Move through history to a command id
    pub fn jump(&mut self, id: u64) -> Result<(), CommandError> {
        self.commands.jump(&mut self.context, id)
    }

    /// Empty the project, the renderer and the history
    pub fn clear_graph(&mut self) {
        self.context.clear_graph();
        self.commands.clean();
    }

    /// Replace the project and drop the history
    pub fn reset_project(&mut self, config: &MProject) -> Result<(), GraphError> {
        self.context.reset_project(config)?;
        self.commands.clean();
        Ok(())
    }

    /// Replace the store
    pub fn set_store(&mut self, store: Map<String, Value>) -> Vec<ElementId> {
        self.context.set_store(store)
    }

    /// Pull renderer changes into the model
    pub fn sync_renderer(&mut self) -> usize {
        self.context.sync_renderer()
    }

    /// Serialized history
    pub fn history(&self) -> Result<History, CommandError> {
        self.commands.to_json()
    }

    /// Load serialized history without replaying it
    pub fn load_history(&mut self, history: &History) -> Result<(), CommandError> {
        self.commands.from_json(history)
    }

    /// Drop history, listeners and contents
    pub fn destroy(&mut self) {
        self.commands.destroy();
        self.context.project_mut().remove_all_listeners();
        self.context.clear_graph();
    }
}

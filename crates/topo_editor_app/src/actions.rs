// SPDX-License-Identifier: MIT OR Apache-2.0
//! What each subcommand does, kept free of argument parsing and printing.

use crate::error::CliError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use topo_editor_engine::{App, EngineConfig, GraphError, History, LinkPoint, MProject, MemoryRenderer};
use topo_editor_expression::{ExpressionParser, ReactiveContext};

/// Read and decode a JSON file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Encode and write a JSON file
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)?;
    std::fs::write(path, text).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the engine config, or defaults when no file is given
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, CliError> {
    match path {
        Some(path) => Ok(EngineConfig::load(path)?),
        None => Ok(EngineConfig::default()),
    }
}

/// Create an app over an in-memory renderer and load `project`
pub fn open(config: EngineConfig, project: &MProject) -> Result<App, CliError> {
    let mut app = App::new(config, Box::new(MemoryRenderer::new()));
    app.reset_project(project)?;
    Ok(app)
}

/// Project statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Project id
    pub id: String,
    /// Project name
    pub name: String,
    /// Vertices at any depth
    pub vertexes: usize,
    /// Top-level vertices
    pub top_level: usize,
    /// Links
    pub links: usize,
    /// Vertices without any link
    pub unlinked: Vec<String>,
    /// Undo stack length
    pub undo: usize,
    /// Redo stack length
    pub redo: usize,
}

impl Summary {
    /// Summarize the app's project and history
    pub fn of(app: &App) -> Self {
        let project = app.project();
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            vertexes: project.all_vertexes().count(),
            top_level: project.vertexes().len(),
            links: project.links().len(),
            unlinked: project
                .all_vertexes()
                .filter(|vertex| vertex.linked().is_empty())
                .map(|vertex| vertex.id().to_string())
                .collect(),
            undo: app.commands().undo_len(),
            redo: app.commands().redo_len(),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "project  {} ({})", self.name, self.id)?;
        writeln!(f, "vertexes {} ({} top level)", self.vertexes, self.top_level)?;
        writeln!(f, "links    {}", self.links)?;
        writeln!(f, "history  {} undo / {} redo", self.undo, self.redo)?;
        if !self.unlinked.is_empty() {
            writeln!(f, "unlinked {}", self.unlinked.join(", "))?;
        }
        Ok(())
    }
}

/// Attach a history. With `replay` the undo stack is executed again on top
/// of the loaded project instead of being restored as is.
pub fn attach_history(app: &mut App, history: &History, replay: bool) -> Result<(), CliError> {
    if !replay {
        app.load_history(history)?;
        return Ok(());
    }
    for command in &history.undo_stack {
        let id = app.execute(&command.name, command.options.clone())?;
        tracing::debug!(id, name = %command.name, "Replayed command");
    }
    Ok(())
}

/// One entry of an `exec` command file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommandSpec {
    /// Registered command name
    pub name: String,
    /// Command options
    #[serde(default)]
    pub options: Value,
}

/// Execute commands in order, then undo `undo` of them. Returns the ids of
/// the executed commands.
pub fn execute_all(app: &mut App, commands: &[CommandSpec], undo: usize) -> Result<Vec<u64>, CliError> {
    let mut ids = Vec::with_capacity(commands.len());
    for command in commands {
        ids.push(app.execute(&command.name, command.options.clone())?);
    }
    if undo > 0 {
        app.undo(undo)?;
    }
    tracing::info!(executed = ids.len(), undone = undo, "Commands applied");
    Ok(ids)
}

/// Result of a link check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkCheck {
    /// Whether the link would be accepted
    pub allowed: bool,
    /// Why it would be refused
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl fmt::Display for LinkCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            None => write!(f, "allowed"),
            Some(reason) => write!(f, "refused: {reason}"),
        }
    }
}

/// Check a prospective link against the project
pub fn check_link(app: &App, source: &LinkPoint, target: &LinkPoint) -> LinkCheck {
    match app.project().check_link_points(source, target) {
        Ok(()) => LinkCheck {
            allowed: true,
            reason: None,
        },
        Err(GraphError::IllegalLink { reason, .. }) => LinkCheck {
            allowed: false,
            reason: Some(reason.to_string()),
        },
        Err(error) => LinkCheck {
            allowed: false,
            reason: Some(error.to_string()),
        },
    }
}

/// Evaluate an expression against `state`, async functions included
pub async fn evaluate(expression: &str, state: Value) -> Result<Value, CliError> {
    let parser = ExpressionParser::new(ReactiveContext::new(state));
    Ok(parser.eval(expression).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use topo_editor_engine::{
        ElementId, MLink, MLinkPoint, MVertex, MVertexPort, PortEnergyType, PortTnodeIo, VertexTag,
    };

    fn vertex(id: &str, ports: &[(&str, PortTnodeIo)]) -> MVertex {
        let mut config = MVertex::new(id, "switch", VertexTag::Equipment);
        config.ports = ports
            .iter()
            .map(|(port, io)| MVertexPort {
                id: port.to_string(),
                tnode_io: *io,
                energy_type: PortEnergyType::Electricity,
                ..MVertexPort::default()
            })
            .collect();
        config
    }

    fn project() -> MProject {
        MProject {
            id: "p1".to_string(),
            name: "Plant".to_string(),
            vertexes: vec![
                vertex("a", &[("out", PortTnodeIo::Out)]),
                vertex("b", &[("in", PortTnodeIo::In)]),
                vertex("c", &[]),
            ],
            links: vec![MLink::new("l1", MLinkPoint::new("a", "out"), MLinkPoint::new("b", "in"))],
            ..MProject::default()
        }
    }

    fn add(id: &str) -> CommandSpec {
        CommandSpec {
            name: "AddElementCmd".to_string(),
            options: json!({ "element": vertex(id, &[]) }),
        }
    }

    #[test]
    fn test_summary() {
        let app = open(EngineConfig::default(), &project()).unwrap();
        let summary = Summary::of(&app);

        assert_eq!(summary.vertexes, 3);
        assert_eq!(summary.links, 1);
        assert_eq!(summary.unlinked, vec!["c".to_string()]);
        assert!(summary.to_string().contains("Plant (p1)"));
    }

    #[test]
    fn test_execute_and_undo() {
        let mut app = open(EngineConfig::default(), &project()).unwrap();
        let commands = vec![
            add("d"),
            CommandSpec {
                name: "DelElementCmd".to_string(),
                options: json!({ "element": [vertex("c", &[])] }),
            },
        ];

        let ids = execute_all(&mut app, &commands, 1).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(app.project().contains(&ElementId::new("d")));
        assert!(app.project().contains(&ElementId::new("c")));
        assert_eq!(app.commands().redo_len(), 1);
    }

    #[test]
    fn test_replay_history() {
        let mut source = open(EngineConfig::default(), &project()).unwrap();
        execute_all(&mut source, &[add("d")], 0).unwrap();
        let history = source.history().unwrap();

        let mut replayed = open(EngineConfig::default(), &project()).unwrap();
        attach_history(&mut replayed, &history, true).unwrap();
        assert!(replayed.project().contains(&ElementId::new("d")));

        let mut restored = open(EngineConfig::default(), &project()).unwrap();
        attach_history(&mut restored, &history, false).unwrap();
        assert!(!restored.project().contains(&ElementId::new("d")));
        assert_eq!(restored.commands().undo_len(), 1);
    }

    #[test]
    fn test_check_link_reasons() {
        let app = open(EngineConfig::default(), &project()).unwrap();

        let check = check_link(&app, &LinkPoint::new("b", "in"), &LinkPoint::new("a", "out"));
        assert!(!check.allowed);

        let check = check_link(&app, &LinkPoint::new("a", "out"), &LinkPoint::new("z", "in"));
        assert_eq!(check.reason.as_deref(), Some("Vertex z does not exist"));
    }

    #[tokio::test]
    async fn test_evaluate() {
        let value = evaluate("user.age + 1", json!({"user": {"age": 41}})).await.unwrap();
        assert_eq!(value, json!(42));
    }
}

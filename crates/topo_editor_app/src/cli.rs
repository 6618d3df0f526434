// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command line arguments.

use crate::error::CliError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;
use topo_editor_engine::{ElementId, LinkPoint};

/// Inspect and edit Topo Editor projects without a canvas
#[derive(Debug, Parser)]
#[command(name = "topo_editor", version, about)]
pub struct Cli {
    /// Engine configuration (RON); defaults apply when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub action: Action,
}

/// What to do
#[derive(Debug, Subcommand)]
pub enum Action {
    /// Load a project and print a summary
    Inspect {
        /// Project file (JSON)
        project: PathBuf,
        /// Command history file (JSON) to attach
        #[arg(long)]
        history: Option<PathBuf>,
        /// Re-execute the history's undo stack on top of the project
        #[arg(long, requires = "history")]
        replay: bool,
    },
    /// Execute commands against a project and save the result
    Exec {
        /// Project file (JSON)
        project: PathBuf,
        /// JSON array of `{"name": ..., "options": ...}`
        #[arg(long)]
        commands: PathBuf,
        /// Commands to undo afterwards
        #[arg(long, default_value_t = 0)]
        undo: usize,
        /// Where to write the project; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Where to write the command history
        #[arg(long)]
        history_out: Option<PathBuf>,
    },
    /// Check whether two ports may be linked
    CheckLink {
        /// Project file (JSON)
        project: PathBuf,
        /// Source endpoint as `vertex:port`
        source: Endpoint,
        /// Target endpoint as `vertex:port`
        target: Endpoint,
    },
    /// Evaluate an expression
    Eval {
        /// Expression text
        expression: String,
        /// State file (JSON object) to evaluate against
        #[arg(long)]
        state: Option<PathBuf>,
    },
}

/// A `vertex:port` pair
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint(pub LinkPoint);

impl FromStr for Endpoint {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once(':') {
            Some((vertex, port)) if !vertex.is_empty() && !port.is_empty() => {
                Ok(Self(LinkPoint::new(ElementId::new(vertex), port)))
            }
            _ => Err(CliError::InvalidEndpoint(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_endpoint_parsing() {
        let endpoint: Endpoint = "v1:out".parse().unwrap();
        assert_eq!(endpoint.0, LinkPoint::new(ElementId::new("v1"), "out"));

        let endpoint: Endpoint = "a:b:c".parse().unwrap();
        assert_eq!(endpoint.0, LinkPoint::new(ElementId::new("a:b"), "c"));

        assert!("v1".parse::<Endpoint>().is_err());
        assert!(":out".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_parse_exec() {
        let cli = Cli::try_parse_from([
            "topo_editor",
            "--json",
            "exec",
            "p.json",
            "--commands",
            "c.json",
            "--undo",
            "2",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.action {
            Action::Exec { undo, output, .. } => {
                assert_eq!(undo, 2);
                assert!(output.is_none());
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_replay_requires_history() {
        assert!(Cli::try_parse_from(["topo_editor", "inspect", "p.json", "--replay"]).is_err());
    }
}

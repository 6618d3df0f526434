// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command line errors.

use std::path::PathBuf;
use topo_editor_engine::{CommandError, ConfigError, GraphError};
use topo_editor_expression::ExpressionError;

/// Anything that stops a command line run
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// File could not be read or written
    #[error("{path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying failure
        source: std::io::Error,
    },

    /// File is not the expected JSON
    #[error("{path}: {source}")]
    Json {
        /// File involved
        path: PathBuf,
        /// Underlying failure
        source: serde_json::Error,
    },

    /// Output could not be encoded
    #[error("Failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),

    /// Engine configuration is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Project could not be loaded
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A command failed
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Expression failed
    #[error(transparent)]
    Expression(#[from] ExpressionError),

    /// Endpoint argument is not `vertex:port`
    #[error("Invalid endpoint {0:?}, expected vertex:port")]
    InvalidEndpoint(String),
}

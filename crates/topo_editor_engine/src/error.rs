// SPDX-License-Identifier: MIT OR Apache-2.0
//! Engine error types.

use crate::element::ElementId;
use crate::validation::LinkRejection;

/// Structural graph errors. The failing operation leaves the graph untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// Referenced vertex is missing
    #[error("Vertex {0} does not exist")]
    VertexNotExist(ElementId),

    /// Element id already present in the project
    #[error("Element {0} already exists")]
    VertexAlreadyExist(ElementId),

    /// Referenced port is missing on the vertex
    #[error("Port {port} does not exist on vertex {vertex}")]
    PortNotExist {
        /// Owning vertex
        vertex: ElementId,
        /// Missing port id
        port: String,
    },

    /// Endpoints fail the link rules
    #[error("Cannot link {source_vertex}.{source_port} to {target_vertex}.{target_port}: {reason}")]
    IllegalLink {
        /// Source vertex
        source_vertex: ElementId,
        /// Source port
        source_port: String,
        /// Target vertex
        target_vertex: ElementId,
        /// Target port
        target_port: String,
        /// First rule that failed
        reason: LinkRejection,
    },

    /// Vertex is not an endpoint of the link
    #[error("Vertex {vertex} is not part of link {link}")]
    IrrelevantLink {
        /// Queried vertex
        vertex: ElementId,
        /// Link queried
        link: ElementId,
    },

    /// Port id declared twice on one vertex
    #[error("Port {port} is declared twice on vertex {vertex}")]
    DuplicatePort {
        /// Owning vertex
        vertex: ElementId,
        /// Duplicated port id
        port: String,
    },
}

/// Command engine errors
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// No command registered under this name
    #[error("Command {0} is not registered")]
    NotRegistered(String),

    /// Command created without options
    #[error("Options of command {0} cannot be empty")]
    NotOptions(String),

    /// Graph mutation failed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Options could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Command cannot run in the current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// RON text is malformed
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// Config could not be written as RON
    #[error("RON write error: {0}")]
    RonWrite(#[from] ron::Error),
}

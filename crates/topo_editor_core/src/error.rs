// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runtime error types.

use topo_editor_expression::ExpressionError;

/// Failure reported by a component method
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct MethodError(pub String);

impl MethodError {
    /// Error with a message
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Effect dispatch errors
#[derive(Debug, thiserror::Error)]
pub enum EffectError {
    /// No page is active
    #[error("No active page")]
    NoActivePage,

    /// Lifecycle call or effect names an unknown component
    #[error("Component {0} does not exist")]
    NodeNotFound(String),

    /// Target instance has no such method
    #[error("Component {node} has no method {method}")]
    MethodNotFound {
        /// Target component
        node: String,
        /// Missing method
        method: String,
    },

    /// Target method failed
    #[error("Method {method} of component {node} failed: {source}")]
    Method {
        /// Target component
        node: String,
        /// Method invoked
        method: String,
        /// Reported failure
        source: MethodError,
    },

    /// Effect names an executor that was never initialized
    #[error("Executor {0} does not exist")]
    ExecutorNotFound(String),

    /// Mapping expression failed
    #[error(transparent)]
    Expression(#[from] ExpressionError),
}

/// HTTP transport failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("HTTP request failed: {message}")]
pub struct HttpError {
    /// Response status, when one arrived
    pub status: Option<u16>,
    /// Failure description
    pub message: String,
    /// Response body, when one arrived
    pub body: Option<serde_json::Value>,
}

/// Executor run errors, recorded in the executor's `error` field
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// No handler registered for the executor type
    #[error("No handler for executor type {0}")]
    UnknownType(String),

    /// Handler-specific fields are malformed
    #[error("Invalid executor config: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    /// Transport failed
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Handler did not finish in time
    #[error("Executor timed out after {0} ms")]
    Timeout(u64),
}

impl ExecutorError {
    /// JSON form stored in the state record
    pub fn to_value(&self) -> serde_json::Value {
        let mut error = serde_json::json!({ "message": self.to_string() });
        if let Self::Http(http) = self {
            if let Some(status) = http.status {
                error["status"] = status.into();
            }
            if let Some(body) = &http.body {
                error["body"] = body.clone();
            }
        }
        error
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Expression errors.

use thiserror::Error;

/// Errors raised while compiling or evaluating an expression
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    /// Invalid character or unterminated literal
    #[error("Lex error at {position}: {message}")]
    Lex {
        /// Byte offset in the source
        position: usize,
        /// What went wrong
        message: String,
    },

    /// Token stream does not form an expression
    #[error("Parse error: {0}")]
    Parse(String),

    /// Call to a function that is not registered
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Pipe to a transform that is not registered
    #[error("Unknown transform: {0}")]
    UnknownTransform(String),

    /// Async function or transform reached by the synchronous evaluator
    #[error("'{0}' is asynchronous and cannot be used in synchronous evaluation")]
    AsyncInSync(String),

    /// Argument of the wrong type
    #[error("Type error in {function}: expected {expected}, got {actual}")]
    Type {
        /// Function or operator name
        function: String,
        /// Expected type
        expected: &'static str,
        /// Actual type
        actual: &'static str,
    },

    /// Any other evaluation failure
    #[error("Evaluation error: {0}")]
    Eval(String),
}

/// Result type for expression operations
pub type ExpressionResult<T> = std::result::Result<T, ExpressionError>;

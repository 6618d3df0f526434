// SPDX-License-Identifier: MIT OR Apache-2.0
//! Expression engine for Topo Editor.
//!
//! This crate provides:
//! - A small Jexl-style expression language (lexer, Pratt parser, evaluator)
//! - A preloaded utility library usable as functions and pipe transforms
//! - Heuristic dependency extraction for expression strings
//! - A shared reactive context and push/pull expression bindings

pub mod ast;
pub mod binding;
pub mod context;
pub mod deps;
pub mod error;
pub mod eval;
pub mod functions;
pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod value;

pub use binding::{ComputedExpression, Expression, ExpressionBinding, Unsubscribe};
pub use context::ReactiveContext;
pub use deps::{DependencyExtractor, DependencyInfo};
pub use error::{ExpressionError, ExpressionResult};
pub use functions::{Callable, FunctionRegistry, Usage};
pub use parser::ExpressionParser;

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Expression syntax tree.

use serde_json::Value;

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!x`
    Not,
    /// `-x`
    Neg,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `//`
    FloorDiv,
    /// `%`
    Mod,
    /// `^`
    Pow,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `in`
    In,
    /// `&&`
    And,
    /// `||`
    Or,
}

impl BinaryOp {
    /// Map an operator token to its variant
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "//" => Self::FloorDiv,
            "%" => Self::Mod,
            "^" => Self::Pow,
            "==" => Self::Eq,
            "!=" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "in" => Self::In,
            "&&" => Self::And,
            "||" => Self::Or,
            _ => return None,
        })
    }

    /// Binding power; higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            Self::And | Self::Or => 10,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::In => 20,
            Self::Add | Self::Sub => 30,
            Self::Mul | Self::Div | Self::FloorDiv | Self::Mod => 40,
            Self::Pow => 50,
        }
    }
}

/// An expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Constant value
    Literal(Value),
    /// `[a, b]`
    Array(Vec<Expr>),
    /// `{key: value}`
    Object(Vec<(String, Expr)>),
    /// Top-level context lookup
    Identifier(String),
    /// `.field` inside a filter, relative to the current element
    Relative(String),
    /// `object.property`
    Member {
        /// Subject
        object: Box<Expr>,
        /// Property name
        property: String,
    },
    /// `object[index]`
    Index {
        /// Subject
        object: Box<Expr>,
        /// Index or key expression
        index: Box<Expr>,
    },
    /// `list[.field == x]`
    Filter {
        /// Subject
        object: Box<Expr>,
        /// Predicate evaluated per element
        predicate: Box<Expr>,
    },
    /// Unary operation
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expr>,
    },
    /// Binary operation
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// `test ? consequent : alternate`
    Conditional {
        /// Condition
        test: Box<Expr>,
        /// Value when truthy
        consequent: Box<Expr>,
        /// Value when falsy
        alternate: Box<Expr>,
    },
    /// `name(args)`
    Call {
        /// Function name
        name: String,
        /// Arguments
        args: Vec<Expr>,
    },
    /// `subject | name(args)`
    Transform {
        /// Transform name
        name: String,
        /// Piped value, passed as the first argument
        subject: Box<Expr>,
        /// Extra arguments
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Whether the expression reads from the relative (filter) scope
    pub fn is_relative(&self) -> bool {
        match self {
            Self::Relative(_) => true,
            Self::Literal(_) | Self::Identifier(_) => false,
            Self::Array(items) => items.iter().any(Self::is_relative),
            Self::Object(entries) => entries.iter().any(|(_, e)| e.is_relative()),
            Self::Member { object, .. } => object.is_relative(),
            Self::Index { object, index } => object.is_relative() || index.is_relative(),
            // A nested filter binds its own scope
            Self::Filter { object, .. } => object.is_relative(),
            Self::Unary { operand, .. } => operand.is_relative(),
            Self::Binary { left, right, .. } => left.is_relative() || right.is_relative(),
            Self::Conditional {
                test,
                consequent,
                alternate,
            } => test.is_relative() || consequent.is_relative() || alternate.is_relative(),
            Self::Call { args, .. } => args.iter().any(Self::is_relative),
            Self::Transform { subject, args, .. } => {
                subject.is_relative() || args.iter().any(Self::is_relative)
            }
        }
    }
}

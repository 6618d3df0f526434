// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pratt parser turning tokens into an [`Expr`] tree.
//!
//! Postfix forms (`.member`, `[index]`, `[.filter]`, `| transform`) bind
//! tightest, then unary operators, then binary operators by precedence,
//! and the ternary conditional loosest.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::{ExpressionError, ExpressionResult};
use crate::lexer::{tokenize, Token};
use serde_json::Value;

/// Parse an expression string
pub fn parse(source: &str) -> ExpressionResult<Expr> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ExpressionError::Parse("empty expression".to_string()));
    }

    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expression()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(ExpressionError::Parse(format!("unexpected token {token:?}"))),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> ExpressionResult<()> {
        match self.next() {
            Some(ref token) if token == expected => Ok(()),
            Some(token) => Err(ExpressionError::Parse(format!(
                "expected {expected:?}, found {token:?}"
            ))),
            None => Err(ExpressionError::Parse(format!(
                "expected {expected:?}, found end of input"
            ))),
        }
    }

    fn ident(&mut self) -> ExpressionResult<String> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(name),
            // Keywords are valid property names after a dot
            Some(Token::Bool(b)) => Ok(b.to_string()),
            Some(Token::Null) => Ok("null".to_string()),
            Some(Token::Op("in")) => Ok("in".to_string()),
            other => Err(ExpressionError::Parse(format!("expected identifier, found {other:?}"))),
        }
    }

    /// Full expression including the ternary conditional
    fn expression(&mut self) -> ExpressionResult<Expr> {
        let test = self.binary(0)?;
        if !self.eat(&Token::Question) {
            return Ok(test);
        }
        let consequent = self.expression()?;
        self.expect(&Token::Colon)?;
        let alternate = self.expression()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn binary(&mut self, min_precedence: u8) -> ExpressionResult<Expr> {
        let mut left = self.unary()?;

        loop {
            let Some(Token::Op(symbol)) = self.peek() else {
                break;
            };
            let Some(op) = BinaryOp::from_symbol(symbol) else {
                break;
            };
            let precedence = op.precedence();
            if precedence <= min_precedence {
                break;
            }
            self.pos += 1;
            let right = self.binary(precedence)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn unary(&mut self) -> ExpressionResult<Expr> {
        let op = match self.peek() {
            Some(Token::Not) => UnaryOp::Not,
            Some(Token::Op("-")) => UnaryOp::Neg,
            _ => return self.postfix(),
        };
        self.pos += 1;
        let operand = self.unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> ExpressionResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    let property = self.ident()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                    };
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let inner = self.expression()?;
                    self.expect(&Token::RBracket)?;
                    expr = if inner.is_relative() {
                        Expr::Filter {
                            object: Box::new(expr),
                            predicate: Box::new(inner),
                        }
                    } else {
                        Expr::Index {
                            object: Box::new(expr),
                            index: Box::new(inner),
                        }
                    };
                }
                Some(Token::Pipe) => {
                    self.pos += 1;
                    let name = self.ident()?;
                    let args = if self.eat(&Token::LParen) {
                        self.arguments(&Token::RParen)?
                    } else {
                        Vec::new()
                    };
                    expr = Expr::Transform {
                        name,
                        subject: Box::new(expr),
                        args,
                    };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn primary(&mut self) -> ExpressionResult<Expr> {
        let Some(token) = self.next() else {
            return Err(ExpressionError::Parse("unexpected end of input".to_string()));
        };

        match token {
            Token::Number(n) => Ok(Expr::Literal(crate::value::number(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::Bool(b) => Ok(Expr::Literal(Value::Bool(b))),
            Token::Null => Ok(Expr::Literal(Value::Null)),
            Token::Ident(name) => {
                if self.eat(&Token::LParen) {
                    let args = self.arguments(&Token::RParen)?;
                    Ok(Expr::Call { name, args })
                } else {
                    Ok(Expr::Identifier(name))
                }
            }
            Token::Dot => Ok(Expr::Relative(self.ident()?)),
            Token::LParen => {
                let inner = self.expression()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => Ok(Expr::Array(self.arguments(&Token::RBracket)?)),
            Token::LBrace => self.object(),
            other => Err(ExpressionError::Parse(format!("unexpected token {other:?}"))),
        }
    }

    /// Comma separated expressions up to `close`
    fn arguments(&mut self, close: &Token) -> ExpressionResult<Vec<Expr>> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.expression()?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(&Token::Comma)?;
        }
    }

    fn object(&mut self) -> ExpressionResult<Expr> {
        let mut entries = Vec::new();
        if self.eat(&Token::RBrace) {
            return Ok(Expr::Object(entries));
        }
        loop {
            let key = match self.next() {
                Some(Token::Str(s) | Token::Ident(s)) => s,
                other => {
                    return Err(ExpressionError::Parse(format!(
                        "expected object key, found {other:?}"
                    )))
                }
            };
            self.expect(&Token::Colon)?;
            entries.push((key, self.expression()?));
            if self.eat(&Token::RBrace) {
                return Ok(Expr::Object(entries));
            }
            self.expect(&Token::Comma)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Identifier(name.to_string()))
    }

    #[test]
    fn test_precedence() {
        let expr = parse("a + b * 2").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                left: ident("a"),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: ident("b"),
                    right: Box::new(Expr::Literal(json!(2))),
                }),
            }
        );
    }

    #[test]
    fn test_filter_versus_index() {
        assert!(matches!(parse("items[.id == 3]").unwrap(), Expr::Filter { .. }));
        assert!(matches!(parse("items[0]").unwrap(), Expr::Index { .. }));
        assert!(matches!(parse("items['key']").unwrap(), Expr::Index { .. }));
    }

    #[test]
    fn test_transform_binds_to_operand() {
        let expr = parse("1 + x | double(2)").unwrap();
        let Expr::Binary { right, .. } = expr else {
            panic!("expected binary");
        };
        assert_eq!(
            *right,
            Expr::Transform {
                name: "double".into(),
                subject: ident("x"),
                args: vec![Expr::Literal(json!(2))],
            }
        );
    }

    #[test]
    fn test_ternary_and_literals() {
        let expr = parse("ok ? {a: [1, 'x']} : null").unwrap();
        assert!(matches!(expr, Expr::Conditional { .. }));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("").is_err());
        assert!(parse("a +").is_err());
        assert!(parse("(a").is_err());
        assert!(parse("a b").is_err());
    }
}

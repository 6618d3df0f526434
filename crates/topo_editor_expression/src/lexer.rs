// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tokenizer for expression strings.

use crate::error::{ExpressionError, ExpressionResult};

/// A lexical token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Numeric literal
    Number(f64),
    /// Quoted string literal (escapes resolved)
    Str(String),
    /// `true` / `false`
    Bool(bool),
    /// `null`
    Null,
    /// Identifier
    Ident(String),
    /// Binary operator, including the word operator `in`
    Op(&'static str),
    /// `!`
    Not,
    /// `.`
    Dot,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `?`
    Question,
    /// `|` (transform pipe)
    Pipe,
}

/// Operators ordered longest first so greedy matching works
const OPERATORS: &[&str] = &[
    "==", "!=", "<=", ">=", "&&", "||", "//", "+", "-", "*", "/", "%", "^", "<", ">",
];

/// Split an expression into tokens
pub fn tokenize(source: &str) -> ExpressionResult<Vec<Token>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        match c {
            b' ' | b'\t' | b'\n' | b'\r' => pos += 1,
            b'0'..=b'9' => {
                let start = pos;
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
                if pos + 1 < bytes.len() && bytes[pos] == b'.' && bytes[pos + 1].is_ascii_digit() {
                    pos += 1;
                    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                        pos += 1;
                    }
                }
                let text = &source[start..pos];
                let value = text.parse::<f64>().map_err(|_| ExpressionError::Lex {
                    position: start,
                    message: format!("invalid number '{text}'"),
                })?;
                tokens.push(Token::Number(value));
            }
            b'"' | b'\'' => {
                let (literal, next) = read_string(source, pos)?;
                tokens.push(Token::Str(literal));
                pos = next;
            }
            c if c.is_ascii_alphabetic() || c == b'_' || c == b'$' => {
                let start = pos;
                while pos < bytes.len()
                    && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_' || bytes[pos] == b'$')
                {
                    pos += 1;
                }
                tokens.push(match &source[start..pos] {
                    "true" => Token::Bool(true),
                    "false" => Token::Bool(false),
                    "null" => Token::Null,
                    "in" => Token::Op("in"),
                    word => Token::Ident(word.to_string()),
                });
            }
            b'.' => {
                tokens.push(Token::Dot);
                pos += 1;
            }
            b'[' => {
                tokens.push(Token::LBracket);
                pos += 1;
            }
            b']' => {
                tokens.push(Token::RBracket);
                pos += 1;
            }
            b'(' => {
                tokens.push(Token::LParen);
                pos += 1;
            }
            b')' => {
                tokens.push(Token::RParen);
                pos += 1;
            }
            b'{' => {
                tokens.push(Token::LBrace);
                pos += 1;
            }
            b'}' => {
                tokens.push(Token::RBrace);
                pos += 1;
            }
            b',' => {
                tokens.push(Token::Comma);
                pos += 1;
            }
            b':' => {
                tokens.push(Token::Colon);
                pos += 1;
            }
            b'?' => {
                tokens.push(Token::Question);
                pos += 1;
            }
            _ => {
                let rest = &source[pos..];
                if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
                    tokens.push(Token::Op(*op));
                    pos += op.len();
                } else if c == b'|' {
                    tokens.push(Token::Pipe);
                    pos += 1;
                } else if c == b'!' {
                    tokens.push(Token::Not);
                    pos += 1;
                } else {
                    let ch = rest.chars().next().unwrap_or('?');
                    return Err(ExpressionError::Lex {
                        position: pos,
                        message: format!("unexpected character '{ch}'"),
                    });
                }
            }
        }
    }

    Ok(tokens)
}

/// Read a quoted literal starting at `start`; returns the text and the
/// position after the closing quote.
fn read_string(source: &str, start: usize) -> ExpressionResult<(String, usize)> {
    let mut chars = source[start..].char_indices();
    let Some((_, quote)) = chars.next() else {
        return Err(ExpressionError::Lex {
            position: start,
            message: "expected string".to_string(),
        });
    };

    let mut out = String::new();
    while let Some((offset, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, escaped)) => out.push(escaped),
                None => break,
            },
            c if c == quote => return Ok((out, start + offset + c.len_utf8())),
            c => out.push(c),
        }
    }

    Err(ExpressionError::Lex {
        position: start,
        message: "unterminated string".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_mixed() {
        let tokens = tokenize("a.b[0] >= 1.5 && 'x\\'y' | upper").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("a".into()),
                Token::Dot,
                Token::Ident("b".into()),
                Token::LBracket,
                Token::Number(0.0),
                Token::RBracket,
                Token::Op(">="),
                Token::Number(1.5),
                Token::Op("&&"),
                Token::Str("x'y".into()),
                Token::Pipe,
                Token::Ident("upper".into()),
            ]
        );
    }

    #[test]
    fn test_pipe_versus_or() {
        let tokens = tokenize("a || b | c").unwrap();
        assert_eq!(tokens[1], Token::Op("||"));
        assert_eq!(tokens[3], Token::Pipe);
    }

    #[test]
    fn test_lex_errors() {
        assert!(matches!(tokenize("'open"), Err(ExpressionError::Lex { .. })));
        assert!(matches!(tokenize("a # b"), Err(ExpressionError::Lex { position: 2, .. })));
    }
}

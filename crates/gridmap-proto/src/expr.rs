//! Arithmetic evaluation for formula-valued properties.
//!
//! Definition files write draw-order layers like `"2.1 + 0.01"` or
//! `"(3 - 1) * 2"`. This module evaluates that subset: decimal literals,
//! `+ - * /`, unary minus, and parentheses. Anything else (identifiers,
//! dangling input, division by zero) is an [`ProtoError::Expression`]; the
//! caller decides whether that is fatal. [`draw_order_of`] is the forgiving
//! wrapper used for ordering: it logs the failure and falls back to `0`.

use gridmap_types::{PropertyMap, Value};
use tracing::warn;

use crate::error::{ProtoError, ProtoResult};

/// The property consulted for draw/processing order.
pub const LAYER_PROPERTY: &str = "layer";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn fail(expr: &str, reason: impl Into<String>) -> ProtoError {
    ProtoError::Expression {
        expr: expr.to_string(),
        reason: reason.into(),
    }
}

fn tokenize(src: &str) -> ProtoResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '0'..='9' | '.' => {
                let mut end = start;
                while let Some(&(idx, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        end = idx + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &src[start..end];
                let value: f64 = text
                    .parse()
                    .map_err(|_| fail(src, format!("bad number {text:?}")))?;
                tokens.push(Token::Number(value));
            }
            other => return Err(fail(src, format!("unexpected character {other:?}"))),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> ProtoResult<f64> {
        let mut acc = self.term()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.next();
                    acc += self.term()?;
                }
                Token::Minus => {
                    self.next();
                    acc -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(acc)
    }

    // term := factor (('*' | '/') factor)*
    fn term(&mut self) -> ProtoResult<f64> {
        let mut acc = self.factor()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Star => {
                    self.next();
                    acc *= self.factor()?;
                }
                Token::Slash => {
                    self.next();
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err(fail(self.src, "division by zero"));
                    }
                    acc /= divisor;
                }
                _ => break,
            }
        }
        Ok(acc)
    }

    // factor := '-' factor | number | '(' expr ')'
    fn factor(&mut self) -> ProtoResult<f64> {
        match self.next() {
            Some(Token::Minus) => Ok(-self.factor()?),
            Some(Token::Number(value)) => Ok(value),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(fail(self.src, "unclosed parenthesis")),
                }
            }
            Some(other) => Err(fail(self.src, format!("unexpected token {other:?}"))),
            None => Err(fail(self.src, "unexpected end of expression")),
        }
    }
}

/// Evaluate an arithmetic formula.
pub fn eval(src: &str) -> ProtoResult<f64> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        src,
        tokens,
        pos: 0,
    };
    let value = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(fail(src, "trailing input"));
    }
    Ok(value)
}

/// Evaluate one layer value as a number or formula, falling back to `0` on
/// any failure (logged, never an error) so ordering can always proceed.
pub fn draw_order_value(value: &Value) -> f64 {
    if let Some(n) = value.as_number() {
        return n;
    }
    let Some(text) = value.as_raw() else {
        warn!(layer = %value, "non-numeric layer property, using 0");
        return 0.0;
    };
    match eval(text) {
        Ok(n) => n,
        Err(err) => {
            warn!(layer = text, %err, "failed to evaluate layer formula, using 0");
            0.0
        }
    }
}

/// Draw order of a property map: the `layer` property through
/// [`draw_order_value`], `0` when absent.
pub fn draw_order_of(properties: &PropertyMap) -> f64 {
    properties
        .get(LAYER_PROPERTY)
        .map_or(0.0, |prop| draw_order_value(&prop.value))
}

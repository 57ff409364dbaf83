// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! Arithmetic evaluation for `$(( ... ))` (spec §4.I step 4): integer
//! expressions over `+ - * / % ( )` and bare variable references.

use std::collections::HashMap;

use super::ExpansionError;

struct ArithLexer<'a> {
    chars: Vec<char>,
    pos: usize,
    vars: &'a HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Num(i64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Eof,
}

impl<'a> ArithLexer<'a> {
    fn new(src: &'a str, vars: &'a HashMap<String, String>) -> Self {
        Self { chars: src.chars().collect(), pos: 0, vars }
    }

    fn tokens(mut self) -> Result<Vec<Tok>, ExpansionError> {
        let mut out = Vec::new();
        loop {
            while matches!(self.chars.get(self.pos), Some(c) if c.is_whitespace()) {
                self.pos += 1;
            }
            match self.chars.get(self.pos).copied() {
                None => {
                    out.push(Tok::Eof);
                    break;
                }
                Some('+') => {
                    out.push(Tok::Plus);
                    self.pos += 1;
                }
                Some('-') => {
                    out.push(Tok::Minus);
                    self.pos += 1;
                }
                Some('*') => {
                    out.push(Tok::Star);
                    self.pos += 1;
                }
                Some('/') => {
                    out.push(Tok::Slash);
                    self.pos += 1;
                }
                Some('%') => {
                    out.push(Tok::Percent);
                    self.pos += 1;
                }
                Some('(') => {
                    out.push(Tok::LParen);
                    self.pos += 1;
                }
                Some(')') => {
                    out.push(Tok::RParen);
                    self.pos += 1;
                }
                Some(c) if c.is_ascii_digit() => {
                    let start = self.pos;
                    while matches!(self.chars.get(self.pos), Some(c) if c.is_ascii_digit()) {
                        self.pos += 1;
                    }
                    let text: String = self.chars[start..self.pos].iter().collect();
                    out.push(Tok::Num(text.parse().map_err(|_| {
                        ExpansionError(format!("invalid integer literal: {text}"))
                    })?));
                }
                Some(c) if c == '_' || c.is_alphabetic() => {
                    let start = self.pos;
                    while matches!(self.chars.get(self.pos), Some(c) if c == '_' || c.is_alphanumeric()) {
                        self.pos += 1;
                    }
                    let name: String = self.chars[start..self.pos].iter().collect();
                    let value = self
                        .vars
                        .get(&name)
                        .and_then(|v| v.trim().parse::<i64>().ok())
                        .unwrap_or(0);
                    out.push(Tok::Num(value));
                }
                Some(c) => return Err(ExpansionError(format!("unexpected character in arithmetic expression: {c:?}"))),
            }
        }
        Ok(out)
    }
}

struct Evaluator {
    tokens: Vec<Tok>,
    pos: usize,
}

impl Evaluator {
    fn peek(&self) -> &Tok {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Tok {
        let t = self.tokens[self.pos].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn expr(&mut self) -> Result<i64, ExpansionError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Tok::Plus => {
                    self.advance();
                    value += self.term()?;
                }
                Tok::Minus => {
                    self.advance();
                    value -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<i64, ExpansionError> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Tok::Star => {
                    self.advance();
                    value *= self.unary()?;
                }
                Tok::Slash => {
                    self.advance();
                    let rhs = self.unary()?;
                    if rhs == 0 {
                        return Err(ExpansionError("division by zero".to_string()));
                    }
                    value /= rhs;
                }
                Tok::Percent => {
                    self.advance();
                    let rhs = self.unary()?;
                    if rhs == 0 {
                        return Err(ExpansionError("division by zero".to_string()));
                    }
                    value %= rhs;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<i64, ExpansionError> {
        match self.peek() {
            Tok::Minus => {
                self.advance();
                Ok(-self.unary()?)
            }
            Tok::Plus => {
                self.advance();
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<i64, ExpansionError> {
        match self.advance() {
            Tok::Num(n) => Ok(n),
            Tok::LParen => {
                let value = self.expr()?;
                if self.advance() != Tok::RParen {
                    return Err(ExpansionError("expected ')' in arithmetic expression".to_string()));
                }
                Ok(value)
            }
            other => Err(ExpansionError(format!("unexpected token in arithmetic expression: {other:?}"))),
        }
    }
}

/// Evaluate an integer expression (the text between `$((` and `))`,
/// exclusive) against the shell's current variables.
pub fn eval(expr: &str, vars: &HashMap<String, String>) -> Result<i64, ExpansionError> {
    let tokens = ArithLexer::new(expr, vars).tokens()?;
    let mut evaluator = Evaluator { tokens, pos: 0 };
    let value = evaluator.expr()?;
    if evaluator.peek() != &Tok::Eof {
        return Err(ExpansionError("trailing characters in arithmetic expression".to_string()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn basic_arithmetic() {
        assert_eq!(eval("1 + 2 * 3", &vars(&[])).unwrap(), 7);
        assert_eq!(eval("(1 + 2) * 3", &vars(&[])).unwrap(), 9);
        assert_eq!(eval("10 % 3", &vars(&[])).unwrap(), 1);
        assert_eq!(eval("-5 + 2", &vars(&[])).unwrap(), -3);
    }

    #[test]
    fn variable_references() {
        assert_eq!(eval("x + 1", &vars(&[("x", "41")])).unwrap(), 42);
        assert_eq!(eval("missing + 1", &vars(&[])).unwrap(), 1);
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(eval("1 / 0", &vars(&[])).is_err());
    }
}

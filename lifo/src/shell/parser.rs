// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! The shell parser (spec §4.H): LL(1) recursive descent over the lexer's
//! token stream, precedence loose to tight `;`/newline → `&&`/`||` → `|` →
//! command.

use thiserror::Error;

use lifo_domain::shell_ast::{
    Command, Connector, List, Pipeline, RedirOp, Redirection, Quoting, Script, SimpleCommand, Token,
    TokenKind, WordPart,
};

use super::lexer::Lexer;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("parse error at byte {position}: {message}")]
pub struct ParseError {
    pub position: usize,
    pub message: String,
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Lex and parse a full script in one step.
    pub fn parse_script(src: &str) -> Result<Script, ParseError> {
        Parser::new(Lexer::tokenize(src)).script()
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind.clone()
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            position: self.peek().span.start,
            message: message.into(),
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Semi | TokenKind::Newline) {
            self.advance();
        }
    }

    pub fn script(&mut self) -> Result<Script, ParseError> {
        let mut lists = Vec::new();
        self.skip_separators();
        while self.peek_kind() != TokenKind::Eof {
            lists.push(self.list()?);
            self.skip_separators();
        }
        Ok(lists)
    }

    /// Parse one `List`, stopping at `;`, newline, `)`, or EOF. A trailing
    /// `&` marks it to run in the background.
    fn list(&mut self) -> Result<List, ParseError> {
        let mut entries = Vec::new();
        loop {
            let pipeline = self.pipeline()?;
            let connector = match self.peek_kind() {
                TokenKind::And => {
                    self.advance();
                    Connector::And
                }
                TokenKind::Or => {
                    self.advance();
                    Connector::Or
                }
                _ => Connector::None,
            };
            let is_last = connector == Connector::None;
            entries.push((pipeline, connector));
            if is_last {
                break;
            }
        }
        let background = if self.peek_kind() == TokenKind::Amp {
            self.advance();
            true
        } else {
            false
        };
        Ok(List { entries, background })
    }

    fn pipeline(&mut self) -> Result<Pipeline, ParseError> {
        let negated = if self.is_bang() {
            self.advance();
            true
        } else {
            false
        };
        let mut commands = vec![self.command()?];
        while self.peek_kind() == TokenKind::Pipe {
            self.advance();
            commands.push(self.command()?);
        }
        Ok(Pipeline { commands, negated })
    }

    /// `!` is a reserved word recognized by the parser, not an operator
    /// token from the lexer (spec §4.J "a leading `!` inverts it").
    fn is_bang(&self) -> bool {
        let tok = self.peek();
        tok.kind == TokenKind::Word && tok.lexeme == "!" && is_unquoted_literal(tok, "!")
    }

    fn command(&mut self) -> Result<Command, ParseError> {
        if self.peek_kind() == TokenKind::LParen {
            self.advance();
            let inner = self.list()?;
            if self.peek_kind() != TokenKind::RParen {
                return Err(self.error("expected ')' to close grouped command"));
            }
            self.advance();
            Ok(Command::Grouped(Box::new(inner)))
        } else {
            Ok(Command::Simple(self.simple_command()?))
        }
    }

    fn simple_command(&mut self) -> Result<SimpleCommand, ParseError> {
        let mut assignments = Vec::new();
        let mut words = Vec::new();
        let mut redirections = Vec::new();
        let mut still_collecting_assignments = true;

        loop {
            match self.peek_kind() {
                TokenKind::Word => {
                    let tok = self.peek().clone();
                    if still_collecting_assignments {
                        if let Some((name, value_parts)) = split_assignment(&tok) {
                            self.advance();
                            assignments.push((name, value_parts));
                            continue;
                        }
                        still_collecting_assignments = false;
                    }
                    self.advance();
                    words.push(tok.parts.unwrap_or_default());
                }
                TokenKind::RedirectOut
                | TokenKind::RedirectAppend
                | TokenKind::RedirectIn
                | TokenKind::RedirectErr
                | TokenKind::RedirectErrAppend
                | TokenKind::RedirectAll => {
                    let op_tok = self.advance();
                    let op = redir_op(&op_tok.kind);
                    if self.peek_kind() != TokenKind::Word {
                        return Err(self.error("expected a redirection target"));
                    }
                    let target_tok = self.advance();
                    redirections.push(Redirection {
                        op,
                        target: target_tok.parts.unwrap_or_default(),
                    });
                }
                _ => break,
            }
        }

        if assignments.is_empty() && words.is_empty() && redirections.is_empty() {
            return Err(self.error(format!("unexpected token {:?}", self.peek_kind())));
        }
        Ok(SimpleCommand { assignments, words, redirections })
    }
}

fn redir_op(kind: &TokenKind) -> RedirOp {
    match kind {
        TokenKind::RedirectOut => RedirOp::Out,
        TokenKind::RedirectAppend => RedirOp::Append,
        TokenKind::RedirectIn => RedirOp::In,
        TokenKind::RedirectErr => RedirOp::ErrOut,
        TokenKind::RedirectErrAppend => RedirOp::ErrAppend,
        TokenKind::RedirectAll => RedirOp::All,
        other => unreachable!("not a redirection token: {other:?}"),
    }
}

fn is_unquoted_literal(tok: &Token, text: &str) -> bool {
    match &tok.parts {
        Some(parts) if parts.len() == 1 => parts[0].quoting == Quoting::Raw && parts[0].text == text,
        _ => false,
    }
}

/// `NAME=VALUE` recognized only while still in the leading run of
/// assignments (spec §4.H): the name must come from an unquoted raw part at
/// the very start of the word.
fn split_assignment(tok: &Token) -> Option<(String, Vec<WordPart>)> {
    let parts = tok.parts.as_ref()?;
    let first = parts.first()?;
    if first.quoting != Quoting::Raw {
        return None;
    }
    let eq_idx = first.text.find('=')?;
    let name = &first.text[..eq_idx];
    if name.is_empty() || !is_identifier(name) {
        return None;
    }
    let mut value_parts = Vec::new();
    let rest = &first.text[eq_idx + 1..];
    if !rest.is_empty() || parts.len() == 1 {
        value_parts.push(WordPart::raw(rest));
    }
    value_parts.extend(parts[1..].iter().cloned());
    Some((name.to_string(), value_parts))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Script {
        Parser::parse_script(src).unwrap()
    }

    fn word_text(parts: &[WordPart]) -> String {
        parts.iter().map(|p| p.text.as_str()).collect()
    }

    #[test]
    fn simple_command_with_args() {
        let script = parse("echo hello world");
        assert_eq!(script.len(), 1);
        let Command::Simple(cmd) = &script[0].entries[0].0.commands[0] else { panic!() };
        assert_eq!(cmd.words.len(), 3);
        assert_eq!(word_text(&cmd.words[0]), "echo");
        assert_eq!(word_text(&cmd.words[2]), "world");
    }

    #[test]
    fn pipeline_has_two_stages() {
        let script = parse("echo hi | tr a-z A-Z");
        let pipeline = &script[0].entries[0].0;
        assert_eq!(pipeline.commands.len(), 2);
        assert!(!pipeline.negated);
    }

    #[test]
    fn negated_pipeline() {
        let script = parse("! false");
        let pipeline = &script[0].entries[0].0;
        assert!(pipeline.negated);
        assert_eq!(pipeline.commands.len(), 1);
    }

    #[test]
    fn and_or_connectors() {
        let script = parse("true && echo yes || echo no");
        let entries = &script[0].entries;
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].1, Connector::And);
        assert_eq!(entries[1].1, Connector::Or);
        assert_eq!(entries[2].1, Connector::None);
    }

    #[test]
    fn background_flag() {
        let script = parse("sleep 10 &");
        assert!(script[0].background);
    }

    #[test]
    fn redirection_attaches_to_command() {
        let script = parse("echo hi > /tmp/out.txt 2>> /tmp/err.log");
        let Command::Simple(cmd) = &script[0].entries[0].0.commands[0] else { panic!() };
        assert_eq!(cmd.redirections.len(), 2);
        assert_eq!(cmd.redirections[0].op, RedirOp::Out);
        assert_eq!(word_text(&cmd.redirections[0].target), "/tmp/out.txt");
        assert_eq!(cmd.redirections[1].op, RedirOp::ErrAppend);
    }

    #[test]
    fn leading_assignments_collected_separately() {
        let script = parse("FOO=bar BAZ=qux env");
        let Command::Simple(cmd) = &script[0].entries[0].0.commands[0] else { panic!() };
        assert_eq!(cmd.assignments.len(), 2);
        assert_eq!(cmd.assignments[0].0, "FOO");
        assert_eq!(word_text(&cmd.assignments[0].1), "bar");
        assert_eq!(cmd.words.len(), 1);
    }

    #[test]
    fn assignment_looking_word_after_a_command_word_is_an_argument() {
        let script = parse("echo FOO=bar");
        let Command::Simple(cmd) = &script[0].entries[0].0.commands[0] else { panic!() };
        assert!(cmd.assignments.is_empty());
        assert_eq!(cmd.words.len(), 2);
        assert_eq!(word_text(&cmd.words[1]), "FOO=bar");
    }

    #[test]
    fn grouped_command_in_parens() {
        let script = parse("(echo a; echo b)");
        let Command::Grouped(inner) = &script[0].entries[0].0.commands[0] else { panic!() };
        assert_eq!(inner.entries.len(), 2);
    }

    #[test]
    fn multiple_lists_separated_by_newline() {
        let script = parse("echo a\necho b");
        assert_eq!(script.len(), 2);
    }

    #[test]
    fn unclosed_group_is_a_parse_error() {
        assert!(Parser::parse_script("(echo a").is_err());
    }
}

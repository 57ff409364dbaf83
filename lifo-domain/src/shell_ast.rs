// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! Token and AST types shared by the lexer, parser, expander, and executor
//! (spec §3 "Token (shell)" / "AST", §4.G–§4.J).

/// How a word part was quoted; governs later expansion (word splitting,
/// globbing, and substitution all key off this).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    Raw,
    Single,
    Double,
}

/// One piece of a `Word` token. Concatenating `text` across all parts of a
/// word yields the combined (unexpanded) lexeme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordPart {
    pub text: String,
    pub quoting: Quoting,
}

impl WordPart {
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoting: Quoting::Raw,
        }
    }
}

/// Byte offset span of a token in the source line, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Pipe,
    And,
    Or,
    Amp,
    Semi,
    DoubleSemi,
    LParen,
    RParen,
    Newline,
    RedirectOut,
    RedirectAppend,
    RedirectIn,
    RedirectErr,
    RedirectErrAppend,
    RedirectAll,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
    /// Populated only for `Word` tokens.
    pub parts: Option<Vec<WordPart>>,
}

impl Token {
    pub fn simple(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
            parts: None,
        }
    }

    pub fn word(parts: Vec<WordPart>, span: Span) -> Self {
        let lexeme = parts.iter().map(|p| p.text.as_str()).collect::<String>();
        Self {
            kind: TokenKind::Word,
            lexeme,
            span,
            parts: Some(parts),
        }
    }
}

/// Redirection operator (spec §3 AST: `op ∈ {>, >>, <, 2>, 2>>, &>}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirOp {
    Out,
    Append,
    In,
    ErrOut,
    ErrAppend,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub op: RedirOp,
    pub target: Vec<WordPart>,
}

/// A single, non-pipeline, non-compound command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimpleCommand {
    pub assignments: Vec<(String, Vec<WordPart>)>,
    pub words: Vec<Vec<WordPart>>,
    pub redirections: Vec<Redirection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Simple(SimpleCommand),
    /// A parenthesized sub-list, run in its own scope.
    Grouped(Box<List>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
    pub negated: bool,
}

/// How a list entry's execution depends on the previous entry's exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    /// Each pipeline paired with the connector that follows it, i.e. the
    /// connector the executor inspects on the *previous* entry to decide
    /// whether to run the *next* one (the connector on the last entry is
    /// always `None`).
    pub entries: Vec<(Pipeline, Connector)>,
    pub background: bool,
}

pub type Script = Vec<List>;

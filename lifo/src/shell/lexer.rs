// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! The shell lexer (spec §4.G).
//!
//! Turns a script into a flat token stream. Quoting and substitution spans
//! are tracked but never recursed into — `$(...)`, `$((...))`, and
//! `${...}` are captured as raw text for the parser/expander to deal with
//! later (spec: "the lexer never recurses into substitutions — it records
//! their textual span only").

use lifo_domain::shell_ast::{Quoting, RedirOp, Span, Token, TokenKind, WordPart};

pub struct Lexer<'a> {
    chars: Vec<(usize, char)>,
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            chars: src.char_indices().collect(),
            src,
            pos: 0,
        }
    }

    pub fn tokenize(src: &'a str) -> Vec<Token> {
        let mut lexer = Self::new(src);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token();
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).map(|(_, c)| *c)
    }

    fn byte_offset(&self) -> usize {
        self.chars.get(self.pos).map(|(b, _)| *b).unwrap_or(self.src.len())
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn next_token(&mut self) -> Token {
        loop {
            match self.peek() {
                None => return Token::simple(TokenKind::Eof, "", self.span_here()),
                Some(' ') | Some('\t') => {
                    self.advance();
                    continue;
                }
                Some('\n') => {
                    let start = self.byte_offset();
                    self.advance();
                    return Token::simple(TokenKind::Newline, "\n", Span { start, end: start + 1 });
                }
                Some('#') => {
                    // Comment at a word boundary: drop to end of line.
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                    continue;
                }
                Some(c) if is_operator_start(c) || is_stderr_redirect_start(self) => {
                    return self.lex_operator()
                }
                _ => return self.lex_word(),
            }
        }
    }

    fn span_here(&self) -> Span {
        let p = self.byte_offset();
        Span { start: p, end: p }
    }

    fn lex_operator(&mut self) -> Token {
        let start = self.byte_offset();
        let c = self.advance().expect("caller checked peek");
        let (kind, len) = match c {
            '|' if self.peek() == Some('|') => {
                self.advance();
                (TokenKind::Or, 2)
            }
            '|' => (TokenKind::Pipe, 1),
            '&' if self.peek() == Some('&') => {
                self.advance();
                (TokenKind::And, 2)
            }
            '&' if self.peek() == Some('>') => {
                self.advance();
                (TokenKind::RedirectAll, 2)
            }
            '&' => (TokenKind::Amp, 1),
            ';' if self.peek() == Some(';') => {
                self.advance();
                (TokenKind::DoubleSemi, 2)
            }
            ';' => (TokenKind::Semi, 1),
            '(' => (TokenKind::LParen, 1),
            ')' => (TokenKind::RParen, 1),
            '>' if self.peek() == Some('>') => {
                self.advance();
                (TokenKind::RedirectAppend, 2)
            }
            '>' => (TokenKind::RedirectOut, 1),
            '<' => (TokenKind::RedirectIn, 1),
            // `2>`/`2>>` only act as redirect operators when lexed fresh at
            // a word boundary (the only place lex_operator is invoked from
            // for a leading digit; see `is_operator_start`).
            '2' if self.peek() == Some('>') && self.peek_at(1) == Some('>') => {
                self.advance();
                self.advance();
                (TokenKind::RedirectErrAppend, 3)
            }
            '2' if self.peek() == Some('>') => {
                self.advance();
                (TokenKind::RedirectErr, 2)
            }
            other => unreachable!("lex_operator called on non-operator char {other:?}"),
        };
        let end = self.byte_offset();
        let lexeme = &self.src[start..end];
        debug_assert_eq!(lexeme.chars().count(), len);
        Token::simple(kind, lexeme, Span { start, end })
    }

    fn lex_word(&mut self) -> Token {
        let start = self.byte_offset();
        let mut parts: Vec<WordPart> = Vec::new();
        let mut current_kind = Quoting::Raw;
        let mut buf = String::new();

        macro_rules! flush {
            () => {
                if !buf.is_empty() {
                    parts.push(WordPart { text: std::mem::take(&mut buf), quoting: current_kind });
                }
            };
        }

        loop {
            match self.peek() {
                None => break,
                Some(' ') | Some('\t') | Some('\n') => break,
                Some(c) if is_operator_start(c) => break,
                Some('\'') => {
                    flush!();
                    current_kind = Quoting::Single;
                    self.advance();
                    while let Some(c) = self.peek() {
                        if c == '\'' {
                            break;
                        }
                        buf.push(c);
                        self.advance();
                    }
                    self.advance(); // closing quote, if any
                    flush!();
                    current_kind = Quoting::Raw;
                }
                Some('"') => {
                    flush!();
                    current_kind = Quoting::Double;
                    self.advance();
                    self.lex_double_quoted_body(&mut buf);
                    flush!();
                    current_kind = Quoting::Raw;
                }
                Some('\\') => {
                    self.advance();
                    if let Some(c) = self.advance() {
                        buf.push(c);
                    } else {
                        buf.push('\\');
                    }
                }
                Some('$') => self.lex_dollar(&mut buf),
                Some(c) => {
                    buf.push(c);
                    self.advance();
                }
            }
        }
        flush!();
        let end = self.byte_offset();
        if parts.is_empty() {
            parts.push(WordPart::raw(""));
        }
        Token::word(parts, Span { start, end })
    }

    /// Scan the inside of a double-quoted string into `buf` (spec §4.G word
    /// composition rules for `"..."`), leaving the cursor past the closing
    /// quote. `$(...)` spans are copied verbatim with paren-depth tracking
    /// rather than re-parsed, per spec.
    fn lex_double_quoted_body(&mut self, buf: &mut String) {
        loop {
            match self.peek() {
                None => break,
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.peek() {
                        Some(c @ ('"' | '\\' | '$' | '`')) => {
                            buf.push(c);
                            self.advance();
                        }
                        Some(c) => {
                            buf.push('\\');
                            buf.push(c);
                            self.advance();
                        }
                        None => buf.push('\\'),
                    }
                }
                Some('$') if self.peek_at(1) == Some('(') => {
                    self.copy_dollar_paren(buf);
                }
                Some(c) => {
                    buf.push(c);
                    self.advance();
                }
            }
        }
    }

    /// Handle a `$` seen outside quotes: variable reference, `${...}`,
    /// `$(...)`, or `$((...))`, all captured as raw text (spec §4.G).
    fn lex_dollar(&mut self, buf: &mut String) {
        debug_assert_eq!(self.peek(), Some('$'));
        match self.peek_at(1) {
            Some('(') => self.copy_dollar_paren(buf),
            Some('{') => self.copy_braced(buf),
            Some(c) if c == '_' || c.is_alphabetic() => self.copy_var_name(buf),
            Some(c) if c.is_ascii_digit() => {
                buf.push('$');
                buf.push(c);
                self.advance();
                self.advance();
            }
            Some(c @ ('#' | '?' | '@' | '*')) => {
                buf.push('$');
                buf.push(c);
                self.advance();
                self.advance();
            }
            _ => {
                buf.push('$');
                self.advance();
            }
        }
    }

    fn copy_var_name(&mut self, buf: &mut String) {
        buf.push('$');
        self.advance();
        while let Some(c) = self.peek() {
            if c == '_' || c.is_alphanumeric() {
                buf.push(c);
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Copy `${...}` verbatim, tracking brace depth so a nested
    /// `${X:-${Y}}` default doesn't close early.
    fn copy_braced(&mut self, buf: &mut String) {
        buf.push('$');
        self.advance(); // '$'
        buf.push('{');
        self.advance(); // '{'
        let mut depth = 1;
        while depth > 0 {
            match self.advance() {
                Some('{') => {
                    depth += 1;
                    buf.push('{');
                }
                Some('}') => {
                    depth -= 1;
                    buf.push('}');
                }
                Some(c) => buf.push(c),
                None => break,
            }
        }
    }

    /// Copy `$(...)` or `$((...))` verbatim, tracking paren depth (spec:
    /// "parentheses balanced with depth tracking").
    fn copy_dollar_paren(&mut self, buf: &mut String) {
        buf.push('$');
        self.advance(); // '$'
        buf.push('(');
        self.advance(); // '('
        let mut depth = 1;
        if self.peek() == Some('(') {
            buf.push('(');
            self.advance();
            depth += 1;
        }
        while depth > 0 {
            match self.advance() {
                Some('(') => {
                    depth += 1;
                    buf.push('(');
                }
                Some(')') => {
                    depth -= 1;
                    buf.push(')');
                }
                Some(c) => buf.push(c),
                None => break,
            }
        }
    }
}

fn is_operator_start(c: char) -> bool {
    matches!(c, '|' | '&' | ';' | '(' | ')' | '>' | '<')
}

/// `2>`/`2>>` are operators only when the `2` opens a brand-new token (spec
/// §4.G); a `2` that's part of an already-started word (e.g. `file2>x`,
/// which lexes as the word `file2` then `>`) is just another character and
/// never reaches this check.
fn is_stderr_redirect_start(lexer: &Lexer) -> bool {
    lexer.peek() == Some('2') && lexer.peek_at(1) == Some('>')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::tokenize(src).into_iter().map(|t| t.kind).collect()
    }

    fn lexemes(src: &str) -> Vec<String> {
        Lexer::tokenize(src).into_iter().map(|t| t.lexeme).collect()
    }

    #[test]
    fn simple_pipeline() {
        assert_eq!(
            kinds("echo hi | tr a-z A-Z"),
            vec![
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::Pipe,
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn redirection_operators() {
        assert_eq!(
            kinds("cmd > out.txt 2>> err.log &> both.log < in.txt"),
            vec![
                TokenKind::Word,
                TokenKind::RedirectOut,
                TokenKind::Word,
                TokenKind::RedirectErrAppend,
                TokenKind::Word,
                TokenKind::RedirectAll,
                TokenKind::Word,
                TokenKind::RedirectIn,
                TokenKind::Word,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn and_or_semi_background() {
        assert_eq!(
            kinds("a && b || c ; d &"),
            vec![
                TokenKind::Word,
                TokenKind::And,
                TokenKind::Word,
                TokenKind::Or,
                TokenKind::Word,
                TokenKind::Semi,
                TokenKind::Word,
                TokenKind::Amp,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn single_quotes_have_no_escapes() {
        let tokens = Lexer::tokenize("echo 'a\\nb'");
        let word = &tokens[1];
        assert_eq!(word.parts.as_ref().unwrap()[0].text, "a\\nb");
        assert_eq!(word.parts.as_ref().unwrap()[0].quoting, Quoting::Single);
    }

    #[test]
    fn double_quotes_process_escapes() {
        let tokens = Lexer::tokenize(r#"echo "a\"b\\c\$d""#);
        let word = &tokens[1];
        assert_eq!(word.parts.as_ref().unwrap()[0].text, "a\"b\\c$d");
    }

    #[test]
    fn backslash_outside_quotes_is_literal_next_char() {
        let tokens = Lexer::tokenize(r"echo a\ b");
        // `a\ b` lexes as a single word "a b" (escaped space doesn't split).
        assert_eq!(tokens[1].lexeme, "a b");
    }

    #[test]
    fn dollar_paren_is_captured_with_nested_parens() {
        let tokens = Lexer::tokenize("echo $(echo (nested))");
        assert_eq!(tokens[1].lexeme, "$(echo (nested))");
    }

    #[test]
    fn arithmetic_substitution_captured() {
        let tokens = Lexer::tokenize("echo $(( 1 + (2 * 3) ))");
        assert_eq!(tokens[1].lexeme, "$(( 1 + (2 * 3) ))");
    }

    #[test]
    fn braced_variable_captured_with_braces() {
        let tokens = Lexer::tokenize("echo ${FOO:-bar}");
        assert_eq!(tokens[1].lexeme, "${FOO:-bar}");
    }

    #[test]
    fn command_substitution_inside_double_quotes_is_one_part() {
        let tokens = Lexer::tokenize(r#"echo "result: $(echo hi)""#);
        let word = &tokens[1];
        assert_eq!(word.parts.as_ref().unwrap()[0].text, "result: $(echo hi)");
        assert_eq!(word.parts.as_ref().unwrap()[0].quoting, Quoting::Double);
    }

    #[test]
    fn comment_strips_to_end_of_line() {
        assert_eq!(lexemes("echo hi # a comment\necho bye"), vec!["echo", "hi", "\n", "echo", "bye", ""]);
    }

    #[test]
    fn comment_mid_word_is_not_a_comment() {
        let tokens = Lexer::tokenize("echo foo#bar");
        assert_eq!(tokens[1].lexeme, "foo#bar");
    }

    #[test]
    fn positional_and_special_parameters() {
        let tokens = Lexer::tokenize("echo $1 $# $? $@");
        assert_eq!(tokens[1].lexeme, "$1");
        assert_eq!(tokens[2].lexeme, "$#");
        assert_eq!(tokens[3].lexeme, "$?");
        assert_eq!(tokens[4].lexeme, "$@");
    }

    #[test]
    fn round_trip_lexemes_reproduce_input_up_to_whitespace() {
        let src = "ls -la /tmp";
        let joined: String = lexemes(src).into_iter().take(3).collect::<Vec<_>>().join(" ");
        assert_eq!(joined, src);
    }
}

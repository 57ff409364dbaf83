// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! The `test`/`[` expression grammar (spec §4.J "`test`/`[` builtin"):
//! unary file tests, string tests, integer comparisons, and the
//! connectives `!`, `-a`, `-o`, `(...)`.
//!
//! Evaluated directly over the already-expanded argument vector a builtin
//! receives; this module doesn't touch the VFS lock itself, it's handed a
//! `&Vfs` snapshot by the caller (spec §5: the VFS has a single writer, but
//! many readers may hold a `&Vfs` at once).

use crate::types::Stat;
use crate::vfs::Vfs;

/// `Ok(true/false)` for a successful evaluation, `Err` for a syntax error
/// (spec: "Returns exit code 0 for true, 1 for false, 2 on syntax error").
pub type TestResult = Result<bool, String>;

struct ExprParser<'a> {
    args: &'a [String],
    pos: usize,
    vfs: &'a Vfs,
}

impl<'a> ExprParser<'a> {
    fn peek(&self) -> Option<&'a str> {
        self.args.get(self.pos).map(String::as_str)
    }

    fn advance(&mut self) -> Option<&'a str> {
        let tok = self.peek();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// Lowest precedence: `-o` (or), left-associative.
    fn or_expr(&mut self) -> TestResult {
        let mut value = self.and_expr()?;
        while self.peek() == Some("-o") {
            self.advance();
            let rhs = self.and_expr()?;
            value = value || rhs;
        }
        Ok(value)
    }

    /// `-a` (and), left-associative, binds tighter than `-o`.
    fn and_expr(&mut self) -> TestResult {
        let mut value = self.unary_not()?;
        while self.peek() == Some("-a") {
            self.advance();
            let rhs = self.unary_not()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn unary_not(&mut self) -> TestResult {
        if self.peek() == Some("!") {
            self.advance();
            return Ok(!self.unary_not()?);
        }
        self.primary()
    }

    fn primary(&mut self) -> TestResult {
        if self.peek() == Some("(") {
            self.advance();
            let inner = self.or_expr()?;
            if self.advance() != Some(")") {
                return Err("expected ')'".to_string());
            }
            return Ok(inner);
        }

        // Unary file test: `-e path`, `-f path`, ...
        if let Some(op) = self.peek() {
            if let Some(file_op) = op.strip_prefix('-').filter(|o| o.len() == 1 && is_file_flag(o)) {
                self.advance();
                let path = self.advance().ok_or("missing operand")?;
                return Ok(eval_file_test(file_op, path, self.vfs));
            }
            if op == "-z" || op == "-n" {
                self.advance();
                let s = self.advance().ok_or("missing operand")?;
                return Ok(if op == "-z" { s.is_empty() } else { !s.is_empty() });
            }
        }

        // Binary operators: lhs OP rhs.
        let lhs = self.advance().ok_or("missing operand")?;
        match self.peek() {
            Some("=") => {
                self.advance();
                let rhs = self.advance().ok_or("missing operand")?;
                Ok(lhs == rhs)
            }
            Some("!=") => {
                self.advance();
                let rhs = self.advance().ok_or("missing operand")?;
                Ok(lhs != rhs)
            }
            Some("<") => {
                self.advance();
                let rhs = self.advance().ok_or("missing operand")?;
                Ok(lhs < rhs)
            }
            Some(">") => {
                self.advance();
                let rhs = self.advance().ok_or("missing operand")?;
                Ok(lhs > rhs)
            }
            Some(op @ ("-eq" | "-ne" | "-lt" | "-le" | "-gt" | "-ge")) => {
                self.advance();
                let rhs = self.advance().ok_or("missing operand")?;
                let a: i64 = lhs.parse().map_err(|_| format!("integer expected: {lhs}"))?;
                let b: i64 = rhs.parse().map_err(|_| format!("integer expected: {rhs}"))?;
                Ok(match op {
                    "-eq" => a == b,
                    "-ne" => a != b,
                    "-lt" => a < b,
                    "-le" => a <= b,
                    "-gt" => a > b,
                    "-ge" => a >= b,
                    _ => unreachable!(),
                })
            }
            _ => Ok(!lhs.is_empty()),
        }
    }
}

fn is_file_flag(c: &str) -> bool {
    matches!(c, "e" | "f" | "d" | "s" | "r" | "w" | "x")
}

fn eval_file_test(op: &str, path: &str, vfs: &Vfs) -> bool {
    let stat: Option<Stat> = vfs.stat(path).ok();
    match op {
        "e" => stat.is_some(),
        "f" => matches!(stat, Some(s) if s.file_type == lifo_domain::inode::FileType::File),
        "d" => matches!(stat, Some(s) if s.file_type == lifo_domain::inode::FileType::Directory),
        "s" => matches!(stat, Some(s) if s.size > 0),
        // No permission model (spec §1 "file mode field is metadata only");
        // readability/writability/executability track existence.
        "r" | "w" => stat.is_some(),
        "x" => matches!(stat, Some(s) if s.file_type == lifo_domain::inode::FileType::Directory) || stat.is_some(),
        _ => false,
    }
}

/// Evaluate a `test`/`[` argument vector (already stripped of the leading
/// `test`/`[` word and, for `[`, its trailing `]`).
pub fn eval_test(args: &[String], vfs: &Vfs) -> TestResult {
    if args.is_empty() {
        return Ok(false);
    }
    let mut parser = ExprParser { args, pos: 0, vfs };
    let result = parser.or_expr()?;
    if parser.pos != args.len() {
        return Err("unexpected trailing token".to_string());
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_store::ContentStore;
    use std::sync::Arc;

    fn vfs_with_file(path: &str, contents: &[u8]) -> Vfs {
        let mut vfs = Vfs::new(Arc::new(ContentStore::with_default_budget()));
        vfs.write_file(path, contents).unwrap();
        vfs
    }

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn file_exists_test() {
        let vfs = vfs_with_file("/etc/hostname", b"lifo");
        assert_eq!(eval_test(&args(&["-f", "/etc/hostname"]), &vfs), Ok(true));
        assert_eq!(eval_test(&args(&["-f", "/nope"]), &vfs), Ok(false));
    }

    #[test]
    fn string_equality() {
        let vfs = Vfs::new(Arc::new(ContentStore::with_default_budget()));
        assert_eq!(eval_test(&args(&["abc", "=", "abc"]), &vfs), Ok(true));
        assert_eq!(eval_test(&args(&["abc", "!=", "xyz"]), &vfs), Ok(true));
    }

    #[test]
    fn integer_comparison() {
        let vfs = Vfs::new(Arc::new(ContentStore::with_default_budget()));
        assert_eq!(eval_test(&args(&["3", "-lt", "2"]), &vfs), Ok(false));
        assert_eq!(eval_test(&args(&["2", "-lt", "3"]), &vfs), Ok(true));
    }

    #[test]
    fn negation_and_connectives() {
        let vfs = Vfs::new(Arc::new(ContentStore::with_default_budget()));
        assert_eq!(eval_test(&args(&["!", "-z", "x"]), &vfs), Ok(false));
        assert_eq!(eval_test(&args(&["-n", "a", "-a", "-n", "b"]), &vfs), Ok(true));
        assert_eq!(eval_test(&args(&["-z", "a", "-o", "-n", "b"]), &vfs), Ok(true));
    }

    #[test]
    fn parenthesized_grouping() {
        let vfs = Vfs::new(Arc::new(ContentStore::with_default_budget()));
        assert_eq!(
            eval_test(&args(&["(", "-n", "a", "-o", "-z", "b", ")", "-a", "-n", "c"]), &vfs),
            Ok(true)
        );
    }

    #[test]
    fn syntax_error_on_trailing_token() {
        let vfs = Vfs::new(Arc::new(ContentStore::with_default_budget()));
        assert!(eval_test(&args(&["a", "b", "c"]), &vfs).is_err());
    }
}

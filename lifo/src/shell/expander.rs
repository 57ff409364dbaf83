// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! Word expansion (spec §4.I): brace expansion, tilde expansion, parameter
//! and command/arithmetic substitution, IFS word splitting, glob expansion,
//! and quote removal, applied in that order to a single AST word (`Vec<WordPart>`).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

use lifo_domain::glob::{glob_match, has_glob_chars};
use lifo_domain::shell_ast::{Quoting, WordPart};

use super::{arithmetic, ExpansionError};
use crate::vfs::Vfs;

const DEFAULT_IFS: &str = " \t\n";

/// Everything expansion needs beyond the word itself. `vars` is mutable
/// because `${NAME:=default}` assigns into the shell's variable table as a
/// side effect (spec §4.I "parameter expansion").
pub struct ExpansionContext<'a> {
    pub vars: &'a mut HashMap<String, String>,
    pub positional: &'a [String],
    pub last_status: i32,
    pub ifs: &'a str,
    pub vfs: Arc<AsyncMutex<Vfs>>,
}

/// Runs a `$(...)` command substitution and reports its captured stdout and
/// exit status. The executor implements this by recursing into its own
/// script runner; the expander only depends on the trait, breaking the
/// expander/executor circular dependency (SPEC_FULL.md §B "async recursion").
#[async_trait]
pub trait SubstitutionRunner: Send {
    async fn run_captured(&mut self, src: &str) -> (String, i32);
}

/// Expand one AST word into zero or more shell fields, in spec order:
/// brace expansion, tilde expansion, parameter/command/arithmetic
/// substitution, IFS splitting, glob expansion, quote removal.
pub async fn expand_word(
    parts: &[WordPart],
    ctx: &mut ExpansionContext<'_>,
    runner: &mut dyn SubstitutionRunner,
) -> Result<Vec<String>, ExpansionError> {
    let mut fields = Vec::new();
    for variant in brace_expand(parts) {
        let variant = tilde_expand(variant, ctx.vars);
        fields.extend(expand_variant(&variant, ctx, runner).await?);
    }
    Ok(fields)
}

/// Expand a single brace/tilde-resolved variant: substitution, splitting,
/// globbing, quote removal.
async fn expand_variant(
    parts: &[WordPart],
    ctx: &mut ExpansionContext<'_>,
    runner: &mut dyn SubstitutionRunner,
) -> Result<Vec<String>, ExpansionError> {
    let mut field_builder = FieldBuilder::default();
    let mut fields: Vec<Field> = Vec::new();

    for part in parts {
        match part.quoting {
            Quoting::Single => {
                field_builder.glue(&part.text);
            }
            Quoting::Double => {
                let expanded = expand_dollar_forms(&part.text, ctx, runner).await?;
                field_builder.glue(&expanded);
            }
            Quoting::Raw => {
                let expanded = expand_dollar_forms(&part.text, ctx, runner).await?;
                split_raw_into(&expanded, ctx.ifs, &mut field_builder, &mut fields);
            }
        }
    }
    field_builder.flush_into(&mut fields);

    let mut out = Vec::with_capacity(fields.len());
    for field in fields {
        if field.all_raw && has_glob_chars(&field.text) {
            out.extend(glob_against_vfs(&field.text, &ctx.vfs).await);
        } else {
            out.push(field.text);
        }
    }
    Ok(out)
}

#[derive(Default)]
struct Field {
    text: String,
    all_raw: bool,
}

#[derive(Default)]
struct FieldBuilder {
    text: String,
    all_raw: bool,
    touched: bool,
}

impl FieldBuilder {
    /// Append quoted (non-splittable) text; marks the field as no longer
    /// purely-raw so it's exempt from glob expansion.
    fn glue(&mut self, text: &str) {
        self.text.push_str(text);
        self.all_raw = false;
        self.touched = true;
    }

    /// Append unquoted text, splitting on runs of `ifs` as we go.
    fn push_raw(&mut self, text: &str, ifs: &str, fields: &mut Vec<Field>) {
        if text.is_empty() {
            return;
        }
        let mut first = true;
        let pieces: Vec<&str> = text.split(|c: char| ifs.contains(c)).collect();
        let had_separator = pieces.len() > 1;
        for (i, piece) in pieces.iter().enumerate() {
            if i == 0 {
                self.text.push_str(piece);
                if !piece.is_empty() {
                    self.touched = true;
                }
                first = false;
                continue;
            }
            // A separator occurred before this piece: flush what came before.
            self.flush_pending(fields);
            if i == pieces.len() - 1 {
                // last piece glues onto whatever follows this raw run
                self.text.push_str(piece);
                if !piece.is_empty() {
                    self.touched = true;
                }
            } else if !piece.is_empty() {
                fields.push(Field { text: piece.to_string(), all_raw: true });
            }
        }
        let _ = (first, had_separator);
    }

    fn flush_pending(&mut self, fields: &mut Vec<Field>) {
        if self.touched {
            fields.push(Field { text: std::mem::take(&mut self.text), all_raw: self.all_raw });
        } else {
            self.text.clear();
        }
        self.all_raw = true;
        self.touched = false;
    }

    fn flush_into(mut self, fields: &mut Vec<Field>) {
        if self.touched || (!self.text.is_empty()) {
            fields.push(Field { text: self.text, all_raw: self.all_raw });
        }
    }
}

fn split_raw_into(text: &str, ifs: &str, builder: &mut FieldBuilder, fields: &mut Vec<Field>) {
    builder.push_raw(text, ifs, fields);
}

/// Expand `{a,b,c}` and `{N..M}` groups in the raw parts of a word,
/// cartesian-producing one `Vec<WordPart>` per combination (spec §4.I step
/// 1). Non-raw parts and words with no brace group pass through unchanged.
fn brace_expand(parts: &[WordPart]) -> Vec<Vec<WordPart>> {
    let mut variants: Vec<Vec<WordPart>> = vec![Vec::new()];
    for part in parts {
        if part.quoting != Quoting::Raw {
            for variant in variants.iter_mut() {
                variant.push(part.clone());
            }
            continue;
        }
        let alternatives = brace_expand_text(&part.text);
        if alternatives.len() == 1 {
            for variant in variants.iter_mut() {
                variant.push(WordPart::raw(&alternatives[0]));
            }
        } else {
            let mut next = Vec::with_capacity(variants.len() * alternatives.len());
            for variant in &variants {
                for alt in &alternatives {
                    let mut v = variant.clone();
                    v.push(WordPart::raw(alt));
                    next.push(v);
                }
            }
            variants = next;
        }
    }
    variants
}

/// Expand one `{...}` group (first one found) in `text`, recursing into the
/// prefix/suffix so multiple groups in a single raw chunk all expand.
fn brace_expand_text(text: &str) -> Vec<String> {
    let Some(open) = text.find('{') else { return vec![text.to_string()] };
    let Some(close) = matching_brace(text, open) else { return vec![text.to_string()] };
    let prefix = &text[..open];
    let inner = &text[open + 1..close];
    let suffix = &text[close + 1..];

    let items = brace_items(inner);
    if items.len() <= 1 {
        return vec![text.to_string()];
    }

    let suffix_variants = brace_expand_text(suffix);
    let mut out = Vec::new();
    for item in items {
        for suf in &suffix_variants {
            out.push(format!("{prefix}{item}{suf}"));
        }
    }
    out
}

fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0;
    for (i, c) in text.char_indices().skip(open) {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split a `{...}` interior into its alternatives: a comma list, or a
/// `N..M` numeric range.
fn brace_items(inner: &str) -> Vec<String> {
    if let Some((lo, hi)) = inner.split_once("..") {
        if let (Ok(lo), Ok(hi)) = (lo.parse::<i64>(), hi.parse::<i64>()) {
            return if lo <= hi {
                (lo..=hi).map(|n| n.to_string()).collect()
            } else {
                (hi..=lo).rev().map(|n| n.to_string()).collect()
            };
        }
    }
    if !inner.contains(',') {
        return vec![format!("{{{inner}}}")];
    }
    inner.split(',').map(str::to_string).collect()
}

/// `~` and `~/rest` at the start of a raw leading part expand to `HOME`
/// (spec §4.I step 2). `~user` forms are out of scope (no user database).
fn tilde_expand(mut parts: Vec<WordPart>, vars: &HashMap<String, String>) -> Vec<WordPart> {
    let Some(first) = parts.first_mut() else { return parts };
    if first.quoting != Quoting::Raw || !first.text.starts_with('~') {
        return parts;
    }
    let home = vars.get("HOME").cloned().unwrap_or_default();
    if first.text == "~" {
        first.text = home;
    } else if let Some(rest) = first.text.strip_prefix("~/") {
        first.text = format!("{home}/{rest}");
    }
    parts
}

/// Scan `text` for `$` forms, expanding each in place. Used on raw and
/// double-quoted parts alike; callers skip this entirely for single-quoted
/// text, which is never expanded.
async fn expand_dollar_forms(
    text: &str,
    ctx: &mut ExpansionContext<'_>,
    runner: &mut dyn SubstitutionRunner,
) -> Result<String, ExpansionError> {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    let mut out = String::new();
    while i < chars.len() {
        if chars[i] != '$' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        if i + 1 >= chars.len() {
            out.push('$');
            break;
        }
        match chars[i + 1] {
            '(' if i + 2 < chars.len() && chars[i + 2] == '(' => {
                let (expr, next_i) = extract_balanced(&chars, i, 2)?;
                let value = arithmetic::eval(&expr, ctx.vars)?;
                out.push_str(&value.to_string());
                i = next_i;
            }
            '(' => {
                let (src, next_i) = extract_balanced(&chars, i, 1)?;
                let (captured, _status) = runner.run_captured(&src).await;
                out.push_str(captured.trim_end_matches('\n'));
                i = next_i;
            }
            '{' => {
                let (inner, next_i) = extract_braced(&chars, i)?;
                out.push_str(&Box::pin(expand_braced_param(&inner, ctx, runner)).await?);
                i = next_i;
            }
            c if c == '_' || c.is_alphabetic() => {
                let (name, next_i) = extract_name(&chars, i + 1);
                out.push_str(ctx.vars.get(&name).map(String::as_str).unwrap_or(""));
                i = next_i;
            }
            c if c.is_ascii_digit() => {
                let idx = c.to_digit(10).unwrap() as usize;
                if idx > 0 {
                    out.push_str(ctx.positional.get(idx - 1).map(String::as_str).unwrap_or(""));
                }
                i += 2;
            }
            '#' => {
                out.push_str(&ctx.positional.len().to_string());
                i += 2;
            }
            '?' => {
                out.push_str(&ctx.last_status.to_string());
                i += 2;
            }
            '@' | '*' => {
                out.push_str(&ctx.positional.join(" "));
                i += 2;
            }
            _ => {
                out.push('$');
                i += 1;
            }
        }
    }
    Ok(out)
}

/// Resolve the interior of a `${...}` form: a plain name, `$#`/positional
/// index, or a `NAME:-default` / `NAME:=default` / `NAME:?msg` default form
/// (spec §4.I "parameter expansion").
async fn expand_braced_param(
    inner: &str,
    ctx: &mut ExpansionContext<'_>,
    runner: &mut dyn SubstitutionRunner,
) -> Result<String, ExpansionError> {
    let mut name = String::new();
    let mut rest_start = 0;
    for (idx, c) in inner.char_indices() {
        if c == '_' || c.is_alphanumeric() {
            name.push(c);
            rest_start = idx + c.len_utf8();
        } else {
            break;
        }
    }
    if name.is_empty() {
        if inner == "#" {
            return Ok(ctx.positional.len().to_string());
        }
        if let Ok(idx) = inner.parse::<usize>() {
            return Ok(ctx.positional.get(idx.saturating_sub(1)).cloned().unwrap_or_default());
        }
        return Ok(String::new());
    }

    let rest = &inner[rest_start..];
    let current = ctx.vars.get(&name).cloned().filter(|v| !v.is_empty());

    if rest.is_empty() {
        return Ok(current.unwrap_or_default());
    }
    if let Some(default) = rest.strip_prefix(":-") {
        return match current {
            Some(v) => Ok(v),
            None => Box::pin(expand_dollar_forms(default, ctx, runner)).await,
        };
    }
    if let Some(default) = rest.strip_prefix(":=") {
        return match current {
            Some(v) => Ok(v),
            None => {
                let expanded = Box::pin(expand_dollar_forms(default, ctx, runner)).await?;
                ctx.vars.insert(name, expanded.clone());
                Ok(expanded)
            }
        };
    }
    if let Some(msg) = rest.strip_prefix(":?") {
        return match current {
            Some(v) => Ok(v),
            None => {
                let expanded = Box::pin(expand_dollar_forms(msg, ctx, runner)).await?;
                let message = if expanded.is_empty() {
                    format!("{name}: parameter not set")
                } else {
                    expanded
                };
                Err(ExpansionError(message))
            }
        };
    }
    Ok(current.unwrap_or_default())
}

fn extract_name(chars: &[char], start: usize) -> (String, usize) {
    let mut i = start;
    let mut name = String::new();
    while let Some(&c) = chars.get(i) {
        if c == '_' || c.is_alphanumeric() {
            name.push(c);
            i += 1;
        } else {
            break;
        }
    }
    (name, i)
}

/// Find the text inside `$(...)` or `$((...))`, mirroring the lexer's own
/// paren-depth tracking (`Lexer::copy_dollar_paren`), and report the index
/// just past the closing wrapper.
fn extract_balanced(chars: &[char], start: usize, open_count: usize) -> Result<(String, usize), ExpansionError> {
    let mut i = start + 1 + open_count;
    let content_start = i;
    let mut depth = open_count;
    while depth > 0 {
        match chars.get(i) {
            Some('(') => {
                depth += 1;
                i += 1;
            }
            Some(')') => {
                depth -= 1;
                i += 1;
            }
            Some(_) => i += 1,
            None => return Err(ExpansionError("unterminated substitution".to_string())),
        }
    }
    let content: String = chars[content_start..i - open_count].iter().collect();
    Ok((content, i))
}

fn extract_braced(chars: &[char], start: usize) -> Result<(String, usize), ExpansionError> {
    let mut i = start + 2;
    let content_start = i;
    let mut depth = 1;
    while depth > 0 {
        match chars.get(i) {
            Some('{') => {
                depth += 1;
                i += 1;
            }
            Some('}') => {
                depth -= 1;
                i += 1;
            }
            Some(_) => i += 1,
            None => return Err(ExpansionError("unterminated ${...}".to_string())),
        }
    }
    let content: String = chars[content_start..i - 1].iter().collect();
    Ok((content, i))
}

/// Expand a single glob pattern against the VFS (spec §4.I step 6): matches
/// are resolved within the pattern's own parent directory and sorted, dotfiles
/// excluded unless the pattern itself starts with `.`. Patterns that match
/// nothing are returned unchanged, per POSIX "no match" behavior.
async fn glob_against_vfs(pattern: &str, vfs: &AsyncMutex<Vfs>) -> Vec<String> {
    let (dir, name_pattern) = split_glob_pattern(pattern);
    let guard = vfs.lock().await;
    let entries = guard.readdir(dir).unwrap_or_default();
    drop(guard);

    let dotglob = name_pattern.starts_with('.');
    let mut matches: Vec<String> = entries
        .into_iter()
        .filter(|name| dotglob || !name.starts_with('.'))
        .filter(|name| glob_match(&name_pattern, name))
        .map(|name| join_dir(dir, &name))
        .collect();
    matches.sort();

    if matches.is_empty() {
        vec![pattern.to_string()]
    } else {
        matches
    }
}

fn split_glob_pattern(pattern: &str) -> (&str, &str) {
    match pattern.rfind('/') {
        Some(0) => ("/", &pattern[1..]),
        Some(idx) => (&pattern[..idx], &pattern[idx + 1..]),
        None => (".", pattern),
    }
}

fn join_dir(dir: &str, name: &str) -> String {
    if dir == "." {
        name.to_string()
    } else if dir == "/" {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_store::ContentStore;
    use lifo_domain::shell_ast::WordPart;

    struct NoopRunner;

    #[async_trait]
    impl SubstitutionRunner for NoopRunner {
        async fn run_captured(&mut self, _src: &str) -> (String, i32) {
            ("substituted".to_string(), 0)
        }
    }

    fn fresh_vfs() -> Arc<AsyncMutex<Vfs>> {
        Arc::new(AsyncMutex::new(Vfs::new(Arc::new(ContentStore::with_default_budget()))))
    }

    async fn expand(src_vars: &[(&str, &str)], word: Vec<WordPart>) -> Vec<String> {
        let mut vars: HashMap<String, String> = src_vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        let positional = vec!["one".to_string(), "two".to_string()];
        let mut ctx = ExpansionContext {
            vars: &mut vars,
            positional: &positional,
            last_status: 0,
            ifs: DEFAULT_IFS,
            vfs: fresh_vfs(),
        };
        let mut runner = NoopRunner;
        expand_word(&word, &mut ctx, &mut runner).await.unwrap()
    }

    #[tokio::test]
    async fn plain_variable_expansion() {
        let fields = expand(&[("NAME", "world")], vec![WordPart::raw("hello-$NAME")]).await;
        assert_eq!(fields, vec!["hello-world".to_string()]);
    }

    #[tokio::test]
    async fn unset_variable_defaults_to_empty() {
        let fields = expand(&[], vec![WordPart::raw("[$MISSING]")]).await;
        assert_eq!(fields, vec!["[]".to_string()]);
    }

    #[tokio::test]
    async fn default_value_form() {
        let fields = expand(&[], vec![WordPart::raw("${MISSING:-fallback}")]).await;
        assert_eq!(fields, vec!["fallback".to_string()]);
    }

    #[tokio::test]
    async fn assigning_default_form_updates_vars() {
        let mut vars = HashMap::new();
        let positional: Vec<String> = Vec::new();
        let mut ctx = ExpansionContext {
            vars: &mut vars,
            positional: &positional,
            last_status: 0,
            ifs: DEFAULT_IFS,
            vfs: fresh_vfs(),
        };
        let mut runner = NoopRunner;
        let fields = expand_word(&[WordPart::raw("${X:=def}")], &mut ctx, &mut runner).await.unwrap();
        assert_eq!(fields, vec!["def".to_string()]);
        assert_eq!(ctx.vars.get("X"), Some(&"def".to_string()));
    }

    #[tokio::test]
    async fn arithmetic_substitution() {
        let fields = expand(&[], vec![WordPart::raw("$((2 + 3))")]).await;
        assert_eq!(fields, vec!["5".to_string()]);
    }

    #[tokio::test]
    async fn command_substitution_calls_runner() {
        let fields = expand(&[], vec![WordPart::raw("prefix-$(anything)")]).await;
        assert_eq!(fields, vec!["prefix-substituted".to_string()]);
    }

    #[tokio::test]
    async fn brace_expansion_fans_out_into_multiple_fields() {
        let fields = expand(&[], vec![WordPart::raw("file{1,2,3}.txt")]).await;
        assert_eq!(fields, vec!["file1.txt", "file2.txt", "file3.txt"]);
    }

    #[tokio::test]
    async fn numeric_range_brace_expansion() {
        let fields = expand(&[], vec![WordPart::raw("{1..3}")]).await;
        assert_eq!(fields, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn tilde_expands_home() {
        let fields = expand(&[("HOME", "/home/user")], vec![WordPart::raw("~/docs")]).await;
        assert_eq!(fields, vec!["/home/user/docs".to_string()]);
    }

    #[tokio::test]
    async fn unquoted_whitespace_splits_into_multiple_fields() {
        let fields = expand(&[("LIST", "a b  c")], vec![WordPart::raw("$LIST")]).await;
        assert_eq!(fields, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn double_quoted_expansion_is_not_split() {
        let fields = expand(&[("LIST", "a b c")], vec![WordPart { text: "$LIST".to_string(), quoting: Quoting::Double }]).await;
        assert_eq!(fields, vec!["a b c".to_string()]);
    }

    #[tokio::test]
    async fn empty_double_quoted_word_preserves_one_empty_field() {
        let fields = expand(&[], vec![WordPart { text: String::new(), quoting: Quoting::Double }]).await;
        assert_eq!(fields, vec!["".to_string()]);
    }

    #[tokio::test]
    async fn single_quotes_suppress_all_expansion() {
        let fields = expand(&[("X", "nope")], vec![WordPart { text: "$X literal".to_string(), quoting: Quoting::Single }]).await;
        assert_eq!(fields, vec!["$X literal".to_string()]);
    }

    #[tokio::test]
    async fn glob_matches_entries_sorted_and_skips_dotfiles() {
        let vfs = fresh_vfs();
        {
            let mut guard = vfs.lock().await;
            guard.mkdir("/a", true).unwrap();
            guard.write_file("/a/b.txt", b"1").unwrap();
            guard.write_file("/a/a.txt", b"2").unwrap();
            guard.write_file("/a/.hidden.txt", b"3").unwrap();
        }
        let mut vars = HashMap::new();
        let positional: Vec<String> = Vec::new();
        let mut ctx = ExpansionContext {
            vars: &mut vars,
            positional: &positional,
            last_status: 0,
            ifs: DEFAULT_IFS,
            vfs: vfs.clone(),
        };
        let mut runner = NoopRunner;
        let fields = expand_word(&[WordPart::raw("/a/*.txt")], &mut ctx, &mut runner).await.unwrap();
        assert_eq!(fields, vec!["/a/a.txt".to_string(), "/a/b.txt".to_string()]);
    }

    #[tokio::test]
    async fn glob_with_no_matches_is_left_literal() {
        let fields = expand(&[], vec![WordPart::raw("/nowhere/*.txt")]).await;
        assert_eq!(fields, vec!["/nowhere/*.txt".to_string()]);
    }

    #[tokio::test]
    async fn positional_and_special_parameters_expand() {
        let fields = expand(&[], vec![WordPart::raw("$1:$2:$#:$?")]).await;
        assert_eq!(fields, vec!["one:two:2:0".to_string()]);
    }
}

// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! A handful of demonstration commands: just enough of a registered-command
//! library to drive end-to-end scenarios through the shell. A full command
//! library is out of scope here — this module exists to exercise the
//! executor/VFS contract, not to be a real command library.

use std::time::Duration;

use super::context::{Command, CommandContext};
use async_trait::async_trait;

pub struct Echo;

#[async_trait]
impl Command for Echo {
    async fn run(&self, mut ctx: CommandContext) -> i32 {
        let line = ctx.args.join(" ");
        ctx.write_stdout(&line).await;
        ctx.write_stdout("\n").await;
        0
    }
}

pub struct Cat;

#[async_trait]
impl Command for Cat {
    async fn run(&self, mut ctx: CommandContext) -> i32 {
        if ctx.args.is_empty() {
            let content = ctx.read_all_stdin().await;
            ctx.write_stdout(&content).await;
            return 0;
        }
        let mut status = 0;
        for path in ctx.args.clone() {
            let resolved = resolve(&ctx.cwd, &path);
            let content = {
                let vfs = ctx.vfs.lock().await;
                vfs.read_file_string(&resolved)
            };
            match content {
                Ok(text) => ctx.write_stdout(&text).await,
                Err(e) => {
                    ctx.write_stderr(&format!("cat: {path}: {e}\n")).await;
                    status = 1;
                }
            }
        }
        status
    }
}

pub struct Ls;

#[async_trait]
impl Command for Ls {
    async fn run(&self, mut ctx: CommandContext) -> i32 {
        let targets = if ctx.args.is_empty() {
            vec![ctx.cwd.clone()]
        } else {
            ctx.args.clone()
        };
        let multiple = targets.len() > 1;
        let mut status = 0;
        for (i, target) in targets.iter().enumerate() {
            let resolved = resolve(&ctx.cwd, target);
            let vfs = ctx.vfs.lock().await;
            match vfs.readdir(&resolved) {
                Ok(mut names) => {
                    drop(vfs);
                    names.sort();
                    if multiple {
                        if i > 0 {
                            ctx.write_stdout("\n").await;
                        }
                        ctx.write_stdout(&format!("{target}:\n")).await;
                    }
                    ctx.write_stdout(&names.join("\n")).await;
                    if !names.is_empty() {
                        ctx.write_stdout("\n").await;
                    }
                }
                Err(e) => {
                    drop(vfs);
                    ctx.write_stderr(&format!("ls: {target}: {e}\n")).await;
                    status = 1;
                }
            }
        }
        status
    }
}

pub struct Env;

#[async_trait]
impl Command for Env {
    async fn run(&self, mut ctx: CommandContext) -> i32 {
        let mut pairs: Vec<(&String, &String)> = ctx.env.iter().collect();
        pairs.sort_by_key(|(k, _)| k.as_str());
        for (k, v) in pairs {
            let line = format!("{k}={v}\n");
            ctx.write_stdout(&line).await;
        }
        0
    }
}

/// `tr SET1 SET2`: byte-wise character translation of stdin to stdout. Only
/// literal characters and the `a-z`/`A-Z` range forms are supported, not
/// full POSIX `tr` classes.
pub struct Tr;

#[async_trait]
impl Command for Tr {
    async fn run(&self, mut ctx: CommandContext) -> i32 {
        if ctx.args.len() != 2 {
            ctx.write_stderr("tr: usage: tr SET1 SET2\n").await;
            return 1;
        }
        let from = expand_set(&ctx.args[0]);
        let to = expand_set(&ctx.args[1]);
        let input = ctx.read_all_stdin().await;
        let mut out = String::with_capacity(input.len());
        for c in input.chars() {
            if let Some(idx) = from.iter().position(|&f| f == c) {
                out.push(*to.get(idx).or(to.last()).unwrap_or(&c));
            } else {
                out.push(c);
            }
        }
        ctx.write_stdout(&out).await;
        0
    }
}

fn expand_set(spec: &str) -> Vec<char> {
    let chars: Vec<char> = spec.chars().collect();
    let mut out = Vec::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        if i + 2 < chars.len() && chars[i + 1] == '-' {
            let (lo, hi) = (chars[i], chars[i + 2]);
            if lo <= hi {
                out.extend((lo as u32..=hi as u32).filter_map(char::from_u32));
                i += 3;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// `sleep SECONDS`: parks the task, polling the cancellation token so a
/// background `sleep 10 &` can be killed promptly.
pub struct Sleep;

#[async_trait]
impl Command for Sleep {
    async fn run(&self, mut ctx: CommandContext) -> i32 {
        let Some(secs) = ctx.args.first().and_then(|s| s.parse::<f64>().ok()) else {
            ctx.write_stderr("sleep: usage: sleep SECONDS\n").await;
            return 1;
        };
        let total = Duration::from_secs_f64(secs.max(0.0));
        let tick = Duration::from_millis(50);
        let mut elapsed = Duration::ZERO;
        while elapsed < total {
            if ctx.signal.is_cancelled() {
                return 130;
            }
            let step = tick.min(total - elapsed);
            tokio::time::sleep(step).await;
            elapsed += step;
        }
        0
    }
}

fn resolve(cwd: &str, path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{}/{}", cwd.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::context::CommandRegistry;
    use crate::command::io::{CapturingWriter, NullWriter, StringReader};
    use crate::content_store::ContentStore;
    use crate::vfs::Vfs;
    use lifo_domain::cancel::CancelToken;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex as AsyncMutex;

    fn ctx(args: Vec<&str>, stdin: Option<&str>) -> (CommandContext, CapturingWriter) {
        let out = CapturingWriter::new();
        let ctx = CommandContext {
            args: args.into_iter().map(String::from).collect(),
            env: HashMap::new(),
            cwd: "/".to_string(),
            vfs: Arc::new(AsyncMutex::new(Vfs::new(Arc::new(ContentStore::with_default_budget())))),
            stdout: Box::new(out.clone()),
            stderr: Box::new(NullWriter),
            stdin: stdin.map(|s| Box::new(StringReader::new(s.to_string())) as _),
            signal: CancelToken::new(),
        };
        (ctx, out)
    }

    #[tokio::test]
    async fn echo_joins_args_with_newline() {
        let (ctx, out) = ctx(vec!["hello", "world"], None);
        assert_eq!(Echo.run(ctx).await, 0);
        assert_eq!(out.contents().await, "hello world\n");
    }

    #[tokio::test]
    async fn tr_translates_lowercase_to_uppercase() {
        let (ctx, out) = ctx(vec!["a-z", "A-Z"], Some("hello world"));
        assert_eq!(Tr.run(ctx).await, 0);
        assert_eq!(out.contents().await, "HELLO WORLD");
    }

    #[tokio::test]
    async fn ls_lists_sorted_directory_entries() {
        let (mut ctx, out) = ctx(vec!["/a"], None);
        {
            let mut vfs = ctx.vfs.lock().await;
            vfs.mkdir("/a", true).unwrap();
            vfs.write_file("/a/b.txt", b"1").unwrap();
            vfs.write_file("/a/a.txt", b"2").unwrap();
        }
        assert_eq!(Ls.run(ctx).await, 0);
        assert_eq!(out.contents().await, "a.txt\nb.txt\n");
    }

    #[tokio::test]
    async fn sleep_is_cancellable() {
        let (mut ctx, _out) = ctx(vec!["10"], None);
        ctx.signal.cancel();
        assert_eq!(Sleep.run(ctx).await, 130);
    }

    #[tokio::test]
    async fn registry_lists_demo_commands() {
        let mut registry = CommandRegistry::new();
        registry.register("echo", Arc::new(Echo));
        registry.register("tr", Arc::new(Tr));
        assert_eq!(registry.list(), vec!["echo".to_string(), "tr".to_string()]);
    }
}

// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! The command contract and registry.
//!
//! A command is `(ctx) -> future<int>`: it receives everything it needs
//! (args, env, cwd, the VFS, its streams, a cancellation token) in one
//! `CommandContext` and returns an exit status. Registered commands are
//! looked up by name and dispatched by the executor; builtins (`cd`,
//! `export`, `test`, ...) run in the shell's own context instead and never
//! pass through this registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

use lifo_domain::cancel::CancelToken;

use super::io::{CommandReader, CommandWriter};
use crate::vfs::Vfs;

/// Everything a registered command needs to run.
pub struct CommandContext {
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cwd: String,
    pub vfs: Arc<AsyncMutex<Vfs>>,
    pub stdout: Box<dyn CommandWriter>,
    pub stderr: Box<dyn CommandWriter>,
    pub stdin: Option<Box<dyn CommandReader>>,
    pub signal: CancelToken,
}

impl CommandContext {
    pub async fn write_stdout(&mut self, s: &str) {
        let _ = self.stdout.write(s).await;
    }

    pub async fn write_stderr(&mut self, s: &str) {
        let _ = self.stderr.write(s).await;
    }

    /// Read all of stdin, or an empty string if none is connected. Commands
    /// that consume stdin incrementally should use `self.stdin` directly.
    pub async fn read_all_stdin(&mut self) -> String {
        match self.stdin.as_mut() {
            Some(reader) => reader.read_all().await,
            None => String::new(),
        }
    }
}

/// A registered, non-builtin command.
#[async_trait]
pub trait Command: Send + Sync {
    async fn run(&self, ctx: CommandContext) -> i32;
}

/// Adapts a plain async function into a [`Command`], the common case for
/// the small demonstration commands this crate ships.
pub struct FnCommand<F>(pub F);

#[async_trait]
impl<F, Fut> Command for FnCommand<F>
where
    F: Fn(CommandContext) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = i32> + Send,
{
    async fn run(&self, ctx: CommandContext) -> i32 {
        (self.0)(ctx).await
    }
}

/// Maps command names to implementations: `register`, `lookup`, `list`.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, command: Arc<dyn Command>) {
        self.commands.insert(name.into(), command);
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(name).cloned()
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::io::{CapturingWriter, NullWriter};
    use crate::content_store::ContentStore;

    fn fresh_ctx(args: Vec<&str>) -> (CommandContext, CapturingWriter) {
        let out = CapturingWriter::new();
        let ctx = CommandContext {
            args: args.into_iter().map(String::from).collect(),
            env: HashMap::new(),
            cwd: "/".to_string(),
            vfs: Arc::new(AsyncMutex::new(Vfs::new(Arc::new(ContentStore::with_default_budget())))),
            stdout: Box::new(out.clone()),
            stderr: Box::new(NullWriter),
            stdin: None,
            signal: CancelToken::new(),
        };
        (ctx, out)
    }

    #[tokio::test]
    async fn registry_round_trips_and_lists_sorted() {
        let mut registry = CommandRegistry::new();
        registry.register(
            "true",
            Arc::new(FnCommand(|_ctx: CommandContext| async { 0 })),
        );
        registry.register(
            "false",
            Arc::new(FnCommand(|_ctx: CommandContext| async { 1 })),
        );
        assert_eq!(registry.list(), vec!["false".to_string(), "true".to_string()]);
        let (ctx, _out) = fresh_ctx(vec![]);
        assert_eq!(registry.lookup("true").unwrap().run(ctx).await, 0);
        assert!(registry.lookup("nope").is_none());
    }

    #[tokio::test]
    async fn fn_command_writes_to_stdout() {
        let cmd = FnCommand(|mut ctx: CommandContext| async move {
            ctx.write_stdout("hi").await;
            0
        });
        let (ctx, out) = fresh_ctx(vec![]);
        assert_eq!(cmd.run(ctx).await, 0);
        assert_eq!(out.contents().await, "hi");
    }
}

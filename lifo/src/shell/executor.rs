// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! The shell executor (spec §4.J): walks the parsed AST, tracks `$?`,
//! drives pipelines and redirections, and dispatches each simple command to
//! a builtin or the command registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

use lifo_domain::shell_ast::{Command as AstCommand, Connector, List, Pipeline, RedirOp, Redirection, Script, SimpleCommand, WordPart};
use lifo_domain::SHELL_PID;

use super::builtins::{self, BuiltinContext, BuiltinEffects};
use super::expander::{expand_word, ExpansionContext, SubstitutionRunner};
use super::parser::Parser;
use crate::command::context::{CommandContext, CommandRegistry};
use crate::command::io::{pipe, CapturingWriter, CommandReader, CommandWriter, EmptyReader, NullWriter, PipeWriter, StringReader};
use crate::process::{JobTable, ProcessRegistry, ProcessStatus, Spawn};
use crate::vfs::Vfs;

const DEFAULT_IFS: &str = " \t\n";

/// What running one list/script produced, beyond the bare exit code — the
/// executor's caller (a REPL, `source`, or a test) sometimes needs to know
/// whether the script asked to terminate the shell (spec §4.J `exit`).
pub struct ExecOutcome {
    pub status: i32,
    pub exit_requested: Option<i32>,
}

/// A shared, owned writer handle: several concurrently-spawned pipeline
/// stages (or successive top-level commands) can hold a clone and each
/// write through to the same underlying sink. Used for the shell's
/// top-level stdout/stderr and for `&>` (stdout+stderr merged into one
/// redirection target).
#[derive(Clone)]
struct SharedWriter(Arc<AsyncMutex<Box<dyn CommandWriter>>>);

#[async_trait]
impl CommandWriter for SharedWriter {
    async fn write(&mut self, data: &str) -> std::io::Result<()> {
        self.0.lock().await.write(data).await
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().await.flush().await
    }
}

/// Buffers writes for a `>`/`>>` (or `&>`) redirection target; committed to
/// the VFS once the owning stage has finished (spec §4.J "Redirection
/// semantics").
struct FileTarget {
    path: String,
    append: bool,
    buffer: String,
}

type SharedFileTarget = Arc<AsyncMutex<FileTarget>>;

#[derive(Clone)]
struct FileTargetWriter(SharedFileTarget);

#[async_trait]
impl CommandWriter for FileTargetWriter {
    async fn write(&mut self, data: &str) -> std::io::Result<()> {
        self.0.lock().await.buffer.push_str(data);
        Ok(())
    }
}

/// A clone of the shell's substitutable state, used to run `$(...)`
/// command substitution as a subshell: it reads the parent's variables and
/// cwd but never mutates them (spec §4.I step 4, POSIX subshell semantics
/// for command substitution).
struct SubshellRunner {
    vfs: Arc<AsyncMutex<Vfs>>,
    registry: Arc<CommandRegistry>,
    processes: Arc<ProcessRegistry>,
    jobs: Arc<JobTable>,
    vars: HashMap<String, String>,
    cwd: String,
    positional: Vec<String>,
}

#[async_trait]
impl SubstitutionRunner for SubshellRunner {
    async fn run_captured(&mut self, src: &str) -> (String, i32) {
        let mut child = Shell {
            vfs: self.vfs.clone(),
            registry: self.registry.clone(),
            processes: self.processes.clone(),
            jobs: self.jobs.clone(),
            vars: self.vars.clone(),
            cwd: self.cwd.clone(),
            positional: self.positional.clone(),
            last_status: 0,
            aliases: HashMap::new(),
            background_handles: HashMap::new(),
            pending_exit: None,
        };
        child.run_captured(src).await
    }
}

/// The shell's live, mutable state: variables, cwd, aliases, `$?`, and the
/// shared runtime handles (spec §3 environment/cwd, §4.J executor state).
pub struct Shell {
    pub vfs: Arc<AsyncMutex<Vfs>>,
    pub registry: Arc<CommandRegistry>,
    pub processes: Arc<ProcessRegistry>,
    pub jobs: Arc<JobTable>,
    pub vars: HashMap<String, String>,
    pub cwd: String,
    pub positional: Vec<String>,
    pub last_status: i32,
    pub aliases: HashMap<String, String>,
    background_handles: HashMap<u32, tokio::task::JoinHandle<()>>,
    /// Set by the `exit` builtin (applied via `BuiltinEffects`); checked
    /// after every list/pipeline to unwind `run_script`'s loop early.
    pending_exit: Option<i32>,
}

/// The outcome of running one pipeline stage.
struct StageResult {
    status: i32,
    effects: Option<BuiltinEffects>,
}

impl Shell {
    pub fn new(
        vfs: Arc<AsyncMutex<Vfs>>,
        registry: Arc<CommandRegistry>,
        processes: Arc<ProcessRegistry>,
        jobs: Arc<JobTable>,
        env: HashMap<String, String>,
        cwd: impl Into<String>,
    ) -> Self {
        Self {
            vfs,
            registry,
            processes,
            jobs,
            vars: env,
            cwd: cwd.into(),
            positional: Vec::new(),
            last_status: 0,
            aliases: HashMap::new(),
            background_handles: HashMap::new(),
            pending_exit: None,
        }
    }

    /// Parse and run a full script against the given top-level stdout/
    /// stderr sinks. Returns once every list has run or `exit` was
    /// requested.
    pub async fn run_script(
        &mut self,
        src: &str,
        stdout: Arc<AsyncMutex<Box<dyn CommandWriter>>>,
        stderr: Arc<AsyncMutex<Box<dyn CommandWriter>>>,
    ) -> ExecOutcome {
        let script: Script = match Parser::parse_script(src) {
            Ok(script) => script,
            Err(e) => {
                stderr.lock().await.write(&format!("sh: {e}\n")).await.ok();
                self.last_status = 2;
                return ExecOutcome { status: 2, exit_requested: None };
            }
        };

        let mut exit_requested = None;
        for list in &script {
            self.run_list(list, stdout.clone(), stderr.clone()).await;
            if let Some(code) = self.pending_exit.take() {
                exit_requested = Some(code);
                break;
            }
        }
        ExecOutcome { status: self.last_status, exit_requested }
    }

    /// Run a script with stdout captured into a string, for `$(...)`
    /// command substitution and callers that just want the text (spec
    /// §4.I step 4: "the trailing newline is trimmed" is the caller's job).
    pub async fn run_captured(&mut self, src: &str) -> (String, i32) {
        let capture = CapturingWriter::new();
        let stdout: Arc<AsyncMutex<Box<dyn CommandWriter>>> = Arc::new(AsyncMutex::new(Box::new(capture.clone())));
        let stderr: Arc<AsyncMutex<Box<dyn CommandWriter>>> = Arc::new(AsyncMutex::new(Box::new(NullWriter)));
        let outcome = self.run_script(src, stdout, stderr).await;
        (capture.into_string().await, outcome.status)
    }

    async fn run_list(
        &mut self,
        list: &List,
        stdout: Arc<AsyncMutex<Box<dyn CommandWriter>>>,
        stderr: Arc<AsyncMutex<Box<dyn CommandWriter>>>,
    ) {
        if list.background {
            self.spawn_background(list, stdout, stderr).await;
            self.last_status = 0;
            return;
        }
        let mut run_next = true;
        for (pipeline, connector) in &list.entries {
            if run_next {
                self.last_status = self.run_pipeline(pipeline, stdout.clone(), stderr.clone()).await;
                if self.pending_exit.is_some() {
                    return;
                }
            }
            run_next = match connector {
                Connector::And => self.last_status == 0,
                Connector::Or => self.last_status != 0,
                Connector::None => true,
            };
        }
    }

    /// Background lists: a single detached pipeline with its own job id
    /// (spec §4.J "A background list spawns the pipeline detached... and
    /// immediately returns `0`", §4.K "Jobs"). The spawned task self-reaps
    /// on completion — in this single-shell, non-interactive model there is
    /// no separate reaper loop to do it later.
    async fn spawn_background(
        &mut self,
        list: &List,
        stdout: Arc<AsyncMutex<Box<dyn CommandWriter>>>,
        stderr: Arc<AsyncMutex<Box<dyn CommandWriter>>>,
    ) {
        let Some((pipeline, _)) = list.entries.first() else { return };
        let command_line = describe_pipeline(pipeline);
        let mut child = Shell {
            vfs: self.vfs.clone(),
            registry: self.registry.clone(),
            processes: self.processes.clone(),
            jobs: self.jobs.clone(),
            vars: self.vars.clone(),
            cwd: self.cwd.clone(),
            positional: self.positional.clone(),
            last_status: 0,
            aliases: self.aliases.clone(),
            background_handles: HashMap::new(),
            pending_exit: None,
        };
        let pipeline = pipeline.clone();
        let processes = self.processes.clone();
        let jobs = self.jobs.clone();
        let spawn = processes.spawn(Spawn {
            ppid: SHELL_PID,
            job_id: None,
            command: command_line.clone(),
            args: Vec::new(),
            cwd: self.cwd.clone(),
            env: self.vars.clone(),
            is_foreground: false,
        });
        let pid = spawn.pid;
        let job_id = jobs.add(pid, command_line);

        let handle = tokio::spawn(async move {
            let status = child.run_pipeline(&pipeline, stdout, stderr).await;
            let _ = processes.update_status(pid, ProcessStatus::Zombie { exit_code: status });
            let _ = processes.reap(pid);
            jobs.remove(job_id);
        });
        self.background_handles.insert(job_id, handle);
    }

    /// Run one pipeline stage-by-stage, wiring `n-1` in-memory pipes
    /// between stages (spec §4.J "Pipeline"). Every stage is spawned as its
    /// own concurrent task so data flows between stages as it's produced,
    /// not after a stage fully completes.
    async fn run_pipeline(
        &mut self,
        pipeline: &Pipeline,
        stdout: Arc<AsyncMutex<Box<dyn CommandWriter>>>,
        stderr: Arc<AsyncMutex<Box<dyn CommandWriter>>>,
    ) -> i32 {
        let n = pipeline.commands.len();
        if n == 0 {
            return 0;
        }

        // Build the n-1 connecting pipes up front.
        let mut pipe_writers: Vec<Option<PipeWriter>> = Vec::with_capacity(n);
        let mut pipe_readers: Vec<Option<Box<dyn CommandReader>>> = Vec::with_capacity(n);
        pipe_readers.push(None);
        for _ in 0..n.saturating_sub(1) {
            let (w, r) = pipe();
            pipe_writers.push(Some(w));
            pipe_readers.push(Some(Box::new(r)));
        }
        pipe_writers.push(None);

        let solo = n == 1;
        let mut futures = Vec::with_capacity(n);
        let mut file_targets: Vec<SharedFileTarget> = Vec::new();

        for (i, command) in pipeline.commands.iter().enumerate() {
            let stage_stdin: Box<dyn CommandReader> = pipe_readers[i].take().unwrap_or_else(|| Box::new(EmptyReader));
            let stage_stdout: Box<dyn CommandWriter> = match pipe_writers[i].take() {
                Some(w) => Box::new(w),
                None => Box::new(SharedWriter(stdout.clone())),
            };
            let stage_stderr: Box<dyn CommandWriter> = Box::new(SharedWriter(stderr.clone()));

            match command {
                AstCommand::Simple(simple) => {
                    let (stage_stdin, stage_stdout, stage_stderr, targets) =
                        match self.apply_redirections(simple, stage_stdin, stage_stdout, stage_stderr).await {
                            Ok(v) => v,
                            Err(status) => {
                                futures.push(tokio::spawn(async move { StageResult { status, effects: None } }));
                                continue;
                            }
                        };
                    file_targets.extend(targets);
                    let future = self.build_stage(simple, stage_stdin, stage_stdout, stage_stderr).await;
                    futures.push(tokio::spawn(future));
                }
                AstCommand::Grouped(sub_list) => {
                    let mut child = Shell {
                        vfs: self.vfs.clone(),
                        registry: self.registry.clone(),
                        processes: self.processes.clone(),
                        jobs: self.jobs.clone(),
                        vars: self.vars.clone(),
                        cwd: self.cwd.clone(),
                        positional: self.positional.clone(),
                        last_status: 0,
                        aliases: self.aliases.clone(),
                        background_handles: HashMap::new(),
                        pending_exit: None,
                    };
                    let sub_list = (**sub_list).clone();
                    let out_arc = Arc::new(AsyncMutex::new(stage_stdout));
                    let err_arc = Arc::new(AsyncMutex::new(stage_stderr));
                    futures.push(tokio::spawn(async move {
                        drop(stage_stdin);
                        child.run_list(&sub_list, out_arc, err_arc).await;
                        StageResult { status: child.last_status, effects: None }
                    }));
                }
            }
        }

        let mut results = Vec::with_capacity(futures.len());
        for future in futures {
            results.push(future.await.unwrap_or(StageResult { status: 1, effects: None }));
        }

        for target in file_targets {
            let inner = target.lock().await;
            let mut vfs = self.vfs.lock().await;
            let result = if inner.append {
                vfs.append_file(&inner.path, inner.buffer.as_bytes())
            } else {
                vfs.write_file(&inner.path, inner.buffer.as_bytes())
            };
            if let Err(e) = result {
                drop(vfs);
                stderr.lock().await.write(&format!("sh: {e}\n")).await.ok();
            }
        }

        let last = results.pop().unwrap_or(StageResult { status: 0, effects: None });
        if solo {
            if let Some(effects) = last.effects {
                self.apply_effects(effects);
            }
        }
        if pipeline.negated {
            if last.status == 0 { 1 } else { 0 }
        } else {
            last.status
        }
    }

    fn apply_effects(&mut self, effects: BuiltinEffects) {
        if let Some(cwd) = effects.cwd {
            self.cwd = cwd;
        }
        for (name, value) in effects.set_vars {
            self.vars.insert(name, value);
        }
        for name in effects.unset_vars {
            self.vars.remove(&name);
        }
        for (name, value) in effects.set_aliases {
            self.aliases.insert(name, value);
        }
        for name in effects.unset_aliases {
            self.aliases.remove(&name);
        }
        if let Some(code) = effects.exit {
            self.pending_exit = Some(code);
        }
    }

    /// Build (but don't yet spawn) the future for one simple command:
    /// expand its words, resolve alias/builtin/registry dispatch, and merge
    /// command-local assignments into a child environment (spec §4.J
    /// "Simple command").
    async fn build_stage(
        &mut self,
        simple: &SimpleCommand,
        stdin: Box<dyn CommandReader>,
        stdout: Box<dyn CommandWriter>,
        mut stderr: Box<dyn CommandWriter>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = StageResult> + Send>> {
        let mut fields: Vec<String> = Vec::new();
        let mut expand_err = None;
        for word in &simple.words {
            match self.expand_one(word).await {
                Ok(f) => fields.extend(f),
                Err(e) => {
                    expand_err = Some(e.0);
                    break;
                }
            }
        }

        let mut local_env: HashMap<String, String> = HashMap::new();
        for (name, value_parts) in &simple.assignments {
            match self.expand_one(value_parts).await {
                Ok(parts) => {
                    local_env.insert(name.clone(), parts.join(" "));
                }
                Err(e) => expand_err = Some(e.0),
            }
        }

        if let Some(message) = expand_err {
            return Box::pin(async move {
                stderr.write(&format!("sh: {message}\n")).await.ok();
                StageResult { status: 1, effects: None }
            });
        }

        if fields.is_empty() {
            // An assignment-only simple command (`FOO=bar`) applies to the
            // live shell when solo, same as any other builtin effect.
            return Box::pin(async move {
                StageResult {
                    status: 0,
                    effects: Some(BuiltinEffects {
                        set_vars: local_env.into_iter().collect(),
                        ..Default::default()
                    }),
                }
            });
        }

        let name = resolve_alias(&self.aliases, &fields[0]);
        let args = fields[1..].to_vec();
        let mut env = self.vars.clone();
        env.extend(local_env);

        if name == "source" || name == "." {
            let vfs = self.vfs.clone();
            let cwd = self.cwd.clone();
            let registry = self.registry.clone();
            let processes = self.processes.clone();
            let jobs = self.jobs.clone();
            let vars = self.vars.clone();
            let aliases = self.aliases.clone();
            let positional = self.positional.clone();
            return Box::pin(async move {
                let Some(path) = args.first() else {
                    stderr.write("source: usage: source file\n").await.ok();
                    return StageResult { status: 1, effects: None };
                };
                let resolved = if path.starts_with('/') {
                    path.clone()
                } else {
                    format!("{}/{}", cwd.trim_end_matches('/'), path)
                };
                let content = { vfs.lock().await.read_file_string(&resolved) };
                match content {
                    Ok(src) => {
                        let mut child = Shell {
                            vfs,
                            registry,
                            processes,
                            jobs,
                            vars,
                            cwd,
                            positional,
                            last_status: 0,
                            aliases,
                            background_handles: HashMap::new(),
                            pending_exit: None,
                        };
                        let stdout_arc = Arc::new(AsyncMutex::new(stdout));
                        let stderr_arc = Arc::new(AsyncMutex::new(stderr));
                        let outcome = child.run_script(&src, stdout_arc, stderr_arc).await;
                        StageResult {
                            status: outcome.status,
                            effects: Some(BuiltinEffects {
                                set_vars: child.vars.into_iter().collect(),
                                cwd: Some(child.cwd),
                                set_aliases: child.aliases.into_iter().collect(),
                                exit: outcome.exit_requested,
                                ..Default::default()
                            }),
                        }
                    }
                    Err(e) => {
                        stderr.write(&format!("source: {e}\n")).await.ok();
                        StageResult { status: 1, effects: None }
                    }
                }
            });
        }

        if builtins::is_builtin(&name) {
            let ctx = BuiltinContext {
                args,
                vars: env,
                cwd: self.cwd.clone(),
                aliases: self.aliases.clone(),
                vfs: self.vfs.clone(),
                processes: self.processes.clone(),
                jobs: self.jobs.clone(),
                stdout,
                stderr,
                stdin: Some(stdin),
                signal: lifo_domain::cancel::CancelToken::new(),
            };
            return Box::pin(async move {
                let (status, effects) = builtins::run_builtin(&name, ctx).await;
                StageResult { status, effects: Some(effects) }
            });
        }

        match self.registry.lookup(&name) {
            Some(cmd) => {
                let cwd = self.cwd.clone();
                let vfs = self.vfs.clone();
                let signal = self
                    .processes
                    .spawn(Spawn {
                        ppid: SHELL_PID,
                        job_id: None,
                        command: name.clone(),
                        args: args.clone(),
                        cwd: cwd.clone(),
                        env: env.clone(),
                        is_foreground: true,
                    });
                let pid = signal.pid;
                let cancel = signal.cancel;
                let processes = self.processes.clone();
                Box::pin(async move {
                    let ctx = CommandContext {
                        args,
                        env,
                        cwd,
                        vfs,
                        stdout,
                        stderr,
                        stdin: Some(stdin),
                        signal: cancel,
                    };
                    let status = cmd.run(ctx).await;
                    let _ = processes.update_status(pid, ProcessStatus::Zombie { exit_code: status });
                    let _ = processes.reap(pid);
                    StageResult { status, effects: None }
                })
            }
            None => Box::pin(async move {
                stderr.write(&format!("{name}: command not found\n")).await.ok();
                StageResult { status: 127, effects: None }
            }),
        }
    }

    async fn expand_one(&mut self, word: &[WordPart]) -> Result<Vec<String>, super::ExpansionError> {
        let mut runner = SubshellRunner {
            vfs: self.vfs.clone(),
            registry: self.registry.clone(),
            processes: self.processes.clone(),
            jobs: self.jobs.clone(),
            vars: self.vars.clone(),
            cwd: self.cwd.clone(),
            positional: self.positional.clone(),
        };
        let mut ectx = ExpansionContext {
            vars: &mut self.vars,
            positional: &self.positional,
            last_status: self.last_status,
            ifs: DEFAULT_IFS,
            vfs: self.vfs.clone(),
        };
        expand_word(word, &mut ectx, &mut runner).await
    }

    /// Apply a simple command's redirections, returning the (possibly
    /// replaced) stdin/stdout/stderr for the stage plus any file targets
    /// that need committing to the VFS once the stage finishes. `Err(status)`
    /// signals a redirection failure that should short-circuit the stage
    /// (spec §4.J "Opening a nonexistent read target fails with ENOENT
    /// (stage exits 1)").
    async fn apply_redirections(
        &mut self,
        simple: &SimpleCommand,
        mut stdin: Box<dyn CommandReader>,
        mut stdout: Box<dyn CommandWriter>,
        mut stderr: Box<dyn CommandWriter>,
    ) -> Result<(Box<dyn CommandReader>, Box<dyn CommandWriter>, Box<dyn CommandWriter>, Vec<SharedFileTarget>), i32> {
        let mut targets = Vec::new();
        for redir in &simple.redirections {
            match redir.op {
                RedirOp::In => {
                    let path = self.redir_target_path(redir).await.map_err(|_| 1)?;
                    let content = {
                        let vfs = self.vfs.lock().await;
                        vfs.read_file_string(&path)
                    };
                    match content {
                        Ok(text) => stdin = Box::new(StringReader::new(text)),
                        Err(_) => return Err(1),
                    }
                }
                RedirOp::Out | RedirOp::Append => {
                    let path = self.redir_target_path(redir).await.map_err(|_| 1)?;
                    let target = Arc::new(AsyncMutex::new(FileTarget {
                        path,
                        append: matches!(redir.op, RedirOp::Append),
                        buffer: String::new(),
                    }));
                    stdout = Box::new(FileTargetWriter(target.clone()));
                    targets.push(target);
                }
                RedirOp::ErrOut | RedirOp::ErrAppend => {
                    let path = self.redir_target_path(redir).await.map_err(|_| 1)?;
                    let target = Arc::new(AsyncMutex::new(FileTarget {
                        path,
                        append: matches!(redir.op, RedirOp::ErrAppend),
                        buffer: String::new(),
                    }));
                    stderr = Box::new(FileTargetWriter(target.clone()));
                    targets.push(target);
                }
                RedirOp::All => {
                    let path = self.redir_target_path(redir).await.map_err(|_| 1)?;
                    let target = Arc::new(AsyncMutex::new(FileTarget { path, append: false, buffer: String::new() }));
                    stdout = Box::new(FileTargetWriter(target.clone()));
                    stderr = Box::new(FileTargetWriter(target.clone()));
                    targets.push(target);
                }
            }
        }
        Ok((stdin, stdout, stderr, targets))
    }

    async fn redir_target_path(&mut self, redir: &Redirection) -> Result<String, super::ExpansionError> {
        let fields = self.expand_one(&redir.target).await?;
        let raw = fields.join(" ");
        Ok(if raw.starts_with('/') {
            raw
        } else {
            format!("{}/{}", self.cwd.trim_end_matches('/'), raw)
        })
    }
}

/// `NAME=value` aliasing: one non-recursive substitution of the first word,
/// guarded against a direct self-reference cycle.
fn resolve_alias(aliases: &HashMap<String, String>, name: &str) -> String {
    match aliases.get(name) {
        Some(expansion) if expansion != name => {
            expansion.split_whitespace().next().unwrap_or(name).to_string()
        }
        _ => name.to_string(),
    }
}

fn describe_pipeline(pipeline: &Pipeline) -> String {
    pipeline
        .commands
        .iter()
        .map(describe_command)
        .collect::<Vec<_>>()
        .join(" | ")
}

fn describe_command(command: &AstCommand) -> String {
    match command {
        AstCommand::Simple(simple) => simple
            .words
            .iter()
            .map(|w| w.iter().map(|p| p.text.as_str()).collect::<String>())
            .collect::<Vec<_>>()
            .join(" "),
        AstCommand::Grouped(_) => "(...)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::demo::{Echo, Tr};
    use crate::content_store::ContentStore;

    fn fresh_shell() -> Shell {
        let vfs = Arc::new(AsyncMutex::new(Vfs::new(Arc::new(ContentStore::with_default_budget()))));
        let mut registry = CommandRegistry::new();
        registry.register("echo", Arc::new(Echo));
        registry.register("tr", Arc::new(Tr));
        Shell::new(
            vfs,
            Arc::new(registry),
            Arc::new(ProcessRegistry::new()),
            Arc::new(JobTable::new()),
            HashMap::new(),
            "/",
        )
    }

    #[tokio::test]
    async fn pipeline_streams_between_registered_commands() {
        let mut shell = fresh_shell();
        let (out, status) = shell.run_captured("echo hello world | tr a-z A-Z").await;
        assert_eq!(status, 0);
        assert_eq!(out, "HELLO WORLD\n");
    }

    #[tokio::test]
    async fn redirection_writes_through_to_the_vfs() {
        let mut shell = fresh_shell();
        let capture = CapturingWriter::new();
        let stdout: Arc<AsyncMutex<Box<dyn CommandWriter>>> = Arc::new(AsyncMutex::new(Box::new(capture)));
        let stderr: Arc<AsyncMutex<Box<dyn CommandWriter>>> = Arc::new(AsyncMutex::new(Box::new(NullWriter)));
        let outcome = shell
            .run_script("echo hello world | tr a-z A-Z > /tmp/out.txt", stdout, stderr)
            .await;
        assert_eq!(outcome.status, 0);
        let vfs = shell.vfs.lock().await;
        assert_eq!(vfs.read_file_string("/tmp/out.txt").unwrap(), "HELLO WORLD\n");
    }

    #[tokio::test]
    async fn cd_and_export_apply_back_to_a_solo_stage() {
        let mut shell = fresh_shell();
        shell.vfs.lock().await.mkdir("/work", true).unwrap();
        let (_, status) = shell.run_captured("cd /work").await;
        assert_eq!(status, 0);
        assert_eq!(shell.cwd, "/work");
        let (_, status) = shell.run_captured("export FOO=bar").await;
        assert_eq!(status, 0);
        assert_eq!(shell.vars.get("FOO"), Some(&"bar".to_string()));
    }

    #[tokio::test]
    async fn and_or_connectors_short_circuit() {
        let mut shell = fresh_shell();
        let (out, status) = shell.run_captured("false && echo nope").await;
        assert_eq!(status, 1);
        assert_eq!(out, "");
        let (out, status) = shell.run_captured("false || echo yep").await;
        assert_eq!(status, 0);
        assert_eq!(out, "yep\n");
    }

    #[tokio::test]
    async fn background_job_is_listed_then_killable() {
        let mut shell = fresh_shell();
        shell.registry = Arc::new({
            let mut registry = CommandRegistry::new();
            registry.register("sleep", Arc::new(crate::command::demo::Sleep));
            registry
        });
        let (_, status) = shell.run_captured("sleep 10 &").await;
        assert_eq!(status, 0);
        tokio::task::yield_now().await;
        let jobs = shell.jobs.get_background_jobs();
        assert_eq!(jobs.len(), 1);
        let job_id = jobs[0].job_id;
        shell.jobs.resolve_job_spec(&format!("%{job_id}"));
        let pid = jobs[0].pid;
        shell.processes.kill(pid, Some("KILL")).unwrap();
    }

    #[tokio::test]
    async fn command_not_found_reports_status_127() {
        let mut shell = fresh_shell();
        let (_, status) = shell.run_captured("nonexistent-cmd").await;
        assert_eq!(status, 127);
    }

    #[tokio::test]
    async fn command_substitution_does_not_leak_subshell_mutation() {
        let mut shell = fresh_shell();
        let (out, status) = shell.run_captured("echo $(cd /tmp; echo hi)").await;
        assert_eq!(status, 0);
        assert_eq!(out, "hi\n");
        assert_eq!(shell.cwd, "/");
    }
}

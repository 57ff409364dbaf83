// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! Shell builtins (spec §4.J): `cd`, `pwd`, `export`, `unset`, `alias`,
//! `unalias`, `exit`, `jobs`, `fg`, `bg`, `kill`, `test`/`[`, `:`, `true`,
//! `false`.
//!
//! Builtins run "directly in the shell's context" rather than through the
//! command registry (spec §4.J), but they don't borrow `Shell` directly —
//! the executor hands each one a [`BuiltinContext`] (a snapshot of the
//! state it's allowed to read, plus the shared VFS/process/job handles) and
//! applies the returned [`BuiltinEffects`] back onto itself. This keeps
//! pipeline concurrency uniform (see `executor::run_pipeline`): a builtin
//! that isn't the sole stage of its pipeline still runs, but its effects
//! are discarded exactly like a subshell's (spec's "Non-goals" exclude real
//! process isolation, but POSIX shells give every non-last pipeline stage
//! subshell semantics regardless, and we follow that here for every
//! non-solo stage).
//!
//! `source`/`.` is handled directly by the executor instead of through this
//! dispatch table, since it needs to recursively run a script against the
//! live shell rather than a disposable snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;

use lifo_domain::cancel::CancelToken;

use super::test_expr;
use crate::command::io::{CommandReader, CommandWriter};
use crate::process::{JobTable, ProcessRegistry, ProcessStatus};
use crate::vfs::Vfs;

pub const BUILTIN_NAMES: &[&str] = &[
    "cd", "pwd", "export", "unset", "alias", "unalias", "exit", "jobs", "fg", "bg", "kill",
    "test", "[", ":", "true", "false", "source", ".",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// State changes a builtin wants applied back onto the live shell. Only
/// applied by the executor when the builtin was the sole stage of its
/// pipeline.
#[derive(Default)]
pub struct BuiltinEffects {
    pub cwd: Option<String>,
    pub set_vars: Vec<(String, String)>,
    pub unset_vars: Vec<String>,
    pub set_aliases: Vec<(String, String)>,
    pub unset_aliases: Vec<String>,
    pub exit: Option<i32>,
}

/// Everything a builtin needs: a read-only snapshot of shell state, the
/// shared runtime handles, and its streams (spec §6 "Command contract",
/// narrowed to what builtins — which never touch `args`/`env` the way a
/// registered command's `CommandContext` does — actually use).
pub struct BuiltinContext {
    pub args: Vec<String>,
    pub vars: HashMap<String, String>,
    pub cwd: String,
    pub aliases: HashMap<String, String>,
    pub vfs: Arc<AsyncMutex<Vfs>>,
    pub processes: Arc<ProcessRegistry>,
    pub jobs: Arc<JobTable>,
    pub stdout: Box<dyn CommandWriter>,
    pub stderr: Box<dyn CommandWriter>,
    pub stdin: Option<Box<dyn CommandReader>>,
    pub signal: CancelToken,
}

impl BuiltinContext {
    async fn out(&mut self, s: &str) {
        let _ = self.stdout.write(s).await;
    }

    async fn err(&mut self, s: &str) {
        let _ = self.stderr.write(s).await;
    }
}

/// Dispatch one builtin by name, returning its exit status and the effects
/// it wants applied.
pub async fn run_builtin(name: &str, mut ctx: BuiltinContext) -> (i32, BuiltinEffects) {
    match name {
        "cd" => cd(&mut ctx).await,
        "pwd" => pwd(&mut ctx).await,
        "export" => export(&mut ctx).await,
        "unset" => unset(&mut ctx).await,
        "alias" => alias(&mut ctx).await,
        "unalias" => unalias(&mut ctx).await,
        "exit" => exit_builtin(&mut ctx).await,
        "jobs" => jobs(&mut ctx).await,
        "fg" | "bg" => fg_bg(name, &mut ctx).await,
        "kill" => kill(&mut ctx).await,
        "test" => test_builtin(&ctx.args, &ctx).await,
        "[" => {
            if ctx.args.last().map(String::as_str) != Some("]") {
                ctx.err("[: missing closing ']'\n").await;
                return (2, BuiltinEffects::default());
            }
            let inner = &ctx.args[..ctx.args.len() - 1];
            test_builtin(inner, &ctx).await
        }
        ":" | "true" => (0, BuiltinEffects::default()),
        "false" => (1, BuiltinEffects::default()),
        other => {
            ctx.err(&format!("{other}: not a builtin\n")).await;
            (1, BuiltinEffects::default())
        }
    }
}

async fn cd(ctx: &mut BuiltinContext) -> (i32, BuiltinEffects) {
    let target = ctx
        .args
        .first()
        .cloned()
        .or_else(|| ctx.vars.get("HOME").cloned())
        .unwrap_or_else(|| "/".to_string());
    let resolved = if target.starts_with('/') {
        target
    } else {
        format!("{}/{}", ctx.cwd.trim_end_matches('/'), target)
    };
    let vfs = ctx.vfs.lock().await;
    match vfs.stat(&resolved) {
        Ok(stat) if stat.file_type == lifo_domain::inode::FileType::Directory => {
            drop(vfs);
            let normalized = lifo_domain::path::NormalizedPath::normalize(&resolved)
                .map(|p| p.as_str().to_string())
                .unwrap_or(resolved);
            (
                0,
                BuiltinEffects {
                    cwd: Some(normalized.clone()),
                    set_vars: vec![("PWD".to_string(), normalized)],
                    ..Default::default()
                },
            )
        }
        Ok(_) => {
            drop(vfs);
            ctx.err(&format!("cd: not a directory: {resolved}\n")).await;
            (1, BuiltinEffects::default())
        }
        Err(e) => {
            drop(vfs);
            ctx.err(&format!("cd: {e}\n")).await;
            (1, BuiltinEffects::default())
        }
    }
}

async fn pwd(ctx: &mut BuiltinContext) -> (i32, BuiltinEffects) {
    let cwd = ctx.cwd.clone();
    ctx.out(&format!("{cwd}\n")).await;
    (0, BuiltinEffects::default())
}

async fn export(ctx: &mut BuiltinContext) -> (i32, BuiltinEffects) {
    if ctx.args.is_empty() {
        let mut pairs: Vec<(&String, &String)> = ctx.vars.iter().collect();
        pairs.sort_by_key(|(k, _)| k.as_str());
        for (k, v) in pairs {
            let line = format!("export {k}={v}\n");
            ctx.out(&line).await;
        }
        return (0, BuiltinEffects::default());
    }
    let mut effects = BuiltinEffects::default();
    for arg in &ctx.args {
        if let Some((name, value)) = arg.split_once('=') {
            effects.set_vars.push((name.to_string(), value.to_string()));
        } else if let Some(value) = ctx.vars.get(arg) {
            effects.set_vars.push((arg.clone(), value.clone()));
        }
    }
    (0, effects)
}

async fn unset(ctx: &mut BuiltinContext) -> (i32, BuiltinEffects) {
    (
        0,
        BuiltinEffects {
            unset_vars: ctx.args.clone(),
            ..Default::default()
        },
    )
}

async fn alias(ctx: &mut BuiltinContext) -> (i32, BuiltinEffects) {
    if ctx.args.is_empty() {
        let mut pairs: Vec<(&String, &String)> = ctx.aliases.iter().collect();
        pairs.sort_by_key(|(k, _)| k.as_str());
        for (k, v) in pairs {
            ctx.out(&format!("alias {k}='{v}'\n")).await;
        }
        return (0, BuiltinEffects::default());
    }
    let mut effects = BuiltinEffects::default();
    for arg in &ctx.args {
        if let Some((name, value)) = arg.split_once('=') {
            effects.set_aliases.push((name.to_string(), value.to_string()));
        } else if let Some(value) = ctx.aliases.get(arg) {
            ctx.out(&format!("alias {arg}='{value}'\n")).await;
        } else {
            ctx.err(&format!("alias: {arg}: not found\n")).await;
            return (1, effects);
        }
    }
    (0, effects)
}

async fn unalias(ctx: &mut BuiltinContext) -> (i32, BuiltinEffects) {
    (
        0,
        BuiltinEffects {
            unset_aliases: ctx.args.clone(),
            ..Default::default()
        },
    )
}

async fn exit_builtin(ctx: &mut BuiltinContext) -> (i32, BuiltinEffects) {
    let code = ctx
        .args
        .first()
        .and_then(|s| s.parse::<i32>().ok())
        .unwrap_or(0);
    let code = code.rem_euclid(256);
    (
        code,
        BuiltinEffects {
            exit: Some(code),
            ..Default::default()
        },
    )
}

async fn jobs(ctx: &mut BuiltinContext) -> (i32, BuiltinEffects) {
    for entry in ctx.jobs.get_background_jobs() {
        let status = match ctx.processes.get(entry.pid).map(|p| p.status) {
            Some(ProcessStatus::Running) => "Running",
            Some(ProcessStatus::Sleeping) => "Running",
            Some(ProcessStatus::Stopped) => "Stopped",
            Some(ProcessStatus::Zombie { .. }) | None => "Done",
        };
        ctx.out(&format!("[{}] {} {}\n", entry.job_id, status, entry.command_line)).await;
    }
    (0, BuiltinEffects::default())
}

async fn fg_bg(name: &str, ctx: &mut BuiltinContext) -> (i32, BuiltinEffects) {
    let Some(spec) = ctx.args.first() else {
        ctx.err(&format!("{name}: usage: {name} %jobid\n")).await;
        return (1, BuiltinEffects::default());
    };
    let Some(pid) = ctx.jobs.resolve_job_spec(spec) else {
        ctx.err(&format!("{name}: {spec}: no such job\n")).await;
        return (1, BuiltinEffects::default());
    };
    if name == "bg" {
        // No stop/resume model (spec §1 Non-goals: no preemption); a
        // background job is always already running.
        return match ctx.processes.get(pid) {
            Some(_) => (0, BuiltinEffects::default()),
            None => (0, BuiltinEffects::default()),
        };
    }
    // `fg`: spin until the process is reaped (the background task that ran
    // it self-reaps on completion, see executor::spawn_background).
    loop {
        match ctx.processes.get(pid) {
            Some(record) if !record.is_zombie() => {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            }
            Some(record) => return (record.exit_code.unwrap_or(0), BuiltinEffects::default()),
            None => return (0, BuiltinEffects::default()),
        }
    }
}

async fn kill(ctx: &mut BuiltinContext) -> (i32, BuiltinEffects) {
    if ctx.args.is_empty() {
        ctx.err("kill: usage: kill [-SIGNAL] pid|%job\n").await;
        return (1, BuiltinEffects::default());
    }
    let mut signal = None;
    let mut targets = Vec::new();
    for arg in &ctx.args {
        if let Some(sig) = arg.strip_prefix('-') {
            signal = Some(sig.trim_start_matches("SIG").to_string());
        } else {
            targets.push(arg.clone());
        }
    }
    let mut status = 0;
    for target in targets {
        let pid = if let Some(spec) = target.strip_prefix('%').map(|_| target.as_str()) {
            ctx.jobs.resolve_job_spec(spec)
        } else {
            target.parse::<u32>().ok()
        };
        match pid {
            Some(pid) => {
                if let Err(e) = ctx.processes.kill(pid, signal.as_deref()) {
                    ctx.err(&format!("kill: {e}\n")).await;
                    status = 1;
                }
            }
            None => {
                ctx.err(&format!("kill: {target}: no such process or job\n")).await;
                status = 1;
            }
        }
    }
    (status, BuiltinEffects::default())
}

async fn test_builtin(args: &[String], ctx: &BuiltinContext) -> (i32, BuiltinEffects) {
    let vfs = ctx.vfs.lock().await;
    match test_expr::eval_test(args, &vfs) {
        Ok(true) => (0, BuiltinEffects::default()),
        Ok(false) => (1, BuiltinEffects::default()),
        Err(_) => (2, BuiltinEffects::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::io::{CapturingWriter, NullWriter};
    use crate::content_store::ContentStore;

    fn ctx(args: Vec<&str>) -> (BuiltinContext, CapturingWriter) {
        let out = CapturingWriter::new();
        let ctx = BuiltinContext {
            args: args.into_iter().map(String::from).collect(),
            vars: HashMap::new(),
            cwd: "/home/user".to_string(),
            aliases: HashMap::new(),
            vfs: Arc::new(AsyncMutex::new(Vfs::new(Arc::new(ContentStore::with_default_budget())))),
            processes: Arc::new(ProcessRegistry::new()),
            jobs: Arc::new(JobTable::new()),
            stdout: Box::new(out.clone()),
            stderr: Box::new(NullWriter),
            stdin: None,
            signal: CancelToken::new(),
        };
        (ctx, out)
    }

    #[tokio::test]
    async fn cd_into_existing_directory() {
        let (mut c, _) = ctx(vec!["/tmp"]);
        c.vfs.lock().await.mkdir("/tmp", true).unwrap();
        let (status, effects) = run_builtin("cd", c).await;
        assert_eq!(status, 0);
        assert_eq!(effects.cwd, Some("/tmp".to_string()));
    }

    #[tokio::test]
    async fn cd_into_missing_directory_fails() {
        let (c, _) = ctx(vec!["/nope"]);
        let (status, _) = run_builtin("cd", c).await;
        assert_eq!(status, 1);
    }

    #[tokio::test]
    async fn pwd_prints_cwd() {
        let (c, out) = ctx(vec![]);
        let (status, _) = run_builtin("pwd", c).await;
        assert_eq!(status, 0);
        assert_eq!(out.contents().await, "/home/user\n");
    }

    #[tokio::test]
    async fn export_sets_variable_effect() {
        let (c, _) = ctx(vec!["FOO=bar"]);
        let (status, effects) = run_builtin("export", c).await;
        assert_eq!(status, 0);
        assert_eq!(effects.set_vars, vec![("FOO".to_string(), "bar".to_string())]);
    }

    #[tokio::test]
    async fn exit_builtin_reports_code() {
        let (c, _) = ctx(vec!["3"]);
        let (status, effects) = run_builtin("exit", c).await;
        assert_eq!(status, 3);
        assert_eq!(effects.exit, Some(3));
    }

    #[tokio::test]
    async fn true_and_false_builtins() {
        let (c1, _) = ctx(vec![]);
        assert_eq!(run_builtin("true", c1).await.0, 0);
        let (c2, _) = ctx(vec![]);
        assert_eq!(run_builtin("false", c2).await.0, 1);
    }

    #[tokio::test]
    async fn bracket_test_requires_closing_bracket() {
        let (c, _) = ctx(vec!["-n", "x"]);
        let (status, _) = run_builtin("[", c).await;
        assert_eq!(status, 2);
    }

    #[tokio::test]
    async fn bracket_test_evaluates() {
        let (c, _) = ctx(vec!["3", "-lt", "2", "]"]);
        let (status, _) = run_builtin("[", c).await;
        assert_eq!(status, 1);
    }

    #[tokio::test]
    async fn kill_unknown_pid_reports_error() {
        let (c, _) = ctx(vec!["999"]);
        let (status, _) = run_builtin("kill", c).await;
        assert_eq!(status, 1);
    }

    #[tokio::test]
    async fn jobs_lists_background_entries() {
        let (c, out) = ctx(vec![]);
        let pid = c
            .processes
            .spawn(crate::process::Spawn {
                ppid: 1,
                job_id: Some(1),
                command: "sleep 10".to_string(),
                args: vec![],
                cwd: "/".to_string(),
                env: HashMap::new(),
                is_foreground: false,
            })
            .pid;
        c.jobs.add(pid, "sleep 10");
        run_builtin("jobs", c).await;
        assert_eq!(out.contents().await, "[1] Running sleep 10\n");
    }
}

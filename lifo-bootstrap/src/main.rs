// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! Process entry point (SPEC_FULL.md §A `lifo-bootstrap`): wires the
//! runtime together (content store, VFS with `/proc`/`/dev` mounted,
//! process/job registries, a command registry seeded with the
//! demonstration commands) and drives either a script file, a `-c` one-
//! liner, or an interactive REPL over stdin.

mod cli;
mod exit_code;
mod logger;
mod signals;

use std::io::Write as _;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex as AsyncMutex;

use lifo::command::demo::{Cat, Echo, Env, Ls, Sleep, Tr};
use lifo::command::io::{CommandWriter, HostWriter};
use lifo::command::CommandRegistry;
use lifo::content_store::ContentStore;
use lifo::process::{JobTable, ProcessRegistry};
use lifo::providers::{DevProvider, ProcProvider};
use lifo::vfs::Provider;
use lifo::{LifoConfig, Shell, Vfs};

fn build_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry.register("echo", Arc::new(Echo));
    registry.register("cat", Arc::new(Cat));
    registry.register("ls", Arc::new(Ls));
    registry.register("env", Arc::new(Env));
    registry.register("tr", Arc::new(Tr));
    registry.register("sleep", Arc::new(Sleep));
    registry
}

fn build_vfs(config: &LifoConfig) -> anyhow::Result<Vfs> {
    let content_store = Arc::new(ContentStore::new(config.content_store_max_bytes));
    let mut vfs = Vfs::new(content_store);
    vfs.register_provider("/proc", Provider::Virtual(Arc::new(ProcProvider::new())))?;
    vfs.register_provider("/dev", Provider::Virtual(Arc::new(DevProvider::new())))?;
    vfs.mkdir(&config.data_dir_home(), true).ok();
    Ok(vfs)
}

async fn run_interactive(mut shell: Shell) -> i32 {
    let stdout: Arc<AsyncMutex<Box<dyn CommandWriter>>> = Arc::new(AsyncMutex::new(Box::new(HostWriter::stdout())));
    let stderr: Arc<AsyncMutex<Box<dyn CommandWriter>>> = Arc::new(AsyncMutex::new(Box::new(HostWriter::stdout())));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} $ ", shell.cwd);
        std::io::stdout().flush().ok();

        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = signals::cancel_on_ctrl_c(&shell) => continue,
        };

        match line {
            Ok(Some(src)) => {
                let outcome = shell.run_script(&src, stdout.clone(), stderr.clone()).await;
                if let Some(code) = outcome.exit_requested {
                    return code;
                }
            }
            Ok(None) => return shell.last_status,
            Err(e) => {
                tracing::warn!("error reading stdin: {e}");
                return 1;
            }
        }
    }
}

async fn run_script(mut shell: Shell, src: &str) -> i32 {
    let stdout: Arc<AsyncMutex<Box<dyn CommandWriter>>> = Arc::new(AsyncMutex::new(Box::new(HostWriter::stdout())));
    let stderr: Arc<AsyncMutex<Box<dyn CommandWriter>>> = Arc::new(AsyncMutex::new(Box::new(HostWriter::stdout())));
    shell.run_script(src, stdout, stderr).await.status
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Cli::parse_args();
    logger::init(args.verbose);

    let config = match LifoConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return exit_code::from_bootstrap_error(&e),
    };

    let vfs = match build_vfs(&config) {
        Ok(vfs) => vfs,
        Err(e) => return exit_code::from_bootstrap_error(&e),
    };

    let shell = Shell::new(
        Arc::new(AsyncMutex::new(vfs)),
        Arc::new(build_registry()),
        Arc::new(ProcessRegistry::new()),
        Arc::new(JobTable::new()),
        config.default_env.clone(),
        config.data_dir_home(),
    );

    let status = if let Some(command) = &args.command {
        run_script(shell, command).await
    } else if let Some(path) = &args.script {
        match std::fs::read_to_string(path) {
            Ok(src) => run_script(shell, &src).await,
            Err(e) => {
                return exit_code::from_bootstrap_error(&anyhow::anyhow!("reading {}: {e}", path.display()));
            }
        }
    } else {
        run_interactive(shell).await
    };

    exit_code::from_shell_status(status)
}

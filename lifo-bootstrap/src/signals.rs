// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! Signal handling for graceful shutdown (SPEC_FULL.md §A "signal handling
//! for graceful shutdown of the embedding host executable").
//!
//! The host process's own Ctrl-C is wired to the top-level interactive
//! shell's process-group: it fires every live process's [`CancelToken`]
//! (spec §4.K "Kill", §5 "Cancellation") rather than killing the process,
//! so an interactive REPL survives one Ctrl-C the way a real shell does.

use lifo::Shell;

/// Wait for a Ctrl-C and cancel every currently-tracked process in
/// response. Runs for the lifetime of the shell; intended to be raced
/// against the REPL loop with `tokio::select!`.
pub async fn cancel_on_ctrl_c(shell: &Shell) {
    loop {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::info!("received interrupt, cancelling running processes");
        for process in shell.processes.get_all() {
            if process.is_zombie() {
                continue;
            }
            let _ = shell.processes.kill(process.pid, Some("INT"));
        }
    }
}

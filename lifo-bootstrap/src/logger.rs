// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! Process-wide `tracing` initialization (SPEC_FULL.md §B "Logging").
//!
//! Mirrors the teacher's bootstrap logger: a thin wrapper around
//! `tracing-subscriber`'s env-filter + fmt layers, set once at process
//! start. Library code never configures its own subscriber.

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber. `verbose` raises the default
/// filter to `debug`; `RUST_LOG` always takes precedence when set.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("tracing subscriber already initialized, ignoring");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_does_not_panic_when_called_repeatedly() {
        init(false);
        init(true);
    }
}

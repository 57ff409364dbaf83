// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! CLI argument parsing (SPEC_FULL.md §A "CLI parsing (`clap`)").

use std::path::PathBuf;

use clap::Parser;

/// An in-process POSIX-like shell: run a script file, a one-off command
/// line, or start an interactive REPL.
#[derive(Parser, Debug)]
#[command(name = "lifo", about = "An in-process, POSIX-like shell over a virtual filesystem", version)]
pub struct Cli {
    /// Script file to run non-interactively. Omit to start a REPL.
    pub script: Option<PathBuf>,

    /// Run a single command line instead of reading a script or REPL input.
    #[arg(short = 'c', long = "command")]
    pub command: Option<String>,

    /// Optional TOML configuration file (SPEC_FULL.md §B "Configuration").
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Raise logging to debug level.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

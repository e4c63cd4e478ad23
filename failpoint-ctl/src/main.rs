//! Thin CLI wrapping `failpoint-rewriter`'s two operations. No
//! business logic of its own lives here — argument parsing plus a
//! direct call into the library, matching the upstream `failpoint-ctl`
//! tool's scope (a build-step helper, not a framework).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// Rewrite or restore failpoint marker calls in a crate's source tree.
#[derive(Parser)]
#[command(name = "failpoint-ctl", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rewrite marker calls under `path` into real evaluation logic.
    Enable {
        /// Root of the crate to rewrite (the directory holding `Cargo.toml`).
        path: PathBuf,
    },
    /// Put back any files stashed by a previous `enable` run under `path`.
    Disable {
        /// Root to search for stashed originals.
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Enable { path } => match failpoint_rewriter::enable_dir(&path) {
            Ok(rewritten) => {
                println!("rewrote {} file(s)", rewritten.len());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("failpoint-ctl: {e}");
                ExitCode::FAILURE
            }
        },
        Command::Disable { path } => match failpoint_rewriter::restore_dir(&path) {
            Ok(restored) => {
                println!("restored {} file(s)", restored.len());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("failpoint-ctl: {e}");
                ExitCode::FAILURE
            }
        },
    }
}

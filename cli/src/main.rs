//! # Pharc Main Entry Point
//!
//! File: cli/src/main.rs
//!
//! ## Overview
//!
//! This file is the entry point of the `pharc` CLI. It handles:
//! - Command-line argument parsing using Clap
//! - Setting up the logging system based on verbosity flags
//! - Routing execution to the `build` and `list` handlers
//!
//! ## Examples
//!
//! ```bash
//! # Get help
//! pharc --help
//!
//! # Build with stage-by-stage logging
//! pharc -v build bin/app -I src
//!
//! # Inspect the result
//! pharc list build/app
//! ```
//!
//! Command processing flow:
//! 1. Parse command-line args via Clap
//! 2. Configure logging based on verbosity level (`RUST_LOG` overrides it)
//! 3. Route to the command handler
//! 4. Print any error on stderr and exit with status 1
//!
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod commands; // Subcommand handlers (build, list).
mod common; // Shared utilities (archive format, fs, system lookups).
mod compiler; // Validation, packaging and finalization of a compile run.
mod core; // Errors and configuration.

/// Top-level command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "pharc",
    about = "Compile a PHP entry point and its sources into a self-executing Phar archive",
    long_about = "Packages an entry-point script together with the source files of one or more\n\
                  include directories into a single Phar archive that runs directly from the shell.",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Compile an entry point into an executable archive.
    #[command(alias = "b")]
    Build(commands::build::BuildArgs),
    /// List and verify the contents of an archive.
    #[command(alias = "ls")]
    List(commands::list::ListArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    let command_result = match cli.command {
        Commands::Build(args) => commands::build::handle_build(args),
        Commands::List(args) => commands::list::handle_list(args),
    };

    if let Err(e) = command_result {
        tracing::debug!("Command execution failed: {:?}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_cmd::Command;
    use predicates::prelude::*;
    fn pharc_cmd() -> Command {
        Command::cargo_bin("pharc").expect("Failed to find pharc binary for testing")
    }
    #[test]
    fn test_main_help_flag() {
        pharc_cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("build"));
    }
    #[test]
    fn test_main_version_flag() {
        pharc_cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }
}

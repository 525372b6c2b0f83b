//! # Pharc Build Command
//!
//! File: cli/src/commands/build.rs
//!
//! ## Overview
//!
//! This module implements `pharc build`, the thin caller around
//! `compiler::compile`. It merges command-line flags over the loaded
//! configuration, turns the result into a `CompileRequest` plus
//! `CompileOptions`, runs the compiler, and reports where the archive went.
//!
//! ## Architecture
//!
//! The command flow follows these steps:
//! 1. Parse arguments (entry point, build dir, include dirs, filters).
//! 2. Load configuration (`core::config::load_config`).
//! 3. Resolve each setting: flag, then config, then built-in default.
//!    Exclusions from both sources are combined.
//! 4. Detect the archive environment (config `readonly` or `PHARC_READONLY`).
//! 5. Compile and print the final archive path and entry count.
//!
//! ## Examples
//!
//! ```bash
//! # Package bin/app with everything under src/ into build/app
//! pharc build bin/app -I src
//!
//! # Explicit output directory, two include dirs, reproducible timestamps
//! SOURCE_DATE_EPOCH=1700000000 pharc build bin/app -o dist -I src -I vendor
//! ```
//!
use crate::compiler::{self, ArchiveEnvironment, CompileOptions, CompileRequest};
use crate::core::config::{self, Config};
use crate::core::error::Result;
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};

/// Build directory used when neither a flag nor the config names one.
pub const DEFAULT_BUILD_DIR: &str = "build";

/// # Build Arguments (`BuildArgs`)
///
/// Defines the command-line arguments accepted by `pharc build`.
#[derive(Parser, Debug, Default)]
pub struct BuildArgs {
    /// Entry-point script; its file name becomes the archive name.
    pub entry: PathBuf,

    /// Directory the archive is written to (created if missing).
    #[arg(short = 'o', long = "build-dir")]
    pub build_dir: Option<PathBuf>,

    /// Directory whose source files are embedded. Repeat for several; order matters.
    #[arg(short = 'I', long = "include", action = clap::ArgAction::Append)]
    pub include: Vec<PathBuf>,

    /// Source file extension to collect (without dot). Repeatable. Defaults to "php".
    #[arg(long = "ext", action = clap::ArgAction::Append)]
    pub extensions: Vec<String>,

    /// File never packaged, even if it sits under an include directory. Repeatable.
    #[arg(long = "exclude", action = clap::ArgAction::Append)]
    pub exclude: Vec<PathBuf>,

    /// Interpreter named in the shebang and stripped from the entry point.
    #[arg(long)]
    pub interpreter: Option<String>,

    /// Modification time (Unix seconds) recorded for every entry.
    #[arg(long, env = "SOURCE_DATE_EPOCH")]
    pub timestamp: Option<u32>,
}

/// # Handle Build Command (`handle_build`)
///
/// Loads configuration, resolves the compile inputs and runs the compiler.
///
/// ## Errors
///
/// Returns an `Err` if configuration cannot be loaded or validated, or if
/// compilation fails. Failures of the cosmetic rename/chmod step are only
/// logged as warnings.
pub fn handle_build(args: BuildArgs) -> Result<()> {
    let cfg = config::load_config()?;
    let (request, options, env) = resolve(args, &cfg);
    debug!("Resolved build: {:?} {:?} {:?}", request, options, env);
    config::validate_build_settings(&options.extensions, &options.interpreter)
        .context("Invalid build options")?;

    let report = compiler::compile(&request, &options, &env)?;

    info!("Archive entries: {:?}", report.entries);
    debug!("Archive flushed to {:?}", report.archive_path);
    println!(
        "Built {} ({} entries{})",
        report.final_path().display(),
        report.entries.len(),
        if report.finalize.is_complete() { "" } else { ", with warnings" }
    );
    Ok(())
}

/// Merges flags over configuration.
fn resolve(args: BuildArgs, cfg: &Config) -> (CompileRequest, CompileOptions, ArchiveEnvironment) {
    let build_dir = args
        .build_dir
        .or_else(|| cfg.build.build_dir.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILD_DIR));

    let include_dirs = if !args.include.is_empty() {
        args.include
    } else {
        cfg.build.include.iter().map(PathBuf::from).collect()
    };

    let extensions = if !args.extensions.is_empty() {
        args.extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_string())
            .collect()
    } else {
        cfg.build.extensions.clone()
    };

    let mut exclude: Vec<PathBuf> = cfg.build.exclude.iter().map(PathBuf::from).collect();
    exclude.extend(args.exclude);

    let options = CompileOptions {
        interpreter: args
            .interpreter
            .unwrap_or_else(|| cfg.build.interpreter.clone()),
        extensions,
        exclude,
        env_launcher: None,
        timestamp: args.timestamp,
    };
    let request = CompileRequest {
        entry_path: args.entry,
        build_dir,
        include_dirs,
    };
    (request, options, ArchiveEnvironment::detect(cfg.archive.readonly))
}

//! # Pharc Archive Compiler (`compiler`)
//!
//! File: cli/src/compiler/mod.rs
//!
//! ## Overview
//!
//! This module turns a PHP command-line project into a single self-executing
//! Phar archive. Given an entry-point script, a build directory and a list of
//! include directories, `compile` produces `<build_dir>/<base>`: a file that
//! starts with a shebang, boots PHP, maps itself under `<base>.phar` and
//! `require`s the embedded entry point.
//!
//! ## Architecture
//!
//! The routine is strictly linear and stops at the first failure:
//!
//! ```text
//! Validating -> ArchiveOpened -> Buffering -> (Walking -> EntryAdding)*
//!   -> EntryPointEmbedding -> StubSetting -> Flushing -> Finalized
//! ```
//!
//! - `validate`: input checks, build directory creation.
//! - `common::fs::walk`: source collection and archive names.
//! - `common::archive`: the buffered writer, stub rendering and shebang stripping.
//! - `finalize`: the best-effort rename and chmod.
//!
//! Inputs that used to be ambient are explicit parameters. Whether archives
//! may be written at all is an `ArchiveEnvironment` value; which files are
//! skipped during the walk is the `exclude` list in `CompileOptions`; and the
//! result of the cosmetic rename/chmod step comes back as a `FinalizeOutcome`
//! inside the report instead of being swallowed.
//!
//! Failures after the archive is opened never leave a file under the final
//! archive name: entries are staged in memory and written through a temporary
//! file that is only renamed into place once it is complete.
//!
//! ## Usage
//!
//! ```rust
//! let request = CompileRequest {
//!     entry_path: "/proj/app".into(),
//!     build_dir: "/out".into(),
//!     include_dirs: vec!["/proj/lib".into()],
//! };
//! let report = compiler::compile(&request, &CompileOptions::default(), &ArchiveEnvironment::detect(false))?;
//! println!("{} ({} entries)", report.final_path().display(), report.entries.len());
//! ```
//!
pub mod finalize;
pub mod validate;

use crate::common::archive::phar::{PharArchive, PharError};
use crate::common::archive::stub::{bootstrap_stub, InterpreterDirective};
use crate::common::fs::walk::{self, SourceFilter};
use crate::common::system;
use crate::core::error::CompileError;
use finalize::{FinalizeOps, FinalizeOutcome, StdFinalizeOps};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable that puts the archive environment in read-only mode.
pub const READONLY_ENV_VAR: &str = "PHARC_READONLY";

/// The three inputs of a compile run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    pub entry_path: PathBuf,
    pub build_dir: PathBuf,
    pub include_dirs: Vec<PathBuf>,
}

/// Knobs with sensible defaults for a PHP project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Program started by the shebang and stripped from the entry point.
    pub interpreter: String,
    /// Extensions (without dot) of files collected from include directories.
    pub extensions: Vec<String>,
    /// Files never packaged, matched by real path.
    pub exclude: Vec<PathBuf>,
    /// Absolute path of `env`; resolved from `PATH` when unset.
    pub env_launcher: Option<PathBuf>,
    /// Modification time recorded for every entry; now when unset.
    pub timestamp: Option<u32>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            interpreter: "php".to_string(),
            extensions: vec!["php".to_string()],
            exclude: Vec::new(),
            env_launcher: None,
            timestamp: None,
        }
    }
}

/// Whether the archive-writing capability is allowed to write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveEnvironment {
    pub readonly: bool,
}

impl ArchiveEnvironment {
    /// Combines the configured setting with the `PHARC_READONLY` variable.
    /// Either one being on makes the environment read-only.
    pub fn detect(configured_readonly: bool) -> Self {
        let from_env = std::env::var(READONLY_ENV_VAR)
            .map(|v| is_truthy(&v))
            .unwrap_or(false);
        Self {
            readonly: configured_readonly || from_env,
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

/// The states a compile run moves through; logged as it goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    ArchiveOpened,
    Buffering,
    Walking,
    EntryAdding,
    EntryPointEmbedding,
    StubSetting,
    Flushing,
    Finalized,
    /// Terminal state of any run that returns an error; logged with the error.
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a successful compile produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileReport {
    /// `<build_dir>/<base>.phar`, where the archive was flushed.
    pub archive_path: PathBuf,
    /// Entry names in archive order; the entry point is last.
    pub entries: Vec<String>,
    pub finalize: FinalizeOutcome,
}

impl CompileReport {
    /// The path the archive can be run from.
    pub fn final_path(&self) -> &Path {
        &self.finalize.final_path
    }
}

/// Compiles `request` into a self-executing archive.
pub fn compile(
    request: &CompileRequest,
    options: &CompileOptions,
    env: &ArchiveEnvironment,
) -> Result<CompileReport, CompileError> {
    compile_with(request, options, env, &StdFinalizeOps)
        .inspect_err(|e| debug!("compile stage: {} ({})", Stage::Failed, e))
}

/// `compile`, with the flush and the rename/chmod step going through `ops`.
pub fn compile_with(
    request: &CompileRequest,
    options: &CompileOptions,
    env: &ArchiveEnvironment,
    ops: &dyn FinalizeOps,
) -> Result<CompileReport, CompileError> {
    enter(Stage::Validating);
    validate::validate(request, env)?;

    let base = base_name(&request.entry_path);
    let alias = format!("{}.phar", base);
    let archive_path = request.build_dir.join(&alias);

    let phar = PharArchive::create(&archive_path, &alias).map_err(|source| {
        CompileError::ArchiveCreateFailed {
            path: archive_path.clone(),
            source,
        }
    })?;
    let mut phar = match options.timestamp {
        Some(ts) => phar.with_timestamp(ts),
        None => phar,
    };
    enter(Stage::ArchiveOpened);

    phar.start_buffering();
    enter(Stage::Buffering);

    let filter = source_filter(options);
    for include_dir in &request.include_dirs {
        enter(Stage::Walking);
        let sources = walk::collect_sources(include_dir, &filter).map_err(|e| {
            CompileError::EntryAddFailed {
                path: e.path,
                source: PharError::Io {
                    path: include_dir.clone(),
                    source: e.source,
                },
            }
        })?;

        enter(Stage::EntryAdding);
        for source in &sources {
            phar.add_file(&source.archive_name, &source.real_path)
                .map_err(|e| CompileError::EntryAddFailed {
                    path: source.real_path.clone(),
                    source: e,
                })?;
        }
        info!("Added {} file(s) from {:?}", sources.len(), include_dir);
    }

    enter(Stage::EntryPointEmbedding);
    embed_entry_point(&mut phar, &request.entry_path, &base, &options.interpreter)?;

    enter(Stage::StubSetting);
    let launcher = options
        .env_launcher
        .clone()
        .unwrap_or_else(system::resolve_env_launcher);
    let stub = bootstrap_stub(&launcher, &options.interpreter, &base);
    phar.set_stub(&stub)
        .map_err(|source| CompileError::StubSetFailed { source })?;

    enter(Stage::Flushing);
    ops.flush(&mut phar)
        .map_err(|source| CompileError::ArchiveWriteFailed {
            path: archive_path.clone(),
            source,
        })?;

    let outcome = finalize::finalize(&archive_path, &request.build_dir.join(&base), ops);
    enter(Stage::Finalized);
    info!(
        "Compiled {:?} into {:?} ({} entries)",
        request.entry_path,
        outcome.final_path,
        phar.entries().len()
    );

    Ok(CompileReport {
        archive_path,
        entries: phar.entry_names(),
        finalize: outcome,
    })
}

fn enter(stage: Stage) {
    debug!("compile stage: {}", stage);
}

/// File name of the entry point. Validation has already rejected names that
/// are missing or not UTF-8.
fn base_name(entry_path: &Path) -> String {
    entry_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

fn source_filter(options: &CompileOptions) -> SourceFilter {
    let mut filter = SourceFilter::new(options.extensions.iter().cloned());
    for path in &options.exclude {
        filter = filter.exclude(path);
    }
    // The running compiler never packages itself.
    if let Ok(own) = std::env::current_exe() {
        filter = filter.exclude(&own);
    }
    debug!("Excluded from collection: {:?}", filter.excluded());
    filter
}

fn embed_entry_point(
    phar: &mut PharArchive,
    entry_path: &Path,
    base: &str,
    interpreter: &str,
) -> Result<(), CompileError> {
    let fail = |source| CompileError::EntryAddFailed {
        path: entry_path.to_path_buf(),
        source,
    };
    let content = fs::read(entry_path).map_err(|e| {
        fail(PharError::Io {
            path: entry_path.to_path_buf(),
            source: e,
        })
    })?;
    let directive = InterpreterDirective::new(interpreter).map_err(|e| {
        fail(PharError::Unsupported(format!(
            "interpreter name '{}': {}",
            interpreter, e
        )))
    })?;
    let stripped = directive.strip(&content);
    if stripped.len() != content.len() {
        debug!(
            "Stripped {} byte interpreter directive from {:?}",
            content.len() - stripped.len(),
            entry_path
        );
    }
    phar.add_from_bytes(base, stripped).map_err(fail)
}

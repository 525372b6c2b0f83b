//! # Pharc Error Types
//!
//! File: cli/src/core/error.rs
//!
//! ## Overview
//!
//! This module defines the error types used throughout `pharc`. The archive
//! compiler reports every failure through a single typed enum, `CompileError`,
//! so the caller always receives either a finished archive or exactly one
//! tagged reason. Command handlers and other application-level code use the
//! `Result<T>` alias (backed by `anyhow`) and attach context as they go.
//!
//! ## Architecture
//!
//! - `CompileError`: the compile taxonomy, derived with `thiserror`.
//! - `EntryPointReason`, `BuildDirReason`, `IncludeDirReason`: the specific
//!   validation failure carried by the matching `Invalid*` variant.
//! - `Result<T>`: alias for `anyhow::Result<T>` used outside the compiler.
//!
//! ## Examples
//!
//! ```rust
//! match compiler::compile(&request, &options, &env) {
//!     Ok(report) => println!("Wrote {}", report.archive_path.display()),
//!     Err(CompileError::InvalidEntryPoint { reason: EntryPointReason::Missing, .. }) => {
//!         eprintln!("entry point not found");
//!     }
//!     Err(e) => return Err(e.into()),
//! }
//! ```
//!
use crate::common::archive::phar::PharError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why the entry-point path was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPointReason {
    Missing,
    NotAFile,
    Unreadable,
    NonUtf8Name,
}

impl fmt::Display for EntryPointReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryPointReason::Missing => f.write_str("file does not exist"),
            EntryPointReason::NotAFile => f.write_str("specified path is not a file"),
            EntryPointReason::Unreadable => f.write_str("file not readable"),
            EntryPointReason::NonUtf8Name => f.write_str("file name is not valid UTF-8"),
        }
    }
}

/// Why the build directory was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildDirReason {
    NotADirectory,
    NotWritable,
    CreateFailed,
}

impl fmt::Display for BuildDirReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildDirReason::NotADirectory => f.write_str("specified path is not a directory"),
            BuildDirReason::NotWritable => f.write_str("directory not writable"),
            BuildDirReason::CreateFailed => f.write_str("unable to create directory"),
        }
    }
}

/// Why an include directory was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeDirReason {
    Empty,
    Missing,
    NotADirectory,
}

impl fmt::Display for IncludeDirReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncludeDirReason::Empty => f.write_str("empty path passed as directory name"),
            IncludeDirReason::Missing => f.write_str("directory does not exist"),
            IncludeDirReason::NotADirectory => f.write_str("specified path is not a directory"),
        }
    }
}

/// Every way a single `compile` call can fail.
///
/// Validation variants (`EnvironmentUnwritable` through `InvalidIncludeDir`) are
/// raised before anything is written, except for the creation of a missing
/// build directory. The remaining variants are raised once the archive exists
/// in memory; none of them leave a file behind under the final archive name.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Archive environment is read-only; refusing to write archives")]
    EnvironmentUnwritable,

    #[error("Invalid entry point '{}': {reason}", path.display())]
    InvalidEntryPoint {
        path: PathBuf,
        reason: EntryPointReason,
    },

    #[error("Invalid build directory '{}': {reason}", path.display())]
    InvalidBuildDir { path: PathBuf, reason: BuildDirReason },

    #[error("Invalid include directory '{}': {reason}", path.display())]
    InvalidIncludeDir {
        path: PathBuf,
        reason: IncludeDirReason,
    },

    #[error("Error creating Phar archive '{}': {source}", path.display())]
    ArchiveCreateFailed {
        path: PathBuf,
        #[source]
        source: PharError,
    },

    #[error("Error adding file '{}': {source}", path.display())]
    EntryAddFailed {
        path: PathBuf,
        #[source]
        source: PharError,
    },

    #[error("Error setting executable Phar stub: {source}")]
    StubSetFailed {
        #[source]
        source: PharError,
    },

    #[error("Error writing Phar archive '{}' to disk: {source}", path.display())]
    ArchiveWriteFailed {
        path: PathBuf,
        #[source]
        source: PharError,
    },
}

/// Result type for command handlers and other application code.
pub type Result<T> = anyhow::Result<T>;

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let missing = CompileError::InvalidEntryPoint {
            path: PathBuf::from("/proj/app"),
            reason: EntryPointReason::Missing,
        };
        assert_eq!(
            missing.to_string(),
            "Invalid entry point '/proj/app': file does not exist"
        );

        let read_only = CompileError::InvalidBuildDir {
            path: PathBuf::from("/out"),
            reason: BuildDirReason::NotWritable,
        };
        assert_eq!(
            read_only.to_string(),
            "Invalid build directory '/out': directory not writable"
        );

        assert_eq!(
            CompileError::EnvironmentUnwritable.to_string(),
            "Archive environment is read-only; refusing to write archives"
        );
    }

    #[test]
    fn test_entry_add_failed_keeps_source() {
        let err = CompileError::EntryAddFailed {
            path: PathBuf::from("/proj/lib/util.php"),
            source: PharError::NotBuffering,
        };
        assert!(err.to_string().contains("/proj/lib/util.php"));
        assert!(std::error::Error::source(&err).is_some());
    }
}

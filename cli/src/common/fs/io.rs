//! # Pharc Filesystem I/O Operations
//!
//! File: cli/src/common/fs/io.rs
//!
//! ## Overview
//!
//! This module centralizes the small filesystem checks and reads that the
//! compiler and the configuration loader need. They are thin wrappers over
//! `std::fs` that either add context to errors or turn a check into a plain
//! `bool`, so validation code can stay a flat sequence of checks.
//!
//! ## Architecture
//!
//! - **`ensure_dir_exists`**: Creates a directory (and its parents) if it is
//!   missing, and rejects a path that exists but is not a directory.
//! - **`is_readable_file`**: True when the path can be opened for reading.
//! - **`is_writable_dir`**: True when the directory's permission bits allow
//!   writing and a scratch file can actually be created inside it.
//! - **`read_file_to_string`**: Reads a file with error context.
//!
use crate::core::error::Result; // Use standard Result type from core::error
use anyhow::Context; // For adding context to errors
use std::fs; // Standard filesystem module
use std::path::Path; // Filesystem path type
use tracing::{debug, info}; // Logging utilities

/// Ensures that a directory exists at the specified path.
///
/// If the path does not exist, this function attempts to create the directory,
/// including any necessary parent directories (similar to `mkdir -p`).
///
/// # Errors
///
/// Returns an `Err` if:
/// - The path exists but is not a directory.
/// - Creating the directory fails (e.g., due to permissions).
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {:?}", path))?;
        info!("Created directory: {:?}", path);
    } else if !path.is_dir() {
        anyhow::bail!("Path exists but is not a directory: {:?}", path);
    } else {
        debug!("Directory already exists: {:?}", path);
    }
    Ok(())
}

/// Returns `true` if `path` can be opened for reading.
pub fn is_readable_file(path: &Path) -> bool {
    fs::File::open(path).is_ok()
}

/// Returns `true` if new files can be created inside the directory `path`.
///
/// Two checks are made. The permission bits must not mark the directory
/// read-only (this holds even for privileged users, who would otherwise
/// bypass the bits), and a throwaway scratch file must be creatable.
pub fn is_writable_dir(path: &Path) -> bool {
    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    if !meta.is_dir() || meta.permissions().readonly() {
        return false;
    }
    // The scratch file is unlinked as soon as it is created.
    tempfile::tempfile_in(path).is_ok()
}

/// Reads the entire content of a file into a string.
pub fn read_file_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file {:?}", path))
}

//! # Pharc Compile Input Validation
//!
//! File: cli/src/compiler/validate.rs
//!
//! Fail-fast checks run before any archive is created. Each step returns the
//! first violation it finds as a `CompileError`; the only side effect allowed
//! here is creating a missing build directory.
//!
use super::{ArchiveEnvironment, CompileRequest};
use crate::common::fs::io;
use crate::core::error::{BuildDirReason, CompileError, EntryPointReason, IncludeDirReason};
use std::path::Path;
use tracing::{debug, info};

/// Runs every validation step in order.
pub fn validate(request: &CompileRequest, env: &ArchiveEnvironment) -> Result<(), CompileError> {
    check_environment(env)?;
    check_entry_point(&request.entry_path)?;
    prepare_build_dir(&request.build_dir)?;
    for dir in &request.include_dirs {
        check_include_dir(dir)?;
    }
    debug!("Compile request validated: {:?}", request);
    Ok(())
}

pub fn check_environment(env: &ArchiveEnvironment) -> Result<(), CompileError> {
    if env.readonly {
        return Err(CompileError::EnvironmentUnwritable);
    }
    Ok(())
}

pub fn check_entry_point(path: &Path) -> Result<(), CompileError> {
    let fail = |reason| CompileError::InvalidEntryPoint {
        path: path.to_path_buf(),
        reason,
    };
    if !path.exists() {
        return Err(fail(EntryPointReason::Missing));
    }
    if !path.is_file() {
        return Err(fail(EntryPointReason::NotAFile));
    }
    if !io::is_readable_file(path) {
        return Err(fail(EntryPointReason::Unreadable));
    }
    // The file name becomes the archive alias and an entry name.
    if path.file_name().and_then(|n| n.to_str()).is_none() {
        return Err(fail(EntryPointReason::NonUtf8Name));
    }
    Ok(())
}

/// Checks an existing build directory, or creates a missing one with its parents.
pub fn prepare_build_dir(path: &Path) -> Result<(), CompileError> {
    let fail = |reason| CompileError::InvalidBuildDir {
        path: path.to_path_buf(),
        reason,
    };
    if path.exists() {
        if !path.is_dir() {
            return Err(fail(BuildDirReason::NotADirectory));
        }
        if !io::is_writable_dir(path) {
            return Err(fail(BuildDirReason::NotWritable));
        }
        return Ok(());
    }
    io::ensure_dir_exists(path).map_err(|e| {
        debug!("Build directory creation failed: {:#}", e);
        fail(BuildDirReason::CreateFailed)
    })?;
    info!("Created build directory {:?}", path);
    Ok(())
}

pub fn check_include_dir(path: &Path) -> Result<(), CompileError> {
    let fail = |reason| CompileError::InvalidIncludeDir {
        path: path.to_path_buf(),
        reason,
    };
    if path.as_os_str().is_empty() {
        return Err(fail(IncludeDirReason::Empty));
    }
    if !path.exists() {
        return Err(fail(IncludeDirReason::Missing));
    }
    if !path.is_dir() {
        return Err(fail(IncludeDirReason::NotADirectory));
    }
    Ok(())
}

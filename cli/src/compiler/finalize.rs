//! # Pharc Best-Effort Finalization
//!
//! File: cli/src/compiler/finalize.rs
//!
//! ## Overview
//!
//! After the archive has been written as `<base>.phar`, two cosmetic steps
//! make it look like a native executable: dropping the `.phar` suffix and
//! setting mode `0755`. Neither step can make the build fail. The archive is
//! already valid and runnable under its suffixed name, so failures here are
//! collected into a `FinalizeOutcome` and logged as warnings.
//!
//! The filesystem calls go through the `FinalizeOps` trait so tests can make
//! any step fail on demand. The trait also owns the flush that precedes them,
//! the one finalization step whose failure does fail the build.
//!
use crate::common::archive::phar::{PharArchive, PharError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Mode applied to the finished archive: `rwxr-xr-x`.
pub const EXECUTABLE_MODE: u32 = 0o755;

/// The filesystem operations used to finish a compile.
pub trait FinalizeOps {
    /// Writes the buffered archive to its target path.
    fn flush(&self, archive: &mut PharArchive) -> Result<PathBuf, PharError> {
        archive.stop_buffering()
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()>;
}

/// `FinalizeOps` backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFinalizeOps;

impl FinalizeOps for StdFinalizeOps {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    #[cfg(unix)]
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
    }

    #[cfg(not(unix))]
    fn set_mode(&self, _path: &Path, _mode: u32) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "file modes are not supported on this platform",
        ))
    }
}

/// What the best-effort step managed to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeOutcome {
    /// Where the archive ended up.
    pub final_path: PathBuf,
    pub renamed: bool,
    pub permissions_set: bool,
    /// One message per step that failed.
    pub warnings: Vec<String>,
}

impl FinalizeOutcome {
    pub fn is_complete(&self) -> bool {
        self.renamed && self.permissions_set
    }
}

/// Renames `archive_path` to `executable_path` and marks whichever of the
/// two exists as executable. Never fails.
pub fn finalize(
    archive_path: &Path,
    executable_path: &Path,
    ops: &dyn FinalizeOps,
) -> FinalizeOutcome {
    let mut warnings = Vec::new();

    let (final_path, renamed) = match ops.rename(archive_path, executable_path) {
        Ok(()) => {
            debug!("Renamed {:?} to {:?}", archive_path, executable_path);
            (executable_path.to_path_buf(), true)
        }
        Err(e) => {
            let msg = format!(
                "Could not rename {} to {}: {}",
                archive_path.display(),
                executable_path.display(),
                e
            );
            warn!("{}", msg);
            warnings.push(msg);
            (archive_path.to_path_buf(), false)
        }
    };

    let permissions_set = match ops.set_mode(&final_path, EXECUTABLE_MODE) {
        Ok(()) => true,
        Err(e) => {
            let msg = format!(
                "Could not set mode {:o} on {}: {}",
                EXECUTABLE_MODE,
                final_path.display(),
                e
            );
            warn!("{}", msg);
            warnings.push(msg);
            false
        }
    };

    FinalizeOutcome {
        final_path,
        renamed,
        permissions_set,
        warnings,
    }
}

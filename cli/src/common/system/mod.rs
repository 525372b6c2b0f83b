//! # Pharc System Utilities Module (`common::system`)
//!
//! File: cli/src/common/system/mod.rs
//!
//! ## Overview
//!
//! Host-system lookups. The only one the compiler needs is the location of
//! `env`, which goes into the archive's shebang line so the packaged program
//! finds its interpreter through `PATH` on whatever machine runs it.
//!
use std::path::PathBuf;
use tracing::{debug, warn};

/// Used when `env` cannot be found on `PATH`.
pub const FALLBACK_ENV_LAUNCHER: &str = "/usr/bin/env";

/// Resolves the absolute path of the `env` launcher.
pub fn resolve_env_launcher() -> PathBuf {
    match which::which("env") {
        Ok(path) => {
            debug!("Resolved env launcher: {:?}", path);
            path
        }
        Err(e) => {
            warn!(
                "Could not locate `env` on PATH ({}); using {}",
                e, FALLBACK_ENV_LAUNCHER
            );
            PathBuf::from(FALLBACK_ENV_LAUNCHER)
        }
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_env_launcher_is_absolute() {
        let launcher = resolve_env_launcher();
        assert!(launcher.is_absolute());
        assert_eq!(launcher.file_name().and_then(|n| n.to_str()), Some("env"));
    }
}

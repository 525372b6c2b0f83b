//! # Pharc CLI Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//!
//! ## Overview
//!
//! Shared helpers for the integration test files (`build.rs`, `list.rs`,
//! `main_tests.rs`). Each of those is compiled as its own test crate and runs
//! the real `pharc` binary.
//!

// Each test file uses a different subset of these helpers.
#![allow(dead_code)]

pub use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// # Get Pharc Command (`pharc_cmd`)
///
/// Returns an `assert_cmd::Command` for the compiled `pharc` binary.
///
/// ## Panics
/// Panics if the `pharc` binary cannot be found via `Command::cargo_bin`.
pub fn pharc_cmd() -> Command {
    Command::cargo_bin("pharc").expect("Failed to find pharc binary for testing")
}

/// A throwaway PHP project:
///
/// ```text
/// <tmp>/.git/
/// <tmp>/proj/app              (entry point, with a shebang)
/// <tmp>/proj/src/Kernel.php
/// <tmp>/proj/src/Http/Router.php
/// <tmp>/proj/src/notes.txt
/// ```
pub struct Project {
    pub tmp: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().expect("Failed to create temp dir");
        // Stops the project-config search from leaving the sandbox.
        fs::create_dir(tmp.path().join(".git")).expect("Failed to create .git");
        let proj = tmp.path().join("proj");
        fs::create_dir_all(proj.join("src/Http")).expect("Failed to create src");
        fs::write(
            proj.join("app"),
            "#!/usr/bin/env php\n<?php\nrequire __DIR__ . '/src/Kernel.php';\n",
        )
        .expect("Failed to write entry point");
        fs::write(proj.join("src/Kernel.php"), "<?php class Kernel {}\n").expect("write");
        fs::write(proj.join("src/Http/Router.php"), "<?php class Router {}\n").expect("write");
        fs::write(proj.join("src/notes.txt"), "not php\n").expect("write");
        Self { tmp }
    }

    pub fn root(&self) -> PathBuf {
        self.tmp.path().join("proj")
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    /// `pharc` running inside the project, isolated from the user's config
    /// and from environment switches that change its behavior.
    pub fn cmd(&self) -> Command {
        let home = self.tmp.path().join("home");
        fs::create_dir_all(&home).expect("Failed to create home");
        let mut cmd = pharc_cmd();
        cmd.current_dir(self.root())
            .env("HOME", &home)
            .env("XDG_CONFIG_HOME", home.join(".config"))
            .env_remove("PHARC_READONLY")
            .env_remove("SOURCE_DATE_EPOCH")
            .env_remove("RUST_LOG");
        cmd
    }
}

/// Reads a file, panicking with its path on failure.
pub fn read(path: &Path) -> Vec<u8> {
    fs::read(path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}

//! # Pharc Common Utilities (`common`)
//!
//! File: cli/src/common/mod.rs
//!
//! ## Overview
//!
//! This module is the root of the shared utilities that the compiler and the
//! command handlers build on. Keeping them here separates format and
//! filesystem mechanics (`common::`) from the compile routine (`compiler::`)
//! and the CLI surface (`commands::`).
//!
//! ## Architecture
//!
//! - **`archive`**: The Phar writer and reader, and the stub helpers.
//! - **`fs`**: Directory checks and the include-directory walker.
//! - **`system`**: Host lookups (the `env` launcher path).
//!

/// Phar archive writing, reading and stub construction.
pub mod archive;
/// Filesystem checks and source-tree walking.
pub mod fs;
/// Host system lookups.
pub mod system;

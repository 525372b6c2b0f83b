//! # Pharc Filesystem Utilities (`common::fs`)
//!
//! File: cli/src/common/fs/mod.rs
//!
//! ## Overview
//!
//! This module groups the filesystem helpers used by the compiler and the
//! configuration loader.
//!
//! ## Architecture
//!
//! - **`io`**: Directory creation and the readability/writability checks used
//!   during validation, plus reading config files with error context.
//! - **`walk`**: Recursive collection of source files from an include
//!   directory, with the extension allowlist and exclusion list
//!   (`SourceFilter`) and the archive-name computation.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::fs::{io, walk};
//! use std::path::Path;
//!
//! # fn run_example() -> anyhow::Result<()> {
//! io::ensure_dir_exists(Path::new("./build"))?;
//! let filter = walk::SourceFilter::new(["php"]);
//! for source in walk::collect_sources(Path::new("./lib"), &filter)? {
//!     println!("{} <- {}", source.archive_name, source.real_path.display());
//! }
//! # Ok(())
//! # }
//! ```
//!

/// Contains basic file I/O operations and path checks (e.g., `ensure_dir_exists`, `is_writable_dir`).
pub mod io;
/// Contains the include-directory walker (`collect_sources`, `SourceFilter`).
pub mod walk;

//! # Pharc Archive Utilities Module (`common::archive`)
//!
//! File: cli/src/common/archive/mod.rs
//!
//! ## Overview
//!
//! This module groups everything that knows about the Phar file format. The
//! compiler only talks to it through `PharArchive` (writing) and the stub
//! helpers; `pharc list` and the tests read archives back through `PharFile`.
//!
//! ## Architecture
//!
//! - **`phar`**: The buffered archive writer, its error type and the format
//!   constants (flags, signature identifiers, stub terminator).
//! - **`reader`**: Parses an archive and verifies entry CRCs and the signature.
//! - **`stub`**: Builds the bootstrap stub and strips interpreter directives
//!   from the entry point.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::archive::{phar::PharArchive, reader::PharFile, stub};
//! use std::path::Path;
//!
//! # fn run() -> anyhow::Result<()> {
//! let mut phar = PharArchive::create(Path::new("build/app.phar"), "app.phar")?;
//! phar.start_buffering();
//! phar.add_from_bytes("app", b"<?php echo 1;")?;
//! phar.set_stub(&stub::bootstrap_stub(Path::new("/usr/bin/env"), "php", "app"))?;
//! phar.stop_buffering()?;
//!
//! let parsed = PharFile::open(Path::new("build/app.phar"))?;
//! assert_eq!(parsed.entries().len(), 1);
//! # Ok(())
//! # }
//! ```
//!

/// Buffered Phar writer and format constants.
pub mod phar;
/// Phar parser with integrity checks.
pub mod reader;
/// Bootstrap stub rendering and shebang stripping.
pub mod stub;

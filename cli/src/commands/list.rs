//! # Pharc List Command
//!
//! File: cli/src/commands/list.rs
//!
//! ## Overview
//!
//! `pharc list <ARCHIVE>` opens a compiled archive, verifies its signature and
//! every entry checksum, and prints what is inside. It is the quickest way to
//! check what a build actually packaged.
//!
//! ## Examples
//!
//! ```bash
//! pharc list build/app
//!
//! # Only some entries; fails if one of them is missing
//! pharc list build/app app src/Kernel.php
//! ```
//!
//! Example output:
//!
//! ```
//! Archive:   build/app
//! Alias:     app.phar
//! Stub:      #!/usr/bin/env php (112 bytes)
//! Signature: SHA-256
//!
//!     SIZE  MODE  MTIME       CRC32     NAME
//!     2048  0644  1700000000  9a0b11ee  src/Kernel.php
//!      812  0644  1700000000  5f1d7a3c  app
//!
//! 2 entries.
//! ```
//!
use crate::common::archive::reader::{PharEntry, PharFile};
use crate::core::error::Result;
use anyhow::{anyhow, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::debug;

/// # List Arguments (`ListArgs`)
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Archive to inspect (with or without the `.phar` suffix).
    pub archive: PathBuf,

    /// Entry names to show instead of the whole manifest.
    pub names: Vec<String>,
}

/// # Handle List Command (`handle_list`)
///
/// ## Errors
///
/// Fails if the archive cannot be read, is malformed, does not verify, or
/// lacks one of the requested entries.
pub fn handle_list(args: ListArgs) -> Result<()> {
    let phar = PharFile::open(&args.archive)
        .with_context(|| format!("Failed to read archive {}", args.archive.display()))?;
    debug!(
        "Opened {:?}: API {} flags {:#x}",
        args.archive,
        phar.api_version(),
        phar.flags()
    );
    let entries = select(&phar, &args.names)?;
    print!("{}", render(&args.archive, &phar, &entries));
    Ok(())
}

/// The requested entries in the order given, or all of them in manifest order.
fn select<'a>(phar: &'a PharFile, names: &[String]) -> Result<Vec<&'a PharEntry>> {
    if names.is_empty() {
        return Ok(phar.entries().iter().collect());
    }
    names
        .iter()
        .map(|name| {
            phar.entry(name)
                .ok_or_else(|| anyhow!("No entry '{}' in archive", name))
        })
        .collect()
}

/// Formats the listing printed by `handle_list`.
fn render(path: &Path, phar: &PharFile, entries: &[&PharEntry]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Archive:   {}\n", path.display()));
    out.push_str(&format!("Alias:     {}\n", phar.alias()));
    out.push_str(&format!(
        "Stub:      {} ({} bytes)\n",
        phar.stub_first_line(),
        phar.stub().len()
    ));
    out.push_str(&format!("Signature: {}\n\n", phar.signature_name()));
    out.push_str(&format!(
        "{:>8}  {:<4}  {:<10}  {:<8}  NAME\n",
        "SIZE", "MODE", "MTIME", "CRC32"
    ));
    for entry in entries {
        out.push_str(&format!(
            "{:>8}  {:04o}  {:<10}  {:08x}  {}{}\n",
            entry.content.len(),
            entry.permissions,
            entry.timestamp,
            entry.crc32,
            entry.name,
            if entry.compressed { " (deflated)" } else { "" }
        ));
    }
    let count = entries.len();
    out.push_str(&format!(
        "\n{} {}.\n",
        count,
        if count == 1 { "entry" } else { "entries" }
    ));
    out
}

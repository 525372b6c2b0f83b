//! # Pharc Phar Writer (`common::archive::phar`)
//!
//! File: cli/src/common/archive/phar.rs
//!
//! ## Overview
//!
//! This module builds Phar archives: the single-file package format PHP can
//! execute directly and mount as a virtual file tree under `phar://<alias>/`.
//! An archive is a textual stub (ending in `__HALT_COMPILER();`), followed by
//! a binary manifest, the raw entry contents, and a trailing signature.
//!
//! ## Architecture
//!
//! `PharArchive` holds every entry in memory. The lifecycle mirrors the way
//! the compiler drives it:
//!
//! 1. `PharArchive::create` checks the target path and opens a staging file
//!    next to it (so the final rename never crosses filesystems).
//! 2. `start_buffering` enables entry additions.
//! 3. `add_file` / `add_from_bytes` store entries. Re-adding a name replaces
//!    the earlier content but keeps its original position.
//! 4. `set_stub` validates and normalises the bootstrap header.
//! 5. `stop_buffering` serialises the archive into the staging file and
//!    atomically persists it under the target name.
//!
//! If the archive is dropped before `stop_buffering`, the staging file is
//! removed with it and nothing appears under the target name.
//!
//! The byte layout (all integers little-endian) is:
//!
//! ```text
//! stub | u32 manifest_len | u32 count | u16 api | u32 flags | u32 alias_len | alias
//!      | u32 meta_len | entry records... | contents... | sha256 | u32 sig_type | "GBMB"
//! ```
//!
//! ## Usage
//!
//! ```rust
//! let mut phar = PharArchive::create(Path::new("build/app.phar"), "app.phar")?;
//! phar.start_buffering();
//! phar.add_from_bytes("app", b"<?php echo 1;")?;
//! phar.set_stub("<?php Phar::mapPhar('app.phar');require'phar://app.phar/app';__HALT_COMPILER();")?;
//! let written = phar.stop_buffering()?;
//! ```
//!
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

/// Token that ends the executable part of a stub.
pub const HALT_COMPILER: &str = "__HALT_COMPILER();";
/// Appended after `__HALT_COMPILER();` when a stub is set.
pub const STUB_TERMINATOR: &str = " ?>\r\n";
/// Manifest API version 1.1.0, encoded as two nibble-packed bytes.
pub const API_VERSION: [u8; 2] = [0x11, 0x10];
/// Global manifest flag: the archive carries a signature.
pub const FLAG_SIGNATURE: u32 = 0x0001_0000;
/// Per-entry flag masks.
pub const ENTRY_PERM_MASK: u32 = 0x0000_01FF;
pub const ENTRY_COMPRESSED_GZ: u32 = 0x0000_1000;
pub const ENTRY_COMPRESSED_BZ2: u32 = 0x0000_2000;
/// Signature type identifiers.
pub const SIG_MD5: u32 = 0x0001;
pub const SIG_SHA1: u32 = 0x0002;
pub const SIG_SHA256: u32 = 0x0003;
pub const SIG_SHA512: u32 = 0x0004;
/// Trailing magic after the signature.
pub const SIGNATURE_MAGIC: &[u8; 4] = b"GBMB";

/// Longest `#!` line Linux executes without truncation (excluding the newline).
pub const MAX_SHEBANG_LEN: usize = 255;

const DEFAULT_STUB: &str = "<?php __HALT_COMPILER();";
const DEFAULT_ENTRY_PERMISSIONS: u32 = 0o644;

/// Errors raised while building or reading a Phar archive.
#[derive(Error, Debug)]
pub enum PharError {
    #[error("Archive target is a directory: {}", .0.display())]
    TargetIsDirectory(PathBuf),

    #[error("Invalid archive alias '{0}'")]
    InvalidAlias(String),

    #[error("Invalid entry name '{0}'")]
    InvalidEntryName(String),

    #[error("Archive is not in buffering mode")]
    NotBuffering,

    #[error("Illegal stub: missing __HALT_COMPILER();")]
    MissingHaltCompiler,

    #[error("Illegal stub: interpreter line is {0} bytes (limit {limit})", limit = MAX_SHEBANG_LEN)]
    ShebangTooLong(usize),

    #[error("'{0}' is too large for a Phar manifest")]
    TooLarge(String),

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed Phar archive: {0}")]
    Malformed(String),

    #[error("CRC32 mismatch for entry '{0}'")]
    CrcMismatch(String),

    #[error("Signature does not match archive contents")]
    SignatureMismatch,

    #[error("Unsupported Phar feature: {0}")]
    Unsupported(String),
}

impl PharError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        PharError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A single named file inside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub content: Vec<u8>,
    pub timestamp: u32,
    pub permissions: u32,
}

/// An in-memory Phar archive bound to a target path.
#[derive(Debug)]
pub struct PharArchive {
    path: PathBuf,
    alias: String,
    stub: Option<String>,
    entries: Vec<ArchiveEntry>,
    index: HashMap<String, usize>,
    staging: Option<NamedTempFile>,
    buffering: bool,
    timestamp: u32,
}

impl PharArchive {
    /// Opens a new archive that will be written to `path`, mounted under `alias`.
    ///
    /// Fails if `path` is an existing directory, if the alias cannot be used in
    /// a `phar://` URL, or if the staging file cannot be created next to `path`.
    pub fn create(path: &Path, alias: &str) -> Result<Self, PharError> {
        if path.is_dir() {
            return Err(PharError::TargetIsDirectory(path.to_path_buf()));
        }
        validate_alias(alias)?;

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let staging = tempfile::Builder::new()
            .prefix(".pharc-")
            .suffix(".tmp")
            .tempfile_in(parent)
            .map_err(|e| PharError::io(parent, e))?;
        debug!(
            "Opened Phar archive {:?} (alias '{}', staging {:?})",
            path,
            alias,
            staging.path()
        );

        Ok(Self {
            path: path.to_path_buf(),
            alias: alias.to_string(),
            stub: None,
            entries: Vec::new(),
            index: HashMap::new(),
            staging: Some(staging),
            buffering: false,
            timestamp: unix_now(),
        })
    }

    /// Overrides the modification time recorded for entries added afterwards.
    pub fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn start_buffering(&mut self) {
        self.buffering = true;
    }

    /// Adds the contents of the file at `source` under `name`.
    pub fn add_file(&mut self, name: &str, source: &Path) -> Result<(), PharError> {
        if !self.buffering {
            return Err(PharError::NotBuffering);
        }
        let content = fs::read(source).map_err(|e| PharError::io(source, e))?;
        self.add_from_bytes(name, &content)
    }

    /// Adds `content` under `name`, replacing any entry with the same name.
    pub fn add_from_bytes(&mut self, name: &str, content: &[u8]) -> Result<(), PharError> {
        if !self.buffering {
            return Err(PharError::NotBuffering);
        }
        let name = normalize_entry_name(name)?;
        if u32::try_from(content.len()).is_err() {
            return Err(PharError::TooLarge(name));
        }

        let entry = ArchiveEntry {
            name: name.clone(),
            content: content.to_vec(),
            timestamp: self.timestamp,
            permissions: DEFAULT_ENTRY_PERMISSIONS,
        };
        match self.index.get(&name) {
            Some(&slot) => {
                debug!("Replacing existing entry '{}'", name);
                self.entries[slot] = entry;
            }
            None => {
                debug!("Adding entry '{}' ({} bytes)", name, content.len());
                self.index.insert(name, self.entries.len());
                self.entries.push(entry);
            }
        }
        Ok(())
    }

    /// Sets the bootstrap stub.
    ///
    /// Everything after the first `__HALT_COMPILER();` is discarded and the
    /// standard ` ?>\r\n` terminator is appended, so the stored stub always ends
    /// exactly where the manifest begins.
    ///
    /// A leading `#!` line longer than `MAX_SHEBANG_LEN` is rejected: the
    /// kernel would cut it short and the archive could not be executed.
    pub fn set_stub(&mut self, stub: &str) -> Result<(), PharError> {
        if stub.starts_with("#!") {
            let line = stub.split('\n').next().unwrap_or_default();
            if line.len() > MAX_SHEBANG_LEN {
                return Err(PharError::ShebangTooLong(line.len()));
            }
        }
        self.stub = Some(normalize_stub(stub)?);
        Ok(())
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn entry_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Serialises the whole archive, signature included.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PharError> {
        let stub = match &self.stub {
            Some(s) => s.clone(),
            None => normalize_stub(DEFAULT_STUB)?,
        };

        let mut manifest = Vec::new();
        put_u32(&mut manifest, len_u32(self.entries.len(), "entry count")?);
        manifest.extend_from_slice(&API_VERSION);
        put_u32(&mut manifest, FLAG_SIGNATURE);
        put_u32(&mut manifest, len_u32(self.alias.len(), &self.alias)?);
        manifest.extend_from_slice(self.alias.as_bytes());
        put_u32(&mut manifest, 0); // archive metadata
        for entry in &self.entries {
            let size = len_u32(entry.content.len(), &entry.name)?;
            put_u32(&mut manifest, len_u32(entry.name.len(), &entry.name)?);
            manifest.extend_from_slice(entry.name.as_bytes());
            put_u32(&mut manifest, size);
            put_u32(&mut manifest, entry.timestamp);
            put_u32(&mut manifest, size);
            put_u32(&mut manifest, crc32(&entry.content));
            put_u32(&mut manifest, entry.permissions & ENTRY_PERM_MASK);
            put_u32(&mut manifest, 0); // entry metadata
        }

        let mut out = Vec::with_capacity(
            stub.len() + manifest.len() + self.entries.iter().map(|e| e.content.len()).sum::<usize>() + 48,
        );
        out.extend_from_slice(stub.as_bytes());
        put_u32(&mut out, len_u32(manifest.len(), "manifest")?);
        out.extend_from_slice(&manifest);
        for entry in &self.entries {
            out.extend_from_slice(&entry.content);
        }

        let digest = Sha256::digest(&out);
        out.extend_from_slice(&digest);
        put_u32(&mut out, SIG_SHA256);
        out.extend_from_slice(SIGNATURE_MAGIC);
        Ok(out)
    }

    /// Flushes the buffered archive to disk and leaves buffering mode.
    ///
    /// The bytes go to the staging file first, which is then renamed over the
    /// target path. On error the staging file is removed and the target path
    /// is left as it was.
    pub fn stop_buffering(&mut self) -> Result<PathBuf, PharError> {
        if !self.buffering {
            return Err(PharError::NotBuffering);
        }
        let bytes = self.to_bytes()?;
        let mut staging = self.staging.take().ok_or(PharError::NotBuffering)?;

        staging
            .write_all(&bytes)
            .and_then(|_| staging.as_file().sync_all())
            .map_err(|e| PharError::io(staging.path(), e))?;
        staging
            .persist(&self.path)
            .map_err(|e| PharError::io(&self.path, e.error))?;

        self.buffering = false;
        info!(
            "Wrote Phar archive {:?} ({} entries, {} bytes)",
            self.path,
            self.entries.len(),
            bytes.len()
        );
        Ok(self.path.clone())
    }
}

/// Computes the CRC32 recorded for each entry.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = flate2::Crc::new();
    crc.update(data);
    crc.sum()
}

/// Trims a stub after `__HALT_COMPILER();` and appends the standard terminator.
pub fn normalize_stub(stub: &str) -> Result<String, PharError> {
    let pos = find_ascii_case_insensitive(stub.as_bytes(), HALT_COMPILER.as_bytes())
        .ok_or(PharError::MissingHaltCompiler)?;
    let end = pos + HALT_COMPILER.len();
    let mut normalized = String::with_capacity(end + STUB_TERMINATOR.len());
    normalized.push_str(&stub[..end]);
    normalized.push_str(STUB_TERMINATOR);
    Ok(normalized)
}

/// Normalises an entry name to the `/`-separated relative form stored in the
/// manifest, rejecting names that would escape the archive root.
pub fn normalize_entry_name(name: &str) -> Result<String, PharError> {
    let unified = name.replace('\\', "/");
    let parts: Vec<&str> = unified
        .split('/')
        .filter(|p| !p.is_empty() && *p != ".")
        .collect();
    if parts.is_empty() || parts.iter().any(|p| *p == "..") {
        return Err(PharError::InvalidEntryName(name.to_string()));
    }
    Ok(parts.join("/"))
}

pub(crate) fn find_ascii_case_insensitive(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
}

/// The alias ends up inside single-quoted PHP literals in the stub and in
/// `phar://` URLs, so quotes and path or URL separators are refused.
fn validate_alias(alias: &str) -> Result<(), PharError> {
    if alias.is_empty() || alias.contains(['/', '\\', ':', ';', '\'', '\0']) {
        return Err(PharError::InvalidAlias(alias.to_string()));
    }
    Ok(())
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn len_u32(len: usize, what: &str) -> Result<u32, PharError> {
    u32::try_from(len).map_err(|_| PharError::TooLarge(what.to_string()))
}

fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| u32::try_from(d.as_secs()).ok())
        .unwrap_or(0)
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::archive::reader::PharFile;
    use tempfile::tempdir;

    const STUB: &str =
        "#!/usr/bin/env php\n<?php Phar::mapPhar('app.phar');require'phar://app.phar/app';__HALT_COMPILER();";

    fn staging_files(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".pharc-"))
            .count()
    }

    #[test]
    fn test_create_rejects_directory_target() -> anyhow::Result<()> {
        let dir = tempdir()?;
        fs::create_dir(dir.path().join("app.phar"))?;
        let result = PharArchive::create(&dir.path().join("app.phar"), "app.phar");
        assert!(matches!(result, Err(PharError::TargetIsDirectory(_))));
        Ok(())
    }

    #[test]
    fn test_create_rejects_bad_alias() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let result = PharArchive::create(&dir.path().join("app.phar"), "a/b");
        assert!(matches!(result, Err(PharError::InvalidAlias(_))));
        // A quote would end the PHP string literal the alias is rendered into.
        let result = PharArchive::create(&dir.path().join("it's.phar"), "it's.phar");
        assert!(matches!(result, Err(PharError::InvalidAlias(_))));
        assert_eq!(staging_files(dir.path()), 0);
        Ok(())
    }

    #[test]
    fn test_overlong_shebang_is_rejected() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut phar = PharArchive::create(&dir.path().join("app.phar"), "app.phar")?;
        let launcher = format!("/{}/env", "d".repeat(MAX_SHEBANG_LEN));
        let stub = format!("#!{} php\n<?php __HALT_COMPILER();", launcher);
        assert!(matches!(
            phar.set_stub(&stub),
            Err(PharError::ShebangTooLong(len)) if len > MAX_SHEBANG_LEN
        ));
        phar.set_stub(STUB)?;
        Ok(())
    }

    #[test]
    fn test_add_requires_buffering() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut phar = PharArchive::create(&dir.path().join("app.phar"), "app.phar")?;
        assert!(matches!(
            phar.add_from_bytes("a.php", b"x"),
            Err(PharError::NotBuffering)
        ));
        Ok(())
    }

    #[test]
    fn test_last_write_wins_keeps_position() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut phar = PharArchive::create(&dir.path().join("app.phar"), "app.phar")?;
        phar.start_buffering();
        phar.add_from_bytes("lib/a.php", b"first")?;
        phar.add_from_bytes("lib/b.php", b"b")?;
        phar.add_from_bytes("./lib//a.php", b"second")?;
        assert_eq!(phar.entry_names(), vec!["lib/a.php", "lib/b.php"]);
        assert_eq!(phar.entries()[0].content, b"second");
        Ok(())
    }

    #[test]
    fn test_entry_name_normalization() {
        assert_eq!(normalize_entry_name("src\\lib\\a.php").unwrap(), "src/lib/a.php");
        assert_eq!(normalize_entry_name("/app").unwrap(), "app");
        assert!(normalize_entry_name("../etc/passwd").is_err());
        assert!(normalize_entry_name("").is_err());
        assert!(normalize_entry_name("./").is_err());
    }

    #[test]
    fn test_stub_is_trimmed_and_terminated() -> anyhow::Result<()> {
        let normalized = normalize_stub("<?php echo 1; __halt_compiler(); trailing junk")?;
        assert_eq!(normalized, "<?php echo 1; __halt_compiler(); ?>\r\n");
        assert!(matches!(
            normalize_stub("<?php echo 1;"),
            Err(PharError::MissingHaltCompiler)
        ));
        Ok(())
    }

    #[test]
    fn test_layout_starts_with_stub_and_ends_with_magic() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut phar = PharArchive::create(&dir.path().join("app.phar"), "app.phar")?.with_timestamp(1_500_000_000);
        phar.start_buffering();
        phar.add_from_bytes("app", b"<?php echo 1;")?;
        phar.set_stub(STUB)?;
        let bytes = phar.to_bytes()?;

        let expected_stub = format!("{}{}", STUB, STUB_TERMINATOR);
        assert!(bytes.starts_with(expected_stub.as_bytes()));
        assert!(bytes.ends_with(SIGNATURE_MAGIC));

        let sig_type = &bytes[bytes.len() - 8..bytes.len() - 4];
        assert_eq!(sig_type, SIG_SHA256.to_le_bytes());

        let manifest_start = expected_stub.len();
        let count = u32::from_le_bytes(bytes[manifest_start + 4..manifest_start + 8].try_into()?);
        assert_eq!(count, 1);
        assert_eq!(&bytes[manifest_start + 8..manifest_start + 10], &API_VERSION);
        Ok(())
    }

    #[test]
    fn test_stop_buffering_writes_readable_archive() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let target = dir.path().join("app.phar");
        let mut phar = PharArchive::create(&target, "app.phar")?;
        phar.start_buffering();
        phar.add_from_bytes("app", b"<?php echo 1;")?;
        phar.add_from_bytes("lib/util.php", b"<?php function util() {}")?;
        phar.set_stub(STUB)?;
        let written = phar.stop_buffering()?;

        assert_eq!(written, target);
        assert!(matches!(
            phar.add_from_bytes("late.php", b"x"),
            Err(PharError::NotBuffering)
        ));
        assert_eq!(staging_files(dir.path()), 0);

        let parsed = PharFile::open(&target)?;
        assert_eq!(parsed.alias(), "app.phar");
        assert_eq!(parsed.entry("app").map(|e| e.content.as_slice()), Some(&b"<?php echo 1;"[..]));
        assert!(parsed.entry("lib/util.php").is_some());
        Ok(())
    }

    #[test]
    fn test_failed_flush_leaves_no_archive() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let out = dir.path().join("out");
        fs::create_dir(&out)?;
        let target = out.join("app.phar");
        let mut phar = PharArchive::create(&target, "app.phar")?;
        phar.start_buffering();
        phar.add_from_bytes("app", b"<?php echo 1;")?;

        // Removing the directory makes the final rename impossible.
        fs::remove_dir_all(&out)?;
        let result = phar.stop_buffering();
        assert!(matches!(result, Err(PharError::Io { .. })));
        assert!(!target.exists());
        Ok(())
    }

    #[test]
    fn test_dropped_archive_removes_staging_file() -> anyhow::Result<()> {
        let dir = tempdir()?;
        {
            let mut phar = PharArchive::create(&dir.path().join("app.phar"), "app.phar")?;
            phar.start_buffering();
            phar.add_from_bytes("app", b"x")?;
            assert_eq!(staging_files(dir.path()), 1);
        }
        assert_eq!(staging_files(dir.path()), 0);
        assert!(!dir.path().join("app.phar").exists());
        Ok(())
    }

    #[test]
    fn test_crc32_known_value() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }
}

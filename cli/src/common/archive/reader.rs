//! # Pharc Phar Reader (`common::archive::reader`)
//!
//! File: cli/src/common/archive/reader.rs
//!
//! ## Overview
//!
//! Parses a Phar archive back into its stub, alias and entries, and checks
//! its integrity on the way: every entry's CRC32 and, when present, the
//! trailing SHA-256 or SHA-512 signature. `pharc list` uses it to show what
//! went into an archive, and the test suite uses it to assert on outputs.
//!
//! Entries compressed with gzip (raw deflate, as PHP writes them) are
//! inflated with `flate2`. Bzip2 entries and MD5/SHA-1/OpenSSL signatures are
//! reported as unsupported rather than silently skipped.
//!
use super::phar::{
    crc32, find_ascii_case_insensitive, PharError, ENTRY_COMPRESSED_BZ2, ENTRY_COMPRESSED_GZ,
    ENTRY_PERM_MASK, FLAG_SIGNATURE, HALT_COMPILER, SIGNATURE_MAGIC, SIG_MD5, SIG_SHA1,
    SIG_SHA256, SIG_SHA512,
};
use flate2::read::DeflateDecoder;
use sha2::{Digest, Sha256, Sha512};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// One entry as stored in the manifest, with its contents already inflated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PharEntry {
    pub name: String,
    pub content: Vec<u8>,
    pub timestamp: u32,
    pub crc32: u32,
    pub permissions: u32,
    pub compressed: bool,
}

/// A parsed, verified Phar archive.
#[derive(Debug, Clone)]
pub struct PharFile {
    stub: Vec<u8>,
    alias: String,
    api_version: [u8; 2],
    flags: u32,
    entries: Vec<PharEntry>,
    signature_type: Option<u32>,
}

impl PharFile {
    /// Reads and parses the archive at `path`.
    pub fn open(path: &Path) -> Result<Self, PharError> {
        let bytes = std::fs::read(path).map_err(|e| PharError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!("Parsing Phar archive {:?} ({} bytes)", path, bytes.len());
        Self::parse(&bytes)
    }

    /// Parses an archive held in memory.
    pub fn parse(bytes: &[u8]) -> Result<Self, PharError> {
        let manifest_start = manifest_offset(bytes)?;
        let stub = bytes[..manifest_start].to_vec();

        let mut cursor = Cursor::new(bytes, manifest_start);
        let manifest_len = cursor.u32()? as usize;
        let manifest_end = manifest_start
            .checked_add(4 + manifest_len)
            .filter(|end| *end <= bytes.len())
            .ok_or_else(|| malformed("manifest length exceeds archive size"))?;

        let count = cursor.u32()?;
        let api_version = [cursor.u8()?, cursor.u8()?];
        let flags = cursor.u32()?;
        let alias_len = cursor.u32()? as usize;
        let alias = cursor.string(alias_len)?;
        let meta_len = cursor.u32()? as usize;
        cursor.skip(meta_len)?;

        struct Record {
            name: String,
            size: u32,
            timestamp: u32,
            compressed_size: u32,
            crc32: u32,
            flags: u32,
        }
        let mut records = Vec::new();
        for _ in 0..count {
            let name_len = cursor.u32()? as usize;
            let name = cursor.string(name_len)?;
            let size = cursor.u32()?;
            let timestamp = cursor.u32()?;
            let compressed_size = cursor.u32()?;
            let crc32 = cursor.u32()?;
            let flags = cursor.u32()?;
            let meta_len = cursor.u32()? as usize;
            cursor.skip(meta_len)?;
            records.push(Record {
                name,
                size,
                timestamp,
                compressed_size,
                crc32,
                flags,
            });
        }
        if cursor.pos != manifest_end {
            return Err(malformed("manifest length does not match its records"));
        }

        let (data_end, signature_type) = if flags & FLAG_SIGNATURE != 0 {
            let sig_type = verify_signature(bytes)?;
            (bytes.len() - 8 - signature_len(sig_type)?, Some(sig_type))
        } else {
            (bytes.len(), None)
        };

        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            let stored = cursor.bytes(record.compressed_size as usize)?;
            if cursor.pos > data_end {
                return Err(malformed("entry contents overlap the signature"));
            }
            let content = inflate(&record.name, record.flags, stored)?;
            if content.len() != record.size as usize {
                return Err(malformed(&format!(
                    "entry '{}' is {} bytes, manifest says {}",
                    record.name,
                    content.len(),
                    record.size
                )));
            }
            if crc32(&content) != record.crc32 {
                return Err(PharError::CrcMismatch(record.name));
            }
            entries.push(PharEntry {
                name: record.name,
                content,
                timestamp: record.timestamp,
                crc32: record.crc32,
                permissions: record.flags & ENTRY_PERM_MASK,
                compressed: record.flags & (ENTRY_COMPRESSED_GZ | ENTRY_COMPRESSED_BZ2) != 0,
            });
        }

        Ok(Self {
            stub,
            alias,
            api_version,
            flags,
            entries,
            signature_type,
        })
    }

    pub fn stub(&self) -> &[u8] {
        &self.stub
    }

    /// First line of the stub, without the line ending.
    pub fn stub_first_line(&self) -> String {
        let line = self.stub.split(|b| *b == b'\n').next().unwrap_or_default();
        String::from_utf8_lossy(line).trim_end_matches('\r').to_string()
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn api_version(&self) -> String {
        let [hi, lo] = self.api_version;
        format!("{}.{}.{}", hi >> 4, hi & 0x0F, lo >> 4)
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn entries(&self) -> &[PharEntry] {
        &self.entries
    }

    pub fn entry(&self, name: &str) -> Option<&PharEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn signature_name(&self) -> &'static str {
        match self.signature_type {
            Some(SIG_SHA256) => "SHA-256",
            Some(SIG_SHA512) => "SHA-512",
            Some(_) => "unknown",
            None => "none",
        }
    }
}

/// Finds the first byte after `__HALT_COMPILER();` and its optional ` ?>` and line ending.
fn manifest_offset(bytes: &[u8]) -> Result<usize, PharError> {
    let halt = find_ascii_case_insensitive(bytes, HALT_COMPILER.as_bytes())
        .ok_or_else(|| malformed("no __HALT_COMPILER(); token"))?;
    let mut pos = halt + HALT_COMPILER.len();
    if bytes[pos..].starts_with(b" ?>") {
        pos += 3;
    } else if bytes[pos..].starts_with(b"?>") {
        pos += 2;
    }
    if bytes[pos..].starts_with(b"\r\n") {
        pos += 2;
    } else if bytes[pos..].starts_with(b"\n") {
        pos += 1;
    }
    Ok(pos)
}

fn signature_len(sig_type: u32) -> Result<usize, PharError> {
    match sig_type {
        SIG_MD5 => Ok(16),
        SIG_SHA1 => Ok(20),
        SIG_SHA256 => Ok(32),
        SIG_SHA512 => Ok(64),
        other => Err(PharError::Unsupported(format!("signature type {:#06x}", other))),
    }
}

fn verify_signature(bytes: &[u8]) -> Result<u32, PharError> {
    if bytes.len() < 8 || &bytes[bytes.len() - 4..] != SIGNATURE_MAGIC {
        return Err(malformed("missing GBMB signature trailer"));
    }
    let type_at = bytes.len() - 8;
    let sig_type = u32::from_le_bytes([
        bytes[type_at],
        bytes[type_at + 1],
        bytes[type_at + 2],
        bytes[type_at + 3],
    ]);
    let len = signature_len(sig_type)?;
    let sig_start = type_at
        .checked_sub(len)
        .ok_or_else(|| malformed("signature longer than archive"))?;
    let (signed, signature) = (&bytes[..sig_start], &bytes[sig_start..type_at]);

    let matches = match sig_type {
        SIG_SHA256 => Sha256::digest(signed).as_slice() == signature,
        SIG_SHA512 => Sha512::digest(signed).as_slice() == signature,
        other => {
            return Err(PharError::Unsupported(format!(
                "signature type {:#06x}",
                other
            )))
        }
    };
    if !matches {
        return Err(PharError::SignatureMismatch);
    }
    Ok(sig_type)
}

fn inflate(name: &str, flags: u32, stored: &[u8]) -> Result<Vec<u8>, PharError> {
    if flags & ENTRY_COMPRESSED_BZ2 != 0 {
        return Err(PharError::Unsupported(format!(
            "bzip2-compressed entry '{}'",
            name
        )));
    }
    if flags & ENTRY_COMPRESSED_GZ == 0 {
        return Ok(stored.to_vec());
    }
    let mut out = Vec::new();
    DeflateDecoder::new(stored)
        .read_to_end(&mut out)
        .map_err(|e| malformed(&format!("cannot inflate entry '{}': {}", name, e)))?;
    Ok(out)
}

fn malformed(msg: &str) -> PharError {
    PharError::Malformed(msg.to_string())
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8], PharError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| malformed("unexpected end of archive"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> Result<(), PharError> {
        self.bytes(len).map(|_| ())
    }

    fn u8(&mut self) -> Result<u8, PharError> {
        Ok(self.bytes(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, PharError> {
        let b = self.bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn string(&mut self, len: usize) -> Result<String, PharError> {
        let raw = self.bytes(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| malformed("non UTF-8 name in manifest"))
    }
}

//! # Pharc Source Tree Walking
//!
//! File: cli/src/common/fs/walk.rs
//!
//! ## Overview
//!
//! Collects the source files under an include directory and works out the
//! name each one gets inside the archive. Names are taken relative to the
//! *parent* of the include directory, so including `/proj/lib` yields entries
//! such as `lib/util.php`, and a project's `require 'lib/util.php'` keeps
//! working from inside the archive.
//!
//! ## Architecture
//!
//! - `SourceFilter` decides which files are eligible: an extension allowlist
//!   plus an explicit exclusion list of real paths.
//! - `collect_sources` walks one include directory with `walkdir`, sorted by
//!   file name so archives are reproducible, and returns `SourceFile`s in
//!   walk order.
//! - A file's archive name is its real path with `parent(realpath(include_dir))`
//!   stripped and the remaining components joined with `/`.
//!
//! Symlinked directories are not descended into. Symlinked files are
//! followed; a file whose real path lies outside the include directory is
//! named after its position in the walked tree instead. A name that is not
//! valid UTF-8 is an error, never a lossy conversion.
//!
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// A source file found during the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Symlink-resolved absolute path on disk.
    pub real_path: PathBuf,
    /// `/`-separated name the file will have inside the archive.
    pub archive_name: String,
}

/// A walk failure, tagged with the path that could not be read.
#[derive(Error, Debug)]
#[error("Failed to read '{}': {source}", path.display())]
pub struct WalkError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Decides which files the walk keeps.
#[derive(Debug, Clone, Default)]
pub struct SourceFilter {
    extensions: Vec<String>,
    excluded: Vec<PathBuf>,
}

impl SourceFilter {
    /// Builds a filter accepting the given extensions (without leading dot).
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
            excluded: Vec::new(),
        }
    }

    /// Excludes a path. Existing paths are stored resolved so they compare
    /// equal to the real paths produced by the walk.
    pub fn exclude(mut self, path: &Path) -> Self {
        let resolved = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if !self.excluded.contains(&resolved) {
            self.excluded.push(resolved);
        }
        self
    }

    pub fn excluded(&self) -> &[PathBuf] {
        &self.excluded
    }

    pub fn has_source_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed == ext))
    }

    pub fn is_excluded(&self, real_path: &Path) -> bool {
        self.excluded.iter().any(|ex| ex == real_path)
    }
}

/// Recursively collects every eligible source file under `include_dir`.
pub fn collect_sources(
    include_dir: &Path,
    filter: &SourceFilter,
) -> Result<Vec<SourceFile>, WalkError> {
    let root_real = fs::canonicalize(include_dir).map_err(|e| WalkError {
        path: include_dir.to_path_buf(),
        source: e,
    })?;
    let name_base = root_real.parent().unwrap_or(&root_real).to_path_buf();
    debug!(
        "Walking {:?} (names relative to {:?})",
        include_dir, name_base
    );

    let mut sources = Vec::new();
    for entry in WalkDir::new(include_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| WalkError {
            path: e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| include_dir.to_path_buf()),
            source: e.into(),
        })?;
        if !filter.has_source_extension(entry.path()) {
            continue;
        }
        // Follows a symlinked file to its target; dangling links are skipped.
        let is_file = if entry.path_is_symlink() {
            entry.path().is_file()
        } else {
            entry.file_type().is_file()
        };
        if !is_file {
            continue;
        }

        let real_path = fs::canonicalize(entry.path()).map_err(|e| WalkError {
            path: entry.path().to_path_buf(),
            source: e,
        })?;
        if filter.is_excluded(&real_path) {
            debug!("Skipping excluded file {:?}", real_path);
            continue;
        }

        let archive_name = match real_path.strip_prefix(&name_base) {
            Ok(rel) => join_components(rel),
            Err(_) => logical_name(include_dir, &root_real, entry.path()),
        }
        .ok_or_else(|| WalkError {
            path: real_path.clone(),
            source: io::Error::new(
                io::ErrorKind::InvalidData,
                "file name is not valid UTF-8 and cannot be stored in the archive",
            ),
        })?;
        trace!("Collected {:?} as '{}'", real_path, archive_name);
        sources.push(SourceFile {
            real_path,
            archive_name,
        });
    }
    Ok(sources)
}

fn logical_name(include_dir: &Path, root_real: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(include_dir).unwrap_or(path);
    let rest = join_components(rel)?;
    match root_real.file_name() {
        Some(prefix) => Some(format!("{}/{}", prefix.to_str()?, rest)),
        None => Some(rest),
    }
}

/// Joins the normal components of `path` with `/`. `None` if one of them is
/// not valid UTF-8: a lossy conversion could map two files to one name.
fn join_components(path: &Path) -> Option<String> {
    let parts = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_str()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn php_filter() -> SourceFilter {
        SourceFilter::new(["php"])
    }

    fn names(sources: &[SourceFile]) -> Vec<&str> {
        sources.iter().map(|s| s.archive_name.as_str()).collect()
    }

    #[test]
    fn test_names_are_relative_to_include_parent() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("lib"))?;
        fs::write(src.join("lib/a.php"), "<?php")?;

        let sources = collect_sources(&src, &php_filter())?;
        assert_eq!(names(&sources), vec!["src/lib/a.php"]);
        assert_eq!(sources[0].real_path, fs::canonicalize(src.join("lib/a.php"))?);
        Ok(())
    }

    #[test]
    fn test_only_source_extensions_are_kept() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let lib = tmp.path().join("lib");
        fs::create_dir_all(lib.join("nested"))?;
        fs::write(lib.join("b.php"), "<?php")?;
        fs::write(lib.join("a.php"), "<?php")?;
        fs::write(lib.join("README.md"), "docs")?;
        fs::write(lib.join("c.PHP"), "<?php")?;
        fs::write(lib.join("nested/d.php"), "<?php")?;
        fs::create_dir(lib.join("dir.php"))?;

        let sources = collect_sources(&lib, &php_filter())?;
        assert_eq!(names(&sources), vec!["lib/a.php", "lib/b.php", "lib/nested/d.php"]);
        Ok(())
    }

    #[test]
    fn test_excluded_files_are_skipped() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let lib = tmp.path().join("lib");
        fs::create_dir_all(&lib)?;
        fs::write(lib.join("keep.php"), "<?php")?;
        fs::write(lib.join("PharCompiler.php"), "<?php")?;

        let filter = php_filter().exclude(&lib.join("PharCompiler.php"));
        let sources = collect_sources(&lib, &filter)?;
        assert_eq!(names(&sources), vec!["lib/keep.php"]);
        Ok(())
    }

    #[test]
    fn test_relative_include_dir() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let lib = tmp.path().join("proj/lib");
        fs::create_dir_all(&lib)?;
        fs::write(lib.join("util.php"), "<?php")?;

        // A trailing "/." must not change the computed names.
        let sources = collect_sources(&lib.join("."), &php_filter())?;
        assert_eq!(names(&sources), vec!["lib/util.php"]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_include_dir_uses_real_parent() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let real = tmp.path().join("real/code");
        fs::create_dir_all(&real)?;
        fs::write(real.join("x.php"), "<?php")?;
        let link = tmp.path().join("alias");
        std::os::unix::fs::symlink(&real, &link)?;

        let sources = collect_sources(&link, &php_filter())?;
        assert_eq!(names(&sources), vec!["code/x.php"]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_outside_tree_keeps_logical_name() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let outside = tmp.path().join("elsewhere");
        fs::create_dir_all(&outside)?;
        fs::write(outside.join("shared.php"), "<?php")?;
        let lib = tmp.path().join("proj/lib");
        fs::create_dir_all(&lib)?;
        std::os::unix::fs::symlink(outside.join("shared.php"), lib.join("shared.php"))?;

        let sources = collect_sources(&lib, &php_filter())?;
        assert_eq!(names(&sources), vec!["lib/shared.php"]);
        Ok(())
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_file_name_is_an_error() -> anyhow::Result<()> {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;
        let tmp = tempdir()?;
        let lib = tmp.path().join("lib");
        fs::create_dir_all(&lib)?;
        fs::write(lib.join(OsStr::from_bytes(b"\xfe.php")), "<?php // fe")?;
        fs::write(lib.join(OsStr::from_bytes(b"\xff.php")), "<?php // ff")?;

        let err = collect_sources(&lib, &php_filter()).unwrap_err();
        assert_eq!(err.source.kind(), io::ErrorKind::InvalidData);
        assert_eq!(
            err.path.file_name().map(|n| n.as_bytes().to_vec()),
            Some(b"\xfe.php".to_vec())
        );
        Ok(())
    }

    #[test]
    fn test_join_components_skips_dot_segments() {
        assert_eq!(
            join_components(Path::new("./lib/./a.php")).as_deref(),
            Some("lib/a.php")
        );
    }

    #[test]
    fn test_missing_include_dir_is_an_error() {
        let tmp = tempdir().expect("tempdir");
        let result = collect_sources(&tmp.path().join("nope"), &php_filter());
        assert!(result.is_err());
    }
}

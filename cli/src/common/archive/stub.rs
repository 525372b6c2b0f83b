//! # Pharc Stub Helpers (`common::archive::stub`)
//!
//! File: cli/src/common/archive/stub.rs
//!
//! ## Overview
//!
//! Two small pieces of text handling sit between the compiler and the Phar
//! writer:
//!
//! - `InterpreterDirective` strips a leading `#!.../php` line from the entry
//!   point. Inside the archive the entry point is `require`d, and PHP would
//!   otherwise echo the shebang line as output.
//! - `bootstrap_stub` renders the header that makes the archive runnable: a
//!   shebang for the shell, then a one-line PHP bootstrap that maps the
//!   archive under its alias and requires the embedded entry point.
//!
use regex::bytes::Regex;
use std::path::Path;

/// Matches an interpreter directive such as `#!/usr/bin/env php` or
/// `#!/usr/local/bin/php`, along with any whitespace that follows it.
#[derive(Debug, Clone)]
pub struct InterpreterDirective {
    pattern: Regex,
}

impl InterpreterDirective {
    pub fn new(interpreter: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(
            r"\A#!(?:/usr)?(?:/local)?/bin/(?:env\s+)?{}\s*",
            regex::escape(interpreter)
        ))?;
        Ok(Self { pattern })
    }

    /// Returns `content` with the directive removed, or unchanged if it has none.
    pub fn strip<'a>(&self, content: &'a [u8]) -> &'a [u8] {
        match self.pattern.find(content) {
            Some(m) => &content[m.end()..],
            None => content,
        }
    }
}

/// Renders the bootstrap stub for an archive whose entry point is `base`.
///
/// `launcher` is the absolute path of `env`; `interpreter` is the program it
/// should start (usually `php`).
pub fn bootstrap_stub(launcher: &Path, interpreter: &str, base: &str) -> String {
    let alias = format!("{}.phar", base);
    format!(
        "#!{} {}\n<?php Phar::mapPhar('{alias}');require'phar://{alias}/{base}';__HALT_COMPILER();",
        launcher.display(),
        interpreter,
        alias = alias,
        base = base,
    )
}

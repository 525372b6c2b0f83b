//! # Pharc Configuration System
//!
//! File: cli/src/core/config.rs
//!
//! ## Overview
//!
//! This module implements the configuration system for `pharc`, handling
//! loading, merging, path expansion and validation. Configuration supplies
//! the defaults for `pharc build`; anything given on the command line wins.
//!
//! ## Architecture
//!
//! Configuration sources (in order of precedence):
//! 1. Command-line flags (applied by `commands::build`)
//! 2. Project-specific `.pharc.toml` in the current directory or an ancestor
//!    (the search stops at a directory containing `.git`)
//! 3. User-specific `config.toml` in the platform config directory
//!    (e.g. `~/.config/pharc/config.toml` on Linux)
//! 4. Default values defined in the code
//!
//! Relative paths in a config file are resolved against the directory that
//! file lives in, and `~` is expanded, so a project config works no matter
//! where `pharc` is invoked from inside the project.
//!
//! ## Examples
//!
//! ```toml
//! [build]
//! build_dir = "build"
//! include = ["src", "vendor"]
//! extensions = ["php"]
//! exclude = ["src/dev-only.php"]
//! interpreter = "php"
//!
//! [archive]
//! readonly = false
//! ```
//!
//! ```rust
//! let cfg = config::load_config()?;
//! let build_dir = cfg.build.build_dir.clone().unwrap_or_else(|| "build".into());
//! ```
//!
use crate::common::fs::io;
use crate::core::error::Result;
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Represents the main configuration structure, loaded from TOML files.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)] // Error if unknown fields are in TOML
pub struct Config {
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
}

/// Defaults for `pharc build`.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Directory the archive is written to.
    #[serde(default)]
    pub build_dir: Option<String>,
    /// Directories whose source files are embedded, in order.
    #[serde(default)]
    pub include: Vec<String>,
    /// Extensions (without dot) of files collected from include directories.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Files never packaged.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Interpreter named in the shebang and stripped from the entry point.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            build_dir: None,
            include: Vec::new(),
            extensions: default_extensions(),
            exclude: Vec::new(),
            interpreter: default_interpreter(),
        }
    }
}

/// Settings for the archive-writing capability.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    /// Refuse to write archives at all.
    #[serde(default)]
    pub readonly: bool,
}

fn default_extensions() -> Vec<String> {
    vec!["php".to_string()]
}
fn default_interpreter() -> String {
    "php".to_string()
}

const PROJECT_CONFIG_FILENAME: &str = ".pharc.toml";

pub fn load_config() -> Result<Config> {
    let user_config = load_user_config()?;
    let project_config = load_project_config()?;
    let merged_config = merge_configs(user_config.unwrap_or_default(), project_config);
    validate_config(&merged_config).context("Configuration validation failed")?;
    debug!("Final loaded configuration: {:?}", merged_config);
    Ok(merged_config)
}

fn load_user_config() -> Result<Option<Config>> {
    if let Some(proj_dirs) = ProjectDirs::from("dev", "pharc", "pharc") {
        let config_path = proj_dirs.config_dir().join("config.toml");
        if config_path.exists() {
            info!("Loading user configuration from: {}", config_path.display());
            load_config_from_path(&config_path).map(Some)
        } else {
            debug!(
                "User configuration file not found at {}",
                config_path.display()
            );
            Ok(None)
        }
    } else {
        warn!("Could not determine user config directory.");
        Ok(None)
    }
}

fn load_project_config() -> Result<Option<Config>> {
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;
    if let Some(project_config_path) = find_project_config_path(&current_dir) {
        info!(
            "Loading project configuration from: {}",
            project_config_path.display()
        );
        load_config_from_path(&project_config_path).map(Some)
    } else {
        debug!("No project configuration file (.pharc.toml) found in current directory or ancestors.");
        Ok(None)
    }
}

fn find_project_config_path(start: &Path) -> Option<PathBuf> {
    let mut path = start;
    loop {
        let project_config = path.join(PROJECT_CONFIG_FILENAME);
        if project_config.is_file() {
            return Some(project_config);
        }
        if path.join(".git").is_dir() {
            debug!(
                "Found .git directory at {}, stopping project config search.",
                path.display()
            );
            return None;
        }
        path = path.parent()?;
    }
}

/// Reads one config file and anchors its relative paths to the file's directory.
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = io::read_file_to_string(path)?;
    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    anchor_config_paths(&mut config, base);
    Ok(config)
}

fn anchor_config_paths(config: &mut Config, base: &Path) {
    let anchor = |raw: &str| -> String {
        let expanded = shellexpand::tilde(raw).into_owned();
        let path = Path::new(&expanded);
        if path.is_absolute() {
            expanded
        } else {
            base.join(path).to_string_lossy().into_owned()
        }
    };
    config.build.build_dir = config.build.build_dir.as_deref().map(anchor);
    config.build.include = config.build.include.iter().map(|p| anchor(p.as_str())).collect();
    config.build.exclude = config.build.exclude.iter().map(|p| anchor(p.as_str())).collect();
    debug!("Anchored configuration paths to {}", base.display());
}

fn merge_configs(user: Config, project: Option<Config>) -> Config {
    let project_cfg = match project {
        Some(p) => p,
        None => return user,
    };
    let mut merged = Config::default();
    merged.build.build_dir = project_cfg.build.build_dir.or(user.build.build_dir);
    merged.build.include = if !project_cfg.build.include.is_empty() {
        project_cfg.build.include
    } else {
        user.build.include
    };
    merged.build.extensions = if project_cfg.build.extensions != default_extensions() {
        project_cfg.build.extensions
    } else {
        user.build.extensions
    };
    merged.build.exclude = if !project_cfg.build.exclude.is_empty() {
        project_cfg.build.exclude
    } else {
        user.build.exclude
    };
    merged.build.interpreter = if project_cfg.build.interpreter != default_interpreter() {
        project_cfg.build.interpreter
    } else {
        user.build.interpreter
    };
    // Read-only anywhere means read-only.
    merged.archive.readonly = project_cfg.archive.readonly || user.archive.readonly;
    merged
}

pub fn validate_config(config: &Config) -> Result<()> {
    debug!("Validating final configuration...");
    validate_build_settings(&config.build.extensions, &config.build.interpreter)?;
    if config.build.include.iter().any(|p| p.is_empty()) {
        return Err(anyhow!("Include directories cannot be empty paths."));
    }
    debug!("Configuration validation successful.");
    Ok(())
}

/// Checks the extension list and interpreter name, wherever they came from.
pub fn validate_build_settings(extensions: &[String], interpreter: &str) -> Result<()> {
    if extensions.is_empty() {
        return Err(anyhow!("At least one source extension must be configured."));
    }
    for ext in extensions {
        if ext.is_empty() || ext.starts_with('.') {
            return Err(anyhow!(
                "Invalid extension '{}'. Use the bare extension, e.g. \"php\".",
                ext
            ));
        }
    }
    if interpreter.is_empty() || interpreter.chars().any(char::is_whitespace) {
        return Err(anyhow!(
            "Invalid interpreter '{}'. Expected a single program name.",
            interpreter
        ));
    }
    Ok(())
}

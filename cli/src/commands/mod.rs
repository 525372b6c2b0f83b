//! # Pharc Command Modules
//!
//! File: cli/src/commands/mod.rs
//!
//! ## Overview
//!
//! One module per `pharc` subcommand. Each exposes a clap `Args` struct and a
//! `handle_*` function called from `main.rs`.
//!
//! - `build`: compile an entry point and include directories into an archive
//! - `list`: print and verify the contents of an existing archive
//!
pub mod build;
pub mod list;

//! # Pharc Core Infrastructure
//!
//! File: cli/src/core/mod.rs
//!
//! ## Overview
//!
//! This module aggregates the infrastructure shared by the compiler and the
//! command handlers.
//!
//! ## Architecture
//!
//! - `config`: Configuration loading, merging, and validation
//! - `error`: The `CompileError` taxonomy and the application `Result` alias
//!
//! ```rust
//! use crate::core::config; // For loading configuration
//! use crate::core::error::{CompileError, Result}; // For error handling
//! ```
//!
pub mod config;
pub mod error;

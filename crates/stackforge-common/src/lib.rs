//! # stackforge-common
//!
//! Shared types, diagnostics, error definitions, configuration models, and
//! constants used across the entire Stackforge workspace.
//!
//! This crate is the leaf of the dependency graph; it depends on no other
//! internal crate and provides the foundational primitives that the catalog,
//! the compose engine, and the SDK build upon.

pub mod config;
pub mod constants;
pub mod diagnostic;
pub mod error;
pub mod types;

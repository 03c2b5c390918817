//! # stackforge-compose
//!
//! Service resolution and compose assembly engine.
//!
//! Data flows one way through the stages:
//! - **Resolver**: expands a request into a conflict-checked, start-ordered
//!   [`ResolvedGraph`](resolver::ResolvedGraph).
//! - **Partition**: splits a graph into host-native and container-only halves.
//! - **Assembler**: projects a graph into primary and profile compose files,
//!   wiring per-service databases into the shared PostgreSQL container.
//! - **Validator**: re-checks the graph and the primary file before anything
//!   is written.
//!
//! Every stage is a pure function of its inputs and returns a new value.

pub mod assembler;
pub mod databases;
pub mod graph;
pub mod manifest;
pub mod partition;
pub mod profile;
pub mod resolver;
pub mod validator;

pub use assembler::{CompiledManifest, ComposeOptions, assemble};
pub use databases::{DatabaseRequirement, database_requirements};
pub use partition::{Partition, partition};
pub use resolver::{ResolveRequest, ResolvedGraph, check_compatibility, resolve};
pub use validator::{ValidateOptions, ValidationReport, validate};

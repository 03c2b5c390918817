//! # stackforge-sdk
//!
//! Public SDK for using Stackforge as a Rust library.
//!
//! Provides the main entry points:
//! - [`generate`](generate::generate): Runs resolution, partitioning, assembly and
//!   validation, then renders every file of a deployment bundle.
//! - [`StackRequestBuilder`](builder::StackRequestBuilder): Fluent API for building a
//!   [`StackConfig`](stackforge_common::config::StackConfig).
//! - [`Bundle`](bundle::Bundle): The generated files plus metadata, writable to disk.
//!
//! # Example
//!
//! ```rust,no_run
//! use stackforge_catalog::Catalog;
//! use stackforge_sdk::builder::StackRequestBuilder;
//! use stackforge_sdk::generate::generate;
//!
//! # fn main() -> stackforge_common::error::Result<()> {
//! let config = StackRequestBuilder::new("my-stack")
//!     .service("n8n")
//!     .skill_pack("research-agent")
//!     .build()?;
//! let bundle = generate(Catalog::builtin()?, &config)?;
//! bundle.write_to(std::path::Path::new("./out"))?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod bundle;
pub mod env;
pub mod generate;
pub mod native;
pub mod postgres;

pub use builder::StackRequestBuilder;
pub use bundle::{Bundle, BundleMetadata};
pub use generate::generate;

//! # stackforge-catalog
//!
//! The static catalog of companion services, skill packs, and presets.
//!
//! Records are loaded as-is from YAML and validated once. Nothing in this
//! crate resolves dependencies; it only answers lookups through
//! [`CatalogProvider`].

pub mod descriptor;
pub mod registry;
pub mod skill_pack;

pub use descriptor::{ServiceCategory, ServiceDescriptor};
pub use registry::{Catalog, CatalogProvider};
pub use skill_pack::{Preset, SkillPack};

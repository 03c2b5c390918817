//! Generation request model.
//!
//! A [`StackConfig`] is everything a single bundle generation needs. It can
//! be built in code, loaded from a YAML or JSON file, or assembled by the
//! CLI from flags.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_GATEWAY_VERSION, DEFAULT_MAX_RESOLUTION_PASSES};
use crate::error::{Result, StackforgeError};
use crate::types::{DeploymentType, MemoryThresholds, Platform, ProxyType};

/// Root configuration for a bundle generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackConfig {
    /// Project name, used in generated headers and the compose project.
    pub project_name: String,
    /// Explicitly selected service ids.
    #[serde(default)]
    pub services: Vec<String>,
    /// Selected skill pack ids.
    #[serde(default)]
    pub skill_packs: Vec<String>,
    /// Reverse proxy choice.
    #[serde(default)]
    pub proxy: ProxyType,
    /// Public domain, if the stack is exposed.
    #[serde(default)]
    pub domain: Option<String>,
    /// Whether GPU passthrough is available.
    #[serde(default)]
    pub gpu: bool,
    /// Target platform.
    #[serde(default)]
    pub platform: Platform,
    /// Container-only or mixed native deployment.
    #[serde(default)]
    pub deployment_type: DeploymentType,
    /// Whether secrets are generated into `.env`.
    #[serde(default = "default_true")]
    pub generate_secrets: bool,
    /// Gateway image tag.
    #[serde(default = "default_gateway_version")]
    pub gateway_version: String,
    /// Whether the monitoring stack is added.
    #[serde(default)]
    pub monitoring: bool,
    /// Memory warning thresholds.
    #[serde(default)]
    pub memory_thresholds: MemoryThresholds,
    /// Ceiling on dependency-closure passes.
    #[serde(default = "default_max_passes")]
    pub max_resolution_passes: usize,
}

const fn default_true() -> bool {
    true
}

fn default_gateway_version() -> String {
    DEFAULT_GATEWAY_VERSION.to_string()
}

const fn default_max_passes() -> usize {
    DEFAULT_MAX_RESOLUTION_PASSES
}

impl StackConfig {
    /// Creates a configuration with defaults for everything but the name.
    #[must_use]
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            services: Vec::new(),
            skill_packs: Vec::new(),
            proxy: ProxyType::None,
            domain: None,
            gpu: false,
            platform: Platform::default(),
            deployment_type: DeploymentType::default(),
            generate_secrets: true,
            gateway_version: default_gateway_version(),
            monitoring: false,
            memory_thresholds: MemoryThresholds::default(),
            max_resolution_passes: DEFAULT_MAX_RESOLUTION_PASSES,
        }
    }

    /// Loads a configuration file, YAML or JSON by extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or
    /// fails [`StackConfig::validate`].
    pub fn from_path(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading stack config");
        let content = std::fs::read_to_string(path).map_err(|e| StackforgeError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config: Self = if is_json {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the values serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`StackforgeError::Config`] on the first invalid field.
    pub fn validate(&self) -> Result<()> {
        check_project_name(&self.project_name)?;
        let t = self.memory_thresholds;
        if !(t.info < t.warning && t.warning < t.critical) {
            return Err(StackforgeError::Config {
                message: format!(
                    "memory thresholds must increase: info {} < warning {} < critical {}",
                    t.info, t.warning, t.critical
                ),
            });
        }
        if self.max_resolution_passes == 0 {
            return Err(StackforgeError::Config {
                message: "max_resolution_passes must be at least 1".into(),
            });
        }
        Ok(())
    }
}

fn check_project_name(name: &str) -> Result<()> {
    let bytes = name.as_bytes();
    let valid_chars = bytes
        .iter()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-');
    let valid = !bytes.is_empty()
        && bytes.len() <= 64
        && valid_chars
        && bytes.first() != Some(&b'-')
        && bytes.last() != Some(&b'-');
    if valid {
        Ok(())
    } else {
        Err(StackforgeError::Config {
            message: format!(
                "project name \"{name}\" must be 1-64 lowercase alphanumeric characters or hyphens, \
                 not starting or ending with a hyphen"
            ),
        })
    }
}

//! Typed compose document model.
//!
//! Assembly builds these values; serialization to YAML is a separate step
//! in [`ComposeDocument::to_yaml`]. Every type also deserializes, so any
//! emitted file can be read back into the same model.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use stackforge_catalog::descriptor::ResourceFigures;
use stackforge_common::error::Result;

/// One compose file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeDocument {
    /// Compose project name. Set on the primary file only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Services keyed by name, in emission order.
    #[serde(default)]
    pub services: IndexMap<String, ComposeService>,
    /// Top-level named volume declarations.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub volumes: IndexMap<String, Option<VolumeDeclaration>>,
    /// Top-level network declarations.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub networks: IndexMap<String, NetworkDeclaration>,
}

impl ComposeDocument {
    /// Serializes the document to YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Parses a YAML compose document.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a compose document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// A single service entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeService {
    /// Image reference.
    pub image: String,
    /// Environment variables.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub environment: IndexMap<String, String>,
    /// Port mappings as `host:container` strings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    /// Volume mounts as `source:target` strings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    /// Health check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<ComposeHealthcheck>,
    /// Restart policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
    /// Networks joined.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
    /// Whether an init process reaps children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<bool>,
    /// Keep stdin open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin_open: Option<bool>,
    /// Allocate a TTY.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tty: Option<bool>,
    /// Command override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandSpec>,
    /// Entrypoint override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<CommandSpec>,
    /// Extra `/etc/hosts` entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_hosts: Vec<String>,
    /// Container labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Resource limits and device reservations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<ComposeDeploy>,
    /// Start-order dependencies.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub depends_on: IndexMap<String, DependsOn>,
    /// Profiles that activate this service.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<String>,
}

/// A command written as one shell string or as an argument list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    /// Shell form.
    Shell(String),
    /// Exec form.
    Exec(Vec<String>),
}

impl CommandSpec {
    /// Builds an exec-form command.
    #[must_use]
    pub fn exec(args: &[&str]) -> Self {
        Self::Exec(args.iter().map(|a| (*a).to_string()).collect())
    }
}

/// Health check block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeHealthcheck {
    /// Test command, e.g. `["CMD-SHELL", "pg_isready"]`.
    pub test: Vec<String>,
    /// Interval between checks.
    pub interval: String,
    /// Per-check timeout.
    pub timeout: String,
    /// Failures before unhealthy.
    pub retries: u32,
    /// Grace period after start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_period: Option<String>,
}

/// Condition a dependent waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyCondition {
    /// The dependency's health check passes.
    ServiceHealthy,
    /// The dependency's container has started.
    ServiceStarted,
}

/// One `depends_on` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependsOn {
    /// Readiness condition.
    pub condition: DependencyCondition,
}

/// Deploy block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeDeploy {
    /// Resource constraints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ComposeResources>,
}

/// Resource limits and reservations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeResources {
    /// Upper bounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceFigures>,
    /// Guaranteed reservations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservations: Option<ComposeReservations>,
}

/// Reservations, including device requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeReservations {
    /// CPU count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpus: Option<String>,
    /// Memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    /// Device requests such as GPUs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<DeviceRequest>,
}

/// A device reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRequest {
    /// Device driver.
    pub driver: String,
    /// How many devices, or `all`.
    pub count: String,
    /// Requested capabilities.
    pub capabilities: Vec<String>,
}

impl DeviceRequest {
    /// Every NVIDIA GPU on the host.
    #[must_use]
    pub fn all_nvidia_gpus() -> Self {
        Self {
            driver: "nvidia".into(),
            count: "all".into(),
            capabilities: vec!["gpu".into()],
        }
    }
}

/// Options of a named volume declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeDeclaration {
    /// Volume driver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
}

/// A network declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDeclaration {
    /// Network driver.
    pub driver: String,
}

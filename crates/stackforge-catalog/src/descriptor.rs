//! Service descriptor records.
//!
//! A [`ServiceDescriptor`] is the static, immutable description of one
//! companion service: what image it runs, what it exposes, what it needs,
//! and what it cannot coexist with.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stackforge_common::constants::SHARED_NETWORK;
use stackforge_common::error::StackforgeError;
use stackforge_common::types::{NativePlatform, Platform};

/// Functional category of a service. Drives profile-file grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceCategory {
    /// Workflow automation.
    Automation,
    /// Vector databases.
    VectorDb,
    /// Media and video processing.
    Media,
    /// Object storage.
    Storage,
    /// Relational and key-value databases.
    Database,
    /// Reverse proxies.
    Proxy,
    /// Monitoring and observability.
    Monitoring,
    /// Browser automation.
    Browser,
    /// Search engines.
    Search,
    /// Local AI models.
    Ai,
    /// Messaging and notifications.
    Communication,
    /// AI coding agents.
    CodingAgent,
    /// Social media tooling.
    SocialMedia,
    /// Web and product analytics.
    Analytics,
    /// AI platforms and chat UIs.
    AiPlatform,
    /// Developer tools.
    DevTools,
    /// Knowledge and documents.
    Knowledge,
    /// Desktop environments.
    Desktop,
    /// Streaming and relays.
    Streaming,
    /// Security tooling.
    Security,
}

impl ServiceCategory {
    /// Every category, in declaration order.
    pub const ALL: [Self; 20] = [
        Self::Automation,
        Self::VectorDb,
        Self::Media,
        Self::Storage,
        Self::Database,
        Self::Proxy,
        Self::Monitoring,
        Self::Browser,
        Self::Search,
        Self::Ai,
        Self::Communication,
        Self::CodingAgent,
        Self::SocialMedia,
        Self::Analytics,
        Self::AiPlatform,
        Self::DevTools,
        Self::Knowledge,
        Self::Desktop,
        Self::Streaming,
        Self::Security,
    ];

    /// Returns the kebab-case category id.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Automation => "automation",
            Self::VectorDb => "vector-db",
            Self::Media => "media",
            Self::Storage => "storage",
            Self::Database => "database",
            Self::Proxy => "proxy",
            Self::Monitoring => "monitoring",
            Self::Browser => "browser",
            Self::Search => "search",
            Self::Ai => "ai",
            Self::Communication => "communication",
            Self::CodingAgent => "coding-agent",
            Self::SocialMedia => "social-media",
            Self::Analytics => "analytics",
            Self::AiPlatform => "ai-platform",
            Self::DevTools => "dev-tools",
            Self::Knowledge => "knowledge",
            Self::Desktop => "desktop",
            Self::Streaming => "streaming",
            Self::Security => "security",
        }
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceCategory {
    type Err = StackforgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| StackforgeError::Config {
                message: format!("unknown service category: \"{s}\""),
            })
    }
}

/// Container restart policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    /// Restart unless explicitly stopped.
    #[default]
    UnlessStopped,
    /// Always restart.
    Always,
    /// Restart on non-zero exit.
    OnFailure,
    /// Never restart.
    No,
}

impl RestartPolicy {
    /// Returns the compose spelling of the policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnlessStopped => "unless-stopped",
            Self::Always => "always",
            Self::OnFailure => "on-failure",
            Self::No => "no",
        }
    }
}

/// A host-to-container port mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    /// Host port.
    pub host: u16,
    /// Container port.
    pub container: u16,
    /// What the port serves.
    #[serde(default)]
    pub description: String,
    /// Whether the port is published on the host. Internal-only when false.
    #[serde(default = "default_true")]
    pub exposed: bool,
}

/// A named volume mounted into a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMapping {
    /// Volume name.
    pub name: String,
    /// Mount path inside the container.
    pub container_path: String,
    /// What the volume holds.
    #[serde(default)]
    pub description: String,
    /// Optional volume driver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
}

impl VolumeMapping {
    /// Returns `true` when `name` is a host path rather than a named volume.
    ///
    /// Host paths are mounted as-is and never declared at the top level.
    #[must_use]
    pub fn is_bind_mount(&self) -> bool {
        self.name.starts_with(['/', '.', '~'])
    }

    /// Compose short syntax, `source:target`.
    #[must_use]
    pub fn mount(&self) -> String {
        format!("{}:{}", self.name, self.container_path)
    }
}

/// An environment variable a service reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    /// Variable name.
    pub key: String,
    /// Default value; empty when none.
    #[serde(default)]
    pub default_value: String,
    /// Whether the value is secret and deferred to deployment time.
    #[serde(default)]
    pub secret: bool,
    /// What the variable controls.
    #[serde(default)]
    pub description: String,
    /// Whether the service cannot start without it.
    #[serde(default = "default_true")]
    pub required: bool,
}

/// Container health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Shell command run inside the container.
    pub test: String,
    /// Interval between checks.
    #[serde(default = "default_interval")]
    pub interval: String,
    /// Per-check timeout.
    #[serde(default = "default_timeout")]
    pub timeout: String,
    /// Failures before unhealthy.
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Grace period after start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_period: Option<String>,
}

/// CPU and memory figures for a deploy block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFigures {
    /// CPU count, e.g. `"0.5"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpus: Option<String>,
    /// Memory, e.g. `"512M"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

/// Declared resource limits and reservations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployResources {
    /// Upper bounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceFigures>,
    /// Guaranteed reservations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservations: Option<ResourceFigures>,
}

/// Deploy section of a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploySpec {
    /// Resource constraints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<DeployResources>,
}

/// Instructions for installing and running a service outside containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeRecipe {
    /// OS family the recipe targets.
    pub platform: NativePlatform,
    /// Shell steps run in order.
    pub install_steps: Vec<String>,
    /// Command that starts the service.
    pub start_command: String,
    /// Command that stops the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_command: Option<String>,
    /// Where the config template is written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
    /// Config file contents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_template: Option<String>,
    /// systemd unit name, when managed by systemd.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub systemd_unit: Option<String>,
}

/// The static record describing one companion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceDescriptor {
    /// Globally unique id (`[a-z0-9-]+`).
    pub id: String,
    /// Display name.
    pub name: String,
    /// One-paragraph description.
    #[serde(default)]
    pub description: String,
    /// Functional category.
    pub category: ServiceCategory,
    /// Image repository.
    pub image: String,
    /// Image tag.
    pub image_tag: String,
    /// Port mappings.
    #[serde(default)]
    pub ports: Vec<PortMapping>,
    /// Named volumes.
    #[serde(default)]
    pub volumes: Vec<VolumeMapping>,
    /// Environment variables of the service itself.
    #[serde(default)]
    pub environment: Vec<EnvVar>,
    /// Health check, if the image supports one.
    #[serde(default)]
    pub healthcheck: Option<HealthCheck>,
    /// Command override.
    #[serde(default)]
    pub command: Option<String>,
    /// Entrypoint override.
    #[serde(default)]
    pub entrypoint: Option<String>,
    /// Start-order hints: services that should be started first if present.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Restart policy.
    #[serde(default)]
    pub restart_policy: RestartPolicy,
    /// Networks the service joins.
    #[serde(default = "default_networks")]
    pub networks: Vec<String>,
    /// Container labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Deploy resources.
    #[serde(default)]
    pub deploy: Option<DeploySpec>,
    /// Variables passed through to the gateway so it can reach this service.
    #[serde(default)]
    pub gateway_env: Vec<EnvVar>,
    /// Volumes the gateway mounts to share data with this service.
    #[serde(default)]
    pub gateway_volume_mounts: Vec<VolumeMapping>,
    /// Upstream documentation.
    #[serde(default)]
    pub docs_url: String,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Hard dependencies.
    #[serde(default)]
    pub requires: Vec<String>,
    /// Soft, advisory dependencies.
    #[serde(default)]
    pub recommends: Vec<String>,
    /// Mutually exclusive services.
    #[serde(default)]
    pub conflicts_with: Vec<String>,
    /// Supported platforms; empty means all.
    #[serde(default)]
    pub platforms: Vec<Platform>,
    /// Minimum memory in MB.
    #[serde(default)]
    pub min_memory_mb: Option<u64>,
    /// Whether GPU passthrough is needed.
    #[serde(default)]
    pub gpu_required: bool,
    /// Whether the service can run outside the container runtime.
    #[serde(default)]
    pub native_supported: bool,
    /// Native install recipes, one per OS family.
    #[serde(default)]
    pub native_recipes: Vec<NativeRecipe>,
}

impl ServiceDescriptor {
    /// Returns `image:tag`.
    #[must_use]
    pub fn image_reference(&self) -> String {
        format!("{}:{}", self.image, self.image_tag)
    }

    /// Returns the ports published on the host.
    pub fn exposed_ports(&self) -> impl Iterator<Item = &PortMapping> {
        self.ports.iter().filter(|p| p.exposed)
    }

    /// Returns the native recipe for an OS family, if eligible.
    ///
    /// A recipe only counts when the descriptor also declares native support.
    #[must_use]
    pub fn native_recipe(&self, family: NativePlatform) -> Option<&NativeRecipe> {
        if !self.native_supported {
            return None;
        }
        self.native_recipes.iter().find(|r| r.platform == family)
    }

    /// Returns the union of `depends_on` and `requires`, first occurrence wins.
    pub fn start_after(&self) -> impl Iterator<Item = &str> {
        let mut seen = std::collections::HashSet::new();
        self.depends_on
            .iter()
            .chain(&self.requires)
            .map(String::as_str)
            .filter(move |id| seen.insert(*id))
    }
}

const fn default_true() -> bool {
    true
}

fn default_interval() -> String {
    "30s".into()
}

fn default_timeout() -> String {
    "10s".into()
}

const fn default_retries() -> u32 {
    3
}

fn default_networks() -> Vec<String> {
    vec![SHARED_NETWORK.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> ServiceDescriptor {
        serde_yaml::from_str(yaml).expect("descriptor should parse")
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let d = parse(
            "id: cache\nname: Cache\ncategory: database\nimage: redis\nimage_tag: '8'\n\
             ports:\n- host: 6379\n  container: 6379\n\
             environment:\n- key: PASSWORD\n",
        );
        assert!(d.ports[0].exposed);
        assert!(d.environment[0].required);
        assert!(!d.environment[0].secret);
        assert_eq!(d.networks, vec![SHARED_NETWORK]);
        assert_eq!(d.restart_policy, RestartPolicy::UnlessStopped);
        assert_eq!(d.min_memory_mb, None);
        assert_eq!(d.image_reference(), "redis:8");
    }

    #[test]
    fn unknown_descriptor_fields_are_rejected() {
        let result: Result<ServiceDescriptor, _> = serde_yaml::from_str(
            "id: x\nname: X\ncategory: ai\nimage: x\nimage_tag: '1'\nicon: robot\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn exposed_ports_skip_internal_ones() {
        let d = parse(
            "id: q\nname: Q\ncategory: vector-db\nimage: q\nimage_tag: '1'\nports:\n\
             - host: 6333\n  container: 6333\n- host: 6334\n  container: 6334\n  exposed: false\n",
        );
        let hosts: Vec<u16> = d.exposed_ports().map(|p| p.host).collect();
        assert_eq!(hosts, vec![6333]);
    }

    #[test]
    fn host_paths_are_bind_mounts() {
        let d = parse(
            "id: v\nname: V\ncategory: ai\nimage: v\nimage_tag: '1'\nvolumes:\n\
             - name: v-data\n  container_path: /data\n\
             - name: /etc/localtime\n  container_path: /etc/localtime:ro\n\
             - name: ./contracts\n  container_path: /contracts\n",
        );
        let binds: Vec<bool> = d.volumes.iter().map(VolumeMapping::is_bind_mount).collect();
        assert_eq!(binds, vec![false, true, true]);
    }

    #[test]
    fn native_recipe_requires_native_support_flag() {
        let mut d = parse(
            "id: r\nname: R\ncategory: database\nimage: r\nimage_tag: '1'\nnative_recipes:\n\
             - platform: linux\n  install_steps: [apt-get install r]\n  start_command: r-server\n",
        );
        assert!(d.native_recipe(NativePlatform::Linux).is_none());
        d.native_supported = true;
        assert!(d.native_recipe(NativePlatform::Linux).is_some());
        assert!(d.native_recipe(NativePlatform::Windows).is_none());
    }

    #[test]
    fn start_after_merges_hints_and_requires_without_duplicates() {
        let d = parse(
            "id: app\nname: App\ncategory: automation\nimage: a\nimage_tag: '1'\n\
             depends_on: [redis, postgresql]\nrequires: [postgresql, livekit]\n",
        );
        let order: Vec<&str> = d.start_after().collect();
        assert_eq!(order, vec!["redis", "postgresql", "livekit"]);
    }

    #[test]
    fn category_ids_are_kebab_case() {
        let c: ServiceCategory = serde_yaml::from_str("coding-agent").expect("parse");
        assert_eq!(c, ServiceCategory::CodingAgent);
        assert_eq!(ServiceCategory::AiPlatform.to_string(), "ai-platform");
        assert_eq!("vector-db".parse::<ServiceCategory>().expect("parse"), ServiceCategory::VectorDb);
        assert!("vectors".parse::<ServiceCategory>().is_err());
    }
}

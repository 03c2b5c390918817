//! Fluent API for building a generation request.

use stackforge_catalog::Preset;
use stackforge_common::config::StackConfig;
use stackforge_common::error::Result;
use stackforge_common::types::{DeploymentType, MemoryThresholds, Platform, ProxyType};

/// Builder for a [`StackConfig`].
///
/// Selections accumulate; repeated ids are kept once, in first-seen order.
#[derive(Debug, Clone)]
pub struct StackRequestBuilder {
    config: StackConfig,
}

impl StackRequestBuilder {
    /// Creates a builder with defaults for everything but the project name.
    #[must_use]
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            config: StackConfig::new(project_name),
        }
    }

    /// Starts from an existing config, e.g. one loaded from a file.
    #[must_use]
    pub const fn from_config(config: StackConfig) -> Self {
        Self { config }
    }

    /// Replaces the project name.
    #[must_use]
    pub fn project_name(mut self, name: impl Into<String>) -> Self {
        self.config.project_name = name.into();
        self
    }

    /// Selects a service.
    #[must_use]
    pub fn service(mut self, id: impl Into<String>) -> Self {
        push_unique(&mut self.config.services, id.into());
        self
    }

    /// Selects several services.
    #[must_use]
    pub fn services<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            push_unique(&mut self.config.services, id.into());
        }
        self
    }

    /// Selects a skill pack.
    #[must_use]
    pub fn skill_pack(mut self, id: impl Into<String>) -> Self {
        push_unique(&mut self.config.skill_packs, id.into());
        self
    }

    /// Merges a preset's services and skill packs into the selection.
    #[must_use]
    pub fn preset(mut self, preset: &Preset) -> Self {
        for id in &preset.services {
            push_unique(&mut self.config.services, id.clone());
        }
        for id in &preset.skill_packs {
            push_unique(&mut self.config.skill_packs, id.clone());
        }
        self
    }

    /// Sets the reverse proxy.
    #[must_use]
    pub const fn proxy(mut self, proxy: ProxyType) -> Self {
        self.config.proxy = proxy;
        self
    }

    /// Sets the public domain.
    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.config.domain = Some(domain.into());
        self
    }

    /// Declares GPU availability.
    #[must_use]
    pub const fn gpu(mut self, gpu: bool) -> Self {
        self.config.gpu = gpu;
        self
    }

    /// Sets the target platform.
    #[must_use]
    pub const fn platform(mut self, platform: Platform) -> Self {
        self.config.platform = platform;
        self
    }

    /// Sets the deployment type.
    #[must_use]
    pub const fn deployment_type(mut self, deployment_type: DeploymentType) -> Self {
        self.config.deployment_type = deployment_type;
        self
    }

    /// Enables or disables secret generation.
    #[must_use]
    pub const fn generate_secrets(mut self, enabled: bool) -> Self {
        self.config.generate_secrets = enabled;
        self
    }

    /// Sets the gateway image tag.
    #[must_use]
    pub fn gateway_version(mut self, version: impl Into<String>) -> Self {
        self.config.gateway_version = version.into();
        self
    }

    /// Adds the monitoring stack.
    #[must_use]
    pub const fn monitoring(mut self, enabled: bool) -> Self {
        self.config.monitoring = enabled;
        self
    }

    /// Sets the memory warning thresholds.
    #[must_use]
    pub const fn memory_thresholds(mut self, thresholds: MemoryThresholds) -> Self {
        self.config.memory_thresholds = thresholds;
        self
    }

    /// Sets the dependency-closure pass ceiling.
    #[must_use]
    pub const fn max_resolution_passes(mut self, passes: usize) -> Self {
        self.config.max_resolution_passes = passes;
        self
    }

    /// Validates and returns the config.
    ///
    /// # Errors
    ///
    /// Returns an error if the project name or thresholds are invalid.
    pub fn build(self) -> Result<StackConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn push_unique(list: &mut Vec<String>, id: String) {
    if !list.contains(&id) {
        list.push(id);
    }
}

#[cfg(test)]
mod tests {
    use stackforge_catalog::Catalog;

    use super::*;

    #[test]
    fn builder_deduplicates_selections() {
        let config = StackRequestBuilder::new("demo")
            .service("redis")
            .services(["n8n", "redis"])
            .skill_pack("dev-ops")
            .skill_pack("dev-ops")
            .build()
            .expect("build");
        assert_eq!(config.services, vec!["redis", "n8n"]);
        assert_eq!(config.skill_packs, vec!["dev-ops"]);
    }

    #[test]
    fn preset_merges_into_selection() {
        let catalog = Catalog::builtin().expect("builtin catalog");
        let preset = catalog.require_preset("minimal").expect("minimal preset");
        let config = StackRequestBuilder::new("demo")
            .service("n8n")
            .preset(preset)
            .build()
            .expect("build");
        assert_eq!(config.services, vec!["n8n", "redis", "caddy"]);
    }

    #[test]
    fn setters_apply() {
        let config = StackRequestBuilder::new("demo")
            .project_name("renamed")
            .proxy(ProxyType::Traefik)
            .domain("example.org")
            .gpu(true)
            .platform(Platform::LinuxArm64)
            .deployment_type(DeploymentType::BareMetal)
            .generate_secrets(false)
            .gateway_version("2.0.0")
            .monitoring(true)
            .build()
            .expect("build");
        assert_eq!(config.project_name, "renamed");
        assert_eq!(config.proxy, ProxyType::Traefik);
        assert_eq!(config.domain.as_deref(), Some("example.org"));
        assert!(config.gpu && config.monitoring && !config.generate_secrets);
        assert_eq!(config.platform, Platform::LinuxArm64);
        assert_eq!(config.gateway_version, "2.0.0");
    }

    #[test]
    fn invalid_name_is_rejected() {
        let result = StackRequestBuilder::new("Bad Name").build();
        assert!(result.is_err());
    }

    #[test]
    fn zero_passes_is_rejected() {
        let result = StackRequestBuilder::new("demo").max_resolution_passes(0).build();
        assert!(result.is_err());
    }
}

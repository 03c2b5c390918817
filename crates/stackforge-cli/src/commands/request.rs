//! Request flags shared by `resolve`, `generate`, and `validate`.
//!
//! A config file is loaded first; flags and `STACKFORGE_*` variables are
//! applied on top of it, so they win.

use std::path::PathBuf;

use clap::Args;
use stackforge_catalog::Catalog;
use stackforge_common::config::StackConfig;
use stackforge_common::types::{DeploymentType, Platform, ProxyType};
use stackforge_sdk::builder::StackRequestBuilder;

/// Project name used when neither a config file nor a flag sets one.
pub const DEFAULT_PROJECT_NAME: &str = "openclaw-stack";

/// Flags describing a generation request.
#[derive(Args, Debug, Clone, Default)]
pub struct RequestArgs {
    /// Stack config file (YAML, or JSON by `.json` extension).
    #[arg(short, long, env = "STACKFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Project name.
    #[arg(long, env = "STACKFORGE_PROJECT_NAME")]
    pub project_name: Option<String>,

    /// Preset whose services and skill packs are added to the selection.
    #[arg(long, env = "STACKFORGE_PRESET")]
    pub preset: Option<String>,

    /// Service ids to select (repeatable or comma-separated).
    #[arg(short, long = "service", value_delimiter = ',', env = "STACKFORGE_SERVICES")]
    pub services: Vec<String>,

    /// Skill pack ids to select (repeatable or comma-separated).
    #[arg(long = "skill-pack", value_delimiter = ',', env = "STACKFORGE_SKILL_PACKS")]
    pub skill_packs: Vec<String>,

    /// Reverse proxy: none, caddy, or traefik.
    #[arg(long, env = "STACKFORGE_PROXY")]
    pub proxy: Option<ProxyType>,

    /// Public domain.
    #[arg(long, env = "STACKFORGE_DOMAIN")]
    pub domain: Option<String>,

    /// Declare GPU passthrough available.
    #[arg(long)]
    pub gpu: bool,

    /// Target platform, e.g. linux/amd64.
    #[arg(long, env = "STACKFORGE_PLATFORM")]
    pub platform: Option<Platform>,

    /// Deployment type: docker or bare-metal.
    #[arg(long, env = "STACKFORGE_DEPLOYMENT_TYPE")]
    pub deployment_type: Option<DeploymentType>,

    /// Leave secrets empty in `.env` instead of generating them.
    #[arg(long)]
    pub no_secrets: bool,

    /// Gateway image tag.
    #[arg(long, env = "STACKFORGE_GATEWAY_VERSION")]
    pub gateway_version: Option<String>,

    /// Add the monitoring stack.
    #[arg(long)]
    pub monitoring: bool,
}

impl RequestArgs {
    /// Merges the config file (if any) with the flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded, the preset is
    /// unknown, or the merged config is invalid.
    pub fn to_config(&self, catalog: &Catalog) -> anyhow::Result<StackConfig> {
        let base = match &self.config {
            Some(path) => StackConfig::from_path(path)?,
            None => StackConfig::new(DEFAULT_PROJECT_NAME),
        };
        let mut builder = StackRequestBuilder::from_config(base);
        if let Some(name) = &self.project_name {
            builder = builder.project_name(name.clone());
        }
        if let Some(id) = &self.preset {
            builder = builder.preset(catalog.require_preset(id)?);
        }
        builder = builder.services(self.services.iter().cloned());
        for id in &self.skill_packs {
            builder = builder.skill_pack(id.clone());
        }
        if let Some(proxy) = self.proxy {
            builder = builder.proxy(proxy);
        }
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        if self.gpu {
            builder = builder.gpu(true);
        }
        if let Some(platform) = self.platform {
            builder = builder.platform(platform);
        }
        if let Some(deployment_type) = self.deployment_type {
            builder = builder.deployment_type(deployment_type);
        }
        if self.no_secrets {
            builder = builder.generate_secrets(false);
        }
        if let Some(version) = &self.gateway_version {
            builder = builder.gateway_version(version.clone());
        }
        if self.monitoring {
            builder = builder.monitoring(true);
        }
        let config = builder.build()?;
        tracing::debug!(
            project = %config.project_name,
            services = config.services.len(),
            skill_packs = config.skill_packs.len(),
            "request assembled"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin() -> &'static Catalog {
        Catalog::builtin().expect("builtin catalog")
    }

    #[test]
    fn flags_without_file_use_default_name() {
        let args = RequestArgs {
            services: vec!["redis".into()],
            proxy: Some(ProxyType::Caddy),
            ..RequestArgs::default()
        };
        let config = args.to_config(builtin()).expect("config");
        assert_eq!(config.project_name, DEFAULT_PROJECT_NAME);
        assert_eq!(config.services, vec!["redis"]);
        assert_eq!(config.proxy, ProxyType::Caddy);
    }

    #[test]
    fn flags_override_file_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stack.yaml");
        std::fs::write(
            &path,
            "project_name: from-file\nservices: [n8n]\nproxy: caddy\ngenerate_secrets: true\n",
        )
        .expect("write");
        let args = RequestArgs {
            config: Some(path),
            project_name: Some("from-flag".into()),
            services: vec!["redis".into()],
            proxy: Some(ProxyType::Traefik),
            no_secrets: true,
            ..RequestArgs::default()
        };
        let config = args.to_config(builtin()).expect("config");
        assert_eq!(config.project_name, "from-flag");
        assert_eq!(config.services, vec!["n8n", "redis"]);
        assert_eq!(config.proxy, ProxyType::Traefik);
        assert!(!config.generate_secrets);
    }

    #[test]
    fn preset_expands_into_selection() {
        let args = RequestArgs {
            preset: Some("minimal".into()),
            ..RequestArgs::default()
        };
        let config = args.to_config(builtin()).expect("config");
        assert_eq!(config.services, vec!["redis", "caddy"]);
    }

    #[test]
    fn unknown_preset_is_an_error() {
        let args = RequestArgs {
            preset: Some("nope".into()),
            ..RequestArgs::default()
        };
        let err = args.to_config(builtin()).unwrap_err();
        assert!(err.to_string().contains("nope"), "got: {err}");
    }
}

//! End-to-end bundle generation.
//!
//! Runs the compose engine stages in order and renders the downstream
//! files. Nothing is written to disk here; see [`Bundle::write_to`].

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use stackforge_catalog::CatalogProvider;
use stackforge_common::config::StackConfig;
use stackforge_common::constants::{POSTGRES_INIT_SCRIPT, PRIMARY_COMPOSE_FILE};
use stackforge_common::diagnostic::messages;
use stackforge_common::error::{Result, StackforgeError};
use stackforge_common::types::DeploymentType;
use stackforge_compose::{
    ComposeOptions, Partition, ResolveRequest, ResolvedGraph, ValidateOptions, ValidationReport,
    assemble, check_compatibility, database_requirements, partition, resolve, validate,
};

use crate::bundle::{Bundle, BundleMetadata};
use crate::env::{EnvOptions, render_env_files};
use crate::native::render_install_scripts;
use crate::postgres::render_init_script;

const GITIGNORE: &str = ".env\n.env.local\n.env.*.local\n*.log\ndocker-compose.override.yml\n";
const OVERRIDE_STUB: &str = "# Local overrides for docker-compose.yml\n# This file is gitignored; use it for personal port changes, extra volumes, etc.\nservices: {}\n";

/// A resolved request, split for bare metal when asked.
#[derive(Debug, Clone)]
pub struct StackPlan {
    /// The full resolved graph, native services included.
    pub graph: ResolvedGraph,
    /// The bare-metal split, when the deployment is bare metal and at least
    /// one service runs on the host.
    pub partition: Option<Partition>,
    /// The graph that goes into compose files.
    pub compose_graph: ResolvedGraph,
}

impl StackPlan {
    /// Returns `true` if some services run outside the container runtime.
    #[must_use]
    pub const fn has_native(&self) -> bool {
        self.partition.is_some()
    }
}

/// Resolves a config and applies the bare-metal split.
///
/// # Errors
///
/// Returns [`StackforgeError::Config`] for an invalid config and
/// [`StackforgeError::InvalidConfiguration`] when resolution reports errors.
pub fn plan<C: CatalogProvider + ?Sized>(catalog: &C, config: &StackConfig) -> Result<StackPlan> {
    config.validate()?;
    let graph = resolve(catalog, &ResolveRequest::from_config(config));
    if !graph.is_valid() {
        return Err(StackforgeError::InvalidConfiguration {
            messages: messages(graph.errors()),
        });
    }
    let split = match config.deployment_type {
        DeploymentType::BareMetal => Some(partition(&graph, config.platform)?),
        DeploymentType::Docker => None,
    }
    .filter(Partition::has_native);
    let compose_graph = split
        .as_ref()
        .map_or_else(|| graph.clone(), |s| s.container_graph(&graph));
    Ok(StackPlan {
        graph,
        partition: split,
        compose_graph,
    })
}

/// Generates a complete bundle, stamped with the current time.
///
/// # Errors
///
/// See [`generate_at`].
pub fn generate<C: CatalogProvider + ?Sized>(catalog: &C, config: &StackConfig) -> Result<Bundle> {
    generate_at(catalog, config, Utc::now())
}

/// Generates a complete bundle with an explicit timestamp.
///
/// # Errors
///
/// Returns [`StackforgeError::InvalidConfiguration`] if resolution fails,
/// [`StackforgeError::ValidationFailed`] if the assembled primary file does
/// not validate, and serialization errors from assembly.
pub fn generate_at<C: CatalogProvider + ?Sized>(
    catalog: &C,
    config: &StackConfig,
    generated_at: DateTime<Utc>,
) -> Result<Bundle> {
    let plan = plan(catalog, config)?;
    let mut warnings = plan.graph.warnings().to_vec();
    warnings.extend(check_compatibility(&plan.graph));

    let options = ComposeOptions {
        native_host: plan.has_native(),
        ..ComposeOptions::from_config(config)
    };
    let manifest = assemble(&plan.compose_graph, &options)?;
    let report = validate(
        &plan.compose_graph,
        manifest.main_text(),
        &validate_options(config),
    );
    if !report.valid {
        return Err(StackforgeError::ValidationFailed {
            messages: messages(&report.errors),
        });
    }
    warnings.extend(report.warnings);

    let native_ids = plan
        .partition
        .as_ref()
        .map(|p| p.native_ids.clone())
        .unwrap_or_default();
    let env = render_env_files(
        &plan.graph,
        &EnvOptions {
            generate_secrets: config.generate_secrets,
            domain: config.domain.clone(),
            gateway_version: config.gateway_version.clone(),
            native_service_ids: native_ids,
            generated_at,
        },
    );

    let mut files: BTreeMap<String, String> = manifest.files.into_iter().collect();
    let _ = files.insert(".env.example".into(), env.example);
    let _ = files.insert(".env".into(), env.actual);
    let _ = files.insert(".gitignore".into(), GITIGNORE.into());
    let _ = files.insert("docker-compose.override.yml".into(), OVERRIDE_STUB.into());
    if let Some(script) = render_init_script(&database_requirements(&plan.compose_graph)) {
        let _ = files.insert(POSTGRES_INIT_SCRIPT.into(), script);
    }
    if let Some(split) = &plan.partition {
        files.extend(render_install_scripts(
            &split.native_services,
            config.platform.native_family(),
        ));
    }

    let metadata = BundleMetadata {
        service_count: plan.graph.services().len(),
        estimated_memory_mb: plan.graph.estimated_memory_mb(),
        generated_at,
    };
    tracing::info!(
        project = %config.project_name,
        services = metadata.service_count,
        files = files.len(),
        warnings = warnings.len(),
        "bundle generated"
    );
    Ok(Bundle {
        files,
        metadata,
        warnings,
    })
}

/// Re-validates the primary compose file of a bundle already on disk
/// against a fresh resolution of `config`.
///
/// # Errors
///
/// Returns an error if the config does not resolve or the primary file
/// cannot be read. Validation findings are returned in the report.
pub fn validate_bundle<C: CatalogProvider + ?Sized>(
    catalog: &C,
    config: &StackConfig,
    dir: &Path,
) -> Result<ValidationReport> {
    let plan = plan(catalog, config)?;
    let path = dir.join(PRIMARY_COMPOSE_FILE);
    let text = std::fs::read_to_string(&path).map_err(|e| StackforgeError::Io {
        path: path.clone(),
        source: e,
    })?;
    Ok(validate(&plan.compose_graph, &text, &validate_options(config)))
}

fn validate_options(config: &StackConfig) -> ValidateOptions {
    ValidateOptions {
        domain: config.domain.clone(),
        generate_secrets: config.generate_secrets,
    }
}

#[cfg(test)]
mod tests {
    use stackforge_catalog::{Catalog, ServiceDescriptor};
    use stackforge_common::diagnostic::DiagnosticKind;
    use stackforge_common::types::Platform;

    use super::*;

    fn builtin() -> &'static Catalog {
        Catalog::builtin().expect("builtin catalog")
    }

    fn config(services: &[&str]) -> StackConfig {
        let mut config = StackConfig::new("test-stack");
        config.services = services.iter().map(ToString::to_string).collect();
        config
    }

    #[test]
    fn docker_bundle_has_core_files() {
        let bundle = generate(builtin(), &config(&["redis"])).expect("generate");
        for path in [
            "docker-compose.yml",
            ".env",
            ".env.example",
            ".gitignore",
            "docker-compose.override.yml",
        ] {
            assert!(bundle.files.contains_key(path), "missing {path}");
        }
        assert!(!bundle.files.keys().any(|k| k.starts_with("native/")));
        assert_eq!(bundle.metadata.service_count, 1);
        assert_eq!(bundle.file(".gitignore"), Some(GITIGNORE));
    }

    #[test]
    fn conflicting_request_is_invalid_configuration() {
        let err = generate(builtin(), &config(&["redis", "valkey"])).unwrap_err();
        assert!(
            matches!(&err, StackforgeError::InvalidConfiguration { messages } if !messages.is_empty()),
            "got: {err}"
        );
        assert!(err.to_string().starts_with("Invalid stack configuration: "));
    }

    #[test]
    fn bad_domain_fails_validation() {
        let mut cfg = config(&["redis"]);
        cfg.domain = Some("not a domain".into());
        let err = generate(builtin(), &cfg).unwrap_err();
        assert!(
            matches!(err, StackforgeError::ValidationFailed { .. }),
            "got: {err}"
        );
    }

    #[test]
    fn bare_metal_moves_native_services_out_of_compose() {
        let mut cfg = config(&["redis", "n8n"]);
        cfg.deployment_type = DeploymentType::BareMetal;
        cfg.platform = Platform::LinuxAmd64;
        let plan = plan(builtin(), &cfg).expect("plan");
        assert!(plan.has_native());
        assert_eq!(plan.compose_graph.ids(), vec!["postgresql", "n8n"]);
        assert_eq!(plan.graph.ids(), vec!["postgresql", "redis", "n8n"]);

        let bundle = generate(builtin(), &cfg).expect("generate");
        assert!(bundle.files.contains_key("native/install-linux.sh"));
        assert_eq!(bundle.metadata.service_count, 3);
        let main = bundle.file("docker-compose.yml").expect("primary");
        assert!(main.contains("host.docker.internal:host-gateway"), "got: {main}");
        let env = bundle.file(".env").expect(".env");
        assert!(env.contains("REDIS_HOST=host.docker.internal\n"));
    }

    #[test]
    fn bare_metal_without_native_candidates_stays_containerized() {
        let mut cfg = config(&["n8n"]);
        cfg.deployment_type = DeploymentType::BareMetal;
        let plan = plan(builtin(), &cfg).expect("plan");
        assert!(!plan.has_native());
        assert_eq!(plan.compose_graph, plan.graph);
    }

    #[test]
    fn postgres_dependents_get_an_init_script() {
        let bundle = generate(builtin(), &config(&["n8n"])).expect("generate");
        let script = bundle.file(POSTGRES_INIT_SCRIPT).expect("init script");
        assert!(script.contains("CREATE DATABASE \"n8n\" OWNER \"n8n\";"), "got: {script}");
        assert!(script.contains("'${N8N_DB_PASSWORD}'"), "got: {script}");
        let env = bundle.file(".env").expect(".env");
        assert!(env.contains("\nN8N_DB_PASSWORD="), "got: {env}");
        let main = bundle.file("docker-compose.yml").expect("primary");
        assert!(
            main.contains("./postgres/init-databases.sh:/docker-entrypoint-initdb.d/init-databases.sh:ro"),
            "got: {main}"
        );
    }

    #[test]
    fn no_init_script_without_postgres_dependents() {
        let bundle = generate(builtin(), &config(&["redis"])).expect("generate");
        assert!(bundle.file(POSTGRES_INIT_SCRIPT).is_none());
    }

    #[test]
    fn images_are_checked_against_the_container_platform() {
        let db: ServiceDescriptor = serde_yaml::from_str(
            "id: db\nname: Db\ncategory: database\nimage: img\nimage_tag: '1'\n\
             platforms: [linux/amd64, linux/arm64]\n",
        )
        .expect("descriptor");
        let catalog = Catalog::from_parts(vec![db], Vec::new(), Vec::new()).expect("catalog");
        let mut cfg = config(&["db"]);
        cfg.deployment_type = DeploymentType::BareMetal;
        cfg.platform = Platform::MacosArm64;
        let plan = plan(&catalog, &cfg).expect("plan");
        assert!(
            plan.graph
                .warnings()
                .iter()
                .all(|w| w.kind != DiagnosticKind::Platform),
            "got: {:?}",
            plan.graph.warnings()
        );
    }
}

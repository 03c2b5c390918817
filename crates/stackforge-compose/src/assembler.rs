//! Compose assembly.
//!
//! Projects a valid [`ResolvedGraph`] into a primary compose file holding the
//! gateway and core services, plus one profile file per mapped category
//! group. Each named volume is declared exactly once: in the primary file if
//! anything there mounts it, otherwise in the profile file that owns it. The
//! primary file is always loaded first, so profile services can reference
//! the shared network and primary volumes.
//!
//! The primary file does not declare the union of every volume. Compose
//! merges top-level `volumes` across `-f` files, so a union in the primary
//! file would put profile-owned volumes in two files at once, and loading
//! the primary file alone would create volumes for services it never runs.
//! Host paths (see [`VolumeMapping::is_bind_mount`]) are mounted as-is and
//! never declared.
//!
//! When services keep their data in the shared PostgreSQL instance, the
//! database container gets the init script mount and the password variable
//! of each per-service role (see [`database_requirements`]).

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use stackforge_catalog::ServiceDescriptor;
use stackforge_catalog::descriptor::{DeploySpec, VolumeMapping};
use stackforge_common::config::StackConfig;
use stackforge_common::constants::{
    DEFAULT_GATEWAY_VERSION, GATEWAY_CLI_SERVICE, GATEWAY_IMAGE, GATEWAY_SERVICE,
    HOST_GATEWAY_ALIAS, POSTGRES_INIT_SCRIPT, POSTGRES_SERVICE, PRIMARY_COMPOSE_FILE,
    SHARED_NETWORK,
};
use stackforge_common::error::{Result, StackforgeError};

use crate::databases::{DatabaseRequirement, database_requirements};
use crate::manifest::{
    CommandSpec, ComposeDeploy, ComposeDocument, ComposeHealthcheck, ComposeReservations,
    ComposeResources, ComposeService, DependencyCondition, DependsOn, DeviceRequest,
    NetworkDeclaration, VolumeDeclaration,
};
use crate::profile::ProfileMap;
use crate::resolver::ResolvedGraph;

const GATEWAY_PORT: &str = "${OPENCLAW_GATEWAY_PORT:-18789}:18789";
const BRIDGE_PORT: &str = "${OPENCLAW_BRIDGE_PORT:-18790}:18790";
const CONFIG_MOUNT: &str = "${OPENCLAW_CONFIG_DIR:-./openclaw/config}:/home/node/.openclaw";
const WORKSPACE_MOUNT: &str =
    "${OPENCLAW_WORKSPACE_DIR:-./openclaw/workspace}:/home/node/.openclaw/workspace";
const INIT_SCRIPT_TARGET: &str = "/docker-entrypoint-initdb.d/init-databases.sh";

/// Assembly switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeOptions {
    /// Compose project name written to the primary file.
    pub project_name: Option<String>,
    /// Whether GPU reservations are emitted for GPU services.
    pub gpu: bool,
    /// Gateway image tag.
    pub gateway_version: String,
    /// Whether some services run on the host outside the container runtime.
    pub native_host: bool,
    /// Split mapped categories into profile files. When false, everything
    /// goes into the primary file and no profiles are used.
    pub split_profiles: bool,
    /// Category to profile-file table.
    pub profile_map: ProfileMap,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            project_name: None,
            gpu: false,
            gateway_version: DEFAULT_GATEWAY_VERSION.to_string(),
            native_host: false,
            split_profiles: true,
            profile_map: ProfileMap::default(),
        }
    }
}

impl ComposeOptions {
    /// Derives options from a generation config.
    #[must_use]
    pub fn from_config(config: &StackConfig) -> Self {
        Self {
            project_name: Some(config.project_name.clone()),
            gpu: config.gpu,
            gateway_version: config.gateway_version.clone(),
            ..Self::default()
        }
    }
}

/// Assembled compose files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledManifest {
    /// File name to YAML text. The primary file comes first.
    pub files: IndexMap<String, String>,
    /// Name of the primary file.
    pub main_file: String,
    /// Profiles used by the profile files, sorted.
    pub profiles: Vec<String>,
}

impl CompiledManifest {
    /// Text of the primary file.
    #[must_use]
    pub fn main_text(&self) -> &str {
        self.files.get(&self.main_file).map_or("", String::as_str)
    }

    /// Parses one emitted file back into the document model.
    ///
    /// # Errors
    ///
    /// Returns [`StackforgeError::NotFound`] for an unknown file name, or a
    /// YAML error if the text does not parse.
    pub fn document(&self, file: &str) -> Result<ComposeDocument> {
        let text = self.files.get(file).ok_or_else(|| StackforgeError::NotFound {
            kind: "compose file",
            id: file.to_string(),
        })?;
        ComposeDocument::from_yaml(text)
    }
}

struct ProfileGroup<'a> {
    profile: String,
    services: Vec<(&'a ServiceDescriptor, ComposeService)>,
}

/// Assembles a resolved graph into compose files.
///
/// # Errors
///
/// Returns [`StackforgeError::InvalidGraph`] if the graph carries errors,
/// or a YAML error if serialization fails.
pub fn assemble(graph: &ResolvedGraph, options: &ComposeOptions) -> Result<CompiledManifest> {
    if !graph.is_valid() {
        return Err(StackforgeError::InvalidGraph);
    }
    tracing::info!(
        services = graph.services().len(),
        split_profiles = options.split_profiles,
        native_host = options.native_host,
        "assembling compose manifest"
    );

    let databases = database_requirements(graph);
    let mut primary: Vec<(&ServiceDescriptor, ComposeService)> = Vec::new();
    let mut groups: IndexMap<String, ProfileGroup<'_>> = IndexMap::new();
    for entry in graph.services() {
        let def = &entry.descriptor;
        let mut service = project_service(def, graph, options);
        if def.id == POSTGRES_SERVICE && !databases.is_empty() {
            attach_init_script(&mut service, &databases);
        }
        let target = if options.split_profiles {
            options.profile_map.lookup(def.category)
        } else {
            None
        };
        match target {
            Some(target) => {
                tracing::debug!(service = %def.id, file = %target.file, "routed to profile file");
                groups
                    .entry(target.file.clone())
                    .or_insert_with(|| ProfileGroup {
                        profile: target.profile.clone(),
                        services: Vec::new(),
                    })
                    .services
                    .push((def, service));
            }
            None => primary.push((def, service)),
        }
    }

    let drivers: BTreeMap<&str, Option<&str>> = graph
        .services()
        .iter()
        .flat_map(|e| {
            e.descriptor
                .volumes
                .iter()
                .chain(&e.descriptor.gateway_volume_mounts)
        })
        .filter(|v| !v.is_bind_mount())
        .map(|v| (v.name.as_str(), v.driver.as_deref()))
        .collect();
    let declare = |names: BTreeSet<&str>| -> IndexMap<String, Option<VolumeDeclaration>> {
        names
            .into_iter()
            .map(|name| {
                let decl = drivers.get(name).copied().flatten().map(|d| VolumeDeclaration {
                    driver: Some(d.to_string()),
                });
                (name.to_string(), decl)
            })
            .collect()
    };

    let mut primary_volumes: BTreeSet<&str> = graph
        .services()
        .iter()
        .flat_map(|e| &e.descriptor.gateway_volume_mounts)
        .filter(|v| !v.is_bind_mount())
        .map(|v| v.name.as_str())
        .collect();
    for (def, _) in &primary {
        primary_volumes.extend(named_volumes(*def));
    }

    let gateway_depends_on: IndexMap<String, DependsOn> = primary
        .iter()
        .map(|(def, _)| (def.id.clone(), depends_on_entry(def)))
        .collect();

    let mut networks: IndexMap<String, NetworkDeclaration> = IndexMap::new();
    let _ = networks.insert(SHARED_NETWORK.to_string(), bridge());
    for entry in graph.services() {
        for net in &entry.descriptor.networks {
            let _ = networks.entry(net.clone()).or_insert_with(bridge);
        }
    }

    let mut main = ComposeDocument {
        name: options.project_name.clone(),
        ..ComposeDocument::default()
    };
    let _ = main.services.insert(
        GATEWAY_SERVICE.to_string(),
        gateway_service(graph, options, gateway_depends_on),
    );
    for (def, service) in primary {
        let _ = main.services.insert(def.id.clone(), service);
    }
    let _ = main
        .services
        .insert(GATEWAY_CLI_SERVICE.to_string(), cli_service(options));
    main.volumes = declare(primary_volumes.clone());
    main.networks = networks;

    let mut files = IndexMap::new();
    let _ = files.insert(PRIMARY_COMPOSE_FILE.to_string(), main.to_yaml()?);

    let mut profiles = BTreeSet::new();
    for (file, group) in groups {
        let _ = profiles.insert(group.profile.clone());
        let mut doc = ComposeDocument::default();
        let mut owned: BTreeSet<&str> = BTreeSet::new();
        for (def, mut service) in group.services {
            service.profiles = vec![group.profile.clone()];
            owned.extend(named_volumes(def).filter(|name| !primary_volumes.contains(name)));
            let _ = doc.services.insert(def.id.clone(), service);
        }
        doc.volumes = declare(owned);
        tracing::debug!(file = %file, services = doc.services.len(), "profile file assembled");
        let _ = files.insert(file, doc.to_yaml()?);
    }

    Ok(CompiledManifest {
        files,
        main_file: PRIMARY_COMPOSE_FILE.to_string(),
        profiles: profiles.into_iter().collect(),
    })
}

fn named_volumes(def: &ServiceDescriptor) -> impl Iterator<Item = &str> {
    def.volumes
        .iter()
        .filter(|v| !v.is_bind_mount())
        .map(|v| v.name.as_str())
}

fn attach_init_script(service: &mut ComposeService, databases: &[DatabaseRequirement]) {
    service
        .volumes
        .push(format!("./{POSTGRES_INIT_SCRIPT}:{INIT_SCRIPT_TARGET}:ro"));
    for db in databases {
        let _ = service
            .environment
            .entry(db.password_var.clone())
            .or_insert_with(|| format!("${{{}}}", db.password_var));
    }
}

fn bridge() -> NetworkDeclaration {
    NetworkDeclaration {
        driver: "bridge".into(),
    }
}

fn gateway_image(options: &ComposeOptions) -> String {
    format!(
        "${{OPENCLAW_IMAGE:-{GATEWAY_IMAGE}:{}}}",
        options.gateway_version
    )
}

fn env_value(key: &str, default_value: &str, secret: bool) -> String {
    if secret {
        format!("${{{key}}}")
    } else {
        default_value.to_string()
    }
}

fn depends_on_entry(dependency: &ServiceDescriptor) -> DependsOn {
    let condition = if dependency.healthcheck.is_some() {
        DependencyCondition::ServiceHealthy
    } else {
        DependencyCondition::ServiceStarted
    };
    DependsOn { condition }
}

fn base_gateway_env() -> IndexMap<String, String> {
    [
        ("HOME", "/home/node".to_string()),
        ("TERM", "xterm-256color".to_string()),
        ("OPENCLAW_GATEWAY_TOKEN", "${OPENCLAW_GATEWAY_TOKEN}".to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn gateway_service(
    graph: &ResolvedGraph,
    options: &ComposeOptions,
    depends_on: IndexMap<String, DependsOn>,
) -> ComposeService {
    let mut environment = base_gateway_env();
    let mut volumes = vec![CONFIG_MOUNT.to_string(), WORKSPACE_MOUNT.to_string()];
    for entry in graph.services() {
        for var in &entry.descriptor.gateway_env {
            let _ = environment.insert(
                var.key.clone(),
                env_value(&var.key, &var.default_value, var.secret),
            );
        }
        for mount in &entry.descriptor.gateway_volume_mounts {
            volumes.push(mount.mount());
        }
    }

    let extra_hosts = if options.native_host {
        vec![format!("{HOST_GATEWAY_ALIAS}:host-gateway")]
    } else {
        Vec::new()
    };

    ComposeService {
        image: gateway_image(options),
        environment,
        ports: vec![GATEWAY_PORT.to_string(), BRIDGE_PORT.to_string()],
        volumes,
        restart: Some("unless-stopped".into()),
        networks: vec![SHARED_NETWORK.to_string()],
        init: Some(true),
        command: Some(CommandSpec::exec(&[
            "node",
            "dist/index.js",
            "gateway",
            "--bind",
            "${OPENCLAW_GATEWAY_BIND:-lan}",
            "--port",
            "18789",
        ])),
        extra_hosts,
        depends_on,
        ..ComposeService::default()
    }
}

fn cli_service(options: &ComposeOptions) -> ComposeService {
    let mut environment = base_gateway_env();
    let _ = environment.insert("BROWSER".into(), "echo".into());
    ComposeService {
        image: gateway_image(options),
        environment,
        volumes: vec![CONFIG_MOUNT.to_string(), WORKSPACE_MOUNT.to_string()],
        networks: vec![SHARED_NETWORK.to_string()],
        init: Some(true),
        stdin_open: Some(true),
        tty: Some(true),
        entrypoint: Some(CommandSpec::exec(&["node", "dist/index.js"])),
        ..ComposeService::default()
    }
}

fn project_service(
    def: &ServiceDescriptor,
    graph: &ResolvedGraph,
    options: &ComposeOptions,
) -> ComposeService {
    let environment = def
        .environment
        .iter()
        .map(|e| (e.key.clone(), env_value(&e.key, &e.default_value, e.secret)))
        .collect();

    let exposed: Vec<_> = def.exposed_ports().collect();
    let prefix = def.id.to_uppercase().replace('-', "_");
    let ports = exposed
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let suffix = if exposed.len() > 1 {
                format!("_{i}")
            } else {
                String::new()
            };
            format!("${{{prefix}_PORT{suffix}:-{}}}:{}", p.host, p.container)
        })
        .collect();

    let volumes = def.volumes.iter().map(VolumeMapping::mount).collect();

    let healthcheck = def.healthcheck.as_ref().map(|h| ComposeHealthcheck {
        test: vec!["CMD-SHELL".into(), h.test.clone()],
        interval: h.interval.clone(),
        timeout: h.timeout.clone(),
        retries: h.retries,
        start_period: h.start_period.clone(),
    });

    let depends_on = def
        .start_after()
        .filter_map(|id| graph.get(id))
        .map(|dep| (dep.descriptor.id.clone(), depends_on_entry(&dep.descriptor)))
        .collect();

    ComposeService {
        image: def.image_reference(),
        environment,
        ports,
        volumes,
        healthcheck,
        restart: Some(def.restart_policy.as_str().to_string()),
        networks: def.networks.clone(),
        command: def.command.clone().map(CommandSpec::Shell),
        entrypoint: def.entrypoint.clone().map(CommandSpec::Shell),
        labels: def.labels.clone(),
        deploy: project_deploy(def.deploy.as_ref(), options.gpu && def.gpu_required),
        depends_on,
        ..ComposeService::default()
    }
}

/// `None` unless there is a limit, a reservation or a GPU to reserve.
fn project_deploy(spec: Option<&DeploySpec>, reserve_gpu: bool) -> Option<ComposeDeploy> {
    let resources = spec.and_then(|d| d.resources.as_ref());
    let mut reservations = resources
        .and_then(|r| r.reservations.as_ref())
        .map(|r| ComposeReservations {
            cpus: r.cpus.clone(),
            memory: r.memory.clone(),
            devices: Vec::new(),
        });
    if reserve_gpu {
        reservations
            .get_or_insert_with(ComposeReservations::default)
            .devices
            .push(DeviceRequest::all_nvidia_gpus());
    }
    let limits = resources.and_then(|r| r.limits.clone());
    if limits.is_none() && reservations.is_none() {
        return None;
    }
    Some(ComposeDeploy {
        resources: Some(ComposeResources {
            limits,
            reservations,
        }),
    })
}

//! Post-assembly validation.
//!
//! Runs every check independently over the resolved graph and the primary
//! manifest text, collecting all diagnostics rather than stopping at the
//! first problem.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use stackforge_common::constants::SHARED_NETWORK;
use stackforge_common::diagnostic::{Diagnostic, DiagnosticKind};

use crate::graph::DependencyGraph;
use crate::resolver::ResolvedGraph;

#[allow(clippy::expect_used)]
static DOMAIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,}$")
        .expect("Invalid regex in DOMAIN_PATTERN")
});

/// Inputs that are not part of the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Public domain to check, if any.
    pub domain: Option<String>,
    /// Whether secrets will be generated into `.env`.
    pub generate_secrets: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            domain: None,
            generate_secrets: true,
        }
    }
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// `true` when `errors` is empty.
    pub valid: bool,
    /// Hard errors.
    pub errors: Vec<Diagnostic>,
    /// Advisory warnings.
    pub warnings: Vec<Diagnostic>,
}

/// Validates a resolved graph and its primary manifest.
#[must_use]
pub fn validate(
    graph: &ResolvedGraph,
    primary_manifest: &str,
    options: &ValidateOptions,
) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    check_ports(graph, &mut errors);
    check_volumes(graph, &mut errors);
    check_environment(graph, options.generate_secrets, &mut errors, &mut warnings);
    check_networks(graph, &mut warnings);
    check_cycles(graph, &mut errors);
    check_manifest(primary_manifest, &mut errors);
    if let Some(domain) = options.domain.as_deref().filter(|d| !d.is_empty()) {
        check_domain(domain, &mut errors);
    }

    let valid = errors.is_empty();
    tracing::info!(
        valid,
        errors = errors.len(),
        warnings = warnings.len(),
        "validation finished"
    );
    ValidationReport {
        valid,
        errors,
        warnings,
    }
}

fn check_ports(graph: &ResolvedGraph, errors: &mut Vec<Diagnostic>) {
    let mut owners: HashMap<u16, &str> = HashMap::new();
    for entry in graph.services() {
        let def = &entry.descriptor;
        for port in def.exposed_ports() {
            match owners.get(&port.host) {
                Some(existing) => errors.push(Diagnostic::new(
                    DiagnosticKind::PortConflict,
                    format!(
                        "Port {} is used by both \"{existing}\" and \"{}\"",
                        port.host, def.name
                    ),
                )),
                None => {
                    let _ = owners.insert(port.host, &def.name);
                }
            }
        }
    }
}

fn check_volumes(graph: &ResolvedGraph, errors: &mut Vec<Diagnostic>) {
    let mut owners: HashMap<&str, &str> = HashMap::new();
    for entry in graph.services() {
        for volume in entry.descriptor.volumes.iter().filter(|v| !v.is_bind_mount()) {
            let owner = *owners.entry(volume.name.as_str()).or_insert(entry.id());
            if owner != entry.id() {
                errors.push(Diagnostic::new(
                    DiagnosticKind::VolumeConflict,
                    format!(
                        "Volume name \"{}\" is used by both \"{owner}\" and \"{}\"",
                        volume.name,
                        entry.id()
                    ),
                ));
            }
        }
    }
}

fn check_environment(
    graph: &ResolvedGraph,
    generate_secrets: bool,
    errors: &mut Vec<Diagnostic>,
    warnings: &mut Vec<Diagnostic>,
) {
    for entry in graph.services() {
        let def = &entry.descriptor;
        for var in def.environment.iter().filter(|v| v.required && v.default_value.is_empty()) {
            if !var.secret {
                errors.push(Diagnostic::new(
                    DiagnosticKind::MissingEnv,
                    format!(
                        "Required environment variable \"{}\" for \"{}\" has no default value",
                        var.key, def.name
                    ),
                ));
            } else if !generate_secrets {
                warnings.push(Diagnostic::new(
                    DiagnosticKind::SecretNeeded,
                    format!(
                        "Secret \"{}\" for \"{}\" needs to be configured manually",
                        var.key, def.name
                    ),
                ));
            }
        }
    }
}

fn check_networks(graph: &ResolvedGraph, warnings: &mut Vec<Diagnostic>) {
    for entry in graph.services() {
        let def = &entry.descriptor;
        if !def.networks.iter().any(|n| n == SHARED_NETWORK) {
            warnings.push(Diagnostic::new(
                DiagnosticKind::Network,
                format!(
                    "Service \"{}\" is not on {SHARED_NETWORK} and may not be reachable from the gateway",
                    def.name
                ),
            ));
        }
    }
}

fn check_cycles(graph: &ResolvedGraph, errors: &mut Vec<Diagnostic>) {
    let deps = DependencyGraph::from_descriptors(graph.services().iter().map(|e| &e.descriptor));
    for members in deps.cycles() {
        errors.push(Diagnostic::new(
            DiagnosticKind::Cycle,
            format!("Circular dependency detected among: {}", members.join(", ")),
        ));
    }
}

fn check_manifest(text: &str, errors: &mut Vec<Diagnostic>) {
    match serde_yaml::from_str::<serde_yaml::Value>(text) {
        Ok(doc) => {
            let has_services = doc
                .as_mapping()
                .and_then(|m| m.get("services"))
                .is_some_and(serde_yaml::Value::is_mapping);
            if !has_services {
                errors.push(Diagnostic::new(
                    DiagnosticKind::ManifestInvalid,
                    "Generated manifest has no top-level \"services\" mapping",
                ));
            }
        }
        Err(e) => errors.push(Diagnostic::new(
            DiagnosticKind::ManifestInvalid,
            format!("Generated manifest is not valid YAML: {e}"),
        )),
    }
}

fn check_domain(domain: &str, errors: &mut Vec<Diagnostic>) {
    if !DOMAIN_PATTERN.is_match(domain) {
        errors.push(Diagnostic::new(
            DiagnosticKind::InvalidDomain,
            format!("\"{domain}\" is not a valid domain name"),
        ));
    }
}

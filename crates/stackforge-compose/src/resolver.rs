//! Service resolution.
//!
//! Expands a sparse request (explicit services, skill packs, proxy,
//! monitoring) into a complete, conflict-checked, start-ordered service list.
//! Resolution never fails: unknown ids, conflicts, and resource concerns are
//! reported as [`Diagnostic`] values on the returned [`ResolvedGraph`].

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;

use indexmap::IndexMap;
use serde::Serialize;
use stackforge_catalog::{CatalogProvider, ServiceCategory, ServiceDescriptor};
use stackforge_common::config::StackConfig;
use stackforge_common::constants::{
    BASE_MEMORY_MB, DEFAULT_MAX_RESOLUTION_PASSES, DEFAULT_SERVICE_MEMORY_MB, MONITORING_SERVICES,
};
use stackforge_common::diagnostic::{Diagnostic, DiagnosticKind};
use stackforge_common::types::{MemoryThresholds, Platform, Provenance, ProxyType};

use crate::graph::DependencyGraph;

const DEFAULT_PASSES: NonZeroUsize = match NonZeroUsize::new(DEFAULT_MAX_RESOLUTION_PASSES) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    /// Explicitly selected service ids.
    pub services: Vec<String>,
    /// Selected skill pack ids.
    pub skill_packs: Vec<String>,
    /// Reverse proxy to add.
    pub proxy: ProxyType,
    /// Whether GPU passthrough is available.
    pub gpu: bool,
    /// Target platform, if platform checks should run.
    pub platform: Option<Platform>,
    /// Whether to add the monitoring stack.
    pub monitoring: bool,
    /// Memory warning thresholds.
    pub memory_thresholds: MemoryThresholds,
    /// Ceiling on dependency-closure passes.
    pub max_passes: NonZeroUsize,
}

impl Default for ResolveRequest {
    fn default() -> Self {
        Self {
            services: Vec::new(),
            skill_packs: Vec::new(),
            proxy: ProxyType::None,
            gpu: false,
            platform: None,
            monitoring: false,
            memory_thresholds: MemoryThresholds::default(),
            max_passes: DEFAULT_PASSES,
        }
    }
}

impl ResolveRequest {
    /// Creates a request for an explicit service list.
    #[must_use]
    pub fn with_services<S: AsRef<str>>(services: &[S]) -> Self {
        Self {
            services: services.iter().map(|s| s.as_ref().to_string()).collect(),
            ..Self::default()
        }
    }

    /// Derives a request from a generation config.
    ///
    /// Images are checked against the container platform of the target, so
    /// a macOS or Windows host is treated as `linux/amd64`.
    #[must_use]
    pub fn from_config(config: &StackConfig) -> Self {
        Self {
            services: config.services.clone(),
            skill_packs: config.skill_packs.clone(),
            proxy: config.proxy,
            gpu: config.gpu,
            platform: Some(config.platform.container_platform()),
            monitoring: config.monitoring,
            memory_thresholds: config.memory_thresholds,
            max_passes: NonZeroUsize::new(config.max_resolution_passes).unwrap_or(DEFAULT_PASSES),
        }
    }
}

/// A descriptor paired with the reason it is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEntry {
    /// The service descriptor.
    pub descriptor: ServiceDescriptor,
    /// Why the service is in the graph.
    pub provenance: Provenance,
}

impl ResolvedEntry {
    /// Shorthand for the descriptor id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }
}

/// A service the resolver added on the user's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddedDependency {
    /// Added service id.
    pub service: String,
    /// Human-readable reason.
    pub reason: String,
}

/// The outcome of [`resolve`].
///
/// When [`ResolvedGraph::is_valid`] is false the service list is kept for
/// diagnostics but must not be assembled into a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedGraph {
    services: Vec<ResolvedEntry>,
    added_dependencies: Vec<AddedDependency>,
    warnings: Vec<Diagnostic>,
    errors: Vec<Diagnostic>,
    is_valid: bool,
    estimated_memory_mb: u64,
}

impl ResolvedGraph {
    /// Services in start order.
    #[must_use]
    pub fn services(&self) -> &[ResolvedEntry] {
        &self.services
    }

    /// Services added by skill packs, proxy, monitoring, or `requires`.
    #[must_use]
    pub fn added_dependencies(&self) -> &[AddedDependency] {
        &self.added_dependencies
    }

    /// Advisory diagnostics.
    #[must_use]
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    /// Hard errors.
    #[must_use]
    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    /// `true` when there are no hard errors.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Base memory plus each service's minimum, in MB.
    #[must_use]
    pub const fn estimated_memory_mb(&self) -> u64 {
        self.estimated_memory_mb
    }

    /// Ids in start order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.services.iter().map(ResolvedEntry::id).collect()
    }

    /// Looks up a resolved entry.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ResolvedEntry> {
        self.services.iter().find(|e| e.id() == id)
    }

    /// Returns `true` if the service is in the graph.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Returns `image:tag` for a resolved service.
    #[must_use]
    pub fn image_reference(&self, id: &str) -> Option<String> {
        self.get(id).map(|e| e.descriptor.image_reference())
    }

    /// Returns a copy holding only the given ids, in the original order.
    ///
    /// Diagnostics, added dependencies, and the memory estimate carry over
    /// unchanged.
    #[must_use]
    pub fn reduce_to(&self, ids: &[&str]) -> Self {
        let keep: HashSet<&str> = ids.iter().copied().collect();
        Self {
            services: self
                .services
                .iter()
                .filter(|e| keep.contains(e.id()))
                .cloned()
                .collect(),
            ..self.clone()
        }
    }

    /// Returns a copy with image tags pinned. Unknown ids are ignored.
    #[must_use]
    pub fn with_image_tags(&self, overrides: &HashMap<String, String>) -> Self {
        let mut pinned = self.clone();
        for entry in &mut pinned.services {
            if let Some(tag) = overrides.get(&entry.descriptor.id) {
                entry.descriptor.image_tag.clone_from(tag);
            }
        }
        pinned
    }
}

/// Resolves a request against a catalog.
///
/// Runs to completion on any input. See the module docs for how failures
/// are reported.
pub fn resolve<C: CatalogProvider + ?Sized>(catalog: &C, request: &ResolveRequest) -> ResolvedGraph {
    tracing::info!(
        services = request.services.len(),
        skill_packs = request.skill_packs.len(),
        "resolving service graph"
    );
    let mut added = Vec::new();
    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    let mut working: IndexMap<String, Provenance> = IndexMap::new();
    for id in &request.services {
        let _ = working.entry(id.clone()).or_insert(Provenance::User);
    }

    for pack_id in &request.skill_packs {
        let Some(pack) = catalog.skill_pack(pack_id) else {
            errors.push(Diagnostic::new(
                DiagnosticKind::UnknownSkillPack,
                format!("Unknown skill pack: \"{pack_id}\""),
            ));
            continue;
        };
        for service in &pack.required_services {
            add(
                &mut working,
                &mut added,
                service,
                Provenance::SkillPack,
                format!("Required by skill pack: {}", pack.name),
            );
        }
    }

    if let Some(proxy) = request.proxy.service_id() {
        add(
            &mut working,
            &mut added,
            proxy,
            Provenance::Proxy,
            "Selected as reverse proxy".to_string(),
        );
    }

    if request.monitoring {
        for service in MONITORING_SERVICES {
            add(
                &mut working,
                &mut added,
                service,
                Provenance::Monitoring,
                "Included with monitoring stack".to_string(),
            );
        }
    }

    let unknown: Vec<String> = working
        .keys()
        .filter(|id| catalog.service(id).is_none())
        .cloned()
        .collect();
    for id in unknown {
        errors.push(Diagnostic::new(
            DiagnosticKind::UnknownService,
            format!("Unknown service: \"{id}\""),
        ));
        let _ = working.shift_remove(&id);
    }

    close_over_requires(
        catalog,
        request.max_passes,
        &mut working,
        &mut added,
        &mut warnings,
        &mut errors,
    );

    let present: Vec<&ServiceDescriptor> = working
        .keys()
        .filter_map(|id| catalog.service(id))
        .collect();

    for def in &present {
        for rec in &def.recommends {
            if !working.contains_key(rec) && catalog.service(rec).is_some() {
                warnings.push(Diagnostic::new(
                    DiagnosticKind::Recommendation,
                    format!("{} recommends \"{rec}\" for enhanced functionality", def.name),
                ));
            }
        }
    }

    for (i, a) in present.iter().enumerate() {
        for b in &present[i + 1..] {
            if a.conflicts_with.contains(&b.id) || b.conflicts_with.contains(&a.id) {
                errors.push(Diagnostic::new(
                    DiagnosticKind::Conflict,
                    format!("{} and {} cannot be used together", a.name, b.name),
                ));
            }
        }
    }

    if let Some(platform) = request.platform {
        for def in &present {
            if !def.platforms.is_empty() && !def.platforms.contains(&platform) {
                let supported: Vec<&str> = def.platforms.iter().map(|p| p.as_str()).collect();
                warnings.push(Diagnostic::new(
                    DiagnosticKind::Platform,
                    format!(
                        "{} may not be compatible with {platform}. Supported: {}",
                        def.name,
                        supported.join(", ")
                    ),
                ));
            }
        }
    }

    if !request.gpu {
        for def in present.iter().filter(|d| d.gpu_required) {
            warnings.push(Diagnostic::new(
                DiagnosticKind::Gpu,
                format!(
                    "{} requires GPU passthrough. Enable --gpu flag for optimal performance.",
                    def.name
                ),
            ));
        }
    }

    let estimated_memory_mb = estimate_memory(&present);
    if let Some(warning) = memory_warning(estimated_memory_mb, request.memory_thresholds) {
        warnings.push(warning);
    }

    let sorted = DependencyGraph::from_descriptors(present.iter().copied()).topological_order();
    let services: Vec<ResolvedEntry> = sorted
        .order
        .iter()
        .filter_map(|id| {
            let descriptor = catalog.service(id)?;
            let provenance = working.get(id).copied().unwrap_or(Provenance::User);
            Some(ResolvedEntry {
                descriptor: descriptor.clone(),
                provenance,
            })
        })
        .collect();

    let is_valid = errors.is_empty();
    tracing::info!(
        resolved = services.len(),
        added = added.len(),
        warnings = warnings.len(),
        errors = errors.len(),
        estimated_memory_mb,
        is_valid,
        "service graph resolved"
    );

    ResolvedGraph {
        services,
        added_dependencies: added,
        warnings,
        errors,
        is_valid,
        estimated_memory_mb,
    }
}

fn add(
    working: &mut IndexMap<String, Provenance>,
    added: &mut Vec<AddedDependency>,
    id: &str,
    provenance: Provenance,
    reason: String,
) {
    if working.contains_key(id) {
        return;
    }
    let _ = working.insert(id.to_string(), provenance);
    tracing::debug!(service = id, %provenance, reason = %reason, "service added");
    added.push(AddedDependency {
        service: id.to_string(),
        reason,
    });
}

/// Adds every `requires` target until nothing changes or the ceiling is hit.
///
/// A target missing from the catalog is reported once as an unknown service
/// and never added.
fn close_over_requires<C: CatalogProvider + ?Sized>(
    catalog: &C,
    max_passes: NonZeroUsize,
    working: &mut IndexMap<String, Provenance>,
    added: &mut Vec<AddedDependency>,
    warnings: &mut Vec<Diagnostic>,
    errors: &mut Vec<Diagnostic>,
) {
    let mut reported: HashSet<String> = HashSet::new();
    let mut passes = 0;
    let mut changed = true;
    while changed && passes < max_passes.get() {
        changed = false;
        passes += 1;
        let snapshot: Vec<String> = working.keys().cloned().collect();
        for id in snapshot {
            let Some(def) = catalog.service(&id) else {
                continue;
            };
            for target in &def.requires {
                if working.contains_key(target) {
                    continue;
                }
                if catalog.service(target).is_none() {
                    if reported.insert(target.clone()) {
                        errors.push(Diagnostic::new(
                            DiagnosticKind::UnknownService,
                            format!("Unknown service: \"{target}\" (required by {})", def.name),
                        ));
                    }
                    continue;
                }
                add(
                    working,
                    added,
                    target,
                    Provenance::Dependency,
                    format!("Required by {}", def.name),
                );
                changed = true;
            }
        }
    }
    if changed {
        tracing::warn!(passes, "dependency closure hit its pass ceiling");
        warnings.push(Diagnostic::new(
            DiagnosticKind::Resolution,
            format!(
                "Dependency resolution reached maximum iterations ({passes}). \
                 Some transitive dependencies may not be fully resolved."
            ),
        ));
    }
}

fn estimate_memory(present: &[&ServiceDescriptor]) -> u64 {
    BASE_MEMORY_MB
        + present
            .iter()
            .map(|d| d.min_memory_mb.unwrap_or(DEFAULT_SERVICE_MEMORY_MB))
            .sum::<u64>()
}

#[allow(clippy::cast_precision_loss)]
fn memory_warning(estimated_mb: u64, thresholds: MemoryThresholds) -> Option<Diagnostic> {
    let gb = estimated_mb as f64 / 1024.0;
    let message = if estimated_mb > thresholds.critical {
        format!("Estimated {gb:.1}GB RAM required. Ensure your server has sufficient resources.")
    } else if estimated_mb > thresholds.warning {
        format!("Estimated {gb:.1}GB RAM required. A server with at least 8GB RAM is recommended.")
    } else if estimated_mb > thresholds.info {
        format!("Estimated {gb:.1}GB RAM required.")
    } else {
        return None;
    };
    Some(Diagnostic::new(DiagnosticKind::Memory, message))
}

/// Advisory checks for combinations that work but poorly.
///
/// Never affects validity. Flags overlapping vector databases and any
/// GPU-dependent services, which need host-side driver setup.
#[must_use]
pub fn check_compatibility(graph: &ResolvedGraph) -> Vec<Diagnostic> {
    let mut warnings = Vec::new();
    let vector_dbs: Vec<&str> = graph
        .services
        .iter()
        .filter(|e| e.descriptor.category == ServiceCategory::VectorDb)
        .map(ResolvedEntry::id)
        .collect();
    if vector_dbs.len() > 1 {
        warnings.push(Diagnostic::new(
            DiagnosticKind::Compatibility,
            format!(
                "Multiple vector databases selected ({}). Consider using just one to reduce resource usage.",
                vector_dbs.join(", ")
            ),
        ));
    }
    let gpu: Vec<&str> = graph
        .services
        .iter()
        .filter(|e| e.descriptor.gpu_required)
        .map(|e| e.descriptor.name.as_str())
        .collect();
    if !gpu.is_empty() {
        warnings.push(Diagnostic::new(
            DiagnosticKind::Compatibility,
            format!(
                "Services requiring GPU: {}. Ensure NVIDIA Container Toolkit is installed.",
                gpu.join(", ")
            ),
        ));
    }
    warnings
}

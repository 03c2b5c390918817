//! Bare-metal partitioning.
//!
//! Splits a resolved graph into services that can run directly on the host
//! and services that must stay in containers. The gateway is not part of the
//! resolved graph and is therefore always containerized.

use std::collections::BTreeSet;

use stackforge_common::error::{Result, StackforgeError};
use stackforge_common::types::Platform;

use crate::resolver::{ResolvedEntry, ResolvedGraph};

/// The two halves of a resolved graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Services with a native recipe for the target OS family, in start order.
    pub native_services: Vec<ResolvedEntry>,
    /// Everything else, in start order.
    pub container_only_services: Vec<ResolvedEntry>,
    /// Ids of `native_services`.
    pub native_ids: BTreeSet<String>,
}

impl Partition {
    /// Returns `true` if at least one service runs on the host.
    #[must_use]
    pub fn has_native(&self) -> bool {
        !self.native_ids.is_empty()
    }

    /// Reduces `graph` to the container-only half.
    #[must_use]
    pub fn container_graph(&self, graph: &ResolvedGraph) -> ResolvedGraph {
        let ids: Vec<&str> = self
            .container_only_services
            .iter()
            .map(ResolvedEntry::id)
            .collect();
        graph.reduce_to(&ids)
    }
}

/// Partitions a valid graph for a target platform.
///
/// # Errors
///
/// Returns [`StackforgeError::InvalidGraph`] if the graph carries errors.
pub fn partition(graph: &ResolvedGraph, platform: Platform) -> Result<Partition> {
    if !graph.is_valid() {
        return Err(StackforgeError::InvalidGraph);
    }
    let family = platform.native_family();
    let (native_services, container_only_services): (Vec<_>, Vec<_>) = graph
        .services()
        .iter()
        .cloned()
        .partition(|e| e.descriptor.native_recipe(family).is_some());
    let native_ids: BTreeSet<String> = native_services
        .iter()
        .map(|e| e.id().to_string())
        .collect();
    tracing::info!(
        %platform,
        native = native_services.len(),
        containerized = container_only_services.len(),
        "partitioned services for bare metal"
    );
    Ok(Partition {
        native_services,
        container_only_services,
        native_ids,
    })
}

#[cfg(test)]
mod tests {
    use stackforge_catalog::Catalog;

    use super::*;
    use crate::resolver::{ResolveRequest, resolve};

    fn builtin() -> &'static Catalog {
        Catalog::builtin().expect("builtin catalog")
    }

    #[test]
    fn service_with_matching_recipe_goes_native() {
        let graph = resolve(builtin(), &ResolveRequest::with_services(&["redis", "n8n"]));
        let split = partition(&graph, Platform::LinuxAmd64).expect("partition");
        assert_eq!(split.native_ids.iter().collect::<Vec<_>>(), vec!["redis"]);
        let containerized: Vec<&str> = split
            .container_only_services
            .iter()
            .map(ResolvedEntry::id)
            .collect();
        assert_eq!(containerized, vec!["postgresql", "n8n"]);
        assert!(split.has_native());

        let reduced = split.container_graph(&graph);
        assert!(!reduced.contains("redis"));
        assert_eq!(reduced.ids(), vec!["postgresql", "n8n"]);
    }

    #[test]
    fn recipe_for_another_family_stays_in_containers() {
        let graph = resolve(builtin(), &ResolveRequest::with_services(&["redis"]));
        let split = partition(&graph, Platform::WindowsAmd64).expect("partition");
        assert!(!split.has_native());
        assert_eq!(split.container_only_services.len(), 1);
    }

    #[test]
    fn invalid_graph_is_refused() {
        let graph = resolve(builtin(), &ResolveRequest::with_services(&["redis", "valkey"]));
        let err = partition(&graph, Platform::LinuxAmd64).unwrap_err();
        assert!(matches!(err, StackforgeError::InvalidGraph));
    }
}

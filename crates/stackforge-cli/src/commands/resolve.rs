//! `stackforge resolve` — Print the ordered plan for a selection.

use std::collections::BTreeSet;

use clap::Args;
use serde::Serialize;
use stackforge_catalog::Catalog;
use stackforge_common::constants::DEFAULT_SERVICE_MEMORY_MB;
use stackforge_common::diagnostic::{Diagnostic, messages};
use stackforge_common::error::StackforgeError;
use stackforge_common::types::DeploymentType;
use stackforge_compose::{ResolveRequest, ResolvedGraph, check_compatibility, partition, resolve};

use super::request::RequestArgs;
use crate::output;

/// Arguments for the `resolve` command.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Request flags.
    #[command(flatten)]
    pub request: RequestArgs,

    /// Print the plan as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ResolveOutput<'a> {
    #[serde(flatten)]
    graph: &'a ResolvedGraph,
    compatibility: &'a [Diagnostic],
    native_services: &'a BTreeSet<String>,
}

/// Executes the `resolve` command.
///
/// Prints services in start order with their provenance, the dependencies
/// that were added, every warning, and the memory estimate. Resolution
/// errors are printed too, and then returned.
///
/// # Errors
///
/// Returns an error if the request is invalid or resolution reports errors.
pub fn execute(args: ResolveArgs, catalog: &Catalog) -> anyhow::Result<()> {
    let config = args.request.to_config(catalog)?;
    let graph = resolve(catalog, &ResolveRequest::from_config(&config));
    let compatibility = check_compatibility(&graph);
    let native_services = if graph.is_valid() && config.deployment_type == DeploymentType::BareMetal
    {
        partition(&graph, config.platform)?.native_ids
    } else {
        BTreeSet::new()
    };

    if args.json {
        output::print_json(&ResolveOutput {
            graph: &graph,
            compatibility: &compatibility,
            native_services: &native_services,
        })?;
    } else {
        print_plan(&config.project_name, &graph, &compatibility, &native_services);
    }

    if !graph.is_valid() {
        anyhow::bail!(StackforgeError::InvalidConfiguration {
            messages: messages(graph.errors()),
        });
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_plan(
    project: &str,
    graph: &ResolvedGraph,
    compatibility: &[Diagnostic],
    native: &BTreeSet<String>,
) {
    println!("{}", output::heading(&format!("Resolution Plan for: {project}")));
    println!();

    let rows: Vec<Vec<String>> = graph
        .services()
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let def = &entry.descriptor;
            let runs = if native.contains(&def.id) { "native" } else { "container" };
            vec![
                (i + 1).to_string(),
                def.id.clone(),
                entry.provenance.to_string(),
                runs.to_string(),
                output::format_megabytes(def.min_memory_mb.unwrap_or(DEFAULT_SERVICE_MEMORY_MB)),
                def.image_reference(),
            ]
        })
        .collect();
    output::print_table(&["#", "SERVICE", "SOURCE", "RUNS", "MEMORY", "IMAGE"], &rows);

    if !graph.added_dependencies().is_empty() {
        println!();
        println!("  Added dependencies:");
        for dep in graph.added_dependencies() {
            println!("    + {} ({})", dep.service, dep.reason);
        }
    }

    let warnings: Vec<&Diagnostic> = graph.warnings().iter().chain(compatibility).collect();
    if !warnings.is_empty() {
        println!();
        println!("  Warnings:");
        for w in warnings {
            println!("{}", output::diagnostic_line("!", w));
        }
    }
    if !graph.errors().is_empty() {
        println!();
        println!("  Errors:");
        for e in graph.errors() {
            println!("{}", output::diagnostic_line("x", e));
        }
    }

    println!();
    println!(
        "  {} service(s), estimated memory {}.",
        graph.services().len(),
        output::format_megabytes(graph.estimated_memory_mb())
    );
}

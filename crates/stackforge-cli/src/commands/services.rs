//! `stackforge services` — List catalog services.

use clap::Args;
use stackforge_catalog::{Catalog, ServiceCategory, ServiceDescriptor};
use stackforge_common::constants::DEFAULT_SERVICE_MEMORY_MB;

use crate::output;

/// Arguments for the `services` command.
#[derive(Args, Debug)]
pub struct ServicesArgs {
    /// Only services in this category, e.g. vector-db.
    #[arg(long)]
    pub category: Option<ServiceCategory>,

    /// Only services carrying this tag.
    #[arg(long)]
    pub tag: Option<String>,

    /// Print full descriptors as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `services` command.
///
/// # Errors
///
/// Returns an error if JSON output fails.
pub fn execute(args: ServicesArgs, catalog: &Catalog) -> anyhow::Result<()> {
    let selected = select(&args, catalog);
    tracing::debug!(count = selected.len(), "listing services");
    if args.json {
        return output::print_json(&selected);
    }
    let rows: Vec<Vec<String>> = selected
        .iter()
        .map(|s| {
            vec![
                s.id.clone(),
                s.category.to_string(),
                output::format_megabytes(s.min_memory_mb.unwrap_or(DEFAULT_SERVICE_MEMORY_MB)),
                s.image_reference(),
            ]
        })
        .collect();
    output::print_table(&["ID", "CATEGORY", "MEMORY", "IMAGE"], &rows);
    Ok(())
}

fn select<'a>(args: &ServicesArgs, catalog: &'a Catalog) -> Vec<&'a ServiceDescriptor> {
    catalog
        .services()
        .iter()
        .filter(|s| args.category.is_none_or(|c| s.category == c))
        .filter(|s| {
            args.tag
                .as_deref()
                .is_none_or(|tag| s.tags.iter().any(|t| t == tag))
        })
        .collect()
}

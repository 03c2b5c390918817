//! `stackforge packs` — List skill packs.

use clap::Args;
use stackforge_catalog::Catalog;

use crate::output;

/// Arguments for the `packs` command.
#[derive(Args, Debug)]
pub struct PacksArgs {
    /// Print packs as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `packs` command.
///
/// # Errors
///
/// Returns an error if JSON output fails.
pub fn execute(args: PacksArgs, catalog: &Catalog) -> anyhow::Result<()> {
    if args.json {
        return output::print_json(catalog.skill_packs());
    }
    let rows: Vec<Vec<String>> = catalog
        .skill_packs()
        .iter()
        .map(|p| vec![p.id.clone(), p.name.clone(), p.required_services.join(", ")])
        .collect();
    output::print_table(&["ID", "NAME", "REQUIRES"], &rows);
    Ok(())
}

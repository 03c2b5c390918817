//! `stackforge presets` — List presets.

use clap::Args;
use stackforge_catalog::Catalog;

use crate::output;

/// Arguments for the `presets` command.
#[derive(Args, Debug)]
pub struct PresetsArgs {
    /// Print presets as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `presets` command.
///
/// # Errors
///
/// Returns an error if JSON output fails.
pub fn execute(args: PresetsArgs, catalog: &Catalog) -> anyhow::Result<()> {
    if args.json {
        return output::print_json(catalog.presets());
    }
    let rows: Vec<Vec<String>> = catalog
        .presets()
        .iter()
        .map(|p| {
            let mut selection = p.services.join(", ");
            if !p.skill_packs.is_empty() {
                selection.push_str(&format!(" + packs: {}", p.skill_packs.join(", ")));
            }
            vec![p.id.clone(), p.name.clone(), selection]
        })
        .collect();
    output::print_table(&["ID", "NAME", "SELECTION"], &rows);
    Ok(())
}

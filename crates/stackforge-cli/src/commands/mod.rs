//! CLI command definitions and dispatch.

pub mod generate;
pub mod packs;
pub mod presets;
pub mod request;
pub mod resolve;
pub mod services;
pub mod validate;

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use stackforge_catalog::Catalog;

/// Stackforge — Resolve companion services and generate compose bundles.
#[derive(Parser, Debug)]
#[command(name = "stackforge", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Load the catalog from this directory instead of the built-in one.
    #[arg(long, global = true, env = "STACKFORGE_CATALOG_DIR")]
    pub catalog_dir: Option<PathBuf>,

    /// Log output format. Filtering follows `RUST_LOG`.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a selection and print the ordered plan.
    Resolve(resolve::ResolveArgs),
    /// Generate a deployment bundle into a directory.
    Generate(generate::GenerateArgs),
    /// Re-validate a bundle already on disk.
    Validate(validate::ValidateArgs),
    /// List catalog services.
    Services(services::ServicesArgs),
    /// List skill packs.
    Packs(packs::PacksArgs),
    /// List presets.
    Presets(presets::PresetsArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or the command fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let catalog = load_catalog(cli.catalog_dir.as_deref())?;
    match cli.command {
        Command::Resolve(args) => resolve::execute(args, &catalog),
        Command::Generate(args) => generate::execute(args, &catalog),
        Command::Validate(args) => validate::execute(args, &catalog),
        Command::Services(args) => services::execute(args, &catalog),
        Command::Packs(args) => packs::execute(args, &catalog),
        Command::Presets(args) => presets::execute(args, &catalog),
    }
}

fn load_catalog(dir: Option<&Path>) -> anyhow::Result<Cow<'static, Catalog>> {
    match dir {
        Some(dir) => Ok(Cow::Owned(Catalog::from_dir(dir)?)),
        None => Ok(Cow::Borrowed(Catalog::builtin()?)),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["stackforge", "packs", "--log-format", "json"])
            .expect("parse");
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(matches!(cli.command, Command::Packs(_)));
    }
}

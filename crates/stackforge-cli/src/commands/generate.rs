//! `stackforge generate` — Write a deployment bundle to disk.

use std::path::PathBuf;

use clap::Args;
use stackforge_catalog::Catalog;
use stackforge_sdk::Bundle;

use super::request::RequestArgs;
use crate::output;

/// Arguments for the `generate` command.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Request flags.
    #[command(flatten)]
    pub request: RequestArgs,

    /// Directory the bundle is written to.
    #[arg(short, long, default_value = ".", env = "STACKFORGE_OUTPUT")]
    pub output: PathBuf,

    /// Print bundle metadata and warnings as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `generate` command.
///
/// # Errors
///
/// Returns an error if the request does not resolve, the assembled bundle
/// fails validation, or a file cannot be written.
pub fn execute(args: GenerateArgs, catalog: &Catalog) -> anyhow::Result<()> {
    let config = args.request.to_config(catalog)?;
    let bundle = stackforge_sdk::generate(catalog, &config)?;
    bundle.write_to(&args.output)?;

    if args.json {
        output::print_json(&serde_json::json!({
            "output": args.output,
            "files": bundle.files.keys().collect::<Vec<_>>(),
            "metadata": bundle.metadata,
            "warnings": bundle.warnings,
        }))?;
    } else {
        print_summary(&args.output, &bundle);
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_summary(dir: &std::path::Path, bundle: &Bundle) {
    println!("Generated bundle in {}", dir.display());
    for path in bundle.files.keys() {
        println!("  + {path}");
    }
    if !bundle.warnings.is_empty() {
        println!();
        println!("  Warnings:");
        for w in &bundle.warnings {
            println!("{}", output::diagnostic_line("!", w));
        }
    }
    println!();
    println!(
        "  {} service(s), estimated memory {}.",
        bundle.metadata.service_count,
        output::format_megabytes(bundle.metadata.estimated_memory_mb)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_bundle_to_output_dir() {
        let catalog = Catalog::builtin().expect("builtin catalog");
        let dir = tempfile::tempdir().expect("tempdir");
        let args = GenerateArgs {
            request: RequestArgs {
                services: vec!["redis".into()],
                ..RequestArgs::default()
            },
            output: dir.path().join("out"),
            json: true,
        };
        execute(args, catalog).expect("generate");
        assert!(dir.path().join("out/docker-compose.yml").is_file());
        assert!(dir.path().join("out/.env").is_file());
    }
}

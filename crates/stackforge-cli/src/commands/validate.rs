//! `stackforge validate` — Re-validate a bundle already on disk.

use std::path::PathBuf;

use clap::Args;
use stackforge_catalog::Catalog;
use stackforge_common::diagnostic::messages;
use stackforge_common::error::StackforgeError;
use stackforge_compose::ValidationReport;
use stackforge_sdk::generate::validate_bundle;

use super::request::RequestArgs;
use crate::output;

/// Arguments for the `validate` command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Bundle directory holding the primary compose file.
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Request flags the bundle was generated from.
    #[command(flatten)]
    pub request: RequestArgs,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `validate` command.
///
/// Resolves the request again and checks the graph and the primary compose
/// file found in `dir`.
///
/// # Errors
///
/// Returns an error if the request does not resolve, the primary file is
/// missing, or validation reports errors.
pub fn execute(args: ValidateArgs, catalog: &Catalog) -> anyhow::Result<()> {
    let config = args.request.to_config(catalog)?;
    let report = validate_bundle(catalog, &config, &args.dir)?;
    if args.json {
        output::print_json(&report)?;
    } else {
        print_report(&report);
    }
    if !report.valid {
        anyhow::bail!(StackforgeError::ValidationFailed {
            messages: messages(&report.errors),
        });
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_report(report: &ValidationReport) {
    for e in &report.errors {
        println!("{}", output::diagnostic_line("x", e));
    }
    for w in &report.warnings {
        println!("{}", output::diagnostic_line("!", w));
    }
    if report.valid {
        println!(
            "Bundle is valid ({} warning(s)).",
            report.warnings.len()
        );
    } else {
        println!("Bundle is invalid ({} error(s)).", report.errors.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RequestArgs {
        RequestArgs {
            services: vec!["n8n".into()],
            ..RequestArgs::default()
        }
    }

    #[test]
    fn freshly_generated_bundle_validates() {
        let catalog = Catalog::builtin().expect("builtin catalog");
        let dir = tempfile::tempdir().expect("tempdir");
        let config = request().to_config(catalog).expect("config");
        stackforge_sdk::generate(catalog, &config)
            .expect("generate")
            .write_to(dir.path())
            .expect("write");
        let args = ValidateArgs {
            dir: dir.path().to_path_buf(),
            request: request(),
            json: true,
        };
        execute(args, catalog).expect("validate");
    }

    #[test]
    fn missing_bundle_is_an_error() {
        let catalog = Catalog::builtin().expect("builtin catalog");
        let dir = tempfile::tempdir().expect("tempdir");
        let args = ValidateArgs {
            dir: dir.path().join("absent"),
            request: request(),
            json: true,
        };
        assert!(execute(args, catalog).is_err());
    }
}

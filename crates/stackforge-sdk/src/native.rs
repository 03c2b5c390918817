//! Native install scripts for bare-metal deployments.
//!
//! Each script sources `.env` from the project root, writes recipe config
//! files, runs install steps and finally the start commands, in the same
//! order the services were resolved.

use indexmap::IndexMap;
use stackforge_catalog::descriptor::NativeRecipe;
use stackforge_common::types::NativePlatform;
use stackforge_compose::resolver::ResolvedEntry;

const BASH_PREAMBLE: [&str; 6] = [
    "SCRIPT_DIR=\"$(cd \"$(dirname \"${BASH_SOURCE[0]}\")\" && pwd)\"",
    "PROJECT_DIR=\"$(dirname \"$SCRIPT_DIR\")\"",
    "cd \"$PROJECT_DIR\"",
    "",
    "if [ -f .env ]; then set -a; source .env; set +a; fi",
    "",
];

const POWERSHELL_PREAMBLE: [&str; 6] = [
    "$ErrorActionPreference = 'Stop'",
    "$ProjectDir = (Get-Item $PSScriptRoot).Parent.FullName",
    "Set-Location $ProjectDir",
    "",
    "if (Test-Path .env) { Get-Content .env | ForEach-Object { if ($_ -match '^([^#=]+)=(.*)$') { [System.Environment]::SetEnvironmentVariable($matches[1].Trim(), $matches[2].Trim(), 'Process') } } }",
    "",
];

/// Path of the install script for an OS family, relative to the bundle root.
#[must_use]
pub const fn script_path(family: NativePlatform) -> &'static str {
    match family {
        NativePlatform::Linux => "native/install-linux.sh",
        NativePlatform::Macos => "native/install-macos.sh",
        NativePlatform::Windows => "native/install-windows.ps1",
    }
}

/// Renders the install script for the native half of a partition.
///
/// Services without a recipe for `family` are skipped.
#[must_use]
pub fn render_install_scripts(
    services: &[ResolvedEntry],
    family: NativePlatform,
) -> IndexMap<String, String> {
    let recipes: Vec<(&ResolvedEntry, &NativeRecipe)> = services
        .iter()
        .filter_map(|e| e.descriptor.native_recipe(family).map(|r| (e, r)))
        .collect();
    let script = match family {
        NativePlatform::Linux | NativePlatform::Macos => bash_script(&recipes, family),
        NativePlatform::Windows => powershell_script(&recipes),
    };
    tracing::debug!(%family, services = recipes.len(), "rendered native install script");
    IndexMap::from([(script_path(family).to_string(), script)])
}

fn bash_script(recipes: &[(&ResolvedEntry, &NativeRecipe)], family: NativePlatform) -> String {
    let mut lines = vec![
        "#!/usr/bin/env bash".to_string(),
        "set -euo pipefail".to_string(),
        format!("# OpenClaw native services: install and start ({family}). Run from project root."),
        String::new(),
    ];
    lines.extend(BASH_PREAMBLE.iter().map(ToString::to_string));
    for (entry, recipe) in recipes {
        let id = entry.id();
        lines.push(format!("# --- {} ---", entry.descriptor.name));
        lines.push(String::new());
        if let (Some(path), Some(template)) = (&recipe.config_path, &recipe.config_template) {
            let delimiter = format!("ENDOF_{}_CONF", id.to_uppercase().replace('-', "_"));
            lines.push(format!("# Write config for {id}"));
            lines.push(format!(
                "sudo mkdir -p \"$(dirname \"{path}\")\" 2>/dev/null || true"
            ));
            lines.push(format!("sudo tee \"{path}\" > /dev/null << {delimiter}"));
            lines.push(template.trim().to_string());
            lines.push(delimiter);
            lines.push(String::new());
        }
        for step in &recipe.install_steps {
            lines.push(format!("# Install: {id}"));
            lines.push(step.clone());
            lines.push(String::new());
        }
        lines.push(format!("# Start: {id}"));
        lines.push(recipe.start_command.clone());
        lines.push(String::new());
    }
    lines.push("echo 'Native services started.'".to_string());
    lines.join("\n")
}

fn powershell_script(recipes: &[(&ResolvedEntry, &NativeRecipe)]) -> String {
    let mut lines = vec![
        "# OpenClaw native services: install and start (windows). Run from project root."
            .to_string(),
    ];
    lines.extend(POWERSHELL_PREAMBLE.iter().map(ToString::to_string));
    for (entry, recipe) in recipes {
        lines.push(format!("# {}", entry.descriptor.name));
        for step in &recipe.install_steps {
            lines.push(format!("Invoke-Expression \"{}\"", step.replace('"', "`\"")));
        }
        lines.push(recipe.start_command.clone());
        lines.push(String::new());
    }
    lines.push("Write-Host 'Native services started.'".to_string());
    lines.join("\n")
}

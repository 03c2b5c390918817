//! Environment file rendering.
//!
//! Produces `.env.example` (placeholders for every secret) and `.env`
//! (generated secrets when enabled) from a resolved graph. Keys are emitted
//! once: the first service to declare a key owns it. Per-service database
//! passwords come before the service sections, so references such as
//! `${N8N_DB_PASSWORD}` resolve against an earlier line.

use std::collections::{BTreeSet, HashSet};
use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use stackforge_catalog::descriptor::EnvVar;
use stackforge_common::constants::{DEFAULT_GATEWAY_VERSION, HOST_GATEWAY_ALIAS};
use stackforge_compose::{ResolvedGraph, database_requirements};
use uuid::Uuid;

const CORE_SECTION: &str = "OpenClaw Core";
const SECRET_LEN: usize = 48;

/// Inputs to env rendering that do not come from the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvOptions {
    /// Fill secrets in `.env` with random values.
    pub generate_secrets: bool,
    /// Public domain, emitted as `OPENCLAW_DOMAIN` when set.
    pub domain: Option<String>,
    /// Gateway image tag.
    pub gateway_version: String,
    /// Services that run on the host. Their `*_HOST` variables point at the
    /// host alias so the containerized gateway can reach them.
    pub native_service_ids: BTreeSet<String>,
    /// Timestamp written into the header.
    pub generated_at: DateTime<Utc>,
}

impl Default for EnvOptions {
    fn default() -> Self {
        Self {
            generate_secrets: true,
            domain: None,
            gateway_version: DEFAULT_GATEWAY_VERSION.to_string(),
            native_service_ids: BTreeSet::new(),
            generated_at: Utc::now(),
        }
    }
}

/// The two rendered env files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvFiles {
    /// Contents of `.env.example`.
    pub example: String,
    /// Contents of `.env`.
    pub actual: String,
}

enum EnvLine {
    Section(String),
    Var {
        comment: String,
        key: String,
        example: String,
        actual: String,
    },
}

/// Returns a random 48-character hex secret.
#[must_use]
pub fn generate_secret() -> String {
    let mut secret = format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    );
    secret.truncate(SECRET_LEN);
    secret
}

/// Renders `.env.example` and `.env` for a resolved graph.
#[must_use]
pub fn render_env_files(graph: &ResolvedGraph, options: &EnvOptions) -> EnvFiles {
    let mut lines = core_lines(options);
    let mut seen: HashSet<String> = lines
        .iter()
        .filter_map(|line| match line {
            EnvLine::Var { key, .. } => Some(key.clone()),
            EnvLine::Section(_) => None,
        })
        .collect();

    let databases = database_requirements(graph);
    if !databases.is_empty() {
        lines.push(EnvLine::Section(section_banner("Per-Service Database Passwords")));
    }
    for db in &databases {
        if !seen.insert(db.password_var.clone()) {
            continue;
        }
        lines.push(EnvLine::Var {
            comment: comment(
                &format!(
                    "PostgreSQL password for {} (database: {}, user: {})",
                    db.service_name, db.database, db.user
                ),
                &db.service_name,
                true,
                true,
            ),
            key: db.password_var.clone(),
            example: placeholder(&db.password_var),
            actual: secret_value(options),
        });
    }

    for entry in graph.services() {
        let def = &entry.descriptor;
        let vars: Vec<&EnvVar> = def.environment.iter().chain(&def.gateway_env).collect();
        if vars.is_empty() {
            continue;
        }
        lines.push(EnvLine::Section(section_banner(&def.name)));
        let native = options.native_service_ids.contains(&def.id);
        for var in vars {
            if !seen.insert(var.key.clone()) {
                continue;
            }
            let host_override = native && var.key.ends_with("_HOST");
            let (example, actual) = if host_override {
                (HOST_GATEWAY_ALIAS.to_string(), HOST_GATEWAY_ALIAS.to_string())
            } else if var.secret {
                let actual = if var.default_value.starts_with("${") {
                    var.default_value.clone()
                } else {
                    secret_value(options)
                };
                (placeholder(&var.key), actual)
            } else {
                (var.default_value.clone(), var.default_value.clone())
            };
            lines.push(EnvLine::Var {
                comment: comment(&var.description, &def.name, var.required, var.secret),
                key: var.key.clone(),
                example,
                actual,
            });
        }
    }

    let header = header(options.generated_at);
    let mut example = header.clone();
    let mut actual = header;
    for line in &lines {
        match line {
            EnvLine::Section(banner) => {
                let _ = writeln!(example, "{banner}");
                let _ = writeln!(actual, "{banner}");
            }
            EnvLine::Var {
                comment,
                key,
                example: example_value,
                actual: actual_value,
            } => {
                let _ = write!(example, "{comment}\n{key}={example_value}\n\n");
                let _ = write!(actual, "{comment}\n{key}={actual_value}\n\n");
            }
        }
    }
    tracing::debug!(
        keys = seen.len(),
        secrets = options.generate_secrets,
        "rendered env files"
    );
    EnvFiles { example, actual }
}

fn core_lines(options: &EnvOptions) -> Vec<EnvLine> {
    let version = options.gateway_version.as_str();
    let token = secret_value(options);
    let mut lines = vec![
        core_var("OpenClaw version to deploy", "OPENCLAW_VERSION", true, false, version, version),
        core_var(
            "Authentication token for the OpenClaw gateway API",
            "OPENCLAW_GATEWAY_TOKEN",
            true,
            true,
            "your_gateway_token_here",
            &token,
        ),
        core_var(
            "Port the OpenClaw gateway listens on",
            "OPENCLAW_GATEWAY_PORT",
            true,
            false,
            "18789",
            "18789",
        ),
        core_var(
            "Port for the OpenClaw ACP bridge (WebSocket)",
            "OPENCLAW_BRIDGE_PORT",
            false,
            false,
            "18790",
            "18790",
        ),
        core_var(
            "Gateway network bind mode (lan for Docker networking, loopback for local-only)",
            "OPENCLAW_GATEWAY_BIND",
            false,
            false,
            "lan",
            "lan",
        ),
        core_var(
            "Host path to OpenClaw configuration directory",
            "OPENCLAW_CONFIG_DIR",
            true,
            false,
            "./openclaw/config",
            "./openclaw/config",
        ),
        core_var(
            "Host path to OpenClaw workspace directory",
            "OPENCLAW_WORKSPACE_DIR",
            true,
            false,
            "./openclaw/workspace",
            "./openclaw/workspace",
        ),
        core_var(
            "OpenClaw Docker image override (default uses ghcr.io/openclaw/openclaw)",
            "OPENCLAW_IMAGE",
            false,
            false,
            "",
            "",
        ),
    ];
    if let Some(domain) = options.domain.as_deref().filter(|d| !d.is_empty()) {
        lines.push(core_var(
            "Primary domain for service routing",
            "OPENCLAW_DOMAIN",
            false,
            false,
            "example.com",
            domain,
        ));
    }
    lines
}

fn core_var(
    description: &str,
    key: &str,
    required: bool,
    secret: bool,
    example: &str,
    actual: &str,
) -> EnvLine {
    EnvLine::Var {
        comment: comment(description, CORE_SECTION, required, secret),
        key: key.to_string(),
        example: example.to_string(),
        actual: actual.to_string(),
    }
}

fn secret_value(options: &EnvOptions) -> String {
    if options.generate_secrets {
        generate_secret()
    } else {
        String::new()
    }
}

fn placeholder(key: &str) -> String {
    format!("your_{}_here", key.to_lowercase())
}

fn rule() -> String {
    format!("# {}", "\u{2550}".repeat(79))
}

fn section_banner(title: &str) -> String {
    let rule = rule();
    format!("\n{rule}\n# {title}\n{rule}")
}

fn header(generated_at: DateTime<Utc>) -> String {
    let rule = rule();
    format!(
        "{rule}\n# OpenClaw Environment Configuration\n# Generated at {}\n{rule}\n",
        generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

fn comment(description: &str, service: &str, required: bool, secret: bool) -> String {
    let yes_no = |flag: bool| if flag { "Yes" } else { "No" };
    format!(
        "# {description}\n# Service: {service} | Required: {} | Secret: {}",
        yes_no(required),
        yes_no(secret)
    )
}

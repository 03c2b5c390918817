//! End-to-end tests for bundle generation.
//!
//! These tests drive the whole pipeline through the public SDK:
//! 1. Build or load a request
//! 2. Resolve against the built-in catalog
//! 3. Partition for bare metal
//! 4. Assemble compose files
//! 5. Validate and render env files and scripts
//! 6. Write the bundle and re-validate it from disk

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use stackforge_catalog::Catalog;
use stackforge_common::config::StackConfig;
use stackforge_common::constants::{GATEWAY_CLI_SERVICE, GATEWAY_SERVICE, PRIMARY_COMPOSE_FILE};
use stackforge_common::error::StackforgeError;
use stackforge_common::types::{DeploymentType, Platform};
use stackforge_compose::manifest::ComposeDocument;
use stackforge_sdk::builder::StackRequestBuilder;
use stackforge_sdk::generate::{generate, generate_at, validate_bundle};

fn builtin() -> &'static Catalog {
    Catalog::builtin().expect("builtin catalog")
}

fn fixed_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
        .expect("timestamp")
        .with_timezone(&Utc)
}

fn compose_documents(bundle: &stackforge_sdk::Bundle) -> Vec<(String, ComposeDocument)> {
    bundle
        .files
        .iter()
        .filter(|(path, _)| {
            path.starts_with("docker-compose.") && path.as_str() != "docker-compose.override.yml"
        })
        .map(|(path, text)| {
            let doc = ComposeDocument::from_yaml(text)
                .unwrap_or_else(|e| panic!("{path} does not parse: {e}"));
            (path.clone(), doc)
        })
        .collect()
}

// ── Presets and skill packs ─────────────────────────────────────────

#[test]
fn pipeline_researcher_preset_generates_parseable_bundle() {
    let preset = builtin().require_preset("researcher").expect("preset");
    let config = StackRequestBuilder::new("research-lab")
        .preset(preset)
        .build()
        .expect("config");
    let bundle = generate(builtin(), &config).expect("generate");

    let docs = compose_documents(&bundle);
    let (_, primary) = docs
        .iter()
        .find(|(path, _)| path == PRIMARY_COMPOSE_FILE)
        .expect("primary file");
    assert_eq!(primary.name.as_deref(), Some("research-lab"));
    assert!(primary.services.contains_key(GATEWAY_SERVICE));
    assert_eq!(
        primary.services.keys().last().map(String::as_str),
        Some(GATEWAY_CLI_SERVICE)
    );

    let mut seen = BTreeSet::new();
    for (_, doc) in &docs {
        for name in doc.services.keys() {
            assert!(seen.insert(name.clone()), "{name} emitted twice");
        }
    }
    for id in ["qdrant", "searxng", "browserless", "redis", "caddy", "postgresql"] {
        assert!(seen.contains(id), "missing {id}");
    }
    assert_eq!(bundle.metadata.service_count, 6);
}

#[test]
fn pipeline_skill_pack_pulls_required_services() {
    let config = StackRequestBuilder::new("packs")
        .skill_pack("research-agent")
        .build()
        .expect("config");
    let bundle = generate(builtin(), &config).expect("generate");
    let names: BTreeSet<String> = compose_documents(&bundle)
        .into_iter()
        .flat_map(|(_, doc)| doc.services.into_keys())
        .collect();
    for id in ["qdrant", "searxng", "browserless"] {
        assert!(names.contains(id), "missing {id}");
    }
}

#[test]
fn pipeline_every_builtin_skill_pack_generates() {
    assert_eq!(builtin().skill_packs().len(), 30);
    for pack in builtin().skill_packs() {
        let config = StackRequestBuilder::new("pack-stack")
            .skill_pack(pack.id.clone())
            .build()
            .expect("config");
        let bundle = generate(builtin(), &config)
            .unwrap_or_else(|e| panic!("skill pack {} does not generate: {e}", pack.id));
        let names: BTreeSet<String> = compose_documents(&bundle)
            .into_iter()
            .flat_map(|(_, doc)| doc.services.into_keys())
            .collect();
        for id in &pack.required_services {
            assert!(names.contains(id), "{}: missing {id}", pack.id);
        }
    }
}

#[test]
fn pipeline_every_builtin_preset_generates() {
    assert_eq!(builtin().presets().len(), 11);
    for preset in builtin().presets() {
        let config = StackRequestBuilder::new("preset-stack")
            .preset(preset)
            .build()
            .expect("config");
        let bundle = generate(builtin(), &config)
            .unwrap_or_else(|e| panic!("preset {} does not generate: {e}", preset.id));
        assert!(
            bundle.file(PRIMARY_COMPOSE_FILE).is_some(),
            "{}: no primary file",
            preset.id
        );
        assert!(!compose_documents(&bundle).is_empty());
    }
}

#[test]
fn pipeline_monitoring_lands_in_profile_file() {
    let config = StackRequestBuilder::new("watched")
        .service("redis")
        .monitoring(true)
        .build()
        .expect("config");
    let bundle = generate(builtin(), &config).expect("generate");
    let text = bundle
        .file("docker-compose.monitoring.yml")
        .expect("monitoring profile file");
    let doc = ComposeDocument::from_yaml(text).expect("parse");
    for id in ["uptime-kuma", "grafana", "prometheus"] {
        let service = doc.services.get(id).expect(id);
        assert_eq!(service.profiles, vec!["monitoring"]);
    }
    let primary = ComposeDocument::from_yaml(bundle.file(PRIMARY_COMPOSE_FILE).expect("primary"))
        .expect("parse primary");
    assert!(primary.services.contains_key("redis"));
    assert!(!primary.services.contains_key("grafana"));
}

// ── Failures ────────────────────────────────────────────────────────

#[test]
fn pipeline_unknown_service_is_reported() {
    let config = StackRequestBuilder::new("broken")
        .service("does-not-exist")
        .build()
        .expect("config");
    let err = generate(builtin(), &config).unwrap_err();
    let message = err.to_string();
    assert!(
        matches!(err, StackforgeError::InvalidConfiguration { .. }),
        "got: {message}"
    );
    assert!(
        message.contains("Unknown service: \"does-not-exist\""),
        "got: {message}"
    );
}

#[test]
fn pipeline_conflict_is_reported() {
    let config = StackRequestBuilder::new("broken")
        .services(["caddy", "traefik"])
        .build()
        .expect("config");
    let err = generate(builtin(), &config).unwrap_err();
    assert!(
        err.to_string().contains("cannot be used together"),
        "got: {err}"
    );
}

// ── Determinism and bare metal ──────────────────────────────────────

#[test]
fn pipeline_is_deterministic_without_secrets() {
    let config = StackRequestBuilder::new("stable")
        .services(["n8n", "redis", "qdrant"])
        .monitoring(true)
        .generate_secrets(false)
        .build()
        .expect("config");
    let first = generate_at(builtin(), &config, fixed_time()).expect("first");
    let second = generate_at(builtin(), &config, fixed_time()).expect("second");
    assert_eq!(first, second);
}

#[test]
fn pipeline_bare_metal_linux_writes_install_script() {
    let config = StackRequestBuilder::new("metal")
        .services(["redis", "n8n"])
        .platform(Platform::LinuxAmd64)
        .deployment_type(DeploymentType::BareMetal)
        .build()
        .expect("config");
    let bundle = generate(builtin(), &config).expect("generate");
    let script = bundle.file("native/install-linux.sh").expect("script");
    assert!(script.contains("# Start: redis"));

    let primary = ComposeDocument::from_yaml(bundle.file(PRIMARY_COMPOSE_FILE).expect("primary"))
        .expect("parse");
    assert!(!primary.services.contains_key("redis"));
    assert!(primary.services.contains_key("n8n"));
    assert_eq!(
        primary.services[GATEWAY_SERVICE].extra_hosts,
        vec!["host.docker.internal:host-gateway"]
    );
}

#[test]
fn pipeline_bare_metal_windows_keeps_everything_in_containers() {
    let config = StackRequestBuilder::new("metal")
        .service("redis")
        .platform(Platform::WindowsAmd64)
        .deployment_type(DeploymentType::BareMetal)
        .build()
        .expect("config");
    let bundle = generate(builtin(), &config).expect("generate");
    assert!(!bundle.files.keys().any(|k| k.starts_with("native/")));
    let primary = ComposeDocument::from_yaml(bundle.file(PRIMARY_COMPOSE_FILE).expect("primary"))
        .expect("parse");
    assert!(primary.services.contains_key("redis"));
    assert!(primary.services[GATEWAY_SERVICE].extra_hosts.is_empty());
}

// ── Filesystem ──────────────────────────────────────────────────────

#[test]
fn pipeline_write_and_revalidate_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = dir.path().join("stack.yaml");
    std::fs::write(
        &config_path,
        "project_name: from-file\nservices: [n8n]\nskill_packs: [dev-ops]\nproxy: caddy\ndomain: stack.example.com\n",
    )
    .expect("write config");
    let config = StackConfig::from_path(&config_path).expect("load config");

    let bundle = generate(builtin(), &config).expect("generate");
    let out = dir.path().join("bundle");
    bundle.write_to(&out).expect("write bundle");
    for path in bundle.files.keys() {
        assert!(out.join(path).is_file(), "{path} not written");
    }
    let env = std::fs::read_to_string(out.join(".env")).expect("read .env");
    assert!(env.contains("OPENCLAW_DOMAIN=stack.example.com\n"));

    let report = validate_bundle(builtin(), &config, &out).expect("validate");
    assert!(report.valid, "errors: {:?}", report.errors);
}

#[test]
fn pipeline_revalidation_catches_a_broken_primary_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StackRequestBuilder::new("tampered")
        .service("redis")
        .build()
        .expect("config");
    generate(builtin(), &config)
        .expect("generate")
        .write_to(dir.path())
        .expect("write");
    std::fs::write(dir.path().join(PRIMARY_COMPOSE_FILE), "just: [unclosed").expect("tamper");
    let report = validate_bundle(builtin(), &config, dir.path()).expect("validate");
    assert!(!report.valid);
}

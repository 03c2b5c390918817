//! Catalog loading, validation, and lookups.
//!
//! The built-in catalog is compiled into the binary and parsed once per
//! process. Every constructor validates shape and id uniqueness eagerly,
//! so a malformed catalog fails at startup instead of mid-resolution.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;
use stackforge_common::error::{Result, StackforgeError};

use crate::descriptor::{ServiceCategory, ServiceDescriptor};
use crate::skill_pack::{Preset, SkillPack};

const SERVICES_YAML: &str = include_str!("../data/services.yaml");
const SKILL_PACKS_YAML: &str = include_str!("../data/skill_packs.yaml");
const PRESETS_YAML: &str = include_str!("../data/presets.yaml");

static BUILTIN: OnceLock<Catalog> = OnceLock::new();

/// Read-only lookup of service descriptors and skill packs.
///
/// The resolver depends only on this trait, so callers can substitute a
/// catalog assembled in code.
pub trait CatalogProvider {
    /// Looks up a service descriptor by id.
    fn service(&self, id: &str) -> Option<&ServiceDescriptor>;

    /// Looks up a skill pack by id.
    fn skill_pack(&self, id: &str) -> Option<&SkillPack>;
}

#[derive(Deserialize)]
struct ServicesFile {
    services: Vec<ServiceDescriptor>,
}

#[derive(Deserialize)]
struct SkillPacksFile {
    #[serde(default)]
    skill_packs: Vec<SkillPack>,
}

#[derive(Deserialize)]
struct PresetsFile {
    #[serde(default)]
    presets: Vec<Preset>,
}

/// An immutable, validated collection of services, skill packs, and presets.
#[derive(Debug, Clone)]
pub struct Catalog {
    services: Vec<ServiceDescriptor>,
    service_index: HashMap<String, usize>,
    skill_packs: Vec<SkillPack>,
    pack_index: HashMap<String, usize>,
    presets: Vec<Preset>,
}

impl Catalog {
    /// Returns the catalog embedded in the binary, parsing it on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded data fails to parse or validate.
    pub fn builtin() -> Result<&'static Self> {
        if let Some(catalog) = BUILTIN.get() {
            return Ok(catalog);
        }
        let catalog = Self::from_yaml(SERVICES_YAML, SKILL_PACKS_YAML, PRESETS_YAML)?;
        tracing::debug!(
            services = catalog.services.len(),
            skill_packs = catalog.skill_packs.len(),
            "built-in catalog loaded"
        );
        Ok(BUILTIN.get_or_init(|| catalog))
    }

    /// Parses a catalog from YAML documents.
    ///
    /// # Errors
    ///
    /// Returns [`StackforgeError::Yaml`] on malformed documents and the
    /// errors of [`Catalog::from_parts`] on invalid content.
    pub fn from_yaml(services: &str, skill_packs: &str, presets: &str) -> Result<Self> {
        let services: ServicesFile = serde_yaml::from_str(services)?;
        let skill_packs: SkillPacksFile = serde_yaml::from_str(skill_packs)?;
        let presets: PresetsFile = serde_yaml::from_str(presets)?;
        Self::from_parts(services.services, skill_packs.skill_packs, presets.presets)
    }

    /// Loads `services.yaml`, and optionally `skill_packs.yaml` and
    /// `presets.yaml`, from a directory.
    ///
    /// # Errors
    ///
    /// Returns an error if `services.yaml` is missing, or any present file
    /// fails to read, parse, or validate.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        tracing::info!(dir = %dir.display(), "loading catalog directory");
        let services = read(&dir.join("services.yaml"))?;
        let skill_packs = read_optional(&dir.join("skill_packs.yaml"), "skill_packs: []")?;
        let presets = read_optional(&dir.join("presets.yaml"), "presets: []")?;
        Self::from_yaml(&services, &skill_packs, &presets)
    }

    /// Builds a catalog from already-constructed records.
    ///
    /// # Errors
    ///
    /// Returns [`StackforgeError::DuplicateId`] when two records of the same
    /// kind share an id, and [`StackforgeError::Config`] when a record is
    /// malformed (bad id, empty image, port 0, zero retries, empty pack).
    pub fn from_parts(
        services: Vec<ServiceDescriptor>,
        skill_packs: Vec<SkillPack>,
        presets: Vec<Preset>,
    ) -> Result<Self> {
        let mut service_index = HashMap::with_capacity(services.len());
        for (i, service) in services.iter().enumerate() {
            check_service(service)?;
            if service_index.insert(service.id.clone(), i).is_some() {
                return Err(StackforgeError::DuplicateId {
                    kind: "service",
                    id: service.id.clone(),
                });
            }
        }

        let mut pack_index = HashMap::with_capacity(skill_packs.len());
        for (i, pack) in skill_packs.iter().enumerate() {
            check_id("skill pack", &pack.id)?;
            if pack.required_services.is_empty() {
                return Err(config_error(format!(
                    "skill pack \"{}\" must require at least one service",
                    pack.id
                )));
            }
            if pack_index.insert(pack.id.clone(), i).is_some() {
                return Err(StackforgeError::DuplicateId {
                    kind: "skill pack",
                    id: pack.id.clone(),
                });
            }
        }

        let mut preset_ids = std::collections::HashSet::with_capacity(presets.len());
        for preset in &presets {
            check_id("preset", &preset.id)?;
            if !preset_ids.insert(preset.id.as_str()) {
                return Err(StackforgeError::DuplicateId {
                    kind: "preset",
                    id: preset.id.clone(),
                });
            }
        }

        Ok(Self {
            services,
            service_index,
            skill_packs,
            pack_index,
            presets,
        })
    }

    /// All services, in catalog order.
    #[must_use]
    pub fn services(&self) -> &[ServiceDescriptor] {
        &self.services
    }

    /// Services in one category.
    pub fn services_by_category(
        &self,
        category: ServiceCategory,
    ) -> impl Iterator<Item = &ServiceDescriptor> {
        self.services.iter().filter(move |s| s.category == category)
    }

    /// Services carrying a tag.
    pub fn services_by_tag<'a>(
        &'a self,
        tag: &'a str,
    ) -> impl Iterator<Item = &'a ServiceDescriptor> {
        self.services
            .iter()
            .filter(move |s| s.tags.iter().any(|t| t == tag))
    }

    /// All skill packs, in catalog order.
    #[must_use]
    pub fn skill_packs(&self) -> &[SkillPack] {
        &self.skill_packs
    }

    /// All presets, in catalog order.
    #[must_use]
    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    /// Looks up a preset by id.
    #[must_use]
    pub fn preset(&self, id: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.id == id)
    }

    /// Looks up a preset, failing with [`StackforgeError::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns an error if no preset has this id.
    pub fn require_preset(&self, id: &str) -> Result<&Preset> {
        self.preset(id).ok_or_else(|| StackforgeError::NotFound {
            kind: "preset",
            id: id.to_string(),
        })
    }

    /// Skill packs whose required services are all in `service_ids`.
    #[must_use]
    pub fn compatible_skill_packs(&self, service_ids: &[&str]) -> Vec<&SkillPack> {
        self.skill_packs
            .iter()
            .filter(|p| p.is_satisfied_by(service_ids.iter().copied()))
            .collect()
    }
}

impl CatalogProvider for Catalog {
    fn service(&self, id: &str) -> Option<&ServiceDescriptor> {
        self.service_index.get(id).map(|&i| &self.services[i])
    }

    fn skill_pack(&self, id: &str) -> Option<&SkillPack> {
        self.pack_index.get(id).map(|&i| &self.skill_packs[i])
    }
}

fn check_service(service: &ServiceDescriptor) -> Result<()> {
    check_id("service", &service.id)?;
    if service.image.is_empty() || service.image_tag.is_empty() {
        return Err(config_error(format!(
            "service \"{}\" must declare an image and a tag",
            service.id
        )));
    }
    if let Some(port) = service.ports.iter().find(|p| p.host == 0 || p.container == 0) {
        return Err(config_error(format!(
            "service \"{}\" declares port {}:{} outside 1-65535",
            service.id, port.host, port.container
        )));
    }
    if service.healthcheck.as_ref().is_some_and(|h| h.retries == 0) {
        return Err(config_error(format!(
            "service \"{}\" health check needs at least one retry",
            service.id
        )));
    }
    Ok(())
}

fn check_id(kind: &str, id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(config_error(format!(
            "{kind} id \"{id}\" must match [a-z0-9-]+"
        )))
    }
}

const fn config_error(message: String) -> StackforgeError {
    StackforgeError::Config { message }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| StackforgeError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

fn read_optional(path: &Path, fallback: &str) -> Result<String> {
    if path.exists() {
        read(path)
    } else {
        Ok(fallback.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(id: &str) -> ServiceDescriptor {
        serde_yaml::from_str(&format!(
            "id: {id}\nname: {id}\ncategory: database\nimage: img\nimage_tag: '1'\n"
        ))
        .expect("descriptor")
    }

    fn pack(id: &str, required: &[&str]) -> SkillPack {
        SkillPack {
            id: id.into(),
            name: id.into(),
            description: String::new(),
            required_services: required.iter().map(|s| (*s).to_string()).collect(),
            skills: Vec::new(),
            tags: Vec::new(),
        }
    }

    #[test]
    fn builtin_catalog_loads() {
        let catalog = Catalog::builtin().expect("builtin catalog");
        assert_eq!(catalog.services().len(), 92);
        assert_eq!(catalog.skill_packs().len(), 30);
        assert_eq!(catalog.presets().len(), 11);
        for id in ["postgresql", "ghost", "nextcloud", "vaultwarden", "homeassistant"] {
            assert!(catalog.service(id).is_some(), "missing {id}");
        }
        assert!(catalog.skill_pack("research-agent").is_some());
        assert!(catalog.preset("minimal").is_some());
        assert!(catalog.preset("lasuite-meet").is_some());
    }

    #[test]
    fn builtin_references_resolve() {
        let catalog = Catalog::builtin().expect("builtin catalog");
        for s in catalog.services() {
            for target in s.requires.iter().chain(&s.depends_on).chain(&s.conflicts_with) {
                assert!(
                    catalog.service(target).is_some(),
                    "{} references unknown {target}",
                    s.id
                );
            }
        }
        for p in catalog.skill_packs() {
            for target in &p.required_services {
                assert!(catalog.service(target).is_some(), "{} needs {target}", p.id);
            }
        }
        for p in catalog.presets() {
            for target in &p.services {
                assert!(catalog.service(target).is_some(), "{} lists {target}", p.id);
            }
            for target in &p.skill_packs {
                assert!(catalog.skill_pack(target).is_some(), "{} lists {target}", p.id);
            }
        }
    }

    #[test]
    fn builtin_conflicts_are_symmetric() {
        let catalog = Catalog::builtin().expect("builtin catalog");
        let redis = catalog.service("redis").expect("redis");
        let valkey = catalog.service("valkey").expect("valkey");
        assert!(redis.conflicts_with.contains(&valkey.id));
        assert!(valkey.conflicts_with.contains(&redis.id));
    }

    #[test]
    fn builtin_research_pack_needs_three_services() {
        let catalog = Catalog::builtin().expect("builtin catalog");
        let pack = catalog.skill_pack("research-agent").expect("pack");
        assert_eq!(pack.required_services, vec!["qdrant", "searxng", "browserless"]);
    }

    #[test]
    fn duplicate_service_id_is_fatal() {
        let err = Catalog::from_parts(vec![service("a"), service("a")], Vec::new(), Vec::new())
            .unwrap_err();
        assert!(
            matches!(err, StackforgeError::DuplicateId { kind: "service", ref id } if id == "a"),
            "got: {err}"
        );
    }

    #[test]
    fn duplicate_pack_id_is_fatal() {
        let err = Catalog::from_parts(
            vec![service("a")],
            vec![pack("p", &["a"]), pack("p", &["a"])],
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, StackforgeError::DuplicateId { kind: "skill pack", .. }));
    }

    #[test]
    fn empty_pack_is_rejected() {
        let err = Catalog::from_parts(vec![service("a")], vec![pack("p", &[])], Vec::new())
            .unwrap_err();
        assert!(err.to_string().contains("at least one service"), "got: {err}");
    }

    #[test]
    fn bad_ids_and_ports_are_rejected() {
        assert!(Catalog::from_parts(vec![service("Bad_Id")], Vec::new(), Vec::new()).is_err());

        let mut s = service("a");
        s.ports.push(crate::descriptor::PortMapping {
            host: 0,
            container: 80,
            description: String::new(),
            exposed: true,
        });
        let err = Catalog::from_parts(vec![s], Vec::new(), Vec::new()).unwrap_err();
        assert!(err.to_string().contains("outside 1-65535"), "got: {err}");
    }

    #[test]
    fn lookups_by_category_tag_and_packs() {
        let mut a = service("a");
        a.tags.push("cache".into());
        let mut b = service("b");
        b.category = ServiceCategory::Monitoring;
        let catalog = Catalog::from_parts(
            vec![a, b],
            vec![pack("p", &["a"]), pack("q", &["a", "b"])],
            Vec::new(),
        )
        .expect("catalog");

        let monitoring: Vec<_> = catalog
            .services_by_category(ServiceCategory::Monitoring)
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(monitoring, vec!["b"]);
        assert_eq!(catalog.services_by_tag("cache").count(), 1);

        let packs: Vec<_> = catalog
            .compatible_skill_packs(&["a"])
            .into_iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(packs, vec!["p"]);
        assert!(catalog.require_preset("nope").is_err());
    }

    #[test]
    fn from_dir_treats_packs_and_presets_as_optional() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("services.yaml"),
            "services:\n- id: a\n  name: A\n  category: ai\n  image: a\n  image_tag: '1'\n",
        )
        .expect("write");
        let catalog = Catalog::from_dir(dir.path()).expect("catalog");
        assert_eq!(catalog.services().len(), 1);
        assert!(catalog.skill_packs().is_empty());

        let missing = Catalog::from_dir(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(missing, StackforgeError::Io { .. }));
    }
}

//! Skill packs and presets.

use serde::{Deserialize, Serialize};

/// A named bundle of companion services representing one use case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkillPack {
    /// Unique pack id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// What the pack enables.
    #[serde(default)]
    pub description: String,
    /// Services the pack cannot work without. Never empty.
    pub required_services: Vec<String>,
    /// Agent skills the pack installs.
    #[serde(default)]
    pub skills: Vec<String>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SkillPack {
    /// Returns `true` if every required service is in `present`.
    pub fn is_satisfied_by<'a, I>(&self, present: I) -> bool
    where
        I: IntoIterator<Item = &'a str> + Clone,
    {
        self.required_services
            .iter()
            .all(|req| present.clone().into_iter().any(|id| id == req))
    }
}

/// A curated starting selection of services and skill packs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Preset {
    /// Unique preset id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Who the preset is for.
    #[serde(default)]
    pub description: String,
    /// Explicit service selection.
    pub services: Vec<String>,
    /// Skill pack selection.
    #[serde(default)]
    pub skill_packs: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_satisfaction_needs_every_service() {
        let pack = SkillPack {
            id: "research-agent".into(),
            name: "Research Agent".into(),
            description: String::new(),
            required_services: vec!["qdrant".into(), "searxng".into()],
            skills: Vec::new(),
            tags: Vec::new(),
        };
        assert!(pack.is_satisfied_by(["searxng", "qdrant", "redis"]));
        assert!(!pack.is_satisfied_by(["qdrant"]));
    }

    #[test]
    fn preset_skill_packs_are_optional() {
        let preset: Preset =
            serde_yaml::from_str("id: m\nname: M\nservices: [redis]\n").expect("parse");
        assert!(preset.skill_packs.is_empty());
    }
}

//! Category to profile-file mapping.
//!
//! The table is a plain value handed to the assembler, so a deployment
//! target can swap or extend it without touching assembly logic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stackforge_catalog::ServiceCategory;

/// Where a category's services go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileTarget {
    /// Output file name.
    pub file: String,
    /// Compose profile tag applied to each service in the file.
    pub profile: String,
}

impl ProfileTarget {
    /// Creates a target named `docker-compose.<profile>.yml`.
    #[must_use]
    pub fn named(profile: &str) -> Self {
        Self {
            file: format!("docker-compose.{profile}.yml"),
            profile: profile.to_string(),
        }
    }
}

/// Lookup from service category to profile file.
///
/// Categories without an entry stay in the primary file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMap {
    entries: BTreeMap<ServiceCategory, ProfileTarget>,
}

impl Default for ProfileMap {
    fn default() -> Self {
        use ServiceCategory as C;
        let table = [
            (C::Ai, "ai"),
            (C::AiPlatform, "ai"),
            (C::Media, "media"),
            (C::Monitoring, "monitoring"),
            (C::Analytics, "monitoring"),
            (C::DevTools, "tools"),
            (C::CodingAgent, "tools"),
            (C::SocialMedia, "social"),
            (C::Knowledge, "knowledge"),
            (C::Communication, "communication"),
        ];
        Self {
            entries: table
                .into_iter()
                .map(|(category, profile)| (category, ProfileTarget::named(profile)))
                .collect(),
        }
    }
}

impl ProfileMap {
    /// A map with no entries: everything lands in the primary file.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Returns a copy with `category` routed to `target`.
    #[must_use]
    pub fn with(mut self, category: ServiceCategory, target: ProfileTarget) -> Self {
        let _ = self.entries.insert(category, target);
        self
    }

    /// Returns a copy with `category` kept in the primary file.
    #[must_use]
    pub fn without(mut self, category: ServiceCategory) -> Self {
        let _ = self.entries.remove(&category);
        self
    }

    /// Looks up the target for a category.
    #[must_use]
    pub fn lookup(&self, category: ServiceCategory) -> Option<&ProfileTarget> {
        self.entries.get(&category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_groups_related_categories() {
        let map = ProfileMap::default();
        let ai = map.lookup(ServiceCategory::Ai).expect("ai");
        let platform = map.lookup(ServiceCategory::AiPlatform).expect("ai-platform");
        assert_eq!(ai, platform);
        assert_eq!(ai.file, "docker-compose.ai.yml");
        assert_eq!(
            map.lookup(ServiceCategory::Analytics).expect("analytics").profile,
            "monitoring"
        );
        assert!(map.lookup(ServiceCategory::Database).is_none());
        assert!(map.lookup(ServiceCategory::Proxy).is_none());
    }

    #[test]
    fn table_can_be_customized() {
        let map = ProfileMap::empty().with(ServiceCategory::Database, ProfileTarget::named("data"));
        assert_eq!(
            map.lookup(ServiceCategory::Database).expect("database").file,
            "docker-compose.data.yml"
        );
        assert!(map.lookup(ServiceCategory::Ai).is_none());

        let map = ProfileMap::default().without(ServiceCategory::Monitoring);
        assert!(map.lookup(ServiceCategory::Monitoring).is_none());
    }
}

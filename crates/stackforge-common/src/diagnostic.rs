//! Structured diagnostics produced by the resolver and the validator.
//!
//! Neither stage fails on expected bad input. Both accumulate
//! [`Diagnostic`] values and let the caller decide whether to proceed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A requested service id is not in the catalog.
    UnknownService,
    /// A requested skill pack id is not in the catalog.
    UnknownSkillPack,
    /// Two present services exclude each other.
    Conflict,
    /// Two services claim the same exposed host port.
    PortConflict,
    /// A volume name is owned by more than one service.
    VolumeConflict,
    /// A required non-secret variable has no default.
    MissingEnv,
    /// The start-order relation contains a cycle.
    Cycle,
    /// The primary manifest does not re-parse.
    ManifestInvalid,
    /// The supplied public domain is malformed.
    InvalidDomain,
    /// A recommended companion is absent.
    Recommendation,
    /// A service may not support the target platform.
    Platform,
    /// A service wants GPU passthrough that was not enabled.
    Gpu,
    /// The memory estimate crossed a threshold.
    Memory,
    /// Dependency closure hit its pass ceiling.
    Resolution,
    /// A secret must be configured by hand before deployment.
    SecretNeeded,
    /// A service is not attached to the shared network.
    Network,
    /// Services that work together poorly or need host setup.
    Compatibility,
}

impl DiagnosticKind {
    /// Returns `true` when this kind renders the bundle unusable.
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(
            self,
            Self::UnknownService
                | Self::UnknownSkillPack
                | Self::Conflict
                | Self::PortConflict
                | Self::VolumeConflict
                | Self::MissingEnv
                | Self::Cycle
                | Self::ManifestInvalid
                | Self::InvalidDomain
        )
    }

    /// Returns the wire name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownService => "unknown_service",
            Self::UnknownSkillPack => "unknown_skill_pack",
            Self::Conflict => "conflict",
            Self::PortConflict => "port_conflict",
            Self::VolumeConflict => "volume_conflict",
            Self::MissingEnv => "missing_env",
            Self::Cycle => "cycle",
            Self::ManifestInvalid => "manifest_invalid",
            Self::InvalidDomain => "invalid_domain",
            Self::Recommendation => "recommendation",
            Self::Platform => "platform",
            Self::Gpu => "gpu",
            Self::Memory => "memory",
            Self::Resolution => "resolution",
            Self::SecretNeeded => "secret_needed",
            Self::Network => "network",
            Self::Compatibility => "compatibility",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single error or warning with a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// What went wrong.
    #[serde(rename = "type")]
    pub kind: DiagnosticKind,
    /// Human-readable explanation.
    pub message: String,
}

impl Diagnostic {
    /// Creates a new diagnostic.
    #[must_use]
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns `true` when this diagnostic is a hard error.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.kind.is_error()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Collects the messages of a diagnostic list, in order.
#[must_use]
pub fn messages(diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics.iter().map(|d| d.message.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_errors_and_warnings_are_separated() {
        assert!(DiagnosticKind::Conflict.is_error());
        assert!(DiagnosticKind::ManifestInvalid.is_error());
        assert!(!DiagnosticKind::Memory.is_error());
        assert!(!DiagnosticKind::SecretNeeded.is_error());
    }

    #[test]
    fn serializes_with_type_field() {
        let d = Diagnostic::new(DiagnosticKind::UnknownSkillPack, "Unknown skill pack: \"x\"");
        let json = serde_json::to_string(&d).expect("serialize");
        assert_eq!(
            json,
            r#"{"type":"unknown_skill_pack","message":"Unknown skill pack: \"x\""}"#
        );
    }

    #[test]
    fn display_prefixes_kind() {
        let d = Diagnostic::new(DiagnosticKind::Gpu, "needs a GPU");
        assert_eq!(d.to_string(), "[gpu] needs a GPU");
    }
}

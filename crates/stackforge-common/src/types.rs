//! Domain primitive types used across the Stackforge workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StackforgeError;

/// Target platform of a deployment (OS and CPU architecture).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    /// Linux on x86-64.
    #[default]
    #[serde(rename = "linux/amd64")]
    LinuxAmd64,
    /// Linux on ARM64.
    #[serde(rename = "linux/arm64")]
    LinuxArm64,
    /// Windows on x86-64.
    #[serde(rename = "windows/amd64")]
    WindowsAmd64,
    /// macOS on x86-64.
    #[serde(rename = "macos/amd64")]
    MacosAmd64,
    /// macOS on Apple silicon.
    #[serde(rename = "macos/arm64")]
    MacosArm64,
}

impl Platform {
    /// All supported platforms.
    pub const ALL: [Self; 5] = [
        Self::LinuxAmd64,
        Self::LinuxArm64,
        Self::WindowsAmd64,
        Self::MacosAmd64,
        Self::MacosArm64,
    ];

    /// Returns the `os/arch` identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LinuxAmd64 => "linux/amd64",
            Self::LinuxArm64 => "linux/arm64",
            Self::WindowsAmd64 => "windows/amd64",
            Self::MacosAmd64 => "macos/amd64",
            Self::MacosArm64 => "macos/arm64",
        }
    }

    /// Maps the platform to its coarse native OS family.
    #[must_use]
    pub const fn native_family(self) -> NativePlatform {
        match self {
            Self::LinuxAmd64 | Self::LinuxArm64 => NativePlatform::Linux,
            Self::WindowsAmd64 => NativePlatform::Windows,
            Self::MacosAmd64 | Self::MacosArm64 => NativePlatform::Macos,
        }
    }

    /// Returns the container image platform for this target.
    ///
    /// Container images only exist for Linux, so non-Linux hosts fall back
    /// to `linux/amd64`.
    #[must_use]
    pub const fn container_platform(self) -> Self {
        match self {
            Self::LinuxArm64 => Self::LinuxArm64,
            _ => Self::LinuxAmd64,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = StackforgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| StackforgeError::Config {
                message: format!("unsupported platform: \"{s}\""),
            })
    }
}

/// Operating-system family a native install recipe targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NativePlatform {
    /// Linux distributions.
    Linux,
    /// Microsoft Windows.
    Windows,
    /// Apple macOS.
    Macos,
}

impl NativePlatform {
    /// Returns the lowercase family name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::Macos => "macos",
        }
    }
}

impl fmt::Display for NativePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reverse proxy selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    /// No reverse proxy.
    #[default]
    None,
    /// Caddy.
    Caddy,
    /// Traefik.
    Traefik,
}

impl ProxyType {
    /// Returns the catalog service id for this proxy, if any.
    #[must_use]
    pub const fn service_id(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Caddy => Some("caddy"),
            Self::Traefik => Some("traefik"),
        }
    }
}

impl FromStr for ProxyType {
    type Err = StackforgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "caddy" => Ok(Self::Caddy),
            "traefik" => Ok(Self::Traefik),
            other => Err(StackforgeError::Config {
                message: format!("unsupported proxy: \"{other}\""),
            }),
        }
    }
}

/// How the bundle is meant to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentType {
    /// Every service runs in the container runtime.
    #[default]
    Docker,
    /// Native-capable services run on the host, the rest in containers.
    BareMetal,
}

impl FromStr for DeploymentType {
    type Err = StackforgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "docker" => Ok(Self::Docker),
            "bare-metal" => Ok(Self::BareMetal),
            other => Err(StackforgeError::Config {
                message: format!("unsupported deployment type: \"{other}\""),
            }),
        }
    }
}

/// Why a service is present in a resolved graph.
///
/// Provenance is metadata only. It never affects ordering or conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// Explicitly selected.
    User,
    /// Pulled in through a `requires` edge.
    Dependency,
    /// Required by a selected skill pack.
    SkillPack,
    /// The selected reverse proxy.
    Proxy,
    /// Part of the monitoring stack.
    Monitoring,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Dependency => write!(f, "dependency"),
            Self::SkillPack => write!(f, "skill-pack"),
            Self::Proxy => write!(f, "proxy"),
            Self::Monitoring => write!(f, "monitoring"),
        }
    }
}

/// Memory estimate thresholds, in MB. Each must exceed the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryThresholds {
    /// Informational threshold.
    pub info: u64,
    /// Recommend a larger host above this.
    pub warning: u64,
    /// Strongly warn above this.
    pub critical: u64,
}

impl Default for MemoryThresholds {
    fn default() -> Self {
        Self {
            info: 2048,
            warning: 4096,
            critical: 8192,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_round_trips_through_str() {
        for p in Platform::ALL {
            assert_eq!(p.as_str().parse::<Platform>().expect("parse"), p);
        }
        assert!("plan9/mips".parse::<Platform>().is_err());
    }

    #[test]
    fn platform_maps_to_native_family() {
        assert_eq!(Platform::LinuxArm64.native_family(), NativePlatform::Linux);
        assert_eq!(Platform::WindowsAmd64.native_family(), NativePlatform::Windows);
        assert_eq!(Platform::MacosArm64.native_family(), NativePlatform::Macos);
    }

    #[test]
    fn non_linux_hosts_use_amd64_images() {
        assert_eq!(Platform::MacosArm64.container_platform(), Platform::LinuxAmd64);
        assert_eq!(Platform::LinuxArm64.container_platform(), Platform::LinuxArm64);
    }

    #[test]
    fn proxy_service_ids() {
        assert_eq!(ProxyType::None.service_id(), None);
        assert_eq!(ProxyType::Traefik.service_id(), Some("traefik"));
    }

    #[test]
    fn provenance_serializes_kebab_case() {
        let json = serde_json::to_string(&Provenance::SkillPack).expect("serialize");
        assert_eq!(json, "\"skill-pack\"");
        assert_eq!(Provenance::SkillPack.to_string(), "skill-pack");
    }
}

//! Target platform parsing and planning
//!
//! Platform specifiers follow the `os[/arch[/variant]]` convention used by
//! container tooling. Architecture aliases are folded into their canonical
//! names so that `x86_64` and `amd64` describe the same target.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_OS: &str = "linux";

const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux",
    "nacl", "netbsd", "openbsd", "plan9", "solaris", "windows", "zos",
];

const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "amd64p32", "arm", "armbe", "arm64", "arm64be", "loong64", "mips", "mipsle",
    "mips64", "mips64le", "mips64p32", "mips64p32le", "ppc", "ppc64", "ppc64le", "riscv",
    "riscv64", "s390", "s390x", "sparc", "sparc64", "wasm",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformParseError {
    #[error("empty platform specifier in {0:?}")]
    Empty(String),

    #[error("invalid platform {spec:?}: {reason}")]
    Invalid { spec: String, reason: String },

    #[error("unknown operating system {os:?} in platform {spec:?}")]
    UnknownOs { spec: String, os: String },

    #[error("unknown architecture {0:?}")]
    UnknownArch(String),

    #[error("platform {0} requested more than once")]
    Duplicate(String),
}

/// Normalized OCI platform descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub architecture: String,
    pub os: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl Platform {
    pub fn new(os: &str, architecture: &str, variant: Option<&str>) -> Self {
        let (architecture, variant) = normalize_arch(architecture, variant.unwrap_or(""));
        Self {
            architecture,
            os: normalize_os(os),
            variant,
        }
    }

    /// Linux on the architecture this process runs on
    pub fn host() -> Self {
        let arch = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            other => other,
        };
        Self::new(DEFAULT_OS, arch, None)
    }

    /// `os/arch[/variant]`, also used as the export ID
    pub fn id(&self) -> String {
        match &self.variant {
            Some(variant) => format!("{}/{}/{}", self.os, self.architecture, variant),
            None => format!("{}/{}", self.os, self.architecture),
        }
    }

    pub fn parse(spec: &str) -> Result<Self, PlatformParseError> {
        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Err(PlatformParseError::Empty(spec.to_string()));
        }

        let parts: Vec<String> = trimmed.split('/').map(str::to_lowercase).collect();
        for part in &parts {
            if part.is_empty() {
                return Err(PlatformParseError::Invalid {
                    spec: spec.to_string(),
                    reason: "empty component".to_string(),
                });
            }
            if !part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return Err(PlatformParseError::Invalid {
                    spec: spec.to_string(),
                    reason: format!("invalid characters in {:?}", part),
                });
            }
        }

        let platform = match parts.as_slice() {
            [single] => {
                let os = normalize_os(single);
                if is_known_os(&os) {
                    let host = Self::host();
                    Self {
                        os,
                        architecture: host.architecture,
                        variant: host.variant,
                    }
                } else {
                    let (architecture, variant) = normalize_arch(single, "");
                    if !is_known_arch(&architecture) {
                        return Err(PlatformParseError::Invalid {
                            spec: spec.to_string(),
                            reason: "unknown operating system or architecture".to_string(),
                        });
                    }
                    Self {
                        os: DEFAULT_OS.to_string(),
                        architecture,
                        variant,
                    }
                }
            }
            [os, arch] => Self::new(&known_os(spec, os)?, arch, None),
            [os, arch, variant] => Self::new(&known_os(spec, os)?, arch, Some(variant)),
            _ => {
                return Err(PlatformParseError::Invalid {
                    spec: spec.to_string(),
                    reason: "expected os[/arch[/variant]]".to_string(),
                })
            }
        };

        Ok(platform)
    }
}

/// Canonical name of a bare architecture such as `x86_64` or `aarch64`
pub fn parse_architecture(arch: &str) -> Result<String, PlatformParseError> {
    let (architecture, _) = normalize_arch(arch.trim(), "");
    if is_known_arch(&architecture) {
        Ok(architecture)
    } else {
        Err(PlatformParseError::UnknownArch(arch.to_string()))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

impl FromStr for Platform {
    type Err = PlatformParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn is_known_os(os: &str) -> bool {
    KNOWN_OS.contains(&os)
}

fn is_known_arch(arch: &str) -> bool {
    KNOWN_ARCH.contains(&arch)
}

fn known_os(spec: &str, os: &str) -> Result<String, PlatformParseError> {
    let normalized = normalize_os(os);
    if is_known_os(&normalized) {
        Ok(normalized)
    } else {
        Err(PlatformParseError::UnknownOs {
            spec: spec.to_string(),
            os: os.to_string(),
        })
    }
}

fn normalize_os(os: &str) -> String {
    let os = os.to_lowercase();
    match os.as_str() {
        "macos" => "darwin".to_string(),
        _ => os,
    }
}

fn normalize_arch(arch: &str, variant: &str) -> (String, Option<String>) {
    let arch = arch.to_lowercase();
    let variant = variant.to_lowercase();

    let (arch, variant) = match arch.as_str() {
        "i386" | "i486" | "i586" | "i686" | "386" => ("386".to_string(), String::new()),
        "x86_64" | "x86-64" | "amd64" => {
            let variant = if variant == "v1" { String::new() } else { variant };
            ("amd64".to_string(), variant)
        }
        "aarch64" | "arm64" => {
            let variant = match variant.as_str() {
                "8" | "v8" => String::new(),
                _ => variant,
            };
            ("arm64".to_string(), variant)
        }
        "armhf" => ("arm".to_string(), "v7".to_string()),
        "armel" => ("arm".to_string(), "v6".to_string()),
        "arm" => {
            let variant = match variant.as_str() {
                "" | "7" => "v7".to_string(),
                "5" | "6" | "8" => format!("v{}", variant),
                _ => variant,
            };
            ("arm".to_string(), variant)
        }
        _ => (arch, variant),
    };

    let variant = if variant.is_empty() { None } else { Some(variant) };
    (arch, variant)
}

/// One entry of the planned platform set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TargetPlatform {
    /// No platform was requested; the solver picks its own default
    SolverDefault,
    Explicit(Platform),
}

impl TargetPlatform {
    pub fn platform(&self) -> Option<&Platform> {
        match self {
            TargetPlatform::SolverDefault => None,
            TargetPlatform::Explicit(platform) => Some(platform),
        }
    }

    /// The concrete platform this target builds for
    pub fn resolve(&self, default: &Platform) -> Platform {
        self.platform().unwrap_or(default).clone()
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetPlatform::SolverDefault => f.write_str("default"),
            TargetPlatform::Explicit(platform) => write!(f, "{}", platform),
        }
    }
}

/// Resolves the requested target platforms, all or nothing
pub fn plan_platforms(requested: Option<&str>) -> Result<Vec<TargetPlatform>, PlatformParseError> {
    let requested = match requested.map(str::trim) {
        None | Some("") => return Ok(vec![TargetPlatform::SolverDefault]),
        Some(requested) => requested,
    };

    let mut planned: Vec<TargetPlatform> = Vec::new();
    for component in requested.split(',') {
        if component.trim().is_empty() {
            return Err(PlatformParseError::Empty(requested.to_string()));
        }
        let platform = Platform::parse(component)?;
        if planned.iter().any(|p| p.platform() == Some(&platform)) {
            return Err(PlatformParseError::Duplicate(platform.id()));
        }
        planned.push(TargetPlatform::Explicit(platform));
    }

    debug!(count = planned.len(), "Planned target platforms");
    Ok(planned)
}

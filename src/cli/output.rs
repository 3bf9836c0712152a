//! Output formatting for `pyfront inspect`
//!
//! The report is built once from a validated manifest and rendered as JSON,
//! YAML or human-readable text. Dependency entries and index URLs are masked
//! before they reach the report.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::dependency::{masked, DependencyKind};
use crate::manifest::Manifest;
use crate::script::{install_plan, InstallStep, RuntimeBase};

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

/// Masked, serializable view of a manifest
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub python_version: String,
    pub architecture: String,
    pub runtime_base: RuntimeBase,
    pub runtime_image: String,
    pub build_deps: Vec<String>,
    pub dependencies: Vec<DependencyReport>,
    pub install_steps: Vec<StepReport>,
    pub indices: Vec<IndexReport>,
    pub envs: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub sbom: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DependencyReport {
    pub entry: String,
    pub kind: DependencyKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub kind: &'static str,
    pub dependencies: Vec<String>,
    pub needs_ssh: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub url: String,
    pub authenticated: bool,
    pub trusted: bool,
}

impl InspectReport {
    pub fn new(manifest: &Manifest, arch: &str) -> Self {
        let runtime_base = RuntimeBase::select(&manifest.python_version, arch);

        let dependencies = masked(&manifest.pip_dependencies)
            .into_iter()
            .zip(&manifest.pip_dependencies)
            .map(|(entry, original)| DependencyReport {
                entry,
                kind: DependencyKind::of(original),
            })
            .collect();

        let classified = manifest.dependencies();
        let install_steps = install_plan(&classified)
            .iter()
            .map(StepReport::from_step)
            .collect();

        let indices = manifest
            .indices
            .iter()
            .map(|index| IndexReport {
                url: index.masked_url(),
                authenticated: index.username.as_deref().is_some_and(|u| !u.is_empty()),
                trusted: index.trust,
            })
            .collect();

        Self {
            python_version: manifest.python_version.clone(),
            architecture: arch.to_string(),
            runtime_base,
            runtime_image: runtime_base.image(&manifest.python_version),
            build_deps: manifest.build_deps.clone(),
            dependencies,
            install_steps,
            indices,
            envs: manifest.envs.clone(),
            project: manifest.project.clone(),
            labels: manifest.labels.clone(),
            sbom: manifest.sbom,
        }
    }
}

impl StepReport {
    fn from_step(step: &InstallStep<'_>) -> Self {
        let (kind, entries): (&'static str, Vec<String>) = match step {
            InstallStep::SshGit(deps) => ("ssh-git", deps.iter().map(|d| d.to_string()).collect()),
            InstallStep::External(deps) => {
                ("external", deps.iter().map(|d| d.to_string()).collect())
            }
            InstallStep::LocalRequirements(path) => ("local-requirements", vec![path.to_string()]),
            InstallStep::LocalDirectory(path) => ("local-directory", vec![path.to_string()]),
        };

        Self {
            kind,
            dependencies: masked(&entries),
            needs_ssh: matches!(step, InstallStep::SshGit(_)),
        }
    }
}

/// Output formatter for inspect reports
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, report: &InspectReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report)
                .context("Failed to serialize inspect report to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(report).context("Failed to serialize inspect report to YAML")
            }
            OutputFormat::Human => Ok(self.format_human(report)),
        }
    }

    fn format_human(&self, report: &InspectReport) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "Python:        {}", report.python_version);
        let _ = writeln!(out, "Architecture:  {}", report.architecture);
        let _ = writeln!(out, "Runtime image: {}", report.runtime_image);
        if let Some(project) = &report.project {
            let _ = writeln!(out, "Project:       {}", project);
        }
        let _ = writeln!(out, "SBOM scan:     {}", if report.sbom { "build stage" } else { "off" });

        if !report.build_deps.is_empty() {
            let _ = writeln!(out, "\nBuild packages:");
            for dep in &report.build_deps {
                let _ = writeln!(out, "  - {}", dep);
            }
        }

        if !report.dependencies.is_empty() {
            let _ = writeln!(out, "\nDependencies:");
            for dep in &report.dependencies {
                let _ = writeln!(out, "  - {} ({})", dep.entry, kind_label(dep.kind));
            }
        }

        if !report.install_steps.is_empty() {
            let _ = writeln!(out, "\nInstall steps:");
            for (i, step) in report.install_steps.iter().enumerate() {
                let ssh = if step.needs_ssh { " [ssh]" } else { "" };
                let _ = writeln!(
                    out,
                    "  {}. {}{}: {}",
                    i + 1,
                    step.kind,
                    ssh,
                    step.dependencies.join(" ")
                );
            }
        }

        if !report.indices.is_empty() {
            let _ = writeln!(out, "\nIndices:");
            for (i, index) in report.indices.iter().enumerate() {
                let role = if i == 0 { "primary" } else { "extra" };
                let mut flags = Vec::new();
                if index.authenticated {
                    flags.push("authenticated");
                }
                if index.trusted {
                    flags.push("trusted");
                }
                let flags = if flags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", flags.join(", "))
                };
                let _ = writeln!(out, "  - {} ({}){}", index.url, role, flags);
            }
        }

        if !report.envs.is_empty() {
            let _ = writeln!(out, "\nEnvironment:");
            for (key, value) in &report.envs {
                let _ = writeln!(out, "  {}={}", key, value);
            }
        }

        if !report.labels.is_empty() {
            let _ = writeln!(out, "\nLabels:");
            for (key, value) in &report.labels {
                let _ = writeln!(out, "  {}={}", key, value);
            }
        }

        out
    }
}

fn kind_label(kind: DependencyKind) -> &'static str {
    if kind.is_git() {
        match kind {
            DependencyKind::SshGit => "git over ssh",
            _ => "git over http",
        }
    } else if kind.is_local() {
        "local"
    } else {
        "index"
    }
}

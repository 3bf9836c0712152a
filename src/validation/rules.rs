use crate::manifest::{Manifest, SUPPORTED_API_VERSION};
use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, manifest: &Manifest) -> Result<()>;
}

fn python_version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[2-9](\.\d{1,2})?(\.\d{1,2})?$").expect("python version pattern is valid")
    })
}

pub struct ApiVersionRule;

impl ValidationRule for ApiVersionRule {
    fn name(&self) -> &'static str {
        "ApiVersion"
    }

    fn validate(&self, manifest: &Manifest) -> Result<()> {
        match manifest.api_version.as_deref() {
            None | Some("") => Ok(()),
            Some(SUPPORTED_API_VERSION) => Ok(()),
            Some(other) => anyhow::bail!(
                "unknown version {}. Known versions: '{}'",
                other,
                SUPPORTED_API_VERSION
            ),
        }
    }
}

pub struct PythonVersionRule;

impl ValidationRule for PythonVersionRule {
    fn name(&self) -> &'static str {
        "PythonVersion"
    }

    fn validate(&self, manifest: &Manifest) -> Result<()> {
        if manifest.python_version.is_empty() {
            anyhow::bail!("empty is not a valid Python version");
        }
        if !python_version_pattern().is_match(&manifest.python_version) {
            anyhow::bail!(
                "{} is not a valid Python version",
                manifest.python_version
            );
        }
        Ok(())
    }
}

pub struct RelativeDependencyPathsRule;

impl ValidationRule for RelativeDependencyPathsRule {
    fn name(&self) -> &'static str {
        "RelativeDependencyPaths"
    }

    fn validate(&self, manifest: &Manifest) -> Result<()> {
        let absolute: Vec<&str> = manifest
            .pip_dependencies
            .iter()
            .filter(|dep| dep.starts_with('/'))
            .map(String::as_str)
            .collect();

        if !absolute.is_empty() {
            anyhow::bail!(
                "local paths can only be relative, found: {}",
                absolute.join(", ")
            );
        }
        Ok(())
    }
}

pub struct RelativeProjectPathRule;

impl ValidationRule for RelativeProjectPathRule {
    fn name(&self) -> &'static str {
        "RelativeProjectPath"
    }

    fn validate(&self, manifest: &Manifest) -> Result<()> {
        // An empty project is treated as unset during normalization
        if let Some(project) = manifest.project.as_deref() {
            if project.starts_with('/') {
                anyhow::bail!(
                    "project path can't be absolute, has to be relative, found: {}",
                    project
                );
            }
        }
        Ok(())
    }
}

pub struct PackageIndexRule;

impl ValidationRule for PackageIndexRule {
    fn name(&self) -> &'static str {
        "PackageIndex"
    }

    fn validate(&self, manifest: &Manifest) -> Result<()> {
        for (i, index) in manifest.indices.iter().enumerate() {
            if index.url.is_empty() {
                anyhow::bail!("indices[{}] url cannot be empty", i);
            }
            let url = Url::parse(&index.url)
                .map_err(|e| anyhow::anyhow!("indices[{}] url {} is invalid: {}", i, index.url, e))?;
            if !matches!(url.scheme(), "http" | "https") {
                anyhow::bail!(
                    "indices[{}] url must use http or https, found: {}",
                    i,
                    url.scheme()
                );
            }
            let has_username = index.username.as_deref().is_some_and(|u| !u.is_empty());
            if index.password.is_some() && !has_username {
                anyhow::bail!("indices[{}] password requires a username", i);
            }
        }
        Ok(())
    }
}

//! Build planning
//!
//! Everything synchronous happens here, before any task is spawned: platform
//! and cache option parsing, default platform selection, and script
//! synthesis.

use crate::cache::{resolve_cache_imports, CacheImportEntry};
use crate::config::FrontendConfig;
use crate::error::FrontendError;
use crate::frontend::gateway::ConvertOptions;
use crate::frontend::options::BuildOptions;
use crate::frontend::result::ExportPlatform;
use crate::manifest::Manifest;
use crate::platform::{plan_platforms, Platform, TargetPlatform};
use crate::script::{synthesize, RuntimeBase};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// One platform's share of the plan
#[derive(Debug, Clone)]
pub struct PlatformBuild {
    /// Position in the requested platform list
    pub index: usize,
    pub target: TargetPlatform,
    pub export_platform: ExportPlatform,
    pub runtime_base: RuntimeBase,
    /// Shared between platforms with the same architecture
    pub script: Arc<str>,
}

#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub builds: Vec<PlatformBuild>,
    /// Platform the build steps run on
    pub build_platform: Platform,
    pub cache_imports: Vec<CacheImportEntry>,
    pub build_args: BTreeMap<String, String>,
    pub excludes: Vec<String>,
}

impl BuildPlan {
    pub fn resolve(
        manifest: &Manifest,
        opts: &BuildOptions,
        worker_platforms: &[Platform],
        excludes: Vec<String>,
        config: &FrontendConfig,
    ) -> Result<Self, FrontendError> {
        let cache_imports = resolve_cache_imports(opts)?;
        let targets = plan_platforms(opts.target_platforms())?;

        let build_platform = worker_platforms
            .first()
            .cloned()
            .unwrap_or_else(|| config.default_platform());

        let mut scripts: HashMap<String, Arc<str>> = HashMap::new();
        let builds = targets
            .into_iter()
            .enumerate()
            .map(|(index, target)| {
                let platform = target.resolve(&build_platform);
                let script = scripts
                    .entry(platform.architecture.clone())
                    .or_insert_with(|| Arc::from(synthesize(manifest, &platform.architecture)))
                    .clone();

                PlatformBuild {
                    index,
                    runtime_base: RuntimeBase::select(
                        &manifest.python_version,
                        &platform.architecture,
                    ),
                    export_platform: ExportPlatform::new(platform),
                    target,
                    script,
                }
            })
            .collect::<Vec<_>>();

        debug!(
            scripts = scripts.len(),
            cache_imports = cache_imports.len(),
            excludes = excludes.len(),
            "Resolved build plan"
        );
        info!(
            platforms = builds.len(),
            build_platform = %build_platform,
            "Planned build"
        );

        Ok(Self {
            builds,
            build_platform,
            cache_imports,
            build_args: opts.build_args(),
            excludes,
        })
    }

    pub fn is_multi_platform(&self) -> bool {
        self.builds.len() > 1
    }

    pub fn convert_options(&self, build: &PlatformBuild, session_id: &str) -> ConvertOptions {
        ConvertOptions {
            session_id: session_id.to_string(),
            build_args: self.build_args.clone(),
            excludes: self.excludes.clone(),
            build_platforms: vec![self.build_platform.clone()],
            target_platform: build.target.platform().cloned(),
            prefix_platform: self.is_multi_platform(),
        }
    }

    /// Serializable view for reports
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            multi_platform: self.is_multi_platform(),
            build_platform: self.build_platform.id(),
            platforms: self
                .builds
                .iter()
                .map(|build| PlatformSummary {
                    target: build.target.to_string(),
                    export_id: build.export_platform.id.clone(),
                    runtime_base: build.runtime_base,
                    script_digest: format!(
                        "sha256:{}",
                        hex::encode(Sha256::digest(build.script.as_bytes()))
                    ),
                })
                .collect(),
            cache_imports: self.cache_imports.clone(),
            build_args: self.build_args.keys().cloned().collect(),
            excludes: self.excludes.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub multi_platform: bool,
    pub build_platform: String,
    pub platforms: Vec<PlatformSummary>,
    pub cache_imports: Vec<CacheImportEntry>,
    /// Names only, values may carry credentials
    pub build_args: Vec<String>,
    pub excludes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformSummary {
    pub target: String,
    pub export_id: String,
    pub runtime_base: RuntimeBase,
    pub script_digest: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FrontendConfig {
        FrontendConfig {
            manifest_filename: "pyfront.yaml".to_string(),
            default_architecture: "amd64".to_string(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }

    fn manifest() -> Manifest {
        Manifest {
            pip_dependencies: vec!["flask".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_default_platform_from_worker() {
        let worker = vec![Platform::new("linux", "arm64", None)];
        let plan = BuildPlan::resolve(
            &manifest(),
            &BuildOptions::default(),
            &worker,
            Vec::new(),
            &config(),
        )
        .unwrap();

        assert!(!plan.is_multi_platform());
        assert_eq!(plan.builds[0].target, TargetPlatform::SolverDefault);
        assert_eq!(plan.builds[0].export_platform.id, "linux/arm64");
        assert_eq!(plan.build_platform.id(), "linux/arm64");
    }

    #[test]
    fn test_default_platform_from_config() {
        let plan = BuildPlan::resolve(
            &manifest(),
            &BuildOptions::default(),
            &[],
            Vec::new(),
            &config(),
        )
        .unwrap();

        assert_eq!(plan.builds[0].export_platform.id, "linux/amd64");
        assert_eq!(plan.builds[0].runtime_base, RuntimeBase::Distroless);
    }

    #[test]
    fn test_scripts_shared_per_architecture() {
        let opts = BuildOptions::from_pairs(["platform=linux/amd64,linux/arm/v6,linux/arm/v7"]);
        let plan = BuildPlan::resolve(&manifest(), &opts, &[], Vec::new(), &config()).unwrap();

        assert!(plan.is_multi_platform());
        assert!(Arc::ptr_eq(&plan.builds[1].script, &plan.builds[2].script));
        assert!(!Arc::ptr_eq(&plan.builds[0].script, &plan.builds[1].script));
        assert_eq!(plan.builds[1].runtime_base, RuntimeBase::Slim);
    }

    #[test]
    fn test_convert_options() {
        let opts = BuildOptions::from_pairs([
            "platform=linux/amd64,linux/arm64",
            "build-arg:PIP_TIMEOUT=60",
        ]);
        let plan = BuildPlan::resolve(
            &manifest(),
            &opts,
            &[],
            vec!["*.log".to_string()],
            &config(),
        )
        .unwrap();
        let convert = plan.convert_options(&plan.builds[1], "session-1");

        assert_eq!(convert.session_id, "session-1");
        assert_eq!(convert.build_args["PIP_TIMEOUT"], "60");
        assert_eq!(convert.excludes, vec!["*.log"]);
        assert_eq!(convert.build_platforms, vec![Platform::new("linux", "amd64", None)]);
        assert_eq!(convert.target_platform.map(|p| p.id()), Some("linux/arm64".to_string()));
        assert!(convert.prefix_platform);
    }

    #[test]
    fn test_planning_errors_surface_before_synthesis() {
        let opts = BuildOptions::from_pairs(["cache-imports=nope"]);
        let err = BuildPlan::resolve(&manifest(), &opts, &[], Vec::new(), &config()).unwrap_err();
        assert!(matches!(err, FrontendError::CacheParse(_)));

        let opts = BuildOptions::from_pairs(["platform=linux/amd64,"]);
        let err = BuildPlan::resolve(&manifest(), &opts, &[], Vec::new(), &config()).unwrap_err();
        assert!(matches!(err, FrontendError::PlatformParse(_)));
    }

    #[test]
    fn test_summary_hides_build_arg_values() {
        let opts = BuildOptions::from_pairs(["build-arg:TOKEN=secret"]);
        let plan = BuildPlan::resolve(&manifest(), &opts, &[], Vec::new(), &config()).unwrap();
        let json = serde_json::to_string(&plan.summary()).unwrap();

        assert!(json.contains("TOKEN"));
        assert!(!json.contains("secret"));
    }
}

//! Build frontend
//!
//! [`Frontend::build`] runs one build request end to end:
//!
//! 1. read and validate the manifest from the `dockerfile` local
//! 2. read `.dockerignore` from the `context` local
//! 3. plan platforms, cache imports and scripts
//! 4. convert and solve every platform concurrently
//! 5. merge the per-platform results
//!
//! Steps 1 to 3 fail before any platform task starts.

pub mod gateway;
pub mod mock;
pub mod options;
pub mod orchestrator;
pub mod plan;
pub mod result;

pub use gateway::{
    BuildGraph, BuildOpts, ContextError, Conversion, ConversionError, ConvertOptions,
    GatewayClient, Reference, ScriptConverter, SolveError, SolveRequest,
};
pub use options::BuildOptions;
pub use plan::{BuildPlan, PlanSummary};
pub use result::{aggregate, BuildResult, ExportPlatform, ExportPlatforms, FinalResult};

use crate::config::FrontendConfig;
use crate::error::FrontendError;
use crate::manifest::Manifest;
use crate::progress::{LoggingHandler, ProgressEvent, ProgressHandler};
use gateway::{LOCAL_NAME_CONTEXT, LOCAL_NAME_MANIFEST};
use orchestrator::BuildContext;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub const DOCKERIGNORE_FILENAME: &str = ".dockerignore";

pub struct Frontend {
    gateway: Arc<dyn GatewayClient>,
    converter: Arc<dyn ScriptConverter>,
    config: FrontendConfig,
    progress: Arc<dyn ProgressHandler>,
}

impl Frontend {
    pub fn new(
        gateway: Arc<dyn GatewayClient>,
        converter: Arc<dyn ScriptConverter>,
        config: FrontendConfig,
    ) -> Self {
        Self {
            gateway,
            converter,
            config,
            progress: Arc::new(LoggingHandler),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    pub async fn build(&self) -> Result<FinalResult, FrontendError> {
        let started = Instant::now();
        let outcome = self.run(started).await;

        if let Err(err) = &outcome {
            self.progress.on_progress(&ProgressEvent::BuildFailed {
                stage: err.stage(),
                error: err.to_string(),
            });
        }
        outcome
    }

    async fn run(&self, started: Instant) -> Result<FinalResult, FrontendError> {
        let build_opts = self.gateway.build_opts();

        let manifest = self.load_manifest(&build_opts.opts).await?;
        let excludes = self.load_excludes().await?;

        let plan = BuildPlan::resolve(
            &manifest,
            &build_opts.opts,
            &build_opts.worker_platforms,
            excludes,
            &self.config,
        )?;

        self.progress.on_progress(&ProgressEvent::BuildStarted {
            platforms: plan.builds.len(),
            multi_platform: plan.is_multi_platform(),
        });

        let ctx = BuildContext {
            gateway: self.gateway.clone(),
            converter: self.converter.clone(),
            progress: self.progress.clone(),
            session_id: build_opts.session_id.clone(),
        };
        let results = orchestrator::run(&plan, &ctx).await?;
        let platforms = results.len();
        let merged = aggregate(results, plan.is_multi_platform())?;

        self.progress.on_progress(&ProgressEvent::BuildCompleted {
            platforms,
            total_time: started.elapsed(),
        });
        Ok(merged)
    }

    async fn load_manifest(&self, opts: &BuildOptions) -> Result<Manifest, FrontendError> {
        let filename = opts.manifest_filename(&self.config.manifest_filename);
        let bytes = self
            .gateway
            .read_file(LOCAL_NAME_MANIFEST, filename)
            .await?
            .ok_or_else(|| ContextError::NotFound {
                local: LOCAL_NAME_MANIFEST.to_string(),
                path: filename.to_string(),
            })?;

        info!(manifest = %filename, bytes = bytes.len(), "Read manifest");
        Ok(Manifest::from_yaml(&bytes)?)
    }

    async fn load_excludes(&self) -> Result<Vec<String>, FrontendError> {
        let excludes = match self
            .gateway
            .read_file(LOCAL_NAME_CONTEXT, DOCKERIGNORE_FILENAME)
            .await?
        {
            Some(bytes) => parse_ignore_rules(&String::from_utf8_lossy(&bytes)),
            None => Vec::new(),
        };

        debug!("Loaded {} patterns from {}", excludes.len(), DOCKERIGNORE_FILENAME);
        Ok(excludes)
    }
}

/// Ignore-file patterns: trimmed, blank lines and `#` comments dropped
pub fn parse_ignore_rules(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use crate::frontend::mock::{MockConverter, MockGateway};

    fn config() -> FrontendConfig {
        FrontendConfig {
            manifest_filename: "pyfront.yaml".to_string(),
            default_architecture: "amd64".to_string(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }

    #[test]
    fn test_parse_ignore_rules() {
        let rules = parse_ignore_rules("# build output\n\n  dist/  \n*.pyc\n#tests\n!keep.txt\n");
        assert_eq!(rules, vec!["dist/", "*.pyc", "!keep.txt"]);
    }

    #[tokio::test]
    async fn test_missing_manifest_is_context_error() {
        let frontend = Frontend::new(
            Arc::new(MockGateway::new()),
            Arc::new(MockConverter::new()),
            config(),
        );

        let err = frontend.build().await.unwrap_err();
        assert_eq!(err.stage(), Stage::Context);
        assert!(err.to_string().contains("pyfront.yaml"));
    }

    #[tokio::test]
    async fn test_unreadable_ignore_file_is_context_error() {
        let converter = Arc::new(MockConverter::new());
        let gateway = MockGateway::new()
            .with_file(LOCAL_NAME_MANIFEST, "pyfront.yaml", "pip: [flask]\n")
            .with_read_failure(LOCAL_NAME_CONTEXT, DOCKERIGNORE_FILENAME, "permission denied");
        let frontend = Frontend::new(Arc::new(gateway), converter.clone(), config());

        let err = frontend.build().await.unwrap_err();
        assert_eq!(err.stage(), Stage::Context);
        assert!(err.to_string().contains("permission denied"));
        assert!(converter.conversions().is_empty());
    }

    #[tokio::test]
    async fn test_filename_option_overrides_config() {
        let gateway = MockGateway::new()
            .with_opts(BuildOptions::from_pairs(["filename=build/app.yaml"]))
            .with_file(LOCAL_NAME_MANIFEST, "build/app.yaml", "pip: [flask]\n");
        let frontend = Frontend::new(Arc::new(gateway), Arc::new(MockConverter::new()), config());

        let result = frontend.build().await.unwrap();
        assert!(result.reference.is_some());
    }

    #[tokio::test]
    async fn test_dockerignore_reaches_converter() {
        let converter = Arc::new(MockConverter::new());
        let gateway = MockGateway::new()
            .with_file(LOCAL_NAME_MANIFEST, "pyfront.yaml", "pip: [flask]\n")
            .with_file(LOCAL_NAME_CONTEXT, DOCKERIGNORE_FILENAME, "# vcs\n.git\n*.pyc\n");
        let frontend = Frontend::new(Arc::new(gateway), converter.clone(), config());

        frontend.build().await.unwrap();

        let conversions = converter.conversions();
        assert_eq!(conversions.len(), 1);
        assert_eq!(conversions[0].opts.excludes, vec![".git", "*.pyc"]);
        assert!(!conversions[0].opts.prefix_platform);
    }
}

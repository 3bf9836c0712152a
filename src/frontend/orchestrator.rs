//! Concurrent per-platform builds
//!
//! Each planned platform runs as its own task: convert the script, then
//! solve the graph. Tasks share nothing but a cancellation signal. The first
//! failure raises the signal, aborts the remaining tasks and becomes the
//! result of the whole build; results of siblings that already finished are
//! dropped.

use crate::cache::CacheImportEntry;
use crate::error::{FrontendError, Stage};
use crate::frontend::gateway::{ConvertOptions, GatewayClient, ScriptConverter, SolveRequest};
use crate::frontend::plan::{BuildPlan, PlatformBuild};
use crate::frontend::result::BuildResult;
use crate::progress::{PlatformState, ProgressEvent, ProgressHandler};
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Shared collaborators of all platform tasks
#[derive(Clone)]
pub struct BuildContext {
    pub gateway: Arc<dyn GatewayClient>,
    pub converter: Arc<dyn ScriptConverter>,
    pub progress: Arc<dyn ProgressHandler>,
    pub session_id: String,
}

/// Runs every planned platform and returns results in request order
pub async fn run(plan: &BuildPlan, ctx: &BuildContext) -> Result<Vec<BuildResult>, FrontendError> {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let mut abort_handles = Vec::with_capacity(plan.builds.len());
    let mut pending = FuturesUnordered::new();

    for build in &plan.builds {
        report(ctx, build, PlatformState::Pending, Instant::now());

        let task = build_platform(
            build.clone(),
            plan.convert_options(build, &ctx.session_id),
            plan.cache_imports.clone(),
            ctx.clone(),
            cancel_rx.clone(),
        );
        let handle = tokio::spawn(task);
        abort_handles.push(handle.abort_handle());

        let index = build.index;
        pending.push(handle.map(move |joined| (index, joined)));
    }

    let mut slots: Vec<Option<BuildResult>> = (0..plan.builds.len()).map(|_| None).collect();

    while let Some((index, joined)) = pending.next().await {
        let outcome = joined.unwrap_or_else(|e| {
            Err(FrontendError::TaskAborted {
                platform: plan.builds[index].target.clone(),
                reason: e.to_string(),
            })
        });

        match outcome {
            Ok(result) => slots[index] = Some(result),
            Err(err) => {
                warn!(
                    platform = %plan.builds[index].export_platform.id,
                    stage = %err.stage(),
                    "Platform failed, cancelling remaining builds"
                );
                let _ = cancel_tx.send(true);
                for handle in &abort_handles {
                    handle.abort();
                }
                return Err(err);
            }
        }
    }

    slots
        .into_iter()
        .zip(&plan.builds)
        .map(|(slot, build)| {
            slot.ok_or_else(|| FrontendError::TaskAborted {
                platform: build.target.clone(),
                reason: "task finished without a result".to_string(),
            })
        })
        .collect()
}

async fn build_platform(
    build: PlatformBuild,
    convert_opts: ConvertOptions,
    cache_imports: Vec<CacheImportEntry>,
    ctx: BuildContext,
    mut cancel: watch::Receiver<bool>,
) -> Result<BuildResult, FrontendError> {
    let started = Instant::now();
    let outcome = convert_and_solve(
        &build,
        &convert_opts,
        cache_imports,
        &ctx,
        &mut cancel,
        started,
    )
    .await;

    match &outcome {
        Ok(result) => {
            debug!(
                platform = %result.export_platform.id,
                reference = %result.reference,
                "Platform solved"
            );
            report(&ctx, &build, PlatformState::Done, started);
        }
        Err(FrontendError::Cancelled { stage, .. }) => {
            debug!(platform = %build.export_platform.id, stage = %stage, "Platform build cancelled");
        }
        Err(_) => report(&ctx, &build, PlatformState::Failed, started),
    }

    outcome
}

async fn convert_and_solve(
    build: &PlatformBuild,
    convert_opts: &ConvertOptions,
    cache_imports: Vec<CacheImportEntry>,
    ctx: &BuildContext,
    cancel: &mut watch::Receiver<bool>,
    started: Instant,
) -> Result<BuildResult, FrontendError> {
    report(ctx, build, PlatformState::Converting, started);
    let conversion = tokio::select! {
        biased;
        _ = cancelled(cancel) => {
            return Err(cancelled_error(build, Stage::Conversion));
        }
        converted = ctx.converter.convert(&build.script, convert_opts) => {
            converted.map_err(|source| FrontendError::Conversion {
                platform: build.target.clone(),
                source,
            })?
        }
    };

    let image_config = serde_json::to_vec(&conversion.image_config)?;
    let build_info = serde_json::to_vec(&conversion.build_info)?;

    report(ctx, build, PlatformState::Solving, started);
    let request = SolveRequest {
        definition: conversion.graph.definition,
        cache_imports,
    };
    let reference = tokio::select! {
        biased;
        _ = cancelled(cancel) => {
            return Err(cancelled_error(build, Stage::Solving));
        }
        solved = ctx.gateway.solve(request) => {
            solved.map_err(|source| FrontendError::Solve {
                platform: build.target.clone(),
                source,
            })?
        }
    };

    if *cancel.borrow() {
        return Err(cancelled_error(build, Stage::Solving));
    }

    Ok(BuildResult {
        reference,
        image_config,
        build_info,
        platform: build.target.clone(),
        export_platform: build.export_platform.clone(),
    })
}

/// Resolves once cancellation is requested; never resolves if the sender is gone
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|requested| *requested).await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn cancelled_error(build: &PlatformBuild, stage: Stage) -> FrontendError {
    FrontendError::Cancelled {
        platform: build.target.clone(),
        stage,
    }
}

fn report(ctx: &BuildContext, build: &PlatformBuild, state: PlatformState, started: Instant) {
    ctx.progress.on_progress(&ProgressEvent::PlatformStateChanged {
        platform: build.export_platform.id.clone(),
        state,
        elapsed: started.elapsed(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FrontendConfig;
    use crate::frontend::mock::{MockConverter, MockGateway};
    use crate::frontend::options::BuildOptions;
    use crate::manifest::Manifest;
    use crate::progress::NoOpHandler;
    use std::sync::Mutex;
    use std::time::Duration;

    fn config() -> FrontendConfig {
        FrontendConfig {
            manifest_filename: "pyfront.yaml".to_string(),
            default_architecture: "amd64".to_string(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }

    fn plan(platforms: &str) -> BuildPlan {
        let opts = BuildOptions::from_pairs([format!("platform={}", platforms)]);
        BuildPlan::resolve(&Manifest::default(), &opts, &[], Vec::new(), &config()).unwrap()
    }

    fn context(gateway: MockGateway, converter: MockConverter) -> BuildContext {
        BuildContext {
            gateway: Arc::new(gateway),
            converter: Arc::new(converter),
            progress: Arc::new(NoOpHandler),
            session_id: "test-session".to_string(),
        }
    }

    #[derive(Default)]
    struct RecordingHandler {
        events: Mutex<Vec<(String, PlatformState)>>,
    }

    impl ProgressHandler for RecordingHandler {
        fn on_progress(&self, event: &ProgressEvent) {
            if let ProgressEvent::PlatformStateChanged {
                platform, state, ..
            } = event
            {
                self.events.lock().unwrap().push((platform.clone(), *state));
            }
        }
    }

    #[tokio::test]
    async fn test_results_follow_request_order() {
        let converter = MockConverter::new().with_delay("linux/amd64", Duration::from_millis(40));
        let ctx = context(MockGateway::new(), converter);

        let results = run(&plan("linux/amd64,linux/arm64"), &ctx).await.unwrap();
        let ids: Vec<&str> = results
            .iter()
            .map(|r| r.export_platform.id.as_str())
            .collect();

        assert_eq!(ids, vec!["linux/amd64", "linux/arm64"]);
    }

    #[tokio::test]
    async fn test_state_transitions_reported() {
        let handler = Arc::new(RecordingHandler::default());
        let ctx = BuildContext {
            progress: handler.clone(),
            ..context(MockGateway::new(), MockConverter::new())
        };

        run(&plan("linux/arm64"), &ctx).await.unwrap();

        let states: Vec<PlatformState> = handler
            .events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, state)| *state)
            .collect();
        assert_eq!(
            states,
            vec![
                PlatformState::Pending,
                PlatformState::Converting,
                PlatformState::Solving,
                PlatformState::Done
            ]
        );
    }

    #[tokio::test]
    async fn test_conversion_failure_is_tagged() {
        let converter = MockConverter::new().with_failure("linux/arm64", "unknown instruction");
        let ctx = context(MockGateway::new(), converter);

        let err = run(&plan("linux/arm64"), &ctx).await.unwrap_err();

        assert_eq!(err.stage(), Stage::Conversion);
        assert!(err.to_string().contains("unknown instruction"));
    }

    #[tokio::test]
    async fn test_cancellation_stops_slow_sibling() {
        let gateway = Arc::new(
            MockGateway::new()
                .with_solve_failure("linux/arm64", "out of disk")
                .with_solve_delay("linux/amd64", Duration::from_secs(30)),
        );
        let ctx = BuildContext {
            gateway: gateway.clone(),
            ..context(MockGateway::new(), MockConverter::new())
        };

        let started = Instant::now();
        let err = run(&plan("linux/amd64,linux/arm64"), &ctx).await.unwrap_err();

        assert_eq!(err.stage(), Stage::Solving);
        assert!(err.to_string().contains("out of disk"));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(gateway.solved_platforms().is_empty());
    }
}

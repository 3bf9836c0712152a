//! Logging-based progress handler

use super::{PlatformState, ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::BuildStarted {
                platforms,
                multi_platform,
            } => {
                info!(platforms, multi_platform, "Starting build");
            }
            ProgressEvent::PlatformStateChanged {
                platform,
                state,
                elapsed,
            } => {
                if !state.is_terminal() {
                    debug!(platform = %platform, state = %state, "Platform state changed");
                } else if *state == PlatformState::Failed {
                    warn!(
                        platform = %platform,
                        elapsed_ms = elapsed.as_millis(),
                        "Platform build failed"
                    );
                } else {
                    info!(
                        platform = %platform,
                        elapsed_ms = elapsed.as_millis(),
                        "Platform build complete"
                    );
                }
            }
            ProgressEvent::BuildCompleted {
                platforms,
                total_time,
            } => {
                info!(
                    platforms,
                    total_time_ms = total_time.as_millis(),
                    "Build complete"
                );
            }
            ProgressEvent::BuildFailed { stage, error } => {
                warn!(stage = %stage, error = %error, "Build failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use std::time::Duration;

    #[test]
    fn test_logging_all_events() {
        let handler = LoggingHandler;

        let events = vec![
            ProgressEvent::BuildStarted {
                platforms: 1,
                multi_platform: false,
            },
            ProgressEvent::PlatformStateChanged {
                platform: "linux/arm64".to_string(),
                state: PlatformState::Solving,
                elapsed: Duration::from_millis(20),
            },
            ProgressEvent::PlatformStateChanged {
                platform: "linux/arm64".to_string(),
                state: PlatformState::Failed,
                elapsed: Duration::from_millis(25),
            },
            ProgressEvent::BuildCompleted {
                platforms: 1,
                total_time: Duration::from_millis(30),
            },
            ProgressEvent::BuildFailed {
                stage: Stage::Solving,
                error: "boom".to_string(),
            },
        ];

        for event in events {
            handler.on_progress(&event);
        }
    }
}

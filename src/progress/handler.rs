//! Progress handler trait and events

use crate::error::Stage;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Lifecycle of one platform build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformState {
    Pending,
    Converting,
    Solving,
    Done,
    Failed,
}

impl PlatformState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PlatformState::Done | PlatformState::Failed)
    }
}

impl fmt::Display for PlatformState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlatformState::Pending => "pending",
            PlatformState::Converting => "converting",
            PlatformState::Solving => "solving",
            PlatformState::Done => "done",
            PlatformState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Events emitted while a build runs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Manifest loaded and platforms planned
    BuildStarted {
        platforms: usize,
        multi_platform: bool,
    },

    /// A platform moved to a new state
    PlatformStateChanged {
        platform: String,
        state: PlatformState,
        elapsed: Duration,
    },

    /// All platforms finished and the result was assembled
    BuildCompleted {
        platforms: usize,
        total_time: Duration,
    },

    /// The build stopped at the given stage
    BuildFailed { stage: Stage, error: String },
}

/// Trait for handling progress events during a build
pub trait ProgressHandler: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

//! Frontend error type
//!
//! Every failure carries the stage it came from, which separates manifest
//! authoring mistakes (validation, planning) from backend failures
//! (conversion, solving).

use crate::cache::CacheParseError;
use crate::frontend::gateway::{ContextError, ConversionError, SolveError};
use crate::manifest::ManifestError;
use crate::platform::{PlatformParseError, TargetPlatform};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Validation,
    Planning,
    Context,
    Conversion,
    Solving,
    Export,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validation => "validation",
            Stage::Planning => "planning",
            Stage::Context => "context",
            Stage::Conversion => "conversion",
            Stage::Solving => "solving",
            Stage::Export => "export",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("failed to parse target platforms: {0}")]
    PlatformParse(#[from] PlatformParseError),

    #[error("failed to parse cache import options: {0}")]
    CacheParse(#[from] CacheParseError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("failed to convert build script for {platform}: {source}")]
    Conversion {
        platform: TargetPlatform,
        #[source]
        source: ConversionError,
    },

    #[error("failed to solve build for {platform}: {source}")]
    Solve {
        platform: TargetPlatform,
        #[source]
        source: SolveError,
    },

    #[error("build for {platform} cancelled during {stage}")]
    Cancelled {
        platform: TargetPlatform,
        stage: Stage,
    },

    #[error("build task for {platform} ended unexpectedly: {reason}")]
    TaskAborted {
        platform: TargetPlatform,
        reason: String,
    },

    #[error("failed to encode export metadata: {0}")]
    Export(#[from] serde_json::Error),
}

impl FrontendError {
    pub fn stage(&self) -> Stage {
        match self {
            FrontendError::Manifest(ManifestError::Io { .. }) => Stage::Context,
            FrontendError::Manifest(_) => Stage::Validation,
            FrontendError::PlatformParse(_) | FrontendError::CacheParse(_) => Stage::Planning,
            FrontendError::Context(_) => Stage::Context,
            FrontendError::Conversion { .. } => Stage::Conversion,
            FrontendError::Solve { .. } | FrontendError::TaskAborted { .. } => Stage::Solving,
            FrontendError::Cancelled { stage, .. } => *stage,
            FrontendError::Export(_) => Stage::Export,
        }
    }

    /// True for errors caused by the manifest or build options rather than the backend
    pub fn is_user_error(&self) -> bool {
        matches!(self.stage(), Stage::Validation | Stage::Planning)
    }
}

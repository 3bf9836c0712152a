//! Collaborator seams of the frontend
//!
//! The frontend never executes builds itself. It reads files and solves
//! graphs through a [`GatewayClient`], and turns build scripts into graphs
//! through a [`ScriptConverter`].

use crate::cache::CacheImportEntry;
use crate::frontend::options::BuildOptions;
use crate::platform::Platform;
use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Local holding the manifest
pub const LOCAL_NAME_MANIFEST: &str = "dockerfile";
/// Local holding the build context
pub const LOCAL_NAME_CONTEXT: &str = "context";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConversionError {
    message: String,
}

impl ConversionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SolveError {
    message: String,
}

impl SolveError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("file {path} not found in local {local:?}")]
    NotFound { local: String, path: String },

    #[error("failed to read {path} from local {local:?}: {message}")]
    Read {
        local: String,
        path: String,
        message: String,
    },
}

/// Opaque handle to a solved build graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Reference(String);

impl Reference {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Content address of a graph definition
    pub fn from_definition(definition: &[u8]) -> Self {
        let digest = Sha256::digest(definition);
        Self(format!("sha256:{}", hex::encode(digest)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serialized build graph produced by a converter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildGraph {
    pub definition: Vec<u8>,
}

/// Converter output for one platform
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub graph: BuildGraph,
    /// OCI image config of the resulting image
    pub image_config: serde_json::Value,
    pub build_info: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    pub session_id: String,
    pub build_args: BTreeMap<String, String>,
    /// Ignore rules applied to the build context
    pub excludes: Vec<String>,
    pub build_platforms: Vec<Platform>,
    /// `None` lets the converter pick its default platform
    pub target_platform: Option<Platform>,
    /// Prefix progress output with the platform, set for multi-platform builds
    pub prefix_platform: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveRequest {
    pub definition: Vec<u8>,
    pub cache_imports: Vec<CacheImportEntry>,
}

/// What the client sent along with the build request
#[derive(Debug, Clone, Default)]
pub struct BuildOpts {
    pub opts: BuildOptions,
    pub session_id: String,
    /// Platforms of the first worker, preferred first
    pub worker_platforms: Vec<Platform>,
}

#[async_trait]
pub trait ScriptConverter: Send + Sync {
    async fn convert(
        &self,
        script: &str,
        opts: &ConvertOptions,
    ) -> Result<Conversion, ConversionError>;
}

#[async_trait]
pub trait GatewayClient: Send + Sync {
    fn build_opts(&self) -> BuildOpts;

    /// Reads `path` from a named local; `Ok(None)` when it does not exist
    async fn read_file(&self, local: &str, path: &str) -> Result<Option<Vec<u8>>, ContextError>;

    async fn solve(&self, request: SolveRequest) -> Result<Reference, SolveError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_from_definition_is_content_addressed() {
        let a = Reference::from_definition(b"graph");
        let b = Reference::from_definition(b"graph");
        let c = Reference::from_definition(b"other");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.as_str().starts_with("sha256:"));
        assert_eq!(a.as_str().len(), "sha256:".len() + 64);
    }

    #[test]
    fn test_context_error_display() {
        let err = ContextError::NotFound {
            local: LOCAL_NAME_MANIFEST.to_string(),
            path: "pyfront.yaml".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "file pyfront.yaml not found in local \"dockerfile\""
        );
    }
}

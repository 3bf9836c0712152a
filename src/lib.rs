//! pyfront - buildkit frontend for Python build manifests
//!
//! Users describe a Python application in a small YAML manifest instead of a
//! Dockerfile. pyfront validates the manifest, synthesizes a deterministic
//! two-stage build script from it and drives a multi-platform build through
//! the build gateway.
//!
//! # Core Concepts
//!
//! - **Manifest**: Python version, build packages, pip dependencies, package
//!   indices, environment, labels and the project to run
//! - **Script synthesis**: a pure function of the manifest and a target
//!   architecture producing the build and runtime stages
//! - **Build plan**: target platforms, cache imports and build arguments
//!   resolved from frontend options before any work starts
//! - **Orchestration**: one concurrent task per platform, failing fast on the
//!   first error
//!
//! # Example Usage
//!
//! ```ignore
//! use pyfront::{Frontend, FrontendConfig};
//! use std::sync::Arc;
//!
//! async fn build(
//!     gateway: Arc<dyn pyfront::frontend::GatewayClient>,
//!     converter: Arc<dyn pyfront::frontend::ScriptConverter>,
//! ) -> Result<(), pyfront::FrontendError> {
//!     let frontend = Frontend::new(gateway, converter, FrontendConfig::default());
//!     let result = frontend.build().await?;
//!     println!("exporter metadata keys: {:?}", result.metadata.keys());
//!     Ok(())
//! }
//! ```
//!
//! # Project Structure
//!
//! - [`manifest`] and [`validation`]: parsing and checking the manifest
//! - [`dependency`]: pip entry classification and credential masking
//! - [`script`]: build script synthesis
//! - [`platform`] and [`cache`]: build option parsing
//! - [`frontend`]: gateway seams, planning, orchestration and result export

pub mod cache;
pub mod cli;
pub mod config;
pub mod dependency;
pub mod error;
pub mod frontend;
pub mod manifest;
pub mod platform;
pub mod progress;
pub mod script;
pub mod util;
pub mod validation;

pub use cache::CacheImportEntry;
pub use config::{ConfigError, FrontendConfig};
pub use dependency::{ClassifiedDependencies, DependencyKind};
pub use error::{FrontendError, Stage};
pub use frontend::{BuildOptions, BuildPlan, FinalResult, Frontend};
pub use manifest::{Index, Manifest, ManifestError};
pub use platform::{Platform, TargetPlatform};
pub use script::{synthesize, RuntimeBase};
pub use util::{init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

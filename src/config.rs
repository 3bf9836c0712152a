//! Configuration management for pyfront
//!
//! Settings are loaded from environment variables with sensible defaults.
//!
//! # Environment Variables
//!
//! - `PYFRONT_MANIFEST`: manifest filename when no `filename` option is given - default: "pyfront.yaml"
//! - `PYFRONT_DEFAULT_ARCH`: architecture for builds without a target platform
//!   when the worker reports none - default: the host architecture
//! - `PYFRONT_LOG_LEVEL`: logging level - default: "info"
//! - `PYFRONT_LOG_JSON`: JSON log output (true|false) - default: "false"
//!
//! # Example
//!
//! ```no_run
//! use pyfront::FrontendConfig;
//!
//! let config = FrontendConfig::default();
//! config.validate().expect("Invalid configuration");
//! println!("{}", config.default_platform());
//! ```

use crate::frontend::options::DEFAULT_MANIFEST_FILENAME;
use crate::platform::{parse_architecture, Platform, DEFAULT_OS};
use std::env;
use std::fmt;
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";

pub const ENV_MANIFEST: &str = "PYFRONT_MANIFEST";
pub const ENV_DEFAULT_ARCH: &str = "PYFRONT_DEFAULT_ARCH";
pub const ENV_LOG_LEVEL: &str = "PYFRONT_LOG_LEVEL";
pub const ENV_LOG_JSON: &str = "PYFRONT_LOG_JSON";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

#[derive(Debug, Clone)]
pub struct FrontendConfig {
    /// Manifest filename looked up in the build context
    pub manifest_filename: String,

    /// Architecture for the solver-default platform, already normalized
    pub default_architecture: String,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    pub log_json: bool,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        let manifest_filename = env::var(ENV_MANIFEST)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_MANIFEST_FILENAME.to_string());

        let default_architecture = env::var(ENV_DEFAULT_ARCH)
            .ok()
            .filter(|v| !v.is_empty())
            .map(|arch| Platform::new(DEFAULT_OS, &arch, None).architecture)
            .unwrap_or_else(|| Platform::host().architecture);

        let log_level = env::var(ENV_LOG_LEVEL)
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        let log_json = env::var(ENV_LOG_JSON)
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        Self {
            manifest_filename,
            default_architecture,
            log_level,
            log_json,
        }
    }
}

impl FrontendConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.manifest_filename.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Manifest filename cannot be empty".to_string(),
            ));
        }

        if parse_architecture(&self.default_architecture).is_err() {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid default architecture: {:?}",
                self.default_architecture
            )));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    /// Platform used when neither the request nor the worker names one
    pub fn default_platform(&self) -> Platform {
        Platform::new(DEFAULT_OS, &self.default_architecture, None)
    }
}

impl fmt::Display for FrontendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "pyfront Configuration:")?;
        writeln!(f, "  Manifest: {}", self.manifest_filename)?;
        writeln!(f, "  Default Platform: {}", self.default_platform())?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        writeln!(f, "  JSON Logs: {}", self.log_json)?;
        Ok(())
    }
}

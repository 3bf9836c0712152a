//! In-process collaborators for tests and dry runs
//!
//! [`MockConverter`] writes the platform ID as the first line of every graph
//! definition so that [`MockGateway`] can tell which platform a solve
//! request belongs to.

use crate::frontend::gateway::{
    BuildGraph, BuildOpts, ContextError, Conversion, ConversionError, ConvertOptions,
    GatewayClient, Reference, ScriptConverter, SolveError, SolveRequest,
};
use crate::frontend::options::BuildOptions;
use crate::platform::Platform;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Marker written for conversions without a target or build platform
const UNKNOWN_PLATFORM: &str = "unknown";

/// One recorded `convert` call
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    pub platform: String,
    pub script: String,
    pub opts: ConvertOptions,
}

#[derive(Default)]
pub struct MockConverter {
    failures: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    conversions: Mutex<Vec<RecordedConversion>>,
}

impl MockConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure(mut self, platform: &str, message: impl Into<String>) -> Self {
        self.failures.insert(platform.to_string(), message.into());
        self
    }

    pub fn with_delay(mut self, platform: &str, delay: Duration) -> Self {
        self.delays.insert(platform.to_string(), delay);
        self
    }

    pub fn conversions(&self) -> Vec<RecordedConversion> {
        self.conversions.lock().unwrap().clone()
    }

    fn platform_of(opts: &ConvertOptions) -> String {
        opts.target_platform
            .as_ref()
            .or_else(|| opts.build_platforms.first())
            .map(Platform::id)
            .unwrap_or_else(|| UNKNOWN_PLATFORM.to_string())
    }
}

#[async_trait]
impl ScriptConverter for MockConverter {
    async fn convert(
        &self,
        script: &str,
        opts: &ConvertOptions,
    ) -> Result<Conversion, ConversionError> {
        let platform = Self::platform_of(opts);

        if let Some(delay) = self.delays.get(&platform) {
            tokio::time::sleep(*delay).await;
        }

        self.conversions.lock().unwrap().push(RecordedConversion {
            platform: platform.clone(),
            script: script.to_string(),
            opts: opts.clone(),
        });

        if let Some(message) = self.failures.get(&platform) {
            return Err(ConversionError::new(message.clone()));
        }

        let target = opts
            .target_platform
            .clone()
            .or_else(|| opts.build_platforms.first().cloned());

        Ok(Conversion {
            graph: BuildGraph {
                definition: format!("{}\n{}", platform, script).into_bytes(),
            },
            image_config: serde_json::json!({
                "architecture": target.as_ref().map(|p| p.architecture.clone()),
                "os": target.as_ref().map(|p| p.os.clone()),
                "config": {},
            }),
            build_info: serde_json::json!({ "sources": [] }),
        })
    }
}

pub struct MockGateway {
    build_opts: BuildOpts,
    files: HashMap<(String, String), Vec<u8>>,
    read_failures: HashMap<(String, String), String>,
    solve_failures: HashMap<String, String>,
    solve_delays: HashMap<String, Duration>,
    solves: Mutex<Vec<(String, SolveRequest)>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            build_opts: BuildOpts {
                opts: BuildOptions::default(),
                session_id: "mock-session".to_string(),
                worker_platforms: Vec::new(),
            },
            files: HashMap::new(),
            read_failures: HashMap::new(),
            solve_failures: HashMap::new(),
            solve_delays: HashMap::new(),
            solves: Mutex::new(Vec::new()),
        }
    }

    pub fn with_opts(mut self, opts: BuildOptions) -> Self {
        self.build_opts.opts = opts;
        self
    }

    pub fn with_worker_platforms(mut self, platforms: Vec<Platform>) -> Self {
        self.build_opts.worker_platforms = platforms;
        self
    }

    pub fn with_file(mut self, local: &str, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.files
            .insert((local.to_string(), path.to_string()), contents.into());
        self
    }

    /// Makes `read_file` fail for `path`, as a gateway does when the client
    /// session drops mid-transfer
    pub fn with_read_failure(mut self, local: &str, path: &str, message: impl Into<String>) -> Self {
        self.read_failures
            .insert((local.to_string(), path.to_string()), message.into());
        self
    }

    pub fn with_solve_failure(mut self, platform: &str, message: impl Into<String>) -> Self {
        self.solve_failures
            .insert(platform.to_string(), message.into());
        self
    }

    pub fn with_solve_delay(mut self, platform: &str, delay: Duration) -> Self {
        self.solve_delays.insert(platform.to_string(), delay);
        self
    }

    /// Platforms whose solve completed successfully, in completion order
    pub fn solved_platforms(&self) -> Vec<String> {
        self.solves
            .lock()
            .unwrap()
            .iter()
            .map(|(platform, _)| platform.clone())
            .collect()
    }

    pub fn solve_requests(&self) -> Vec<SolveRequest> {
        self.solves
            .lock()
            .unwrap()
            .iter()
            .map(|(_, request)| request.clone())
            .collect()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayClient for MockGateway {
    fn build_opts(&self) -> BuildOpts {
        self.build_opts.clone()
    }

    async fn read_file(&self, local: &str, path: &str) -> Result<Option<Vec<u8>>, ContextError> {
        let key = (local.to_string(), path.to_string());
        if let Some(message) = self.read_failures.get(&key) {
            return Err(ContextError::Read {
                local: key.0,
                path: key.1,
                message: message.clone(),
            });
        }
        Ok(self.files.get(&key).cloned())
    }

    async fn solve(&self, request: SolveRequest) -> Result<Reference, SolveError> {
        let platform = request
            .definition
            .split(|b| *b == b'\n')
            .next()
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .unwrap_or_default();

        if let Some(delay) = self.solve_delays.get(&platform) {
            tokio::time::sleep(*delay).await;
        }

        if let Some(message) = self.solve_failures.get(&platform) {
            return Err(SolveError::new(message.clone()));
        }

        let reference = Reference::from_definition(&request.definition);
        self.solves.lock().unwrap().push((platform, request));
        Ok(reference)
    }
}

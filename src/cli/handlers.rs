//! Subcommand handlers
//!
//! Each handler returns the process exit code. Errors are printed to stderr
//! with their full cause chain.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::cli::commands::{InspectArgs, PlanArgs, ScriptArgs};
use crate::cli::output::{InspectReport, OutputFormatter};
use crate::config::FrontendConfig;
use crate::frontend::{parse_ignore_rules, BuildOptions, BuildPlan, DOCKERIGNORE_FILENAME};
use crate::manifest::Manifest;
use crate::platform::parse_architecture;
use crate::script::synthesize;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

pub fn handle_script(args: &ScriptArgs) -> i32 {
    exit_code(run_script(args))
}

pub fn handle_inspect(args: &InspectArgs) -> i32 {
    exit_code(run_inspect(args))
}

pub async fn handle_plan(args: &PlanArgs) -> i32 {
    exit_code(run_plan(args).await)
}

fn run_script(args: &ScriptArgs) -> Result<()> {
    let config = FrontendConfig::default();
    let arch = architecture(args.arch.as_deref(), &config)?;
    let manifest = load_manifest(args.file.as_deref(), &config)?;

    let script = synthesize(&manifest, &arch);

    match &args.output {
        Some(path) => {
            std::fs::write(path, &script)
                .with_context(|| format!("Failed to write script to {}", path.display()))?;
            info!(path = %path.display(), arch = %arch, "Wrote build script");
        }
        None => print!("{}", script),
    }
    Ok(())
}

fn run_inspect(args: &InspectArgs) -> Result<()> {
    let config = FrontendConfig::default();
    let arch = architecture(args.arch.as_deref(), &config)?;
    let manifest = load_manifest(args.file.as_deref(), &config)?;

    let report = InspectReport::new(&manifest, &arch);
    let output = OutputFormatter::new(args.format.into()).format(&report)?;
    println!("{}", output.trim_end());
    Ok(())
}

async fn run_plan(args: &PlanArgs) -> Result<()> {
    let config = FrontendConfig::default();
    let opts = BuildOptions::from_pairs(&args.opts);

    let path = match &args.file {
        Some(path) => path.clone(),
        None => {
            let filename = opts.manifest_filename(&config.manifest_filename);
            args.context
                .as_deref()
                .map(|dir| dir.join(filename))
                .unwrap_or_else(|| PathBuf::from(filename))
        }
    };
    let manifest = load_manifest(Some(&path), &config)?;

    let excludes = match &args.context {
        Some(dir) => read_excludes(dir).await?,
        None => Vec::new(),
    };

    let plan = BuildPlan::resolve(&manifest, &opts, &[], excludes, &config)
        .context("Failed to resolve build plan")?;
    let summary = serde_json::to_string_pretty(&plan.summary())
        .context("Failed to serialize build plan to JSON")?;
    println!("{}", summary);
    Ok(())
}

async fn read_excludes(context_dir: &Path) -> Result<Vec<String>> {
    let path = context_dir.join(DOCKERIGNORE_FILENAME);
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Ok(parse_ignore_rules(&content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No ignore file in build context");
            Ok(Vec::new())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

fn load_manifest(file: Option<&Path>, config: &FrontendConfig) -> Result<Manifest> {
    let path = file
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.manifest_filename));

    debug!(path = %path.display(), "Loading manifest");
    Manifest::from_path(&path).with_context(|| format!("Invalid manifest {}", path.display()))
}

fn architecture(requested: Option<&str>, config: &FrontendConfig) -> Result<String> {
    match requested {
        Some(arch) => parse_architecture(arch).context("Invalid --arch"),
        None => Ok(config.default_architecture.clone()),
    }
}

fn exit_code(result: Result<()>) -> i32 {
    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            EXIT_FAILURE
        }
    }
}

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Buildkit frontend for Python build manifests
#[derive(Parser, Debug)]
#[command(
    name = "pyfront",
    about = "Turns a Python build manifest into container build scripts and multi-platform build plans",
    version,
    author,
    long_about = "pyfront reads a YAML manifest describing a Python application's dependencies, \
                  environment and runtime image, and synthesizes a deterministic multi-stage \
                  build script from it. The same manifest drives multi-platform builds when \
                  pyfront runs as a build frontend."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Print the build script synthesized from a manifest",
        long_about = "Validates the manifest and prints the multi-stage build script for one \
                      target architecture.\n\n\
                      Examples:\n  \
                      pyfront script\n  \
                      pyfront script -f app/pyfront.yaml --arch arm64"
    )]
    Script(ScriptArgs),

    #[command(
        about = "Show the validated manifest and how its dependencies are installed",
        long_about = "Prints the normalized manifest, the classified dependencies with \
                      credentials masked, and the runtime base chosen for an architecture.\n\n\
                      Examples:\n  \
                      pyfront inspect\n  \
                      pyfront inspect --format json"
    )]
    Inspect(InspectArgs),

    #[command(
        about = "Resolve build options into a build plan",
        long_about = "Resolves target platforms, cache imports and build arguments from \
                      frontend options the way a build request would, and prints the plan as \
                      JSON.\n\n\
                      Examples:\n  \
                      pyfront plan --opt platform=linux/amd64,linux/arm64\n  \
                      pyfront plan --opt cache-from=registry.example.com/app:cache --context ."
    )]
    Plan(PlanArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ScriptArgs {
    #[arg(
        short = 'f',
        long,
        value_name = "FILE",
        help = "Manifest path (defaults to PYFRONT_MANIFEST or pyfront.yaml)"
    )]
    pub file: Option<PathBuf>,

    #[arg(
        long,
        value_name = "ARCH",
        help = "Target architecture, e.g. amd64 or aarch64 (defaults to PYFRONT_DEFAULT_ARCH or the host)"
    )]
    pub arch: Option<String>,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write the script to a file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct InspectArgs {
    #[arg(short = 'f', long, value_name = "FILE", help = "Manifest path")]
    pub file: Option<PathBuf>,

    #[arg(long, value_name = "ARCH", help = "Architecture used to pick the runtime base")]
    pub arch: Option<String>,

    #[arg(long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct PlanArgs {
    #[arg(short = 'f', long, value_name = "FILE", help = "Manifest path")]
    pub file: Option<PathBuf>,

    #[arg(
        long = "opt",
        value_name = "KEY=VALUE",
        help = "Frontend option, may be repeated (platform, cache-from, cache-imports, build-arg:NAME)"
    )]
    pub opts: Vec<String>,

    #[arg(
        long,
        value_name = "DIR",
        help = "Build context directory to read .dockerignore from"
    )]
    pub context: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_default_script_args() {
        let args = CliArgs::parse_from(["pyfront", "script"]);
        match args.command {
            Commands::Script(script_args) => {
                assert!(script_args.file.is_none());
                assert!(script_args.arch.is_none());
                assert!(script_args.output.is_none());
            }
            _ => panic!("Expected Script command"),
        }
    }

    #[test]
    fn test_script_with_options() {
        let args = CliArgs::parse_from([
            "pyfront",
            "script",
            "-f",
            "app/pyfront.yaml",
            "--arch",
            "arm64",
        ]);
        match args.command {
            Commands::Script(script_args) => {
                assert_eq!(script_args.file, Some(PathBuf::from("app/pyfront.yaml")));
                assert_eq!(script_args.arch.as_deref(), Some("arm64"));
            }
            _ => panic!("Expected Script command"),
        }
    }

    #[test]
    fn test_inspect_format() {
        let args = CliArgs::parse_from(["pyfront", "inspect", "--format", "yaml"]);
        match args.command {
            Commands::Inspect(inspect_args) => {
                assert_eq!(inspect_args.format, OutputFormatArg::Yaml);
            }
            _ => panic!("Expected Inspect command"),
        }
    }

    #[test]
    fn test_plan_repeated_opts() {
        let args = CliArgs::parse_from([
            "pyfront",
            "plan",
            "--opt",
            "platform=linux/amd64,linux/arm64",
            "--opt",
            "build-arg:HTTP_PROXY=http://proxy:3128",
        ]);
        match args.command {
            Commands::Plan(plan_args) => {
                assert_eq!(plan_args.opts.len(), 2);
                assert!(plan_args.context.is_none());
            }
            _ => panic!("Expected Plan command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from(["pyfront", "-v", "script"]);
        assert!(args.verbose);
        assert!(!args.quiet);

        let args = CliArgs::parse_from(["pyfront", "--log-level", "debug", "inspect"]);
        assert_eq!(args.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(CliArgs::try_parse_from(["pyfront", "-q", "-v", "script"]).is_err());
    }
}

use pyfront::cli::commands::{CliArgs, Commands};
use pyfront::cli::handlers::{handle_inspect, handle_plan, handle_script};
use pyfront::util::logging::parse_level;
use pyfront::{init_from_env, init_logging, LoggingConfig, VERSION};

use clap::Parser;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("pyfront v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Script(script_args) => handle_script(script_args),
        Commands::Inspect(inspect_args) => handle_inspect(inspect_args),
        Commands::Plan(plan_args) => handle_plan(plan_args).await,
    };

    std::process::exit(exit_code);
}

/// Command-line flags win over `PYFRONT_LOG_LEVEL`
fn init_logging_from_args(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        Some(parse_level(level_str))
    } else if args.verbose {
        Some(Level::DEBUG)
    } else if args.quiet {
        Some(Level::ERROR)
    } else {
        None
    };

    match level {
        Some(level) => init_logging(LoggingConfig::with_level(level)),
        None => init_from_env(),
    }
}

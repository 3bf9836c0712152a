pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, InspectArgs, OutputFormatArg, PlanArgs, ScriptArgs};
pub use output::{InspectReport, OutputFormat, OutputFormatter};

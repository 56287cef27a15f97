// CLI module
// Command-line interface, argument parsing and subcommand execution

mod args;
mod commands;

pub use args::{
    CliArgs, Command, FundArgs, GatewayArgs, ProcessingArgs, QuoteArgs, ReconcileArgs,
    ReplayArgs, StatsArgs, StrategyType,
};
pub use commands::run;

use clap::Parser;

/// Parse command-line arguments using clap
///
/// If parsing fails (e.g., invalid arguments, missing required arguments, or
/// the --help flag), clap displays an error message or help text and exits
/// the process.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}

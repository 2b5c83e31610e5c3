// ghtasks CLI entry point.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod credentials;
mod exit_code;
mod github;
mod output;
mod sync;

use exit_code::ExitCode;

#[derive(Parser)]
#[command(name = "ghtasks", version, about = "Keep GitHub issues and pull requests in a markdown task note")]
struct Cli {
    /// Config file (defaults to ~/.ghtasks/config.toml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log debug output to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: commands::Command,
}

fn main() -> process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let global = commands::GlobalArgs { config: cli.config };
    match commands::run(cli.command, &global) {
        Ok(()) => ExitCode::Success.into(),
        // Commands print their own errors.
        Err(error) => ExitCode::from_error(&error).into(),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "capture-worker")]
#[command(about = "Capture worker control plane", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file to use instead of the default location
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Run the worker and report status to webhook subscribers (default)
    Run,
    /// Validate the config and print the resolved dispatcher url and subscribers
    CheckConfig,
    /// Print version information
    Version,
}

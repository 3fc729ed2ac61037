//! mediatag command line interface
//!
//! Runs a GStreamer pipeline with metadata applied through the tag setter
//! interface, and exposes the bundled `gobin` plugin for inspection.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod logging;

#[derive(Debug, Parser)]
#[command(name = "mediatag", version, about = "Apply metadata to GStreamer pipelines")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build the pipeline, apply tags and run it to completion
    Tag(commands::tag::TagArgs),
    /// Write a default settings file
    InitConfig(commands::init_config::InitConfigArgs),
    /// Show metadata of the bundled gobin plugin
    PluginInfo(commands::plugin_info::PluginInfoArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.log_dir.as_deref());

    match cli.command {
        Command::Tag(args) => commands::tag::run(args).await,
        Command::InitConfig(args) => commands::init_config::run(args),
        Command::PluginInfo(args) => commands::plugin_info::run(args),
    }
}

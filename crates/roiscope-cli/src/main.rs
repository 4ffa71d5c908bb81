mod commands;
mod progress;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "roiscope", about = "ROI statistics and traces over numbered array files")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the items found in a directory
    Scan(commands::scan::ScanArgs),
    /// Image statistics and quality metrics of one item
    Stats(commands::stats::StatsArgs),
    /// Average several items into one array
    Average(commands::average::AverageArgs),
    /// Replay a ROI session and compute its traces
    Trace(commands::trace::TraceArgs),
    /// Print or save a default session config
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Scan(args) => commands::scan::run(args),
        Commands::Stats(args) => commands::stats::run(args),
        Commands::Average(args) => commands::average::run(args),
        Commands::Trace(args) => commands::trace::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}

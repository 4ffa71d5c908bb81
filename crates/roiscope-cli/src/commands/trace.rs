use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use roiscope_core::catalog::ItemCatalog;
use roiscope_core::config::SessionConfig;
use roiscope_core::session::run_session;
use tracing::info;

use crate::progress::BarReporter;

#[derive(Args)]
pub struct TraceArgs {
    /// Session config (TOML)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &TraceArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.config)
        .with_context(|| format!("Failed to read {}", args.config.display()))?;
    let config: SessionConfig = toml::from_str(&text)
        .with_context(|| format!("Invalid session config {}", args.config.display()))?;
    info!(
        events = config.roi_events.len(),
        "Loaded session from {}",
        args.config.display()
    );

    let mut catalog = ItemCatalog::new();
    let reporter = BarReporter::new()?;
    let output = run_session(&config, &mut catalog, &reporter).context("Session failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        crate::summary::print_session_summary(&config, &output);
    }
    Ok(())
}

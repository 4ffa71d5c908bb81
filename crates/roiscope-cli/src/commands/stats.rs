use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use roiscope_core::catalog::ItemCatalog;
use roiscope_core::statistics::{basic_statistics, image_quality_metrics};
use serde_json::json;

#[derive(Args)]
pub struct StatsArgs {
    /// Directory holding the item files
    pub dir: PathBuf,

    /// Item number
    pub item: u32,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &StatsArgs) -> Result<()> {
    let mut catalog = ItemCatalog::new();
    catalog
        .set_directory(&args.dir)
        .with_context(|| format!("Failed to scan {}", args.dir.display()))?;
    let frame = catalog
        .load_item(args.item, false)
        .with_context(|| format!("Failed to load item {}", args.item))?;

    let stats = basic_statistics(&frame).context("Failed to compute image statistics")?;
    let quality = image_quality_metrics(&frame).context("Failed to compute quality metrics")?;

    if args.json {
        let out = json!({
            "item": args.item,
            "metadata": catalog.metadata(args.item),
            "statistics": stats,
            "quality": quality,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        crate::summary::print_statistics_summary(
            args.item,
            catalog.metadata(args.item),
            &stats,
            &quality,
        );
    }
    Ok(())
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use roiscope_core::catalog::ItemCatalog;

use crate::progress::BarReporter;

#[derive(Args)]
pub struct ScanArgs {
    /// Directory holding the item files
    pub dir: PathBuf,

    /// Load every item and show its shape, dtype and size
    #[arg(long)]
    pub metadata: bool,
}

pub fn run(args: &ScanArgs) -> Result<()> {
    let mut catalog = ItemCatalog::new();
    let count = catalog
        .set_directory(&args.dir)
        .with_context(|| format!("Failed to scan {}", args.dir.display()))?;
    let items = catalog.available_items();

    if !args.metadata {
        println!("Found {} items in {}", count, args.dir.display());
        let list: Vec<String> = items.iter().map(|n| n.to_string()).collect();
        println!("{}", list.join(", "));
        return Ok(());
    }

    let reporter = BarReporter::new()?;
    catalog.load_multiple_with_progress(&items, &reporter);
    crate::summary::print_scan_summary(&args.dir, &catalog);
    Ok(())
}

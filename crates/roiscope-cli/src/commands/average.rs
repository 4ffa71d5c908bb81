use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use roiscope_core::catalog::ItemCatalog;
use roiscope_core::io::npy::write_npy;

use crate::progress::BarReporter;

#[derive(Args)]
pub struct AverageArgs {
    /// Directory holding the item files
    pub dir: PathBuf,

    /// Item numbers to average
    #[arg(required = true)]
    pub items: Vec<u32>,

    /// Save the average as a .npy file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &AverageArgs) -> Result<()> {
    let mut catalog = ItemCatalog::new();
    catalog
        .set_directory(&args.dir)
        .with_context(|| format!("Failed to scan {}", args.dir.display()))?;

    let reporter = BarReporter::new()?;
    let average = catalog
        .average_items_with_progress(&args.items, &reporter)
        .context("Failed to average items")?;

    let loaded = args
        .items
        .iter()
        .filter(|&&item| catalog.is_cached(item))
        .count();
    let mean = average.mean().unwrap_or(f64::NAN);
    println!(
        "Averaged {} of {} items, shape {:?}, mean {:.6}",
        loaded,
        args.items.len(),
        average.shape(),
        mean
    );

    if let Some(ref path) = args.output {
        write_npy(path, &average)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Saved to {}", path.display());
    }
    Ok(())
}

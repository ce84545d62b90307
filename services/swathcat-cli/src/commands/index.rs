//! `swathcat index <path> [--product NAME]`: scans a directory of existing
//! files into the active registry's catalog.

use std::path::PathBuf;

use anyhow::{bail, Context as _};
use clap::Args;
use tracing::info;

use swathcat_config::Context;
use swathcat_product::ProductGranuleSource;

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Directory to scan for data files
    path: PathBuf,

    /// Name of a single registered product to index as (default: try
    /// every registered product against each file)
    #[arg(long)]
    product: Option<String>,
}

pub fn execute(args: IndexArgs) -> anyhow::Result<()> {
    if !args.path.is_dir() {
        bail!("{} is not a directory", args.path.display());
    }

    let context = Context::load().context("loading swathcat configuration")?;
    let registry = context.active_registry();

    let candidates: Vec<_> = if let Some(name) = &args.product {
        vec![swathcat_product::registry::get(name)?]
    } else {
        swathcat_product::registry::names()
            .iter()
            .filter_map(|n| swathcat_product::registry::get(n).ok())
            .collect()
    };
    if candidates.is_empty() {
        bail!("no registered products to match files against");
    }

    let mut indexed = 0usize;
    for entry in walkdir::WalkDir::new(&args.path).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        for product in &candidates {
            let record = swathcat_granule::FileRecord::from_local_path(product.name(), entry.path());
            if !product.matches(&record) {
                continue;
            }
            let source = ProductGranuleSource(product.as_ref());
            registry.add(&record, &source)?;
            indexed += 1;
            break;
        }
    }

    info!(indexed, path = %args.path.display(), "indexing complete");
    println!("indexed {indexed} file(s) under {}", args.path.display());
    Ok(())
}

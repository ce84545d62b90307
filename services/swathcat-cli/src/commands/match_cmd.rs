//! `swathcat match <product-l> <product-r> [--time-diff SECS] [--merge]`.

use anyhow::Context as _;
use chrono::Duration;
use clap::Args;
use comfy_table::{Cell, Table};

use swathcat_config::Context;
use swathcat_match::{find_matches, MatchOptions};

#[derive(Args, Debug)]
pub struct MatchArgs {
    /// Name of the registered left-hand product
    product_l: String,
    /// Name of the registered right-hand product
    product_r: String,

    /// Maximum time difference between matched granules, in seconds
    #[arg(long, default_value_t = 300)]
    time_diff: i64,

    /// Merge adjacent granules on either side of a match before reporting
    #[arg(long)]
    merge: bool,
}

pub fn execute(args: MatchArgs) -> anyhow::Result<()> {
    let context = Context::load().context("loading swathcat configuration")?;
    let registry = context.active_registry();

    let left = registry.get_index(&args.product_l, None).context("loading left index")?;
    let right = registry.get_index(&args.product_r, None).context("loading right index")?;

    let options = MatchOptions { time_diff: Duration::seconds(args.time_diff), merge: args.merge, n_workers: None };
    let matches = find_matches(&left, &right, &options);

    let mut table = Table::new();
    table.set_header(vec!["left rows", "right rows", "matched pairs"]);
    table.add_row(vec![Cell::new(left.len()), Cell::new(right.len()), Cell::new(matches.len())]);
    println!("{table}");

    Ok(())
}

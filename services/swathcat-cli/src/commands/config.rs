//! `swathcat config`: prints the resolved configuration and registry
//! chain.

use anyhow::Context as _;
use clap::Args;
use comfy_table::{Cell, Table};

use swathcat_config::Config;

#[derive(Args, Debug)]
pub struct ConfigArgs {}

pub fn execute(_args: ConfigArgs) -> anyhow::Result<()> {
    let config = Config::load_default().context("loading swathcat configuration")?;

    println!("general.identity_file = {:?}", config.general.identity_file);

    let mut table = Table::new();
    table.set_header(vec!["registry", "path", "is_data_dir", "transparent", "active"]);
    let active_name = config.active_registry().map(|(name, _)| name.clone());
    for (name, reg) in &config.registries {
        let is_active = active_name.as_deref() == Some(name.as_str());
        table.add_row(vec![
            Cell::new(name),
            Cell::new(reg.path.display().to_string()),
            Cell::new(reg.is_data_dir.to_string()),
            Cell::new(reg.transparent.to_string()),
            Cell::new(if is_active { "*" } else { "" }),
        ]);
    }
    println!("{table}");
    Ok(())
}

//! Command-line interface for the swathcat catalog engine.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "swathcat")]
#[command(about = "Geospatial data-file catalog and retrieval engine")]
struct Cli {
    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Index existing files into the active registry
    Index(commands::index::IndexArgs),
    /// Print the resolved configuration
    Config(commands::config::ConfigArgs),
    /// Manage provider credential references
    Account(commands::account::AccountArgs),
    /// Run the match engine between two products
    Match(commands::match_cmd::MatchArgs),
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).with_target(true).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Index(args) => commands::index::execute(args),
        Commands::Config(args) => commands::config::execute(args),
        Commands::Account(args) => commands::account::execute(args),
        Commands::Match(args) => commands::match_cmd::execute(args),
    }
}

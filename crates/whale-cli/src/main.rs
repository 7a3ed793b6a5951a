mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use whale_engine::WhalePaths;

#[derive(Parser)]
#[command(
    name = "whale",
    version,
    about = "Extract warehouse metadata into markdown documentation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Whale home directory (default: $WHALE_HOME, then ~/.whale)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Connections file (default: <base-dir>/config/connections.yaml)
    #[arg(long, global = true)]
    connections: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract metadata for every configured connection
    Run {
        /// Only list tables where the source supports it; skip columns
        #[arg(long)]
        no_full_extraction: bool,
        /// Log every loaded table
        #[arg(long)]
        verbose: bool,
    },
    /// Parse and validate the connections file
    Check,
    /// List configured connections
    Connections,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Run { verbose: true, .. });
    logging::init(&cli.log_level, verbose);

    let mut paths = WhalePaths::resolve(cli.base_dir.as_deref());
    if let Some(connections) = cli.connections {
        paths = paths.with_connections_file(connections);
    }

    match cli.command {
        Commands::Run {
            no_full_extraction,
            verbose,
        } => commands::run::execute(paths, !no_full_extraction, verbose),
        Commands::Check => commands::check::execute(&paths),
        Commands::Connections => commands::connections::execute(&paths),
    }
}

//! Unitgraph CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "unitgraph")]
#[command(about = "Compilation-unit dependency graph and invalidation queries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Repository root path (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Config file (defaults to unitgraph.toml under the root)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read the graph from the cache written by `index` when available
    #[arg(long)]
    cached: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load all manifests, print statistics and write the cache
    Index,
    /// Show which units own the given files
    Owners {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List every unit that transitively imports the given units
    Affected {
        #[arg(required = true)]
        targets: Vec<String>,

        /// Treat targets as file paths instead of unit ids
        #[arg(short, long)]
        files: bool,
    },
    /// Print the import graph in Graphviz DOT format
    Dot,
    /// Watch the repository and report graph changes and invalidations
    Watch,
    /// Clear the cache
    Clear,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("unitgraph={}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Unitgraph v{}", env!("CARGO_PKG_VERSION"));

    let opts = commands::Options {
        root: cli.root,
        config: cli.config,
        cached: cli.cached,
    };

    match cli.command {
        Commands::Index => commands::index(&opts),
        Commands::Owners { files } => commands::owners(&opts, &files),
        Commands::Affected { targets, files } => commands::affected(&opts, &targets, files),
        Commands::Dot => commands::dot(&opts),
        Commands::Watch => commands::watch(&opts).await,
        Commands::Clear => commands::clear(&opts),
        Commands::Version => {
            println!("Unitgraph v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

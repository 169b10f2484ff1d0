//! CLI entry point for topograph-ingest.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use topograph_core::TopographConfig;
use topograph_graph::GraphStore;

use topograph_ingest::{close_after, MutationEngine, StalePruner, TopologyUpdate};

#[derive(Parser)]
#[command(name = "topograph-ingest")]
#[command(about = "Apply topology batches to the Topograph graph and prune stale nodes")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: topograph).
    #[arg(short, long, default_value = "topograph", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// Apply one batch envelope from a JSON file ("-" reads stdin).
    Apply { file: PathBuf },
    /// Run a single prune pass and exit.
    Prune,
    /// Run the stale pruner on its interval until Ctrl-C.
    Daemon,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    let cli = Cli::parse();
    let config = TopographConfig::load(&cli.config)?;
    let store = GraphStore::open(&config.store)?;
    tracing::info!(
        nodes = store.node_count(),
        edges = store.edge_count(),
        snapshot = ?store.snapshot_path(),
        "Graph store opened"
    );

    let outcome = run(cli.command, &store, config).await;
    close_after(&store, outcome)?;
    Ok(())
}

async fn run(
    command: Command,
    store: &GraphStore,
    config: TopographConfig,
) -> topograph_ingest::Result<()> {
    match command {
        Command::Apply { file } => {
            let update = if file.as_os_str() == "-" {
                TopologyUpdate::from_json(&std::io::read_to_string(std::io::stdin())?)?
            } else {
                TopologyUpdate::read(&file)?
            };
            let engine = MutationEngine::with_config(store.clone(), &config.ingest);
            let report = engine.submit_update(update)?;
            println!("{}", serde_json::to_string(&report)?);
        }
        Command::Prune => {
            let pruner = StalePruner::new(store.clone(), config.pruner);
            let report = pruner.run_once()?;
            println!("{}", serde_json::to_string(&report)?);
        }
        Command::Daemon => {
            let pruner = StalePruner::new(store.clone(), config.pruner);
            pruner
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                    }
                })
                .await?;
        }
    }
    Ok(())
}

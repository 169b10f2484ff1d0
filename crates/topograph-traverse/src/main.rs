//! CLI entry point for topograph-query.
//!
//! Opens the graph store from its configured snapshot, runs one traversal and
//! writes the JSON result to stdout. Logs go to stderr.

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

use topograph_core::{EdgeKind, NodeKind, TopographConfig};
use topograph_graph::GraphStore;
use topograph_traverse::{
    find_preset, preset_rules, ImpactDirection, ImpactRequest, PathRequest, SubgraphRequest,
    TraversalEngine, TraversalRule,
};

#[derive(Parser)]
#[command(name = "topograph-query")]
#[command(about = "Query the Topograph service dependency graph")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: topograph).
    #[arg(short, long, default_value = "topograph", global = true)]
    config: String,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Nodes in id order plus the edges among them.
    Full {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Ego network around a node.
    Subgraph {
        /// Center node ID.
        #[arg(long)]
        center: String,
        #[arg(long)]
        depth: Option<usize>,
        /// Keep only these node kinds (repeatable).
        #[arg(long = "node-type")]
        node_types: Vec<NodeKind>,
        /// Walk only these edge kinds (repeatable).
        #[arg(long = "edge-type")]
        edge_types: Vec<EdgeKind>,
    },
    /// Shortest path between two nodes.
    Path {
        #[arg(long)]
        source: String,
        #[arg(long)]
        target: String,
        #[arg(long)]
        max_depth: Option<usize>,
    },
    /// Nodes impacted by (or impacting) a node.
    Impact {
        #[arg(long)]
        node: String,
        #[arg(long)]
        depth: Option<usize>,
        #[arg(long, value_enum, default_value_t = DirectionArg::Downstream)]
        direction: DirectionArg,
    },
    /// Run a traversal rule (reads JSON from stdin unless --preset is given).
    Rule {
        /// Name of a built-in preset.
        #[arg(long)]
        preset: Option<String>,
        /// Start node for the rule, overriding its start kinds.
        #[arg(long)]
        start: Option<String>,
    },
    /// Node and edge counts by kind.
    Stats,
    /// List the built-in traversal rules.
    Presets,
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Downstream,
    Upstream,
    Both,
}

impl From<DirectionArg> for ImpactDirection {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Downstream => ImpactDirection::Downstream,
            DirectionArg::Upstream => ImpactDirection::Upstream,
            DirectionArg::Both => ImpactDirection::Both,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    if let Command::Presets = cli.command {
        return emit(&preset_rules(), cli.pretty);
    }

    let config = TopographConfig::load(&cli.config)?;
    let store = GraphStore::open(&config.store)?;
    let engine = TraversalEngine::new(store);

    match cli.command {
        Command::Full { limit } => emit(&engine.full_graph(limit)?, cli.pretty),
        Command::Subgraph {
            center,
            depth,
            node_types,
            edge_types,
        } => {
            let request = SubgraphRequest {
                center_node_id: center,
                depth,
                node_types: non_empty(node_types),
                edge_types: non_empty(edge_types),
            };
            emit(&engine.subgraph(&request)?, cli.pretty)
        }
        Command::Path {
            source,
            target,
            max_depth,
        } => {
            let request = PathRequest {
                source_id: source,
                target_id: target,
                max_depth,
            };
            emit(&engine.find_path(&request)?, cli.pretty)
        }
        Command::Impact {
            node,
            depth,
            direction,
        } => {
            let request = ImpactRequest {
                node_id: node,
                depth,
                direction: direction.into(),
            };
            emit(&engine.impact(&request)?, cli.pretty)
        }
        Command::Rule { preset, start } => {
            let mut rule: TraversalRule = match preset {
                Some(name) => find_preset(&name)
                    .ok_or_else(|| anyhow::anyhow!("unknown preset '{name}'"))?,
                None => {
                    let input = std::io::read_to_string(std::io::stdin())?;
                    serde_json::from_str(&input)?
                }
            };
            if start.is_some() {
                rule.start_node_id = start;
            }
            emit(&engine.execute_rule(&rule)?, cli.pretty)
        }
        Command::Stats => emit(&engine.stats()?, cli.pretty),
        Command::Presets => Ok(()),
    }
}

fn non_empty<T>(values: Vec<T>) -> Option<Vec<T>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn emit<T: serde::Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}

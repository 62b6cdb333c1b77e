//! Trellis CLI entry point

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "trellis")]
#[command(version)]
#[command(about = "Incremental code-graph index and analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Repository root path (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,
}

/// Graph scope shared by the algorithm subcommands. Without a center the
/// whole project graph is loaded.
#[derive(Args)]
struct ScopeArgs {
    /// Restrict to the neighborhood of this symbol
    #[arg(long)]
    center: Option<String>,

    /// Neighborhood radius in undirected hops
    #[arg(long, default_value = "2")]
    hops: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one incremental index pass
    Index {
        /// Extra exclusion globs on top of the ignore files
        #[arg(long)]
        exclude: Vec<String>,

        /// Narrow re-extraction to these paths (deletions still detected)
        #[arg(long)]
        changed: Vec<PathBuf>,

        /// Refresh hotspot/health/debt scores after indexing
        #[arg(long)]
        scores: bool,
    },
    /// Look a symbol up by name or qualified name
    Symbol {
        /// Short or qualified symbol name
        query: String,
    },
    /// List the symbols of one file in position order
    Skeleton {
        /// Repository-relative file path
        path: String,
    },
    /// Edges touching a symbol
    Edges {
        /// Short or qualified symbol name
        query: String,

        /// Direction: in, out, or both
        #[arg(long, default_value = "both")]
        direction: String,
    },
    /// Read one stored metric value
    Metric {
        /// Metric kind tag (complexity, churn, pagerank, health, ...)
        kind: String,

        /// Owning symbol name
        #[arg(long, conflicts_with = "file")]
        symbol: Option<String>,

        /// Owning file path
        #[arg(long)]
        file: Option<String>,
    },
    /// PageRank the scope and print the top symbols
    Rank {
        #[command(flatten)]
        scope: ScopeArgs,

        /// How many symbols to print
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        /// Persist the scores as metric records
        #[arg(long)]
        store: bool,
    },
    /// Strongly connected components with more than one member
    Cycles {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Modularity clusters over the undirected projection
    Clusters {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Persist the assignment as metric records
        #[arg(long)]
        store: bool,
    },
    /// Layer assignment and layering violations
    Layers {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Persist the layers as metric records
        #[arg(long)]
        store: bool,
    },
    /// Shortest call paths between two symbols
    Trace {
        /// Source symbol name
        source: String,

        /// Target symbol name
        target: String,

        /// How many paths to report
        #[arg(short, long, default_value = "3")]
        k: usize,
    },
    /// Write the current project graph to a snapshot file
    Snapshot {
        /// Output path for the snapshot JSON
        out: PathBuf,
    },
    /// Diff a snapshot against another snapshot or the current graph
    Diff {
        /// Earlier snapshot file
        before: PathBuf,

        /// Later snapshot file (defaults to the current graph)
        after: Option<PathBuf>,
    },
    /// Delete the on-disk index
    Clear,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "trellis={log_level}"
        )))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Trellis v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Repository root: {}", cli.root.display());

    match cli.command {
        Commands::Index {
            exclude,
            changed,
            scores,
        } => commands::index(cli.root, &exclude, &changed, scores),
        Commands::Symbol { query } => commands::symbol(cli.root, &query),
        Commands::Skeleton { path } => commands::skeleton(cli.root, &path),
        Commands::Edges { query, direction } => commands::edges(cli.root, &query, &direction),
        Commands::Metric { kind, symbol, file } => {
            commands::metric(cli.root, &kind, symbol.as_deref(), file.as_deref())
        }
        Commands::Rank {
            scope,
            limit,
            store,
        } => commands::rank(cli.root, scope.center.as_deref(), scope.hops, limit, store),
        Commands::Cycles { scope } => {
            commands::cycles(cli.root, scope.center.as_deref(), scope.hops)
        }
        Commands::Clusters { scope, store } => {
            commands::clusters(cli.root, scope.center.as_deref(), scope.hops, store)
        }
        Commands::Layers { scope, store } => {
            commands::layers(cli.root, scope.center.as_deref(), scope.hops, store)
        }
        Commands::Trace { source, target, k } => commands::trace(cli.root, &source, &target, k),
        Commands::Snapshot { out } => commands::snapshot(cli.root, &out),
        Commands::Diff { before, after } => commands::diff(cli.root, &before, after.as_deref()),
        Commands::Clear => commands::clear(cli.root),
    }
}

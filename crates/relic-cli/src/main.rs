//! # relic-cli
//!
//! Command-line boundary for the Relic artifact store. Every subcommand
//! maps onto one store operation: browsing is always allowed, mutating
//! operations (ingest, restore, gc, prune) pass through the mutation gate
//! first.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use relic_core::error::RelicResult;
use tracing::info;

mod commands;
mod config;
mod gate;

use commands::CommandContext;

/// Content-addressable artifact cache for distro build outputs
#[derive(Parser)]
#[command(name = "relic", version, about = "Artifact store explorer and maintenance")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the relic.toml configuration
    #[arg(long, default_value = "relic.toml", global = true)]
    pub config: Utf8PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show store status and mutation-permission state
    Status,
    /// List known artifact kinds
    Kinds,
    /// List known distros
    Distros,
    /// Per-distro artifact summary
    Summary { distro: String },
    /// Paginated entry listing for a kind
    Entries {
        kind: String,
        #[arg(long, default_value_t = 0)]
        offset: i64,
        #[arg(long, default_value_t = 30)]
        limit: i64,
    },
    /// Single-entry detail lookup
    Entry { kind: String, input_key: String },
    /// Export a blob by digest
    Blob {
        sha256: String,
        /// Destination file; defaults to the digest in the current directory
        #[arg(long)]
        out: Option<Utf8PathBuf>,
    },
    /// List a directory under a distro's output root
    Ls {
        distro: String,
        #[arg(default_value = "")]
        path: String,
        #[arg(long, default_value_t = 500)]
        limit: usize,
    },
    /// Hash files under a distro's output root on demand
    Hash {
        distro: String,
        paths: Vec<String>,
    },
    /// Ingest a distro's existing on-disk outputs into the store
    Ingest {
        distro: String,
        /// Restrict to these kinds; defaults to everything known
        #[arg(long = "kind")]
        kinds: Vec<String>,
        #[arg(long, env = "RELIC_TOKEN")]
        token: Option<String>,
    },
    /// Restore one kind into a distro's output tree
    Restore {
        distro: String,
        kind: String,
        #[arg(long, env = "RELIC_TOKEN")]
        token: Option<String>,
    },
    /// Remove blobs unreachable from any live entry
    Gc {
        #[arg(long, env = "RELIC_TOKEN")]
        token: Option<String>,
    },
    /// Keep only the most recent entries per kind
    Prune {
        #[arg(long)]
        keep_last: i64,
        #[arg(long, env = "RELIC_TOKEN")]
        token: Option<String>,
    },
}

fn main() -> RelicResult<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    info!("relic v{}", env!("CARGO_PKG_VERSION"));

    let ctx = CommandContext::new(&cli.config)?;
    commands::dispatch(cli.command, &ctx)
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "relic={level},relic_store={level},relic_core={level}"
        ))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

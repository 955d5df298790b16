//! Command implementations and dispatch.

use camino::Utf8Path;
use relic_core::error::{RelicError, RelicResult};
use relic_store::{ArtifactStore, DistroSpec};
use serde::Serialize;

pub mod browse;
pub mod distro;
pub mod files;
pub mod maintain;
pub mod status;

use crate::config::RelicConfig;
use crate::gate::MutationGate;
use crate::Commands;

/// Shared context for all commands
pub struct CommandContext {
    pub config: RelicConfig,
    pub store: ArtifactStore,
    pub gate: MutationGate,
}

impl CommandContext {
    pub fn new(config_path: &Utf8Path) -> RelicResult<Self> {
        let config = RelicConfig::load(config_path)?;
        let store = ArtifactStore::open(&config.store_root)?;
        let gate = MutationGate::new(config.mutations_enabled, config.token.clone());
        Ok(Self {
            config,
            store,
            gate,
        })
    }

    /// Resolve a distro by directory name
    pub fn distro(&self, dir: &str) -> RelicResult<&DistroSpec> {
        self.config.catalog.find(dir).ok_or_else(|| {
            RelicError::invalid_argument(format!("unknown distro '{}'", dir))
        })
    }

    /// Print a response as pretty JSON on stdout
    pub fn print_json<T: Serialize>(&self, value: &T) -> RelicResult<()> {
        let json = serde_json::to_string_pretty(value).map_err(|e| {
            RelicError::io(
                "Failed to serialize response",
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            )
        })?;
        println!("{}", json);
        Ok(())
    }
}

/// Dispatch a parsed command to its handler
pub fn dispatch(command: Commands, ctx: &CommandContext) -> RelicResult<()> {
    match command {
        Commands::Status => status::status(ctx),
        Commands::Kinds => status::kinds(ctx),
        Commands::Distros => status::distros(ctx),
        Commands::Summary { distro } => distro::summary(ctx, &distro),
        Commands::Entries {
            kind,
            offset,
            limit,
        } => browse::entries(ctx, &kind, offset, limit),
        Commands::Entry { kind, input_key } => browse::entry(ctx, &kind, &input_key),
        Commands::Blob { sha256, out } => browse::blob(ctx, &sha256, out),
        Commands::Ls {
            distro,
            path,
            limit,
        } => files::ls(ctx, &distro, &path, limit),
        Commands::Hash { distro, paths } => files::hash(ctx, &distro, &paths),
        Commands::Ingest {
            distro,
            kinds,
            token,
        } => distro::ingest(ctx, &distro, &kinds, token.as_deref()),
        Commands::Restore {
            distro,
            kind,
            token,
        } => distro::restore(ctx, &distro, &kind, token.as_deref()),
        Commands::Gc { token } => maintain::gc(ctx, token.as_deref()),
        Commands::Prune { keep_last, token } => maintain::prune(ctx, keep_last, token.as_deref()),
    }
}

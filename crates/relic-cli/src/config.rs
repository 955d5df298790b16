//! relic.toml configuration parsing.

use camino::{Utf8Path, Utf8PathBuf};
use relic_core::error::{RelicError, RelicResult};
use relic_store::DistroCatalog;
use serde::Deserialize;
use std::fs;

/// Complete relic.toml configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RelicConfig {
    /// Store directory (blob area + entry index)
    pub store_root: Utf8PathBuf,

    /// Root containing the distro output trees
    #[serde(default = "default_repo_root")]
    pub repo_root: Utf8PathBuf,

    /// Whether mutating operations are allowed at all
    #[serde(default)]
    pub mutations_enabled: bool,

    /// Expected token for mutating operations; `None` means mutations
    /// (when enabled) need no token
    #[serde(default)]
    pub token: Option<String>,

    /// Known distros and their artifact layouts
    #[serde(flatten)]
    pub catalog: DistroCatalog,
}

fn default_repo_root() -> Utf8PathBuf {
    Utf8PathBuf::from(".")
}

impl RelicConfig {
    pub fn load(path: &Utf8Path) -> RelicResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| RelicError::io(format!("Failed to read {}", path), e))?;
        Self::parse(path.as_str(), &text)
    }

    pub fn parse(path: &str, text: &str) -> RelicResult<Self> {
        toml::from_str(text).map_err(|e| RelicError::ConfigParse {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

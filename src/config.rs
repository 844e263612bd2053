//! Configuration loading.
//!
//! Config is a TOML file with ranking weights and the list of id-bearing fields
//! the dedup apply phase rewrites. It is looked up in order: an explicit path,
//! `<data-dir>/roadmap-rank.toml`, then `<config dir>/roadmap-rank/config.toml`.
//! With none present, defaults apply.

use crate::error::Result;
use crate::search::RankParams;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name inside a data directory.
pub const CONFIG_FILENAME: &str = "roadmap-rank.toml";

/// A field holding resource ids in one collection file.
///
/// `collection` names `collections/<collection>.json`, an array of objects; `field`
/// names the array-of-ids property on each object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdField {
    pub collection: String,
    pub field: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ranking: RankParams,
    pub id_fields: Vec<IdField>,
}

impl Config {
    /// Parses config from TOML text.
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse config")
    }

    /// Loads the first config found for `data_dir`, or defaults.
    pub fn load(explicit: Option<&Path>, data_dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_file(path);
        }

        let candidates = [
            Some(data_dir.join(CONFIG_FILENAME)),
            global_config_path(),
        ];
        for path in candidates.into_iter().flatten() {
            if path.is_file() {
                return Self::load_file(&path);
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let config = Self::parse(&text)
            .with_context(|| format!("Invalid config at {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

/// `<config dir>/roadmap-rank/config.toml`, if the platform has a config dir.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("roadmap-rank").join("config.toml"))
}

// ⚙️ Engine Configuration - TOML file + environment overrides

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_DATABASE: &str = "PROVENANCE_DB";
pub const ENV_BIND: &str = "PROVENANCE_BIND";
pub const ENV_PATTERNS: &str = "PROVENANCE_PATTERNS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// SQLite document store
    pub database_path: PathBuf,

    /// HTTP bind address (server mode)
    pub bind_address: String,

    /// Optional JSON pattern library replacing the built-in one
    pub patterns_path: Option<PathBuf>,

    /// Max day distance for temporal_proximity edges
    pub temporal_window_days: i64,

    /// Bound on document summaries per key in the address listing
    pub max_documents_per_address: usize,

    /// External similarity scores below this do not create edges
    pub min_semantic_similarity: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            database_path: PathBuf::from("provenance.db"),
            bind_address: "0.0.0.0:3000".to_string(),
            patterns_path: None,
            temporal_window_days: 7,
            max_documents_per_address: 10,
            min_semantic_similarity: 0.5,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML file; missing keys keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse config TOML")
    }

    /// Optional file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override fields from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup(ENV_DATABASE).filter(|v| !v.is_empty()) {
            self.database_path = PathBuf::from(db);
        }
        if let Some(bind) = lookup(ENV_BIND).filter(|v| !v.is_empty()) {
            self.bind_address = bind;
        }
        if let Some(patterns) = lookup(ENV_PATTERNS).filter(|v| !v.is_empty()) {
            self.patterns_path = Some(PathBuf::from(patterns));
        }
    }
}

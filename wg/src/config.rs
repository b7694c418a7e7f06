//! Dashboard configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::subquery::DependencyEdge;
use crate::tiles::{SubqueryExtract, TileQuery};

/// Main dashboard configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Log level used when the CLI flag is absent
    pub log_level: Option<String>,

    /// Directory for JSONL action logs; logging is off when unset
    pub action_log_dir: Option<PathBuf>,

    /// Statically declared tiles
    pub tiles: Vec<TileConfig>,

    /// Producer→consumer dependency edges
    pub edges: Vec<DependencyEdge>,
}

/// One tile declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TileConfig {
    pub id: String,

    /// Endpoint of the remote data source
    pub endpoint: String,

    /// Subquery rule when this tile feeds other tiles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subquery: Option<SubqueryExtract>,

    /// Initial query parameters
    #[serde(default)]
    pub query: TileQuery,
}

impl Config {
    /// Structural checks before a session is built
    ///
    /// Edge semantics (unknown ids, cycles, projection mismatches) are
    /// validated separately by the session via `validate_edges`.
    pub fn validate(&self) -> Result<()> {
        if self.tiles.is_empty() {
            return Err(eyre::eyre!("No tiles configured"));
        }
        let mut seen = std::collections::HashSet::new();
        for tile in &self.tiles {
            if !seen.insert(tile.id.as_str()) {
                return Err(eyre::eyre!("Duplicate tile id: {}", tile.id));
            }
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path)
                .context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: ./wordglance.yml
        let local_config = PathBuf::from("wordglance.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/wordglance/wordglance.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("wordglance").join("wordglance.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subquery::Projection;

    const SAMPLE: &str = r#"
log-level: debug
tiles:
  - id: freqDist
    endpoint: https://corpora.example.org/freqs
    subquery: max-count
    query:
      corpus-name: syn2020
      conc-id: abc123
      criterion: ["word 0"]
      limit: 100
      sort-key: freq
      page: 1
      include-empty: false
  - id: syntacticColls
    endpoint: https://corpora.example.org/scolls
edges:
  - producer: freqDist
    consumer: syntacticColls
    projection: count-as-limit
"#;

    #[test]
    fn test_parse_sample_config() {
        let config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.tiles.len(), 2);
        assert_eq!(config.tiles[0].id, "freqDist");
        assert_eq!(config.tiles[0].subquery, Some(SubqueryExtract::MaxCount));
        assert_eq!(config.tiles[0].query.corpus_name, "syn2020");
        assert_eq!(config.tiles[1].subquery, None);
        // Unspecified query block falls back to defaults
        assert_eq!(config.tiles[1].query.limit, 100);

        assert_eq!(config.edges.len(), 1);
        assert_eq!(config.edges[0].projection, Projection::CountAsLimit);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_empty_and_duplicates() {
        assert!(Config::default().validate().is_err());

        let mut config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        config.tiles[1].id = "freqDist".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dash.yml");
        fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.tiles.len(), 2);

        let missing = dir.path().join("nope.yml");
        assert!(Config::load(Some(&missing)).is_err());
    }
}

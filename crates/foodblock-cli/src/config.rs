use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use foodblock_dag::TraversalLimits;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "foodblock.toml";
/// Block file used when neither `--store` nor the config names one.
pub const DEFAULT_STORE_FILE: &str = "blocks.jsonl";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub store: Option<PathBuf>,
    pub limits: TraversalLimits,
    pub merge: MergeConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Field -> auto-merge policy name.
    pub policies: BTreeMap<String, String>,
}

impl CliConfig {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid configuration")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Load `explicit` if given, else `foodblock.toml` if it exists, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::load(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    /// The block file: `--store`, then the config, then the default.
    pub fn store_path(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.store.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = CliConfig::default();
        assert_eq!(c.limits, TraversalLimits::default());
        assert!(c.store.is_none());
        assert!(c.merge.policies.is_empty());
    }

    #[test]
    fn parses_sections() {
        let c = CliConfig::from_toml_str(
            r#"
            store = "data/blocks.jsonl"

            [limits]
            chain = 10

            [merge.policies]
            price = "max"
            tags = "union"
            "#,
        )
        .unwrap();
        assert_eq!(c.store, Some(PathBuf::from("data/blocks.jsonl")));
        assert_eq!(c.limits.chain, 10);
        assert_eq!(c.limits.head, 1000);
        assert_eq!(c.merge.policies["price"], "max");
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(CliConfig::from_toml_str("limits = 3").is_err());
    }

    #[test]
    fn store_path_precedence() {
        let c = CliConfig {
            store: Some("from-config.jsonl".into()),
            ..CliConfig::default()
        };
        assert_eq!(c.store_path(Some(Path::new("flag.jsonl"))), PathBuf::from("flag.jsonl"));
        assert_eq!(c.store_path(None), PathBuf::from("from-config.jsonl"));
        assert_eq!(CliConfig::default().store_path(None), PathBuf::from(DEFAULT_STORE_FILE));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foodblock.toml");
        std::fs::write(&path, "[limits]\nrecall = 7\n").unwrap();
        assert_eq!(CliConfig::load(&path).unwrap().limits.recall, 7);
        assert!(CliConfig::resolve(Some(&dir.path().join("missing.toml"))).is_err());
    }
}

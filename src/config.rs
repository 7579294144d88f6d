use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Record database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Upper bound on waiting for a locked database, per query
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

/// Graph build configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_attachment_limit")]
    pub attachment_limit: usize,
    #[serde(default = "default_true")]
    pub enrich_attachments: bool,
    #[serde(default = "default_true")]
    pub record_runs: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            attachment_limit: default_attachment_limit(),
            enrich_attachments: true,
            record_runs: true,
        }
    }
}

/// Which renderings the CLI prints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Tree,
    Json,
    #[default]
    Both,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_true")]
    pub pretty_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            pretty_json: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_query_timeout_ms() -> u64 {
    crate::db::DEFAULT_QUERY_TIMEOUT_MS
}

fn default_attachment_limit() -> usize {
    5
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in QRGRAPH_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("QRGRAPH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        Self::from_toml(&config_str)
    }

    /// Parse and validate configuration text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).context("Failed to parse config.toml")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.store.db_path.as_os_str().is_empty() {
            anyhow::bail!("store.db_path must not be empty");
        }

        if let Some(parent) = self.store.db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                anyhow::bail!(
                    "Directory for store.db_path does not exist: {}",
                    parent.display()
                );
            }
        }

        if self.store.query_timeout_ms == 0 {
            anyhow::bail!("store.query_timeout_ms must be greater than 0");
        }

        if self.graph.attachment_limit > 100 {
            anyhow::bail!("graph.attachment_limit must be at most 100");
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.store.db_path
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.store.query_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn create_test_config(temp_dir: &TempDir) -> String {
        let db_path = temp_dir.path().canonicalize().unwrap().join("records.db");
        let db_path_str = db_path.to_str().unwrap().replace('\\', "\\\\");
        format!(
            r#"
[store]
db_path = "{}"
log_level = "debug"
query_timeout_ms = 2500

[graph]
attachment_limit = 3
enrich_attachments = false

[output]
format = "json"
"#,
            db_path_str
        )
    }

    fn with_config_env(config_path: &Path, f: impl FnOnce()) {
        let original = std::env::var("QRGRAPH_CONFIG").ok();
        std::env::set_var("QRGRAPH_CONFIG", config_path.to_str().unwrap());
        f();
        std::env::remove_var("QRGRAPH_CONFIG");
        if let Some(val) = original {
            std::env::set_var("QRGRAPH_CONFIG", val);
        }
    }

    #[test]
    fn test_config_load_success() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, create_test_config(&temp_dir)).unwrap();

        with_config_env(&config_path, || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
            let config = config.unwrap();
            assert_eq!(config.store.log_level, "debug");
            assert_eq!(config.query_timeout(), Duration::from_millis(2500));
            assert_eq!(config.graph.attachment_limit, 3);
            assert!(!config.graph.enrich_attachments);
            assert!(config.graph.record_runs);
            assert_eq!(config.output.format, OutputFormat::Json);
            assert!(config.output.pretty_json);
        });
    }

    #[test]
    fn test_defaults_for_optional_sections() {
        let config = Config::from_toml("[store]\ndb_path = \"records.db\"\n").unwrap();
        assert_eq!(config.store.log_level, "info");
        assert_eq!(config.store.query_timeout_ms, crate::db::DEFAULT_QUERY_TIMEOUT_MS);
        assert_eq!(config.graph.attachment_limit, 5);
        assert!(config.graph.enrich_attachments);
        assert_eq!(config.output.format, OutputFormat::Both);
    }

    #[test]
    fn test_validation_errors() {
        let err = Config::from_toml("[store]\ndb_path = \"records.db\"\nquery_timeout_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("query_timeout_ms"));

        let err = Config::from_toml("[store]\ndb_path = \"records.db\"\n[graph]\nattachment_limit = 500\n")
            .unwrap_err();
        assert!(err.to_string().contains("attachment_limit"));

        let err = Config::from_toml("[store]\ndb_path = \"/definitely/not/here/records.db\"\n").unwrap_err();
        assert!(err.to_string().contains("does not exist"));

        assert!(Config::from_toml("[graph]\nattachment_limit = 1\n").is_err());
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        with_config_env(Path::new("nonexistent.toml"), || {
            assert!(Config::load().is_err());
        });
    }
}

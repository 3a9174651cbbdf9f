/// Server configuration
///
/// Loaded from a JSON file; every field has a default so a missing file or a
/// partial file both work.

use crate::core::store::{JsonFileStore, MemoryStore, Store};
use crate::error::{MudError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "MUDHOST_CONFIG";

/// Which backing store to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// One JSON file per entity under `data_dir`
    #[default]
    Json,
    /// Nothing survives a restart
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub listen_addr: String,

    /// Root directory of the JSON store
    pub data_dir: PathBuf,

    pub storage: StorageKind,

    /// Minimum spacing between accepted inputs of one session
    pub input_delay_ms: u64,

    /// Events buffered per session before new ones are dropped
    pub mailbox_capacity: usize,

    /// Longest accepted input line in bytes
    pub max_line_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8945".to_string(),
            data_dir: PathBuf::from("data"),
            storage: StorageKind::Json,
            input_delay_ms: 200,
            mailbox_capacity: 1024,
            max_line_len: 4096,
        }
    }
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    /// Read and validate a config file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Config named by the first argument, else by `MUDHOST_CONFIG`, else defaults
    pub fn from_args(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let path = args.next().or_else(|| std::env::var(CONFIG_ENV_VAR).ok());

        match path {
            Some(path) => Self::load(Path::new(&path)),
            None => {
                debug!("No config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.trim().is_empty() {
            warn!("Validation failed: empty listen address");
            return Err(MudError::ValidationError {
                field: "listen_addr".to_string(),
                reason: "Listen address cannot be empty".to_string(),
            });
        }

        if self.mailbox_capacity == 0 {
            warn!("Validation failed: mailbox capacity cannot be 0");
            return Err(MudError::ValidationError {
                field: "mailbox_capacity".to_string(),
                reason: "Mailbox capacity must be at least 1".to_string(),
            });
        }

        if self.max_line_len == 0 {
            warn!("Validation failed: max line length cannot be 0");
            return Err(MudError::ValidationError {
                field: "max_line_len".to_string(),
                reason: "Maximum line length must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    pub fn input_delay(&self) -> Duration {
        Duration::from_millis(self.input_delay_ms)
    }

    /// Open the configured backing store
    pub fn open_store(&self) -> Result<Arc<dyn Store>> {
        Ok(match self.storage {
            StorageKind::Json => Arc::new(JsonFileStore::open(&self.data_dir)?),
            StorageKind::Memory => {
                warn!("Using in-memory storage; the world will not be saved");
                Arc::new(MemoryStore::new())
            }
        })
    }
}

pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn storage(mut self, storage: StorageKind) -> Self {
        self.config.storage = storage;
        self
    }

    pub fn input_delay_ms(mut self, ms: u64) -> Self {
        self.config.input_delay_ms = ms;
        self
    }

    pub fn mailbox_capacity(mut self, capacity: usize) -> Self {
        self.config.mailbox_capacity = capacity;
        self
    }

    pub fn max_line_len(mut self, len: usize) -> Self {
        self.config.max_line_len = len;
        self
    }

    pub fn build(self) -> Result<ServerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:8945");
        assert_eq!(config.input_delay(), Duration::from_millis(200));
        assert_eq!(config.mailbox_capacity, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_validates() {
        let config = ServerConfig::builder()
            .listen_addr("127.0.0.1:4000")
            .storage(StorageKind::Memory)
            .build()
            .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:4000");

        let err = ServerConfig::builder().mailbox_capacity(0).build().unwrap_err();
        assert!(matches!(err, MudError::ValidationError { ref field, .. } if field == "mailbox_capacity"));

        assert!(ServerConfig::builder().listen_addr("  ").build().is_err());
        assert!(ServerConfig::builder().max_line_len(0).build().is_err());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mudhost.json");
        std::fs::write(&path, r#"{ "listen_addr": "127.0.0.1:9000", "storage": "memory" }"#).unwrap();

        let config = ServerConfig::load(&path).unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.storage, StorageKind::Memory);
        assert_eq!(config.max_line_len, 4096);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "mailbox_capacity": 0 }"#).unwrap();

        assert!(ServerConfig::load(&path).is_err());
    }

    #[test]
    fn test_from_args_prefers_argument() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mudhost.json");
        std::fs::write(&path, r#"{ "input_delay_ms": 50 }"#).unwrap();

        let config = ServerConfig::from_args(vec![path.display().to_string()].into_iter()).unwrap();
        assert_eq!(config.input_delay_ms, 50);
    }
}

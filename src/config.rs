use std::{fs, path::Path, sync::Arc};

use serde::Deserialize;

use crate::{
    settings::{MemorySettingsStore, SettingsResult, SettingsStore, SqliteSettingsStore},
    transport::{FileTransport, MailTransport, MemoryTransport},
};

/// Top-level configuration for the sender-override service.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub mail: MailConfig,
}

/// Mail pipeline configuration.
#[derive(Debug, Deserialize)]
pub struct MailConfig {
    /// Site admin email, used to seed unset override settings.
    #[serde(default = "default_admin_email")]
    pub admin_email: String,

    /// Site name, used to seed the unset From display name.
    #[serde(default = "default_site_name")]
    pub site_name: String,

    /// Enables delivery-failure diagnostics on the send-failure hook.
    #[serde(default)]
    pub debug_log: bool,

    #[serde(default)]
    pub settings: SettingsBackendConfig,

    #[serde(default)]
    pub transport: TransportBackendConfig,
}

/// Configuration for the settings-store backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum SettingsBackendConfig {
    /// In-memory store, values lost on restart.
    #[serde(rename = "memory")]
    Memory,

    /// Sqlite-backed store.
    #[serde(rename = "sqlite")]
    Sqlite {
        #[serde(default = "default_settings_db")]
        path: String,
    },
}

impl Default for SettingsBackendConfig {
    fn default() -> Self {
        SettingsBackendConfig::Sqlite {
            path: default_settings_db(),
        }
    }
}

impl SettingsBackendConfig {
    /// Builds the configured settings store.
    pub fn build(&self) -> SettingsResult<Arc<dyn SettingsStore>> {
        match self {
            SettingsBackendConfig::Memory => Ok(Arc::new(MemorySettingsStore::new())),
            SettingsBackendConfig::Sqlite { path } => {
                Ok(Arc::new(SqliteSettingsStore::open(path)?))
            }
        }
    }
}

/// Configuration for the mail transport backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum TransportBackendConfig {
    /// Writes outgoing messages into an outbox directory.
    #[serde(rename = "file")]
    File {
        #[serde(default = "default_outbox_path")]
        path: String,
    },

    /// Records outgoing messages in memory.
    #[serde(rename = "memory")]
    Memory,
}

impl Default for TransportBackendConfig {
    fn default() -> Self {
        TransportBackendConfig::File {
            path: default_outbox_path(),
        }
    }
}

impl TransportBackendConfig {
    /// Builds the configured transport.
    pub fn build(&self) -> Arc<dyn MailTransport> {
        match self {
            TransportBackendConfig::File { path } => {
                Arc::new(FileTransport::new(path.clone().into()))
            }
            TransportBackendConfig::Memory => Arc::new(MemoryTransport::new()),
        }
    }
}

/// Loads configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Errors that can occur while loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// An I/O error occurred reading the file.
    Io(std::io::Error),
    /// A parse error occurred deserializing TOML.
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "Config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

fn default_admin_email() -> String {
    "admin@example.com".to_string()
}

fn default_site_name() -> String {
    "Example".to_string()
}

fn default_settings_db() -> String {
    "mailfix.db".to_string()
}

fn default_outbox_path() -> String {
    "outbox".to_string()
}

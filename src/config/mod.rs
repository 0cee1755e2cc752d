mod connector;
mod connector_type;
pub mod env;

pub use connector::{default_headers, ConnectorConfig, DEFAULT_RETRIES, DEFAULT_TIMEOUT_SECS};
pub use connector_type::ConnectorType;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw per-connector input, every field optional.
///
/// Missing fields fall back to the connector type's defaults when the
/// settings are turned into a [`ConnectorConfig`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectorSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default)]
    pub credentials: IndexMap<String, Option<String>>,

    #[serde(default)]
    pub options: IndexMap<String, Value>,

    /// Per-attempt timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Total attempt budget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_headers: Option<IndexMap<String, String>>,
}

impl ConnectorSettings {
    pub fn with_credential(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.credentials.insert(key.into(), Some(value.into()));
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// Complete manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerSettings {
    /// Connector used when a caller does not name one
    #[serde(default = "default_connector")]
    pub default: String,
    #[serde(default)]
    pub connectors: IndexMap<String, ConnectorSettings>,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Connector instance cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_connector() -> String {
    "google".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_log_level(),
        }
    }
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            default: default_connector(),
            connectors: IndexMap::new(),
            cache: CacheSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl ManagerSettings {
    /// Settings for `name`, or empty settings when none are configured.
    pub fn connector(&self, name: &str) -> ConnectorSettings {
        self.connectors.get(name).cloned().unwrap_or_default()
    }
}

/// Load configuration from TOML file
pub fn load_settings(path: &str) -> Result<ManagerSettings> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {}", path))?;
    let settings: ManagerSettings =
        toml::from_str(&contents).with_context(|| format!("Failed to parse settings file {}", path))?;
    Ok(settings)
}

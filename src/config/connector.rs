use indexmap::IndexMap;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

use super::{ConnectorSettings, ConnectorType};
use crate::error::{ConnectorError, ConnectorResult};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RETRIES: u32 = 3;

const REDACTED: &str = "***";

/// Headers sent on every request unless overridden.
pub fn default_headers() -> IndexMap<String, String> {
    IndexMap::from([
        ("Accept".to_string(), "application/json".to_string()),
        ("Content-Type".to_string(), "application/json".to_string()),
    ])
}

/// Immutable configuration bound to one connector instance.
///
/// Credential presence is not checked on construction; call
/// [`validate`](Self::validate) or [`missing_credentials`](Self::missing_credentials)
/// to inspect it. The `with_*` methods return a modified copy.
#[derive(Clone, PartialEq)]
pub struct ConnectorConfig {
    connector_type: ConnectorType,
    base_url: String,
    credentials: IndexMap<String, Option<String>>,
    options: IndexMap<String, Value>,
    timeout: Duration,
    retries: u32,
    default_headers: IndexMap<String, String>,
}

impl ConnectorConfig {
    /// Create a config with default timeout, retries and headers.
    ///
    /// Fails only when `base_url` is blank.
    pub fn new(connector_type: ConnectorType, base_url: impl Into<String>) -> ConnectorResult<Self> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(ConnectorError::InvalidConfiguration(format!(
                "base_url must not be empty for connector '{}'",
                connector_type
            )));
        }

        Ok(Self {
            connector_type,
            base_url,
            credentials: IndexMap::new(),
            options: IndexMap::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retries: DEFAULT_RETRIES,
            default_headers: default_headers(),
        })
    }

    /// Merge caller-supplied settings over the per-type defaults.
    ///
    /// Top-level `timeout`/`retries` win over the same keys in `options`.
    pub fn from_settings(
        connector_type: ConnectorType,
        settings: &ConnectorSettings,
    ) -> ConnectorResult<Self> {
        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| connector_type.default_base_url().to_string());

        let timeout = settings
            .timeout
            .or_else(|| settings.options.get("timeout").and_then(option_as_u64))
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = settings
            .retries
            .or_else(|| {
                settings
                    .options
                    .get("retries")
                    .and_then(option_as_u64)
                    .and_then(|n| u32::try_from(n).ok())
            })
            .unwrap_or(DEFAULT_RETRIES);

        let mut config = Self::new(connector_type, base_url)?;
        config.credentials = settings.credentials.clone();
        config.options = settings.options.clone();
        config.timeout = Duration::from_secs(timeout);
        config.retries = retries;
        if let Some(headers) = &settings.default_headers {
            config.default_headers = headers.clone();
        }
        Ok(config)
    }

    pub fn connector_type(&self) -> ConnectorType {
        self.connector_type
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &IndexMap<String, Option<String>> {
        &self.credentials
    }

    pub fn options(&self) -> &IndexMap<String, Value> {
        &self.options
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Total attempt budget for one logical request.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn default_headers(&self) -> &IndexMap<String, String> {
        &self.default_headers
    }

    /// Credential value, or `None` when the key is absent or has no value.
    pub fn credential(&self, key: &str) -> Option<&str> {
        self.credentials.get(key).and_then(|v| v.as_deref())
    }

    /// True when the key is present, even if its value is absent.
    pub fn has_credential(&self, key: &str) -> bool {
        self.credentials.contains_key(key)
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// String-valued option; non-string values are ignored.
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    pub fn has_option(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.default_headers.get(name).map(String::as_str)
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.default_headers.contains_key(name)
    }

    pub fn validate(&self) -> bool {
        self.connector_type
            .required_credentials()
            .iter()
            .all(|key| self.has_credential(key))
    }

    /// Required keys absent from `credentials`, in schema order.
    pub fn missing_credentials(&self) -> Vec<String> {
        self.connector_type
            .required_credentials()
            .iter()
            .filter(|key| !self.has_credential(key))
            .map(|key| key.to_string())
            .collect()
    }

    /// `Ok(())` when valid, otherwise the missing keys as an error.
    pub fn ensure_valid(&self) -> ConnectorResult<()> {
        let missing = self.missing_credentials();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConnectorError::MissingCredentials { missing })
        }
    }

    pub fn with_credential(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.credentials.insert(key.into(), Some(value.into()));
        next
    }

    pub fn with_option(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut next = self.clone();
        next.options.insert(key.into(), value.into());
        next
    }

    pub fn with_header(&self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.default_headers.insert(name.into(), value.into());
        next
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }

    pub fn with_retries(&self, retries: u32) -> Self {
        Self {
            retries,
            ..self.clone()
        }
    }

    /// JSON view of the configuration, optionally with credential values masked.
    pub fn snapshot(&self, redact_credentials: bool) -> Value {
        let credentials: IndexMap<&str, Option<&str>> = self
            .credentials
            .iter()
            .map(|(k, v)| {
                let value = if redact_credentials {
                    v.as_ref().map(|_| REDACTED)
                } else {
                    v.as_deref()
                };
                (k.as_str(), value)
            })
            .collect();

        json!({
            "type": self.connector_type,
            "base_url": self.base_url,
            "credentials": credentials,
            "options": self.options,
            "timeout": self.timeout.as_secs(),
            "retries": self.retries,
            "default_headers": self.default_headers,
        })
    }
}

impl fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let credential_keys: Vec<&str> = self.credentials.keys().map(String::as_str).collect();
        f.debug_struct("ConnectorConfig")
            .field("connector_type", &self.connector_type)
            .field("base_url", &self.base_url)
            .field("credentials", &credential_keys)
            .field("options", &self.options)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("default_headers", &self.default_headers)
            .finish()
    }
}

fn option_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn google() -> ConnectorConfig {
        ConnectorConfig::new(ConnectorType::Google, "https://www.googleapis.com").unwrap()
    }

    #[test]
    fn test_new_applies_defaults() {
        let config = google();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.retries(), 3);
        assert_eq!(config.header("Accept"), Some("application/json"));
        assert_eq!(config.header("Content-Type"), Some("application/json"));
        assert!(config.credentials().is_empty());
    }

    #[test]
    fn test_blank_base_url_is_rejected() {
        let err = ConnectorConfig::new(ConnectorType::Google, "  ").unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_validate_for_every_type() {
        for t in ConnectorType::ALL {
            let empty = ConnectorConfig::new(t, t.default_base_url()).unwrap();
            assert!(!empty.validate());
            assert_eq!(empty.missing_credentials(), t.required_credentials());

            let full = t
                .required_credentials()
                .iter()
                .fold(empty.clone(), |c, key| c.with_credential(*key, "x"));
            assert!(full.validate());
            assert!(full.missing_credentials().is_empty());
        }
    }

    #[test]
    fn test_missing_credentials_in_schema_order() {
        let config = ConnectorConfig::new(ConnectorType::ExactOnline, "https://start.exactonline.nl")
            .unwrap()
            .with_credential("client_secret", "secret");
        assert_eq!(config.missing_credentials(), vec!["client_id", "division"]);
        let err = config.ensure_valid().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required configuration: client_id, division"
        );
    }

    #[test]
    fn test_absent_value_still_counts_as_present() {
        let mut settings = ConnectorSettings::default();
        settings.credentials.insert("client_id".to_string(), Some("id".to_string()));
        settings.credentials.insert("client_secret".to_string(), None);

        let config = ConnectorConfig::from_settings(ConnectorType::Google, &settings).unwrap();
        assert!(config.validate());
        assert!(config.has_credential("client_secret"));
        assert_eq!(config.credential("client_secret"), None);
    }

    #[test]
    fn test_with_methods_leave_original_untouched() {
        let base = google();
        let derived = base
            .with_credential("client_id", "abc")
            .with_option("scope", "calendar")
            .with_header("X-Trace", "1");

        assert_eq!(base.credential("client_id"), None);
        assert!(!base.has_option("scope"));
        assert!(!base.has_header("X-Trace"));

        assert_eq!(derived.credential("client_id"), Some("abc"));
        assert_eq!(derived.option_str("scope"), Some("calendar"));
        assert_eq!(derived.header("X-Trace"), Some("1"));
        assert_eq!(derived.base_url(), base.base_url());
        assert_eq!(derived.retries(), base.retries());
    }

    #[test]
    fn test_with_credential_overwrites() {
        let config = google()
            .with_credential("client_id", "first")
            .with_credential("client_id", "second");
        assert_eq!(config.credential("client_id"), Some("second"));
        assert_eq!(config.credentials().len(), 1);
    }

    #[test]
    fn test_from_settings_defaults_and_overrides() {
        let settings = ConnectorSettings::default();
        let config = ConnectorConfig::from_settings(ConnectorType::ExactOnline, &settings).unwrap();
        assert_eq!(config.base_url(), "https://start.exactonline.nl");
        assert_eq!(config.retries(), 3);

        let mut settings = ConnectorSettings {
            base_url: Some("http://localhost:9000".to_string()),
            ..Default::default()
        };
        settings.options.insert("timeout".to_string(), json!("5"));
        settings.options.insert("retries".to_string(), json!(7));
        let config = ConnectorConfig::from_settings(ConnectorType::Google, &settings).unwrap();
        assert_eq!(config.base_url(), "http://localhost:9000");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.retries(), 7);

        settings.timeout = Some(12);
        settings.retries = Some(1);
        let config = ConnectorConfig::from_settings(ConnectorType::Google, &settings).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(12));
        assert_eq!(config.retries(), 1);
    }

    #[test]
    fn test_snapshot_redacts_credentials() {
        let config = google().with_credential("client_secret", "hunter2");
        let redacted = config.snapshot(true);
        assert_eq!(redacted["credentials"]["client_secret"], "***");
        assert_eq!(redacted["type"], "google");

        let full = config.snapshot(false);
        assert_eq!(full["credentials"]["client_secret"], "hunter2");
        assert_eq!(full["timeout"], 30);
    }

    #[test]
    fn test_debug_never_prints_secrets() {
        let config = google().with_credential("client_secret", "hunter2");
        let debug = format!("{:?}", config);
        assert!(debug.contains("client_secret"));
        assert!(!debug.contains("hunter2"));
    }
}

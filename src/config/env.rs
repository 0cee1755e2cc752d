//! Build [`ManagerSettings`] from environment variables.
//!
//! Recognised variables, per connector prefix (`GOOGLE`, `EXACT_ONLINE`):
//! `<PREFIX>_API_BASE_URL`, `<PREFIX>_CLIENT_ID`, `<PREFIX>_CLIENT_SECRET`,
//! `<PREFIX>_REDIRECT_URI`, `<PREFIX>_API_TIMEOUT`, `<PREFIX>_API_RETRIES`,
//! plus `GOOGLE_REFRESH_TOKEN` and `EXACT_ONLINE_DIVISION`. Global switches:
//! `API_MANAGER_DEFAULT_CONNECTOR`, `API_MANAGER_CACHE_ENABLED`,
//! `API_MANAGER_LOGGING_ENABLED`, `API_MANAGER_LOG_LEVEL`.

use super::{default_headers, ConnectorSettings, ConnectorType, ManagerSettings};

struct EnvConnector {
    connector_type: ConnectorType,
    prefix: &'static str,
    credentials: &'static [(&'static str, &'static str)],
}

const ENV_CONNECTORS: [EnvConnector; 2] = [
    EnvConnector {
        connector_type: ConnectorType::Google,
        prefix: "GOOGLE",
        credentials: &[
            ("client_id", "CLIENT_ID"),
            ("client_secret", "CLIENT_SECRET"),
            ("refresh_token", "REFRESH_TOKEN"),
            ("redirect_uri", "REDIRECT_URI"),
        ],
    },
    EnvConnector {
        connector_type: ConnectorType::ExactOnline,
        prefix: "EXACT_ONLINE",
        credentials: &[
            ("client_id", "CLIENT_ID"),
            ("client_secret", "CLIENT_SECRET"),
            ("division", "DIVISION"),
            ("redirect_uri", "REDIRECT_URI"),
        ],
    },
];

impl ManagerSettings {
    /// Build from process env vars, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    ///
    /// Unset credential variables are omitted so that validation reports
    /// them as missing.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(v) = lookup("API_MANAGER_DEFAULT_CONNECTOR") {
            settings.default = v;
        }
        if let Some(b) = lookup("API_MANAGER_CACHE_ENABLED").and_then(|v| v.parse::<bool>().ok()) {
            settings.cache.enabled = b;
        }
        if let Some(b) = lookup("API_MANAGER_LOGGING_ENABLED").and_then(|v| v.parse::<bool>().ok()) {
            settings.logging.enabled = b;
        }
        if let Some(v) = lookup("API_MANAGER_LOG_LEVEL") {
            settings.logging.level = v;
        }

        for entry in &ENV_CONNECTORS {
            let var = |suffix: &str| lookup(&format!("{}_{}", entry.prefix, suffix));

            let mut connector = ConnectorSettings {
                base_url: Some(
                    var("API_BASE_URL")
                        .unwrap_or_else(|| entry.connector_type.default_base_url().to_string()),
                ),
                default_headers: Some(default_headers()),
                ..Default::default()
            };

            for (key, suffix) in entry.credentials {
                if let Some(value) = var(suffix) {
                    connector.credentials.insert(key.to_string(), Some(value));
                }
            }
            if let Some(n) = var("API_TIMEOUT").and_then(|v| v.parse::<u64>().ok()) {
                connector.timeout = Some(n);
            }
            if let Some(n) = var("API_RETRIES").and_then(|v| v.parse::<u32>().ok()) {
                connector.retries = Some(n);
            }

            settings
                .connectors
                .insert(entry.connector_type.as_str().to_string(), connector);
        }

        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let settings = ManagerSettings::from_lookup(|_| None);
        assert_eq!(settings.default, "google");
        assert!(settings.cache.enabled);

        let google = settings.connector("google");
        assert_eq!(google.base_url.as_deref(), Some("https://www.googleapis.com"));
        assert!(google.credentials.is_empty());
        assert_eq!(google.timeout, None);

        let exact = settings.connector("exactonline");
        assert_eq!(exact.base_url.as_deref(), Some("https://start.exactonline.nl"));
    }

    #[test]
    fn test_reads_connector_variables() {
        let settings = ManagerSettings::from_lookup(lookup(&[
            ("GOOGLE_CLIENT_ID", "gid"),
            ("GOOGLE_CLIENT_SECRET", "gsecret"),
            ("GOOGLE_REFRESH_TOKEN", "grefresh"),
            ("GOOGLE_API_TIMEOUT", "15"),
            ("EXACT_ONLINE_DIVISION", "4242"),
            ("EXACT_ONLINE_API_RETRIES", "5"),
            ("EXACT_ONLINE_API_BASE_URL", "http://localhost:8080"),
            ("API_MANAGER_DEFAULT_CONNECTOR", "exactonline"),
            ("API_MANAGER_CACHE_ENABLED", "false"),
            ("API_MANAGER_LOG_LEVEL", "debug"),
        ]));

        assert_eq!(settings.default, "exactonline");
        assert!(!settings.cache.enabled);
        assert_eq!(settings.logging.level, "debug");

        let google = settings.connector("google");
        assert_eq!(google.credentials.get("refresh_token"), Some(&Some("grefresh".to_string())));
        assert_eq!(google.timeout, Some(15));
        assert!(!google.credentials.contains_key("redirect_uri"));

        let exact = settings.connector("exactonline");
        assert_eq!(exact.base_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(exact.retries, Some(5));
        assert_eq!(exact.credentials.get("division"), Some(&Some("4242".to_string())));
    }

    #[test]
    fn test_unparseable_numbers_are_ignored() {
        let settings = ManagerSettings::from_lookup(lookup(&[
            ("GOOGLE_API_TIMEOUT", "soon"),
            ("API_MANAGER_CACHE_ENABLED", "maybe"),
        ]));
        assert_eq!(settings.connector("google").timeout, None);
        assert!(settings.cache.enabled);
    }
}

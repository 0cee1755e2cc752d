//! Connector registry - maps connector names to constructors.
//!
//! Ships with `google` and `exactonline`; applications register more.

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::config::{ConnectorConfig, ConnectorSettings, ConnectorType};
use crate::connector::Connector;
use crate::error::{ConnectorError, ConnectorResult};

/// Builds a connector from a fully merged configuration.
pub type ConnectorBuilder =
    Arc<dyn Fn(ConnectorConfig) -> ConnectorResult<Connector> + Send + Sync>;

#[derive(Clone)]
pub struct ConnectorRegistry {
    builders: IndexMap<String, ConnectorBuilder>,
}

impl ConnectorRegistry {
    /// Registry with the built-in connectors.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(ConnectorType::Google.as_str(), Connector::google);
        registry.register(ConnectorType::ExactOnline.as_str(), Connector::exact_online);
        registry
    }

    pub fn empty() -> Self {
        Self {
            builders: IndexMap::new(),
        }
    }

    /// Register `builder` under `name`, replacing any earlier registration.
    ///
    /// The name must also be a [`ConnectorType`] name for [`create`](Self::create)
    /// to succeed.
    pub fn register<F>(&mut self, name: impl Into<String>, builder: F)
    where
        F: Fn(ConnectorConfig) -> ConnectorResult<Connector> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!(connector = %name, "Registering connector");
        self.builders.insert(name, Arc::new(builder));
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn registered(&self) -> Vec<String> {
        self.builders.keys().cloned().collect()
    }

    /// Merge `settings` over the type defaults, validate, and build.
    pub fn create(&self, name: &str, settings: &ConnectorSettings) -> ConnectorResult<Connector> {
        let builder = self
            .builders
            .get(name)
            .ok_or_else(|| ConnectorError::ConnectorNotFound {
                name: name.to_string(),
                available: self.registered(),
            })?;

        let connector_type: ConnectorType = name.parse()?;
        let config = ConnectorConfig::from_settings(connector_type, settings)?;
        builder(config)
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field("registered", &self.registered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn google_settings() -> ConnectorSettings {
        ConnectorSettings::default()
            .with_credential("client_id", "gid")
            .with_credential("client_secret", "gsecret")
    }

    #[test]
    fn test_default_registrations() {
        let registry = ConnectorRegistry::new();
        assert_eq!(registry.registered(), vec!["google", "exactonline"]);
        assert!(registry.is_registered("google"));
        assert!(!registry.is_registered("hubspot"));
    }

    #[test]
    fn test_create_builds_unauthenticated_connector() {
        let registry = ConnectorRegistry::new();
        let connector = registry.create("google", &google_settings()).unwrap();
        assert_eq!(connector.base_url(), "https://www.googleapis.com");
        assert!(!connector.is_authenticated());
        assert_eq!(connector.config().retries(), 3);
    }

    #[test]
    fn test_unknown_name_lists_available() {
        let registry = ConnectorRegistry::new();
        let err = registry
            .create("dropbox", &ConnectorSettings::default())
            .unwrap_err();
        match err {
            ConnectorError::ConnectorNotFound { name, available } => {
                assert_eq!(name, "dropbox");
                assert_eq!(available, vec!["google", "exactonline"]);
            }
            other => panic!("expected ConnectorNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_create_validates_before_building() {
        let registry = ConnectorRegistry::new();
        let settings = ConnectorSettings::default().with_credential("client_id", "eid");
        let err = registry.create("exactonline", &settings).unwrap_err();
        assert!(matches!(err, ConnectorError::MissingCredentials { .. }));
    }

    #[test]
    fn test_register_custom_connector() {
        let mut registry = ConnectorRegistry::new();
        registry.register("hubspot", Connector::static_token);
        assert!(registry.is_registered("hubspot"));
        assert_eq!(registry.registered(), vec!["google", "exactonline", "hubspot"]);

        let settings = ConnectorSettings::default().with_credential("access_token", "pat");
        let connector = registry.create("hubspot", &settings).unwrap();
        assert_eq!(connector.base_url(), "https://api.hubapi.com");
    }

    #[test]
    fn test_register_twice_overwrites() {
        let mut registry = ConnectorRegistry::new();
        registry.register("google", |_config| {
            Err(ConnectorError::InvalidConfiguration("replaced".to_string()))
        });
        assert_eq!(registry.registered().len(), 2);

        let err = registry.create("google", &google_settings()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid configuration: replaced");
    }

    #[test]
    fn test_registered_name_without_type_fails() {
        let mut registry = ConnectorRegistry::empty();
        registry.register("custom", Connector::static_token);
        let err = registry
            .create("custom", &ConnectorSettings::default())
            .unwrap_err();
        assert!(matches!(err, ConnectorError::UnknownConnectorType(_)));
    }
}

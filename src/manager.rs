//! Application-facing entry point.
//!
//! An [`ApiManager`] is built once by the application and passed around by
//! reference. It owns the registry, the loaded settings and a cache of one
//! connector per (name, settings) pair, so authentication happens once per
//! distinct configuration.

use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::{ConnectorSettings, ManagerSettings};
use crate::connector::Connector;
use crate::error::ConnectorResult;
use crate::http::{Headers, Payload, Request, Response};
use crate::registry::ConnectorRegistry;

/// Connector handle shared between callers.
///
/// The mutex serializes the authenticate-then-send sequence per instance.
pub type SharedConnector = Arc<Mutex<Connector>>;

pub struct ApiManager {
    registry: ConnectorRegistry,
    settings: ManagerSettings,
    cache: DashMap<String, SharedConnector>,
}

impl ApiManager {
    pub fn new(registry: ConnectorRegistry, settings: ManagerSettings) -> Self {
        Self {
            registry,
            settings,
            cache: DashMap::new(),
        }
    }

    /// Built-in connectors, configured from `settings`.
    pub fn from_settings(settings: ManagerSettings) -> Self {
        Self::new(ConnectorRegistry::new(), settings)
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ConnectorRegistry {
        &self.registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, builder: F)
    where
        F: Fn(crate::config::ConnectorConfig) -> ConnectorResult<Connector> + Send + Sync + 'static,
    {
        self.registry.register(name, builder);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registry.is_registered(name)
    }

    pub fn registered(&self) -> Vec<String> {
        self.registry.registered()
    }

    /// Connector `name` using the loaded settings for it.
    pub fn connector(&self, name: &str) -> ConnectorResult<SharedConnector> {
        self.connector_with(name, &self.settings.connector(name))
    }

    /// Connector named by the `default` setting.
    pub fn default_connector(&self) -> ConnectorResult<SharedConnector> {
        self.connector(&self.settings.default)
    }

    pub fn google(&self) -> ConnectorResult<SharedConnector> {
        self.connector("google")
    }

    pub fn exact_online(&self) -> ConnectorResult<SharedConnector> {
        self.connector("exactonline")
    }

    /// Connector `name` built from explicit `settings`.
    ///
    /// With caching enabled, equal settings return the same instance.
    pub fn connector_with(
        &self,
        name: &str,
        settings: &ConnectorSettings,
    ) -> ConnectorResult<SharedConnector> {
        if !self.settings.cache.enabled {
            return Ok(Arc::new(Mutex::new(self.registry.create(name, settings)?)));
        }

        let key = cache_key(name, settings)?;
        if let Some(cached) = self.cache.get(&key) {
            return Ok(Arc::clone(cached.value()));
        }

        let entry = self.cache.entry(key).or_try_insert_with(|| {
            debug!(connector = %name, "Creating connector instance");
            self.registry
                .create(name, settings)
                .map(|c| Arc::new(Mutex::new(c)))
        })?;
        Ok(Arc::clone(entry.value()))
    }

    pub async fn request(&self, name: &str, request: Request) -> ConnectorResult<Response> {
        let connector = self.connector(name)?;
        let mut connector = connector.lock().await;
        connector.request(request).await
    }

    pub async fn get(&self, name: &str, endpoint: &str, headers: Headers) -> ConnectorResult<Response> {
        let connector = self.connector(name)?;
        let mut connector = connector.lock().await;
        connector.get(endpoint, headers).await
    }

    pub async fn post(
        &self,
        name: &str,
        endpoint: &str,
        data: Payload,
        headers: Headers,
    ) -> ConnectorResult<Response> {
        let connector = self.connector(name)?;
        let mut connector = connector.lock().await;
        connector.post(endpoint, data, headers).await
    }

    pub async fn put(
        &self,
        name: &str,
        endpoint: &str,
        data: Payload,
        headers: Headers,
    ) -> ConnectorResult<Response> {
        let connector = self.connector(name)?;
        let mut connector = connector.lock().await;
        connector.put(endpoint, data, headers).await
    }

    pub async fn patch(
        &self,
        name: &str,
        endpoint: &str,
        data: Payload,
        headers: Headers,
    ) -> ConnectorResult<Response> {
        let connector = self.connector(name)?;
        let mut connector = connector.lock().await;
        connector.patch(endpoint, data, headers).await
    }

    pub async fn delete(
        &self,
        name: &str,
        endpoint: &str,
        headers: Headers,
    ) -> ConnectorResult<Response> {
        let connector = self.connector(name)?;
        let mut connector = connector.lock().await;
        connector.delete(endpoint, headers).await
    }

    /// Drop every cached instance. Handles already given out stay usable.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}

impl Default for ApiManager {
    fn default() -> Self {
        Self::from_settings(ManagerSettings::default())
    }
}

/// `name` plus the settings serialized with object keys sorted, so that
/// equal settings always produce the same key.
fn cache_key(name: &str, settings: &ConnectorSettings) -> ConnectorResult<String> {
    let value = serde_json::to_value(settings)?;
    Ok(format!("{}_{}", name, canonical_json(&value)))
}

fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let fields: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical_json(v)))
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        other => other.to_string(),
    }
}

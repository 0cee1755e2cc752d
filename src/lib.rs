// Connector configuration and settings files
pub mod config;

// Error taxonomy shared by every layer
pub mod error;

// HTTP transport with retry
pub mod http;

// OAuth strategies per provider
pub mod auth;

// Authenticated connector state machine
pub mod connector;

// Name -> constructor registry
pub mod registry;

// Application facade with instance cache
pub mod manager;

pub use config::{load_settings, ConnectorConfig, ConnectorSettings, ConnectorType, ManagerSettings};
pub use connector::Connector;
pub use error::{ConnectorError, ConnectorResult};
pub use http::{Headers, HttpMethod, Payload, Request, Response};
pub use manager::{ApiManager, SharedConnector};
pub use registry::ConnectorRegistry;

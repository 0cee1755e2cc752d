//! Error types shared by every layer of the connector stack.
//!
//! Non-2xx HTTP responses are not errors here: they come back as a
//! [`Response`](crate::http::Response) with `success == false`.

use crate::http::Response;

#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    /// A structural field (base URL, connector type) is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Required credentials are absent, in schema order.
    ///
    /// This is the invalid-configuration case raised at construction;
    /// [`is_invalid_configuration`](Self::is_invalid_configuration) matches
    /// it together with [`InvalidConfiguration`](Self::InvalidConfiguration).
    #[error("Missing required configuration: {}", missing.join(", "))]
    MissingCredentials { missing: Vec<String> },

    #[error("Connector '{name}' not found. Available connectors: {}", available.join(", "))]
    ConnectorNotFound { name: String, available: Vec<String> },

    #[error("Unknown connector type '{0}'")]
    UnknownConnectorType(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The transport exhausted its attempt budget.
    #[error("HTTP request failed after {attempts} attempts: {message}")]
    Http {
        attempts: u32,
        message: String,
        response: Box<Response>,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConnectorError {
    /// The synthetic failed response carried by a transport failure.
    pub fn response(&self) -> Option<&Response> {
        match self {
            ConnectorError::Http { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Configuration rejected before any network call, structurally or for
    /// missing credentials.
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(
            self,
            ConnectorError::InvalidConfiguration(_) | ConnectorError::MissingCredentials { .. }
        )
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, ConnectorError::Authentication(_))
    }
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;

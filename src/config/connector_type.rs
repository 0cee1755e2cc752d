use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConnectorError;

/// External services the connector layer knows how to describe.
///
/// Each variant carries its default API base URL and the credential keys
/// a configuration must provide before a connector can be built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorType {
    Google,
    #[serde(rename = "exactonline")]
    ExactOnline,
    Salesforce,
    Hubspot,
    Zapier,
}

impl ConnectorType {
    pub const ALL: [ConnectorType; 5] = [
        ConnectorType::Google,
        ConnectorType::ExactOnline,
        ConnectorType::Salesforce,
        ConnectorType::Hubspot,
        ConnectorType::Zapier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorType::Google => "google",
            ConnectorType::ExactOnline => "exactonline",
            ConnectorType::Salesforce => "salesforce",
            ConnectorType::Hubspot => "hubspot",
            ConnectorType::Zapier => "zapier",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ConnectorType::Google => "https://www.googleapis.com",
            ConnectorType::ExactOnline => "https://start.exactonline.nl",
            ConnectorType::Salesforce => "https://api.salesforce.com",
            ConnectorType::Hubspot => "https://api.hubapi.com",
            ConnectorType::Zapier => "https://hooks.zapier.com",
        }
    }

    /// Credential keys required by this connector type, in schema order.
    pub fn required_credentials(&self) -> &'static [&'static str] {
        match self {
            ConnectorType::Google => &["client_id", "client_secret"],
            ConnectorType::ExactOnline => &["client_id", "client_secret", "division"],
            ConnectorType::Salesforce => &["client_id", "client_secret", "username", "password"],
            ConnectorType::Hubspot => &["access_token"],
            ConnectorType::Zapier => &["webhook_url"],
        }
    }
}

impl fmt::Display for ConnectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectorType {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConnectorType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ConnectorError::UnknownConnectorType(s.to_string()))
    }
}

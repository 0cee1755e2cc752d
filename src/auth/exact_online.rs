use serde_json::json;
use tracing::info;

use super::exchange::exchange_token;
use super::{build_auth_url, present, redirect_uri, require, Credentials};
use crate::config::ConnectorConfig;
use crate::error::ConnectorResult;
use crate::http::{HttpTransport, Payload, Request};

pub const TOKEN_URL: &str = "https://start.exactonline.nl/api/oauth2/token";
pub const AUTH_URL: &str = "https://start.exactonline.nl/api/oauth2/auth";
pub const DIVISION_HEADER: &str = "X-Exact-Online-Division";

/// Exact Online client-credentials grant.
///
/// Every authenticated request also carries the division (tenant) header.
#[derive(Clone, Debug, Default)]
pub struct ExactOnlineAuth {
    credentials: Option<Credentials>,
    division: Option<String>,
}

impl ExactOnlineAuth {
    /// Fails without any network call when `client_id`, `client_secret`
    /// or `division` has no value.
    pub async fn authenticate(
        &mut self,
        config: &ConnectorConfig,
        transport: &HttpTransport,
    ) -> ConnectorResult<()> {
        self.credentials = None;
        self.division = None;

        let creds = require(config, &["client_id", "client_secret", "division"])?;
        let (client_id, client_secret, division) = (creds[0], creds[1], creds[2]);

        let fields = Payload::from([
            ("grant_type".to_string(), json!("client_credentials")),
            ("client_id".to_string(), json!(client_id)),
            ("client_secret".to_string(), json!(client_secret)),
        ]);
        let token_url = config.option_str("token_url").unwrap_or(TOKEN_URL);
        let credentials = exchange_token(transport, token_url, fields).await?;

        info!(connector = "exactonline", division = %division, "Obtained access token");
        self.credentials = Some(credentials);
        self.division = Some(division.to_string());
        Ok(())
    }

    pub fn decorate(&self, request: Request) -> Request {
        let request = match &self.credentials {
            Some(credentials) => {
                request.with_header("Authorization", credentials.authorization_header())
            }
            None => request,
        };
        match &self.division {
            Some(division) => request.with_header(DIVISION_HEADER, division.clone()),
            None => request,
        }
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Division cached by the last successful authentication.
    pub fn division(&self) -> Option<&str> {
        self.division.as_deref()
    }

    pub fn authorization_url(config: &ConnectorConfig, redirect: Option<&str>) -> String {
        let auth_url = config.option_str("auth_url").unwrap_or(AUTH_URL);
        build_auth_url(
            auth_url,
            &[
                ("client_id", present(config, "client_id")),
                ("redirect_uri", Some(redirect_uri(config, redirect))),
                ("response_type", Some("code")),
            ],
        )
    }
}

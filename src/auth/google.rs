use serde_json::json;
use tracing::{debug, info};

use super::exchange::exchange_token;
use super::{build_auth_url, present, redirect_uri, require, Credentials};
use crate::config::ConnectorConfig;
use crate::error::{ConnectorError, ConnectorResult};
use crate::http::{HttpTransport, Payload, Request};

pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google OAuth2: refresh-token grant when a refresh token is configured,
/// otherwise the authorization-code grant with `auth_code`.
///
/// The token endpoint can be overridden with the `token_url` option.
#[derive(Clone, Debug, Default)]
pub struct GoogleAuth {
    credentials: Option<Credentials>,
}

impl GoogleAuth {
    pub async fn authenticate(
        &mut self,
        config: &ConnectorConfig,
        transport: &HttpTransport,
    ) -> ConnectorResult<()> {
        self.credentials = None;

        let fields = Self::grant_fields(config)?;
        let token_url = config.option_str("token_url").unwrap_or(TOKEN_URL);
        let credentials = exchange_token(transport, token_url, fields).await?;

        info!(connector = "google", "Obtained access token");
        self.credentials = Some(credentials);
        Ok(())
    }

    /// Form fields for the token request, chosen by which grant input is present.
    fn grant_fields(config: &ConnectorConfig) -> ConnectorResult<Payload> {
        let creds = require(config, &["client_id", "client_secret"])?;
        let (client_id, client_secret) = (creds[0], creds[1]);

        if let Some(refresh_token) = present(config, "refresh_token") {
            debug!(connector = "google", "Using refresh_token grant");
            return Ok(Payload::from([
                ("client_id".to_string(), json!(client_id)),
                ("client_secret".to_string(), json!(client_secret)),
                ("refresh_token".to_string(), json!(refresh_token)),
                ("grant_type".to_string(), json!("refresh_token")),
            ]));
        }

        if let Some(code) = present(config, "auth_code") {
            debug!(connector = "google", "Using authorization_code grant");
            return Ok(Payload::from([
                ("client_id".to_string(), json!(client_id)),
                ("client_secret".to_string(), json!(client_secret)),
                ("code".to_string(), json!(code)),
                ("grant_type".to_string(), json!("authorization_code")),
                ("redirect_uri".to_string(), json!(redirect_uri(config, None))),
            ]));
        }

        Err(ConnectorError::Authentication(
            "missing credentials: refresh_token or auth_code".to_string(),
        ))
    }

    pub fn decorate(&self, request: Request) -> Request {
        match &self.credentials {
            Some(credentials) => {
                request.with_header("Authorization", credentials.authorization_header())
            }
            None => request,
        }
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Consent-screen URL requesting offline access for `scope`.
    pub fn authorization_url(
        config: &ConnectorConfig,
        scope: &str,
        redirect: Option<&str>,
    ) -> String {
        let auth_url = config.option_str("auth_url").unwrap_or(AUTH_URL);
        build_auth_url(
            auth_url,
            &[
                ("client_id", present(config, "client_id")),
                ("redirect_uri", Some(redirect_uri(config, redirect))),
                ("scope", Some(scope)),
                ("response_type", Some("code")),
                ("access_type", Some("offline")),
                ("prompt", Some("consent")),
            ],
        )
    }
}

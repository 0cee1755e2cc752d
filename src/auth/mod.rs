//! Per-provider authentication strategies.
//!
//! Flow for every strategy:
//! 1. Read the grant inputs from the connector's credentials
//! 2. Exchange them at the provider's token endpoint (or take a static token)
//! 3. Cache the resulting bearer credential in memory
//! 4. Decorate outbound requests with it
//!
//! The set of strategies is closed: adding a provider means adding a
//! variant here together with its [`ConnectorType`](crate::config::ConnectorType)
//! schema.

mod exact_online;
mod exchange;
mod google;
mod static_token;

pub use exact_online::ExactOnlineAuth;
pub use google::GoogleAuth;
pub use static_token::StaticTokenAuth;

use chrono::{DateTime, Utc};
use std::fmt;

use crate::config::ConnectorConfig;
use crate::error::{ConnectorError, ConnectorResult};
use crate::http::{HttpTransport, Request};

/// Redirect URI used when none is configured (out-of-band copy/paste flow).
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Bearer credential obtained by a strategy.
///
/// Held in memory only. `expires_at` is informational: tokens are not
/// refreshed proactively.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    /// OAuth access token (used for API requests)
    pub access_token: String,

    /// OAuth refresh token returned alongside the access token, if any
    pub refresh_token: Option<String>,

    /// When the access token expires (UTC)
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.map(|at| at <= Utc::now()).unwrap_or(false)
    }

    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"***")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// How a connector obtains and applies its bearer credential.
#[derive(Clone, Debug)]
pub enum AuthStrategy {
    Google(GoogleAuth),
    ExactOnline(ExactOnlineAuth),
    StaticToken(StaticTokenAuth),
}

impl AuthStrategy {
    pub fn google() -> Self {
        AuthStrategy::Google(GoogleAuth::default())
    }

    pub fn exact_online() -> Self {
        AuthStrategy::ExactOnline(ExactOnlineAuth::default())
    }

    pub fn static_token() -> Self {
        AuthStrategy::StaticToken(StaticTokenAuth::default())
    }

    pub fn name(&self) -> &'static str {
        match self {
            AuthStrategy::Google(_) => "google",
            AuthStrategy::ExactOnline(_) => "exactonline",
            AuthStrategy::StaticToken(_) => "static_token",
        }
    }

    /// Obtain a fresh credential, replacing any cached one.
    pub async fn authenticate(
        &mut self,
        config: &ConnectorConfig,
        transport: &HttpTransport,
    ) -> ConnectorResult<()> {
        match self {
            AuthStrategy::Google(auth) => auth.authenticate(config, transport).await,
            AuthStrategy::ExactOnline(auth) => auth.authenticate(config, transport).await,
            AuthStrategy::StaticToken(auth) => auth.authenticate(config),
        }
    }

    /// Add the cached credential (and provider headers) to `request`.
    pub fn decorate(&self, request: Request) -> Request {
        match self {
            AuthStrategy::Google(auth) => auth.decorate(request),
            AuthStrategy::ExactOnline(auth) => auth.decorate(request),
            AuthStrategy::StaticToken(auth) => auth.decorate(request),
        }
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        match self {
            AuthStrategy::Google(auth) => auth.credentials(),
            AuthStrategy::ExactOnline(auth) => auth.credentials(),
            AuthStrategy::StaticToken(auth) => auth.credentials(),
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.credentials().map(|c| c.access_token.as_str())
    }

    /// Interactive authorization URL, for strategies that have one.
    ///
    /// `scope` is only used by Google.
    pub fn authorization_url(
        &self,
        config: &ConnectorConfig,
        scope: Option<&str>,
        redirect_uri: Option<&str>,
    ) -> Option<String> {
        match self {
            AuthStrategy::Google(_) => Some(GoogleAuth::authorization_url(
                config,
                scope.unwrap_or_default(),
                redirect_uri,
            )),
            AuthStrategy::ExactOnline(_) => {
                Some(ExactOnlineAuth::authorization_url(config, redirect_uri))
            }
            AuthStrategy::StaticToken(_) => None,
        }
    }
}

/// Credential value treated as absent when empty.
fn present<'a>(config: &'a ConnectorConfig, key: &str) -> Option<&'a str> {
    config.credential(key).filter(|v| !v.is_empty())
}

/// Fail with the list of keys that have no usable value.
fn require<'a>(config: &'a ConnectorConfig, keys: &[&str]) -> ConnectorResult<Vec<&'a str>> {
    let values: Vec<Option<&str>> = keys.iter().map(|k| present(config, k)).collect();
    let missing: Vec<&str> = keys
        .iter()
        .zip(&values)
        .filter(|(_, v)| v.is_none())
        .map(|(k, _)| *k)
        .collect();

    if !missing.is_empty() {
        return Err(ConnectorError::Authentication(format!(
            "missing credentials: {}",
            missing.join(", ")
        )));
    }
    Ok(values.into_iter().flatten().collect())
}

/// Redirect URI argument, then the configured credential, then out-of-band.
fn redirect_uri<'a>(config: &'a ConnectorConfig, explicit: Option<&'a str>) -> &'a str {
    explicit
        .or_else(|| present(config, "redirect_uri"))
        .unwrap_or(OOB_REDIRECT_URI)
}

/// Build `base?k=v&...`, skipping parameters without a value.
fn build_auth_url(base: &str, params: &[(&str, Option<&str>)]) -> String {
    let query: Vec<String> = params
        .iter()
        .filter_map(|(k, v)| v.map(|v| format!("{}={}", k, urlencoding::encode(v))))
        .collect();
    format!("{}?{}", base, query.join("&"))
}

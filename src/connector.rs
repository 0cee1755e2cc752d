use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::auth::AuthStrategy;
use crate::config::{ConnectorConfig, ConnectorType};
use crate::error::{ConnectorError, ConnectorResult};
use crate::http::{build_url, Headers, HttpMethod, HttpTransport, Payload, Request, Response};

/// Stateful client bound to one external service and one credential set.
///
/// # Lifecycle
/// 1. Construction validates the configuration (no network)
/// 2. The first request authenticates lazily through the bound strategy
/// 3. Later requests reuse the cached bearer credential
///
/// A failed authentication leaves the connector unauthenticated, so the
/// next request tries again. An expired token is not renewed
/// automatically: a 401 comes back as an unsuccessful [`Response`].
///
/// Methods that may authenticate take `&mut self`; share a connector
/// across tasks behind a mutex (see [`SharedConnector`](crate::SharedConnector)).
#[derive(Debug)]
pub struct Connector {
    config: Arc<ConnectorConfig>,
    transport: HttpTransport,
    strategy: AuthStrategy,
    authenticated: bool,
}

impl Connector {
    /// Fails with [`ConnectorError::MissingCredentials`] before any network
    /// call when a required credential is absent.
    pub fn new(config: ConnectorConfig, strategy: AuthStrategy) -> ConnectorResult<Self> {
        config.ensure_valid()?;
        let transport = HttpTransport::from_config(&config)?;

        Ok(Self {
            config: Arc::new(config),
            transport,
            strategy,
            authenticated: false,
        })
    }

    pub fn google(config: ConnectorConfig) -> ConnectorResult<Self> {
        Self::new(config, AuthStrategy::google())
    }

    pub fn exact_online(config: ConnectorConfig) -> ConnectorResult<Self> {
        Self::new(config, AuthStrategy::exact_online())
    }

    pub fn static_token(config: ConnectorConfig) -> ConnectorResult<Self> {
        Self::new(config, AuthStrategy::static_token())
    }

    pub async fn get(&mut self, endpoint: &str, headers: Headers) -> ConnectorResult<Response> {
        let request = Request::new(HttpMethod::Get, self.url(endpoint)).with_headers(headers);
        self.request(request).await
    }

    pub async fn post(
        &mut self,
        endpoint: &str,
        data: Payload,
        headers: Headers,
    ) -> ConnectorResult<Response> {
        self.send_with_body(HttpMethod::Post, endpoint, data, headers).await
    }

    pub async fn put(
        &mut self,
        endpoint: &str,
        data: Payload,
        headers: Headers,
    ) -> ConnectorResult<Response> {
        self.send_with_body(HttpMethod::Put, endpoint, data, headers).await
    }

    pub async fn patch(
        &mut self,
        endpoint: &str,
        data: Payload,
        headers: Headers,
    ) -> ConnectorResult<Response> {
        self.send_with_body(HttpMethod::Patch, endpoint, data, headers).await
    }

    pub async fn delete(&mut self, endpoint: &str, headers: Headers) -> ConnectorResult<Response> {
        let request = Request::new(HttpMethod::Delete, self.url(endpoint)).with_headers(headers);
        self.request(request).await
    }

    /// Authenticate if needed, add auth headers, send through the transport.
    ///
    /// The transport's response is returned unmodified.
    pub async fn request(&mut self, request: Request) -> ConnectorResult<Response> {
        if !self.authenticated {
            self.authenticate().await?;
        } else if self.token_expired() {
            debug!(connector = %self.config.connector_type(), "Cached token is past its expiry");
        }
        let request = self.strategy.decorate(request);
        self.transport.send(&request).await
    }

    /// Run the strategy again, replacing the cached credential.
    ///
    /// Every failure is reported as [`ConnectorError::Authentication`].
    pub async fn authenticate(&mut self) -> ConnectorResult<()> {
        let result = self
            .strategy
            .authenticate(&self.config, &self.transport)
            .await;

        match result {
            Ok(()) => {
                self.authenticated = true;
                info!(connector = %self.config.connector_type(), "Connector authenticated");
                Ok(())
            }
            Err(e) => {
                self.authenticated = false;
                warn!(connector = %self.config.connector_type(), error = %e, "Authentication failed");
                Err(match e {
                    ConnectorError::Authentication(_) => e,
                    other => ConnectorError::Authentication(other.to_string()),
                })
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn connector_type(&self) -> ConnectorType {
        self.config.connector_type()
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }

    /// The configuration, fixed for the connector's lifetime.
    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// JSON view of the configuration with credential values masked.
    pub fn config_snapshot(&self) -> Value {
        self.config.snapshot(true)
    }

    pub fn has_config(&self, key: &str) -> bool {
        self.config.has_credential(key) || self.config.has_option(key)
    }

    /// Credential value first, then option value.
    pub fn config_value(&self, key: &str) -> Option<Value> {
        self.config
            .credential(key)
            .map(|v| Value::String(v.to_string()))
            .or_else(|| self.config.option(key).cloned())
    }

    pub fn strategy(&self) -> &AuthStrategy {
        &self.strategy
    }

    /// True when the provider-reported lifetime of the cached token has
    /// passed. The token is still sent; nothing renews it.
    pub fn token_expired(&self) -> bool {
        self.strategy
            .credentials()
            .map(|credentials| credentials.is_expired())
            .unwrap_or(false)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.strategy.access_token()
    }

    /// Exact Online division, once authenticated.
    pub fn division(&self) -> Option<&str> {
        match &self.strategy {
            AuthStrategy::ExactOnline(auth) => auth.division(),
            _ => None,
        }
    }

    /// Interactive OAuth consent URL; `None` for static-token connectors.
    pub fn authorization_url(&self, scope: Option<&str>, redirect_uri: Option<&str>) -> Option<String> {
        self.strategy
            .authorization_url(&self.config, scope, redirect_uri)
    }

    fn url(&self, endpoint: &str) -> String {
        build_url(self.config.base_url(), endpoint)
    }

    async fn send_with_body(
        &mut self,
        method: HttpMethod,
        endpoint: &str,
        data: Payload,
        headers: Headers,
    ) -> ConnectorResult<Response> {
        let request = Request::new(method, self.url(endpoint))
            .with_headers(headers)
            .with_data(data);
        self.request(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn google_config(base_url: &str, token_url: &str) -> ConnectorConfig {
        ConnectorConfig::new(ConnectorType::Google, base_url)
            .unwrap()
            .with_credential("client_id", "gid")
            .with_credential("client_secret", "gsecret")
            .with_credential("refresh_token", "r1")
            .with_option("token_url", token_url)
            .with_retries(1)
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let config = ConnectorConfig::new(ConnectorType::ExactOnline, "http://127.0.0.1:1")
            .unwrap()
            .with_credential("client_id", "eid");
        let err = Connector::exact_online(config).unwrap_err();
        match err {
            ConnectorError::MissingCredentials { missing } => {
                assert_eq!(missing, vec!["client_secret", "division"]);
            }
            other => panic!("expected MissingCredentials, got {:?}", other),
        }
    }

    #[test]
    fn test_new_connector_is_unauthenticated() {
        let connector =
            Connector::google(google_config("https://www.googleapis.com", "http://127.0.0.1:1"))
                .unwrap();
        assert!(!connector.is_authenticated());
        assert_eq!(connector.access_token(), None);
        assert_eq!(connector.connector_type(), ConnectorType::Google);
        assert_eq!(connector.config_snapshot()["credentials"]["client_secret"], "***");
    }

    #[test]
    fn test_config_lookup() {
        let connector =
            Connector::google(google_config("https://www.googleapis.com", "http://127.0.0.1:1"))
                .unwrap();
        assert!(connector.has_config("client_id"));
        assert!(connector.has_config("token_url"));
        assert!(!connector.has_config("scope"));
        assert_eq!(connector.config_value("client_id"), Some(json!("gid")));
        assert_eq!(connector.config_value("token_url"), Some(json!("http://127.0.0.1:1")));
        assert_eq!(connector.config_value("scope"), None);
    }

    #[test]
    fn test_authorization_url_per_strategy() {
        let connector =
            Connector::google(google_config("https://www.googleapis.com", "http://127.0.0.1:1"))
                .unwrap();
        let url = connector.authorization_url(Some("email"), None).unwrap();
        assert!(url.contains("scope=email"));
        assert!(url.contains("access_type=offline"));
    }

    #[tokio::test]
    async fn test_lazy_authentication_then_bearer() {
        let mut server = Server::new_async().await;
        let token = server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "tok-1"}"#)
            .expect(1)
            .create_async()
            .await;
        let api = server
            .mock("GET", "/calendar/v3/users/me/calendarList")
            .match_header("authorization", "Bearer tok-1")
            .with_status(200)
            .with_body(r#"{"items": []}"#)
            .expect(2)
            .create_async()
            .await;

        let base = format!("{}/", server.url());
        let token_url = format!("{}/token", server.url());
        let mut connector = Connector::google(google_config(&base, &token_url)).unwrap();

        let response = connector
            .get("/calendar/v3/users/me/calendarList", Headers::new())
            .await
            .unwrap();
        assert!(response.is_success());
        assert!(connector.is_authenticated());

        // Second request reuses the cached token.
        connector
            .get("calendar/v3/users/me/calendarList", Headers::new())
            .await
            .unwrap();

        token.assert_async().await;
        api.assert_async().await;
        assert_eq!(connector.access_token(), Some("tok-1"));
    }

    #[tokio::test]
    async fn test_failed_authentication_stays_unauthenticated() {
        let mut server = Server::new_async().await;
        let token = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant"}"#)
            .expect(2)
            .create_async()
            .await;
        let api = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let token_url = format!("{}/token", server.url());
        let mut connector = Connector::google(google_config(&server.url(), &token_url)).unwrap();

        let err = connector.get("/anything", Headers::new()).await.unwrap_err();
        assert!(err.is_authentication());
        assert!(!connector.is_authenticated());

        // The next request tries to authenticate again.
        let err = connector.get("/anything", Headers::new()).await.unwrap_err();
        assert!(err.is_authentication());

        token.assert_async().await;
        api.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_token_endpoint_wraps_transport_error() {
        let server = Server::new_async().await;
        let mut connector =
            Connector::google(google_config(&server.url(), "http://127.0.0.1:1/token")).unwrap();

        let err = connector.authenticate().await.unwrap_err();
        assert!(err.is_authentication());
        assert!(err.to_string().contains("HTTP request failed after 1 attempts"));
        assert!(!connector.is_authenticated());
    }

    #[tokio::test]
    async fn test_expired_token_is_not_renewed() {
        let mut server = Server::new_async().await;
        let token = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token": "stale", "expires_in": 0}"#)
            .expect(1)
            .create_async()
            .await;
        let _api = server
            .mock("GET", "/me")
            .with_status(401)
            .with_body(r#"{"error": {"message": "Invalid Credentials"}}"#)
            .create_async()
            .await;

        let token_url = format!("{}/token", server.url());
        let mut connector = Connector::google(google_config(&server.url(), &token_url)).unwrap();

        let first = connector.get("/me", Headers::new()).await.unwrap();
        let second = connector.get("/me", Headers::new()).await.unwrap();

        assert_eq!(first.status_code, 401);
        assert_eq!(second.error_message(), Some("Invalid Credentials"));
        assert!(connector.is_authenticated());
        assert!(connector.token_expired());
        token.assert_async().await;
    }

    #[tokio::test]
    async fn test_exact_online_injects_division() {
        let mut server = Server::new_async().await;
        let _token = server
            .mock("POST", "/api/oauth2/token")
            .with_status(200)
            .with_body(r#"{"access_token": "exact-token"}"#)
            .create_async()
            .await;
        let api = server
            .mock("POST", "/api/v1/4242/crm/Accounts")
            .match_header("authorization", "Bearer exact-token")
            .match_header("x-exact-online-division", "4242")
            .match_body(Matcher::Json(json!({"Name": "Acme"})))
            .with_status(201)
            .with_body(r#"{"d": {"ID": "abc"}}"#)
            .create_async()
            .await;

        let config = ConnectorConfig::new(ConnectorType::ExactOnline, server.url())
            .unwrap()
            .with_credential("client_id", "eid")
            .with_credential("client_secret", "esecret")
            .with_credential("division", "4242")
            .with_option("token_url", format!("{}/api/oauth2/token", server.url()));
        let mut connector = Connector::exact_online(config).unwrap();

        let response = connector
            .post(
                "/api/v1/4242/crm/Accounts",
                Payload::from([("Name".to_string(), json!("Acme"))]),
                Headers::new(),
            )
            .await
            .unwrap();

        api.assert_async().await;
        assert!(response.is_success());
        assert_eq!(response.data["d"]["ID"], "abc");
        assert_eq!(connector.division(), Some("4242"));
    }
}

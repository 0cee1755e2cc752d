use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use super::{build_url, Headers, Request, Response};
use crate::config::ConnectorConfig;
use crate::error::{ConnectorError, ConnectorResult};

/// Delay before attempt `attempt + 1`, after `attempt` failures.
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(100 * u64::from(attempt))
}

/// Executes requests against one base URL with a bounded attempt budget.
///
/// Only transport-level failures (connect errors, timeouts, unreadable
/// bodies) consume attempts. Any HTTP status, 4xx and 5xx included, is a
/// completed round trip and is returned as a [`Response`].
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
    retries: u32,
}

impl HttpTransport {
    /// Build a transport. A `retries` of zero is treated as one attempt.
    pub fn new(
        base_url: impl Into<String>,
        default_headers: &Headers,
        timeout: Duration,
        retries: u32,
    ) -> ConnectorResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(to_header_map(default_headers)?)
            .build()
            .map_err(|e| {
                ConnectorError::InvalidConfiguration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
            retries: retries.max(1),
        })
    }

    pub fn from_config(config: &ConnectorConfig) -> ConnectorResult<Self> {
        Self::new(
            config.base_url(),
            config.default_headers(),
            config.timeout(),
            config.retries(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Send `request`, retrying transport failures with linear backoff.
    ///
    /// Returns [`ConnectorError::Http`] once the attempt budget is spent.
    pub async fn send(&self, request: &Request) -> ConnectorResult<Response> {
        let attempts = request.retries.unwrap_or(self.retries).max(1);
        let prepared = self.prepare(request)?;

        let mut attempt = 0;
        let mut last_error = String::from("Unknown error");

        while attempt < attempts {
            let outgoing = prepared.try_clone().ok_or_else(|| {
                ConnectorError::InvalidConfiguration("request body cannot be replayed".to_string())
            })?;

            debug!(
                method = %request.method,
                url = %prepared.url(),
                attempt = attempt + 1,
                "Sending request"
            );

            match self.execute(outgoing).await {
                Ok(response) => {
                    debug!(status = response.status_code, "Response received");
                    return Ok(response);
                }
                Err(e) => {
                    attempt += 1;
                    last_error = e.to_string();
                    warn!(
                        method = %request.method,
                        url = %prepared.url(),
                        attempt,
                        error = %last_error,
                        "Request attempt failed"
                    );

                    if attempt >= attempts {
                        break;
                    }
                    tokio::time::sleep(backoff_delay(attempt)).await;
                }
            }
        }

        Err(ConnectorError::Http {
            attempts,
            response: Box::new(Response::failed(last_error.clone())),
            message: last_error,
        })
    }

    /// Resolve the URL and encode headers and body once, before any attempt.
    fn prepare(&self, request: &Request) -> ConnectorResult<reqwest::Request> {
        let url = self.resolve(&request.full_url());
        let mut builder = self.client.request(request.method.into(), url);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if request.has_body() {
            builder = if request.is_form() {
                builder.form(&request.form_fields())
            } else {
                builder.json(&request.data)
            };
        }

        builder
            .build()
            .map_err(|e| ConnectorError::InvalidConfiguration(format!("Invalid request: {}", e)))
    }

    async fn execute(&self, outgoing: reqwest::Request) -> Result<Response, reqwest::Error> {
        let response = self.client.execute(outgoing).await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await?;

        Ok(Response::new(status, headers, body))
    }

    fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            build_url(&self.base_url, url)
        }
    }
}

fn to_header_map(headers: &Headers) -> ConnectorResult<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ConnectorError::InvalidConfiguration(format!("Invalid header name '{}': {}", name, e))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            ConnectorError::InvalidConfiguration(format!("Invalid value for header '{}': {}", name, e))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

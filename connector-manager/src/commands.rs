//! Subcommand implementations. Each returns the text to print.

use anyhow::{anyhow, bail, Context, Result};
use api_manager::config::ConnectorConfig;
use api_manager::{
    load_settings, ApiManager, ConnectorType, Headers, HttpMethod, ManagerSettings, Payload,
    Request,
};
use tracing::{debug, info};

/// Settings from `path` when given, otherwise from the environment.
pub fn load(path: Option<&str>) -> Result<ManagerSettings> {
    match path {
        Some(path) => {
            info!(path = %path, "Loading settings file");
            load_settings(path)
        }
        None => {
            debug!("No settings file, reading environment");
            Ok(ManagerSettings::from_env())
        }
    }
}

/// One line per registered connector: name, base URL, readiness.
pub fn list(manager: &ApiManager) -> String {
    let mut lines = Vec::new();
    for name in manager.registered() {
        let settings = manager.settings().connector(&name);
        let line = match name.parse::<ConnectorType>() {
            Ok(connector_type) => match ConnectorConfig::from_settings(connector_type, &settings) {
                Ok(config) => {
                    let missing = config.missing_credentials();
                    let status = if missing.is_empty() {
                        "ready".to_string()
                    } else {
                        format!("missing {}", missing.join(", "))
                    };
                    format!("{:<12} {:<40} {}", name, config.base_url(), status)
                }
                Err(e) => format!("{:<12} {:<40} {}", name, "-", e),
            },
            Err(e) => format!("{:<12} {:<40} {}", name, "-", e),
        };
        lines.push(line);
    }
    lines.join("\n")
}

/// Split `key=value`; the value may itself contain `=`.
pub fn parse_pair(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected key=value, got '{}'", raw))?;
    if key.trim().is_empty() {
        bail!("empty key in '{}'", raw);
    }
    Ok((key.trim().to_string(), value.to_string()))
}

/// Parse a JSON object given on the command line.
pub fn parse_data(raw: Option<&str>) -> Result<Payload> {
    match raw {
        Some(raw) => serde_json::from_str(raw).context("--data must be a JSON object"),
        None => Ok(Payload::new()),
    }
}

pub fn build_request(
    method: &str,
    endpoint: &str,
    data: Option<&str>,
    query: &[String],
    headers: &[String],
) -> Result<Request> {
    let method: HttpMethod = method.parse().map_err(anyhow::Error::msg)?;
    let data = parse_data(data)?;
    if !data.is_empty() && !method.allows_body() {
        bail!("{} requests do not take a body", method);
    }

    let query = query
        .iter()
        .map(|raw| parse_pair(raw))
        .collect::<Result<Vec<_>>>()?;
    let headers = headers
        .iter()
        .map(|raw| parse_pair(raw))
        .collect::<Result<Headers>>()?;

    Ok(Request::new(method, endpoint)
        .with_query(query.into_iter().collect())
        .with_headers(headers)
        .with_data(data))
}

/// Send `request` and pretty-print the normalized response.
pub async fn request(manager: &ApiManager, connector: &str, request: Request) -> Result<String> {
    info!(
        connector = %connector,
        method = %request.method,
        endpoint = %request.url,
        "Sending request"
    );
    let response = manager.request(connector, request).await?;
    Ok(serde_json::to_string_pretty(&response)?)
}

pub async fn auth_url(
    manager: &ApiManager,
    connector: &str,
    scope: Option<&str>,
    redirect_uri: Option<&str>,
) -> Result<String> {
    let shared = manager.connector(connector)?;
    let connector_ref = shared.lock().await;
    connector_ref
        .authorization_url(scope, redirect_uri)
        .ok_or_else(|| anyhow!("Connector '{}' has no interactive authorization flow", connector))
}

pub async fn show(manager: &ApiManager, connector: &str) -> Result<String> {
    let shared = manager.connector(connector)?;
    let connector_ref = shared.lock().await;
    Ok(serde_json::to_string_pretty(&connector_ref.config_snapshot())?)
}

//! OAuth token endpoint exchange.
//!
//! Posts form-encoded grant fields through the connector's own transport
//! and turns the provider's token response into [`Credentials`].

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::debug;

use super::Credentials;
use crate::error::{ConnectorError, ConnectorResult};
use crate::http::{HttpTransport, Payload, Request, Response, FORM_CONTENT_TYPE};

/// Exchange grant `fields` for an access token at `token_url`.
///
/// Transport failures, non-2xx answers and bodies without an
/// `access_token` all come back as [`ConnectorError::Authentication`].
pub(crate) async fn exchange_token(
    transport: &HttpTransport,
    token_url: &str,
    fields: Payload,
) -> ConnectorResult<Credentials> {
    let grant_type = fields
        .get("grant_type")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    debug!(token_url = %token_url, grant_type = %grant_type, "Exchanging grant for token");

    let request = Request::post(token_url)
        .with_header("Content-Type", FORM_CONTENT_TYPE)
        .with_data(fields);

    let response = transport
        .send(&request)
        .await
        .map_err(|e| ConnectorError::Authentication(e.to_string()))?;

    if !response.is_success() {
        let detail = response
            .error_message()
            .or_else(|| response.data_str("error"))
            .unwrap_or("no error detail")
            .to_string();
        return Err(ConnectorError::Authentication(format!(
            "Token exchange failed with status {}: {}",
            response.status_code, detail
        )));
    }

    let credentials = parse_token_response(&response)?;

    debug!(
        grant_type = %grant_type,
        has_refresh_token = credentials.refresh_token.is_some(),
        expires_at = ?credentials.expires_at,
        "Token exchange successful"
    );

    Ok(credentials)
}

/// Only `access_token` is required; `refresh_token` and `expires_in` are
/// taken when usable and ignored otherwise.
fn parse_token_response(response: &Response) -> ConnectorResult<Credentials> {
    let access_token = response
        .data_str("access_token")
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            ConnectorError::Authentication("Token response has no access_token".to_string())
        })?;

    let refresh_token = response
        .data_str("refresh_token")
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    let expires_at = response
        .data_value("expires_in")
        .and_then(expires_in_seconds)
        .and_then(|seconds| expiry_after(Utc::now(), seconds));

    Ok(Credentials {
        access_token: access_token.to_string(),
        refresh_token,
        expires_at,
    })
}

/// Lifetime in seconds from a JSON number or numeric string.
fn expires_in_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// `None` when the lifetime does not fit in a timestamp.
fn expiry_after(now: DateTime<Utc>, seconds: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(seconds).and_then(|lifetime| now.checked_add_signed(lifetime))
}

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Normalized result of one HTTP round trip.
///
/// `success` is authoritative; the status helpers are conveniences.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status_code: u16,
    pub headers: IndexMap<String, String>,
    pub body: String,
    /// Parsed body; an empty object when the body is absent or not a JSON
    /// object/array.
    pub data: Value,
    pub success: bool,
    pub error: Option<String>,
}

impl Response {
    pub fn new(status_code: u16, headers: IndexMap<String, String>, body: String) -> Self {
        let data = parse_data(&body);
        Self {
            status_code,
            headers,
            body,
            data,
            success: (200..300).contains(&status_code),
            error: None,
        }
    }

    /// Synthetic response for a request that never completed.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status_code: 0,
            headers: IndexMap::new(),
            body: String::new(),
            data: empty_data(),
            success: false,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn is_error(&self) -> bool {
        !self.success
    }

    pub fn status(&self) -> Option<reqwest::StatusCode> {
        reqwest::StatusCode::from_u16(self.status_code).ok()
    }

    pub fn is_2xx(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status_code)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    /// Top-level field of the parsed body.
    pub fn data_value(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data_value(key).and_then(Value::as_str)
    }

    pub fn has_data(&self, key: &str) -> bool {
        self.data.as_object().map(|o| o.contains_key(key)).unwrap_or(false)
    }

    /// Explicit error, then `data.error.message`, then `data.message`.
    ///
    /// The body fields are only consulted for unsuccessful responses.
    pub fn error_message(&self) -> Option<&str> {
        if let Some(error) = self.error.as_deref().filter(|e| !e.is_empty()) {
            return Some(error);
        }
        if self.success {
            return None;
        }
        self.data
            .pointer("/error/message")
            .and_then(Value::as_str)
            .or_else(|| self.data_str("message"))
    }
}

fn empty_data() -> Value {
    Value::Object(Map::new())
}

/// Parse a body as JSON, keeping only objects and arrays.
fn parse_data(body: &str) -> Value {
    if body.trim().is_empty() {
        return empty_data();
    }
    match serde_json::from_str::<Value>(body) {
        Ok(v @ (Value::Object(_) | Value::Array(_))) => v,
        _ => empty_data(),
    }
}

use indexmap::IndexMap;
use serde_json::Value;
use std::time::Duration;

use super::HttpMethod;

pub type Headers = IndexMap<String, String>;
pub type Payload = IndexMap<String, Value>;
pub type Query = IndexMap<String, String>;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// One logical outbound call.
///
/// The `with_*` methods consume the request and return a new one whose map
/// has the given entries merged in; later keys win.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub data: Payload,
    pub query: Query,
    /// Per-attempt deadline; the transport default applies when unset.
    pub timeout: Option<Duration>,
    /// Attempt budget; the transport default applies when unset.
    pub retries: Option<u32>,
}

impl Request {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
            data: Payload::new(),
            query: Query::new(),
            timeout: None,
            retries: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    /// Header names compare case-insensitively: an existing entry with the
    /// same name in any casing is replaced.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        for (name, value) in headers {
            self.set_header(name, value);
        }
        self
    }

    pub fn with_data(mut self, data: Payload) -> Self {
        self.data.extend(data);
        self
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query.extend(query);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// URL with the query string appended in insertion order.
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }

        let pairs: Vec<(&str, &str)> = self
            .query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        // Encoding string pairs cannot fail.
        let encoded = serde_urlencoded::to_string(&pairs).unwrap_or_default();
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.url, separator, encoded)
    }

    pub fn has_body(&self) -> bool {
        self.method.allows_body() && !self.data.is_empty()
    }

    /// JSON text of the body, empty when the request carries none.
    pub fn body(&self) -> String {
        if !self.has_body() {
            return String::new();
        }
        serde_json::to_string(&self.data).unwrap_or_default()
    }

    fn set_header(&mut self, name: String, value: String) {
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value);
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// True when the body should be sent form encoded instead of as JSON.
    pub fn is_form(&self) -> bool {
        self.header("Content-Type")
            .map(|v| v.to_ascii_lowercase().starts_with(FORM_CONTENT_TYPE))
            .unwrap_or(false)
    }

    /// Body data flattened to string pairs for form encoding.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        self.data
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect()
    }
}

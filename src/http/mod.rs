//! Request/response value types and the retrying HTTP transport.

mod method;
mod request;
mod response;
mod transport;

pub use method::HttpMethod;
pub use request::{Headers, Payload, Query, Request, FORM_CONTENT_TYPE};
pub use response::Response;
pub use transport::{backoff_delay, HttpTransport};

/// Join `base` and `endpoint` with exactly one slash between them.
pub fn build_url(base: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

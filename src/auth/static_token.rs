use tracing::debug;

use super::{require, Credentials};
use crate::config::ConnectorConfig;
use crate::error::ConnectorResult;
use crate::http::Request;

/// Bearer token taken verbatim from the `access_token` credential.
///
/// For services that issue long-lived private-app tokens (e.g. HubSpot).
#[derive(Clone, Debug, Default)]
pub struct StaticTokenAuth {
    credentials: Option<Credentials>,
}

impl StaticTokenAuth {
    pub fn authenticate(&mut self, config: &ConnectorConfig) -> ConnectorResult<()> {
        self.credentials = None;
        let token = require(config, &["access_token"])?[0];
        debug!(connector = %config.connector_type(), "Using configured access token");
        self.credentials = Some(Credentials::bearer(token));
        Ok(())
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
}

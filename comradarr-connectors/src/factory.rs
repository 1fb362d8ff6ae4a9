//! Builds a [`ConnectorClient`] for a managed connector row, and detects a
//! freshly-added connector's kind from its `appName`.

use std::time::Duration;

use comradarr_core::{ConnectorClient, UpstreamError, UpstreamErrorKind};
use comradarr_types::{Connector, ConnectorKind};

use crate::client::{HttpConnectorClient, DEFAULT_TIMEOUT};

/// Builds the HTTP client for an already-classified connector.
pub fn build_client(connector: &Connector, timeout: Option<Duration>) -> Result<HttpConnectorClient, UpstreamError> {
    HttpConnectorClient::new(
        connector.kind,
        &connector.base_url,
        connector.api_key.clone(),
        timeout.unwrap_or(DEFAULT_TIMEOUT),
    )
}

/// Probes `base_url` via `GET /api/v3/system/status` and classifies the
/// connector kind from the response's `appName`. Used when an operator adds
/// a connector without specifying its kind up front.
pub async fn detect_kind(base_url: &str, api_key: &str, timeout: Option<Duration>) -> Result<ConnectorKind, UpstreamError> {
    // Kind is irrelevant for a pure status probe; KindA is an arbitrary placeholder.
    let probe = HttpConnectorClient::new(ConnectorKind::KindA, base_url, api_key.to_string(), timeout.unwrap_or(DEFAULT_TIMEOUT))?;
    let status = ConnectorClient::system_status(&probe).await?;
    ConnectorKind::from_app_name(&status.app_name)
        .ok_or_else(|| UpstreamError::new(UpstreamErrorKind::Validation, format!("unsupported connector kind: {}", status.app_name)))
}

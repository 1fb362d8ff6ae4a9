//! comradarr-connectors
//!
//! `reqwest`-based `ConnectorClient` implementations for the three upstream
//! media-automation kinds, plus kind detection and client construction.

pub mod client;
pub mod factory;

pub use client::{HttpConnectorClient, DEFAULT_TIMEOUT};
pub use factory::{build_client, detect_kind};

#[cfg(test)]
mod tests {
    use super::*;
    use comradarr_types::ConnectorKind;

    #[test]
    fn client_rejects_malformed_base_url() {
        let result = HttpConnectorClient::new(ConnectorKind::KindA, "not a url", "key".to_string(), DEFAULT_TIMEOUT);
        assert!(result.is_err());
    }
}

//! Connector and throttle-profile rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ConnectorId, ThrottleProfileId};

/// The three upstream media-automation services this operator drives searches for.
///
/// Named by role rather than by upstream product name, per the capability the
/// kind serves: `KindA` mirrors TV-series libraries, `KindB` mirrors movie
/// libraries, `KindC` mirrors a third, structurally-identical library kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    KindA,
    KindB,
    KindC,
}

impl ConnectorKind {
    /// Maps an upstream `appName` (from `GET /api/v3/system/status`) to a kind.
    ///
    /// Matching is case-insensitive. Returns `None` for unrecognized app names
    /// so callers can produce a clear "unsupported kind" error.
    #[must_use]
    pub fn from_app_name(app_name: &str) -> Option<Self> {
        match app_name.to_ascii_lowercase().as_str() {
            "sonarr" => Some(Self::KindA),
            "radarr" => Some(Self::KindB),
            "lidarr" | "readarr" => Some(Self::KindC),
            _ => None,
        }
    }
}

/// Health of a connector as observed by sync failures and reconnect probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorHealth {
    Healthy,
    Degraded,
    Unhealthy,
    Offline,
    Unknown,
}

/// A managed upstream connector instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connector {
    pub id: ConnectorId,
    pub kind: ConnectorKind,
    pub base_url: String,
    /// Opaque, already-decrypted API key. Decryption happens outside this crate.
    pub api_key: String,
    pub enabled: bool,
    pub health: ConnectorHealth,
    pub queue_paused: bool,
    pub throttle_profile_id: Option<ThrottleProfileId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Named preset of rate-limiting parameters, shared across connectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrottleProfile {
    pub id: ThrottleProfileId,
    pub name: String,
    pub requests_per_minute: u32,
    /// `None` means unlimited.
    pub daily_budget: Option<u32>,
    pub batch_size: u32,
    pub batch_cooldown_seconds: u32,
    pub rate_limit_pause_seconds: u32,
    pub is_default: bool,
}

impl ThrottleProfile {
    /// The process-level fallback used when a connector has no explicit
    /// profile and the store has no row with `is_default = true`.
    #[must_use]
    pub fn moderate_fallback() -> Self {
        Self {
            id: ThrottleProfileId::new(0),
            name: "Moderate".to_string(),
            requests_per_minute: 5,
            daily_budget: Some(500),
            batch_size: 10,
            batch_cooldown_seconds: 60,
            rate_limit_pause_seconds: 300,
            is_default: false,
        }
    }

    /// Built-in "Conservative" preset.
    #[must_use]
    pub fn conservative() -> Self {
        Self {
            id: ThrottleProfileId::new(0),
            name: "Conservative".to_string(),
            requests_per_minute: 2,
            daily_budget: Some(200),
            batch_size: 5,
            batch_cooldown_seconds: 120,
            rate_limit_pause_seconds: 600,
            is_default: false,
        }
    }

    /// Built-in "Aggressive" preset.
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            id: ThrottleProfileId::new(0),
            name: "Aggressive".to_string(),
            requests_per_minute: 10,
            daily_budget: None,
            batch_size: 20,
            batch_cooldown_seconds: 30,
            rate_limit_pause_seconds: 120,
            is_default: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_matching_is_case_insensitive() {
        assert_eq!(ConnectorKind::from_app_name("Sonarr"), Some(ConnectorKind::KindA));
        assert_eq!(ConnectorKind::from_app_name("RADARR"), Some(ConnectorKind::KindB));
        assert_eq!(ConnectorKind::from_app_name("lidarr"), Some(ConnectorKind::KindC));
        assert_eq!(ConnectorKind::from_app_name("plex"), None);
    }
}

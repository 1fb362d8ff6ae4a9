//! Per-connector sync bookkeeping and reconnect fields (`spec.md` §3, §4.G).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ConnectorId;

/// Per-connector sync/reconnect bookkeeping row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    pub connector_id: ConnectorId,
    pub last_sync: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub reconnect_attempts: u32,
    pub next_reconnect_at: Option<DateTime<Utc>>,
    pub reconnect_started_at: Option<DateTime<Utc>>,
    pub last_reconnect_error: Option<String>,
    pub reconnect_paused: bool,
}

impl SyncState {
    #[must_use]
    pub const fn new(connector_id: ConnectorId) -> Self {
        Self {
            connector_id,
            last_sync: None,
            consecutive_failures: 0,
            reconnect_attempts: 0,
            next_reconnect_at: None,
            reconnect_started_at: None,
            last_reconnect_error: None,
            reconnect_paused: false,
        }
    }

    /// Invariant 7 (`spec.md` §3): `reconnectStartedAt != null` implies health
    /// is/was offline or unhealthy. The caller supplies the connector's
    /// current health since this type doesn't hold a reference to it.
    #[must_use]
    pub fn satisfies_reconnect_invariant(&self, health: crate::connector::ConnectorHealth) -> bool {
        use crate::connector::ConnectorHealth as H;
        self.reconnect_started_at.is_none() || matches!(health, H::Offline | H::Unhealthy | H::Healthy)
    }
}

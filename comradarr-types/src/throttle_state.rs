//! The one-row-per-connector throttle accounting state (invariant 1 in `spec.md` §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ConnectorId;

/// Why a connector's dispatch is currently paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    RateLimit,
    DailyBudgetExhausted,
    Manual,
}

/// Per-connector throttle counters and windows.
///
/// Lazily created on first dispatch decision (see `spec.md` §3 Lifecycles);
/// `Store::get_or_create_throttle_state` is the only place that inserts one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleState {
    pub connector_id: ConnectorId,
    pub requests_this_minute: u32,
    pub requests_today: u32,
    pub minute_window_start: Option<DateTime<Utc>>,
    pub day_window_start: Option<DateTime<Utc>>,
    pub paused_until: Option<DateTime<Utc>>,
    pub pause_reason: Option<PauseReason>,
    pub last_request_at: Option<DateTime<Utc>>,
}

impl ThrottleState {
    /// A fresh, never-dispatched state for a connector.
    #[must_use]
    pub const fn new(connector_id: ConnectorId) -> Self {
        Self {
            connector_id,
            requests_this_minute: 0,
            requests_today: 0,
            minute_window_start: None,
            day_window_start: None,
            paused_until: None,
            pause_reason: None,
            last_request_at: None,
        }
    }
}

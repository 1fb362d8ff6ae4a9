//! The per-(connector, content) search lifecycle row (`spec.md` §3, §4.D).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::ContentRef;
use crate::ids::{ConnectorId, RegistryId};

/// Whether a registry row tracks a missing file (`gap`) or a below-cutoff
/// file (`upgrade`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Gap,
    Upgrade,
}

/// The registry state machine's states (`spec.md` §4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryState {
    Pending,
    Queued,
    Searching,
    Cooldown,
    Exhausted,
}

/// Why the most recent search attempt did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    Authentication,
    Ssl,
    Network,
    Timeout,
    Server,
    Validation,
    NotFound,
    RateLimit,
}

impl FailureCategory {
    /// Categories that bypass the normal attempt-count retry ceiling and move
    /// straight to `exhausted` (`spec.md` §4.D "outcome: error/timeout").
    #[must_use]
    pub const fn bypasses_retry(self) -> bool {
        matches!(self, Self::Authentication | Self::Ssl)
    }
}

/// Maximum number of backlog tiers (`spec.md` §3 invariant 4, §4.D).
pub const MAX_BACKLOG_TIER: u8 = 5;

/// Maximum attempt count before a row is eligible for `exhausted` on
/// `no_results` (a configuration surface per `spec.md` §4.D).
pub const MAX_ATTEMPTS: u32 = 20;

/// One row per (connector, content) search lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRegistry {
    pub id: RegistryId,
    pub connector_id: ConnectorId,
    pub content: ContentRef,
    pub search_type: SearchType,
    pub state: RegistryState,
    pub attempt_count: u32,
    pub last_searched: Option<DateTime<Utc>>,
    pub next_eligible: Option<DateTime<Utc>>,
    pub failure_category: Option<FailureCategory>,
    pub season_pack_failed: bool,
    pub backlog_tier: u8,
    pub priority: i64,
    /// When this gap/upgrade was first discovered; feeds the age bonus in
    /// the priority score (`spec.md` §4.D).
    pub discovered_at: DateTime<Utc>,
}

impl SearchRegistry {
    /// `state = exhausted` invariant check (invariant 4 in `spec.md` §3).
    #[must_use]
    pub fn satisfies_exhausted_invariant(&self) -> bool {
        self.state != RegistryState::Exhausted
            || (self.attempt_count >= MAX_ATTEMPTS && self.backlog_tier >= MAX_BACKLOG_TIER)
    }
}

//! Append-only outcome log (`spec.md` §3, §7 "no silent failures").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{ConnectorId, RegistryId, SearchHistoryId};
use crate::registry::FailureCategory;

/// Terminal outcome of one dispatched search command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    NoResults,
    Error,
    Timeout,
    RateLimited,
    Skipped,
}

/// One append-only row recording a search attempt's outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHistory {
    pub id: SearchHistoryId,
    pub registry_id: RegistryId,
    pub connector_id: ConnectorId,
    pub outcome: Outcome,
    pub category: Option<FailureCategory>,
    /// Free-form metadata, e.g. the batcher's decision `reason` string.
    pub metadata: Value,
    pub recorded_at: DateTime<Utc>,
}

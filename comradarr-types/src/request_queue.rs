//! Ephemeral-but-durable dispatch intent rows (`spec.md` §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ConnectorId, RegistryId, RequestQueueId};

/// A batch identifier assigned by the batcher (`spec.md` §4.E); opaque to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(pub u64);

/// One row of dispatch intent, consumed by the dispatcher on outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestQueue {
    pub id: RequestQueueId,
    pub registry_id: RegistryId,
    pub connector_id: ConnectorId,
    pub priority: i64,
    pub scheduled_at: DateTime<Utc>,
    pub batch_id: Option<BatchId>,
}

//! Persistence-adapter trait (§3, §4.D/§4.G in `SPEC_FULL.md`).
//!
//! Nothing in this workspace pulls in a SQL driver — durable state here is an
//! in-memory `Mutex`-guarded counter set. `Store` generalizes that shape into
//! a trait so a real backend can be swapped in without touching any of the
//! control-plane logic that drives it; `comradarr-mock` ships the only
//! implementation in this workspace.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use comradarr_types::{
    BatchId, Connector, ConnectorHealth, ConnectorId, FailureCategory, Outcome, RegistryId,
    RegistryState, RequestQueue, RequestQueueId, SearchHistory, SearchHistoryId, SearchRegistry,
    SearchType, SyncState, ThrottleProfile, ThrottleProfileId, ThrottleState,
};
use thiserror::Error;

/// Failure surfaced by a [`Store`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connector {0} not found")]
    ConnectorNotFound(ConnectorId),

    #[error("registry row {0} not found")]
    RegistryNotFound(RegistryId),

    #[error("registry row {0} was claimed by another worker before this claim")]
    ClaimConflict(RegistryId),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Result of a successful `try_acquire_minute_slot` / `try_acquire_day_slot` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOutcome {
    /// A slot was reserved; the caller may dispatch.
    Acquired,
    /// The window is saturated; the caller must wait.
    Exhausted,
}

/// Fields updated on a registry row once a search attempt completes
/// (`SPEC_FULL.md` §4.D/§4.F).
#[derive(Debug, Clone)]
pub struct RegistryOutcomeUpdate {
    pub state: RegistryState,
    pub attempt_count: u32,
    pub last_searched: DateTime<Utc>,
    pub next_eligible: Option<DateTime<Utc>>,
    pub failure_category: Option<FailureCategory>,
    pub season_pack_failed: bool,
    pub backlog_tier: u8,
}

/// The persistence seam between the control plane's pure decision logic and
/// durable storage.
///
/// Every method is one unit of durable work; callers compose them rather
/// than the trait exposing transactions, single-purpose accessor methods
/// over guarded state instead of a generic transaction API.
#[async_trait]
pub trait Store: Send + Sync {
    // ---- connectors & throttle profiles ----------------------------------

    async fn get_connector(&self, id: ConnectorId) -> Result<Connector, StoreError>;
    async fn list_connectors(&self) -> Result<Vec<Connector>, StoreError>;
    async fn list_enabled_connectors(&self) -> Result<Vec<Connector>, StoreError>;
    async fn set_connector_health(
        &self,
        id: ConnectorId,
        health: ConnectorHealth,
    ) -> Result<(), StoreError>;
    async fn set_queue_paused(&self, id: ConnectorId, paused: bool) -> Result<(), StoreError>;

    async fn get_throttle_profile(
        &self,
        id: ThrottleProfileId,
    ) -> Result<Option<ThrottleProfile>, StoreError>;
    async fn get_default_throttle_profile(&self) -> Result<Option<ThrottleProfile>, StoreError>;

    // ---- throttle state ----------------------------------------------------

    /// Returns the connector's throttle state, creating a fresh row on first use.
    async fn get_or_create_throttle_state(
        &self,
        connector_id: ConnectorId,
    ) -> Result<ThrottleState, StoreError>;

    /// Atomically checks and increments the per-minute counter, resetting the
    /// window first if `now` has moved past it. Returns [`SlotOutcome::Exhausted`]
    /// without mutating state when the window is already full.
    async fn try_acquire_minute_slot(
        &self,
        connector_id: ConnectorId,
        limit: u32,
        now: DateTime<Utc>,
    ) -> Result<SlotOutcome, StoreError>;

    /// Same contract as [`Store::try_acquire_minute_slot`] for the daily window.
    /// `limit = None` always acquires.
    async fn try_acquire_day_slot(
        &self,
        connector_id: ConnectorId,
        limit: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<SlotOutcome, StoreError>;

    async fn record_request(
        &self,
        connector_id: ConnectorId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn set_pause(
        &self,
        connector_id: ConnectorId,
        until: DateTime<Utc>,
        reason: comradarr_types::PauseReason,
    ) -> Result<(), StoreError>;

    async fn clear_pause(&self, connector_id: ConnectorId) -> Result<(), StoreError>;

    /// Resets every connector's minute/day window whose start has expired as
    /// of `now`. Returns the number of rows touched.
    async fn reset_expired_windows(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    // ---- search registry ----------------------------------------------------

    async fn get_registry(&self, id: RegistryId) -> Result<SearchRegistry, StoreError>;

    /// Looks up the (at most one) registry row for `(connector_id, content,
    /// search_type)` without mutating it, so the selector pass can decide
    /// whether a fresh discovery already has a row and read its
    /// `discovered_at`/`attempt_count` before computing priority.
    async fn find_registry(
        &self,
        connector_id: ConnectorId,
        content: comradarr_types::ContentRef,
        search_type: SearchType,
    ) -> Result<Option<SearchRegistry>, StoreError>;

    /// Creates a registry row if one doesn't already exist for
    /// `(connector_id, content, search_type)`, then enqueues a
    /// [`RequestQueue`] row for it and moves the registry row to
    /// [`RegistryState::Queued`]. Idempotent: re-enqueuing a row already in
    /// `queued` or `searching` is a no-op that returns the existing row.
    async fn enqueue(
        &self,
        connector_id: ConnectorId,
        content: comradarr_types::ContentRef,
        search_type: SearchType,
        priority: i64,
        scheduled_at: DateTime<Utc>,
        discovered_at: DateTime<Utc>,
    ) -> Result<SearchRegistry, StoreError>;

    /// Compare-and-swap claim: moves a row from `pending`/`queued` to
    /// `searching`. Fails with [`StoreError::ClaimConflict`] if another
    /// worker already claimed it, preventing the double-dispatch invariant
    /// violation (`SPEC_FULL.md` §3 invariant 3).
    async fn claim_for_search(&self, id: RegistryId) -> Result<SearchRegistry, StoreError>;

    /// Applies the outcome of a completed search attempt to a registry row.
    async fn update_registry_outcome(
        &self,
        id: RegistryId,
        update: RegistryOutcomeUpdate,
    ) -> Result<SearchRegistry, StoreError>;

    /// Returns dispatch-eligible registry rows for `connector_id` — state in
    /// `{pending, queued}` and `next_eligible` either unset or in the past —
    /// ordered by descending priority, capped at `limit`.
    async fn select_dispatch_eligible(
        &self,
        connector_id: ConnectorId,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<SearchRegistry>, StoreError>;

    /// Moves every `cooldown` row whose `next_eligible` has passed back to `pending`.
    async fn reactivate_cooldowns(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    // ---- request queue ----------------------------------------------------

    async fn assign_batch(
        &self,
        queue_ids: &[RequestQueueId],
        batch_id: BatchId,
    ) -> Result<(), StoreError>;

    async fn delete_queue_row(&self, id: RequestQueueId) -> Result<(), StoreError>;

    async fn list_queue_rows_for_registry(
        &self,
        registry_id: RegistryId,
    ) -> Result<Vec<RequestQueue>, StoreError>;

    // ---- history ----------------------------------------------------

    async fn append_history(
        &self,
        registry_id: RegistryId,
        connector_id: ConnectorId,
        outcome: Outcome,
        category: Option<FailureCategory>,
        metadata: serde_json::Value,
        recorded_at: DateTime<Utc>,
    ) -> Result<SearchHistoryId, StoreError>;

    async fn list_history_for_registry(
        &self,
        registry_id: RegistryId,
    ) -> Result<Vec<SearchHistory>, StoreError>;

    // ---- sync / reconnect state ----------------------------------------------------

    async fn get_sync_state(&self, connector_id: ConnectorId) -> Result<SyncState, StoreError>;

    async fn put_sync_state(&self, state: SyncState) -> Result<(), StoreError>;

    /// Connectors whose `next_reconnect_at` has passed and which aren't paused.
    async fn select_reconnect_due(&self, now: DateTime<Utc>) -> Result<Vec<SyncState>, StoreError>;
}

/// Lets callers hold `Arc<dyn Store>` and pass it anywhere a `Store: Sized`
/// bound is expected (e.g. `ThrottleEnforcer<S>`), so the dispatcher and
/// reconnect service can share one store behind cheap clones.
#[async_trait]
impl<T: Store + ?Sized> Store for std::sync::Arc<T> {
    async fn get_connector(&self, id: ConnectorId) -> Result<Connector, StoreError> {
        (**self).get_connector(id).await
    }
    async fn list_connectors(&self) -> Result<Vec<Connector>, StoreError> {
        (**self).list_connectors().await
    }
    async fn list_enabled_connectors(&self) -> Result<Vec<Connector>, StoreError> {
        (**self).list_enabled_connectors().await
    }
    async fn set_connector_health(&self, id: ConnectorId, health: ConnectorHealth) -> Result<(), StoreError> {
        (**self).set_connector_health(id, health).await
    }
    async fn set_queue_paused(&self, id: ConnectorId, paused: bool) -> Result<(), StoreError> {
        (**self).set_queue_paused(id, paused).await
    }
    async fn get_throttle_profile(&self, id: ThrottleProfileId) -> Result<Option<ThrottleProfile>, StoreError> {
        (**self).get_throttle_profile(id).await
    }
    async fn get_default_throttle_profile(&self) -> Result<Option<ThrottleProfile>, StoreError> {
        (**self).get_default_throttle_profile().await
    }
    async fn get_or_create_throttle_state(&self, connector_id: ConnectorId) -> Result<ThrottleState, StoreError> {
        (**self).get_or_create_throttle_state(connector_id).await
    }
    async fn try_acquire_minute_slot(&self, connector_id: ConnectorId, limit: u32, now: DateTime<Utc>) -> Result<SlotOutcome, StoreError> {
        (**self).try_acquire_minute_slot(connector_id, limit, now).await
    }
    async fn try_acquire_day_slot(&self, connector_id: ConnectorId, limit: Option<u32>, now: DateTime<Utc>) -> Result<SlotOutcome, StoreError> {
        (**self).try_acquire_day_slot(connector_id, limit, now).await
    }
    async fn record_request(&self, connector_id: ConnectorId, now: DateTime<Utc>) -> Result<(), StoreError> {
        (**self).record_request(connector_id, now).await
    }
    async fn set_pause(&self, connector_id: ConnectorId, until: DateTime<Utc>, reason: comradarr_types::PauseReason) -> Result<(), StoreError> {
        (**self).set_pause(connector_id, until, reason).await
    }
    async fn clear_pause(&self, connector_id: ConnectorId) -> Result<(), StoreError> {
        (**self).clear_pause(connector_id).await
    }
    async fn reset_expired_windows(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        (**self).reset_expired_windows(now).await
    }
    async fn get_registry(&self, id: RegistryId) -> Result<SearchRegistry, StoreError> {
        (**self).get_registry(id).await
    }
    async fn find_registry(
        &self,
        connector_id: ConnectorId,
        content: comradarr_types::ContentRef,
        search_type: SearchType,
    ) -> Result<Option<SearchRegistry>, StoreError> {
        (**self).find_registry(connector_id, content, search_type).await
    }
    async fn enqueue(
        &self,
        connector_id: ConnectorId,
        content: comradarr_types::ContentRef,
        search_type: SearchType,
        priority: i64,
        scheduled_at: DateTime<Utc>,
        discovered_at: DateTime<Utc>,
    ) -> Result<SearchRegistry, StoreError> {
        (**self).enqueue(connector_id, content, search_type, priority, scheduled_at, discovered_at).await
    }
    async fn claim_for_search(&self, id: RegistryId) -> Result<SearchRegistry, StoreError> {
        (**self).claim_for_search(id).await
    }
    async fn update_registry_outcome(&self, id: RegistryId, update: RegistryOutcomeUpdate) -> Result<SearchRegistry, StoreError> {
        (**self).update_registry_outcome(id, update).await
    }
    async fn select_dispatch_eligible(&self, connector_id: ConnectorId, now: DateTime<Utc>, limit: u32) -> Result<Vec<SearchRegistry>, StoreError> {
        (**self).select_dispatch_eligible(connector_id, now, limit).await
    }
    async fn reactivate_cooldowns(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        (**self).reactivate_cooldowns(now).await
    }
    async fn assign_batch(&self, queue_ids: &[RequestQueueId], batch_id: BatchId) -> Result<(), StoreError> {
        (**self).assign_batch(queue_ids, batch_id).await
    }
    async fn delete_queue_row(&self, id: RequestQueueId) -> Result<(), StoreError> {
        (**self).delete_queue_row(id).await
    }
    async fn list_queue_rows_for_registry(&self, registry_id: RegistryId) -> Result<Vec<RequestQueue>, StoreError> {
        (**self).list_queue_rows_for_registry(registry_id).await
    }
    async fn append_history(
        &self,
        registry_id: RegistryId,
        connector_id: ConnectorId,
        outcome: Outcome,
        category: Option<FailureCategory>,
        metadata: serde_json::Value,
        recorded_at: DateTime<Utc>,
    ) -> Result<SearchHistoryId, StoreError> {
        (**self).append_history(registry_id, connector_id, outcome, category, metadata, recorded_at).await
    }
    async fn list_history_for_registry(&self, registry_id: RegistryId) -> Result<Vec<SearchHistory>, StoreError> {
        (**self).list_history_for_registry(registry_id).await
    }
    async fn get_sync_state(&self, connector_id: ConnectorId) -> Result<SyncState, StoreError> {
        (**self).get_sync_state(connector_id).await
    }
    async fn put_sync_state(&self, state: SyncState) -> Result<(), StoreError> {
        (**self).put_sync_state(state).await
    }
    async fn select_reconnect_due(&self, now: DateTime<Utc>) -> Result<Vec<SyncState>, StoreError> {
        (**self).select_reconnect_due(now).await
    }
}

//! A deterministic, in-process `Store`: no network, no disk, fully
//! inspectable from test code via the `seed_*`/`peek_*` helpers below.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use comradarr_core::store::{RegistryOutcomeUpdate, SlotOutcome, Store, StoreError};
use comradarr_core::time;
use comradarr_types::{
    BatchId, Connector, ConnectorHealth, ConnectorId, ContentRef, FailureCategory, Outcome,
    PauseReason, RegistryId, RegistryState, RequestQueue, RequestQueueId, SearchHistory,
    SearchHistoryId, SearchRegistry, SearchType, SyncState, ThrottleProfile, ThrottleProfileId,
    ThrottleState,
};

#[derive(Default)]
struct Inner {
    connectors: HashMap<ConnectorId, Connector>,
    profiles: HashMap<ThrottleProfileId, ThrottleProfile>,
    throttle_states: HashMap<ConnectorId, ThrottleState>,
    registry: HashMap<RegistryId, SearchRegistry>,
    queue: HashMap<RequestQueueId, RequestQueue>,
    history: HashMap<SearchHistoryId, SearchHistory>,
    sync_state: HashMap<ConnectorId, SyncState>,
}

/// An in-memory [`Store`] implementation, the only one in this workspace.
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    registry_ids: AtomicI64,
    queue_ids: AtomicI64,
    history_ids: AtomicI64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            registry_ids: AtomicI64::new(1),
            queue_ids: AtomicI64::new(1),
            history_ids: AtomicI64::new(1),
        }
    }

    /// Test helper: inserts or replaces a connector row.
    pub fn seed_connector(&self, connector: Connector) {
        self.inner.lock().unwrap().connectors.insert(connector.id, connector);
    }

    /// Test helper: inserts or replaces a throttle profile.
    pub fn seed_profile(&self, profile: ThrottleProfile) {
        self.inner.lock().unwrap().profiles.insert(profile.id, profile);
    }

    /// Test helper: pre-loads `requests_today` for a connector's throttle
    /// state, with the window anchored to `as_of` rather than the wall clock.
    pub fn seed_throttle_requests_today(&self, connector_id: ConnectorId, requests_today: u32, as_of: DateTime<Utc>) {
        let mut guard = self.inner.lock().unwrap();
        let state = guard
            .throttle_states
            .entry(connector_id)
            .or_insert_with(|| ThrottleState::new(connector_id));
        state.requests_today = requests_today;
        state.day_window_start = Some(time::start_of_day_utc(as_of));
    }

    /// Test helper: reads back a registry row without going through the trait.
    #[must_use]
    pub fn peek_registry(&self, id: RegistryId) -> Option<SearchRegistry> {
        self.inner.lock().unwrap().registry.get(&id).cloned()
    }

    /// Test helper: reads back every queue row.
    #[must_use]
    pub fn peek_queue(&self) -> Vec<RequestQueue> {
        self.inner.lock().unwrap().queue.values().cloned().collect()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_connector(&self, id: ConnectorId) -> Result<Connector, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .connectors
            .get(&id)
            .cloned()
            .ok_or(StoreError::ConnectorNotFound(id))
    }

    async fn list_connectors(&self) -> Result<Vec<Connector>, StoreError> {
        Ok(self.inner.lock().unwrap().connectors.values().cloned().collect())
    }

    async fn list_enabled_connectors(&self) -> Result<Vec<Connector>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .connectors
            .values()
            .filter(|c| c.enabled)
            .cloned()
            .collect())
    }

    async fn set_connector_health(&self, id: ConnectorId, health: ConnectorHealth) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().unwrap();
        let connector = guard.connectors.get_mut(&id).ok_or(StoreError::ConnectorNotFound(id))?;
        connector.health = health;
        Ok(())
    }

    async fn set_queue_paused(&self, id: ConnectorId, paused: bool) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().unwrap();
        let connector = guard.connectors.get_mut(&id).ok_or(StoreError::ConnectorNotFound(id))?;
        connector.queue_paused = paused;
        Ok(())
    }

    async fn get_throttle_profile(&self, id: ThrottleProfileId) -> Result<Option<ThrottleProfile>, StoreError> {
        Ok(self.inner.lock().unwrap().profiles.get(&id).cloned())
    }

    async fn get_default_throttle_profile(&self) -> Result<Option<ThrottleProfile>, StoreError> {
        Ok(self.inner.lock().unwrap().profiles.values().find(|p| p.is_default).cloned())
    }

    async fn get_or_create_throttle_state(&self, connector_id: ConnectorId) -> Result<ThrottleState, StoreError> {
        let mut guard = self.inner.lock().unwrap();
        Ok(guard
            .throttle_states
            .entry(connector_id)
            .or_insert_with(|| ThrottleState::new(connector_id))
            .clone())
    }

    async fn try_acquire_minute_slot(
        &self,
        connector_id: ConnectorId,
        limit: u32,
        now: DateTime<Utc>,
    ) -> Result<SlotOutcome, StoreError> {
        let mut guard = self.inner.lock().unwrap();
        let state = guard
            .throttle_states
            .entry(connector_id)
            .or_insert_with(|| ThrottleState::new(connector_id));
        if time::is_minute_window_expired(state.minute_window_start, now) {
            state.requests_this_minute = 0;
            state.minute_window_start = Some(now);
        }
        if state.requests_this_minute >= limit {
            return Ok(SlotOutcome::Exhausted);
        }
        state.requests_this_minute += 1;
        Ok(SlotOutcome::Acquired)
    }

    async fn try_acquire_day_slot(
        &self,
        connector_id: ConnectorId,
        limit: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<SlotOutcome, StoreError> {
        let Some(limit) = limit else { return Ok(SlotOutcome::Acquired) };
        let mut guard = self.inner.lock().unwrap();
        let state = guard
            .throttle_states
            .entry(connector_id)
            .or_insert_with(|| ThrottleState::new(connector_id));
        if time::is_day_window_expired(state.day_window_start, now) {
            state.requests_today = 0;
            state.day_window_start = Some(time::start_of_day_utc(now));
        }
        if state.requests_today >= limit {
            return Ok(SlotOutcome::Exhausted);
        }
        state.requests_today += 1;
        Ok(SlotOutcome::Acquired)
    }

    async fn record_request(&self, connector_id: ConnectorId, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().unwrap();
        let state = guard
            .throttle_states
            .entry(connector_id)
            .or_insert_with(|| ThrottleState::new(connector_id));
        if time::is_day_window_expired(state.day_window_start, now) {
            state.requests_today = 0;
            state.day_window_start = Some(time::start_of_day_utc(now));
        }
        state.requests_today += 1;
        state.last_request_at = Some(now);
        Ok(())
    }

    async fn set_pause(&self, connector_id: ConnectorId, until: DateTime<Utc>, reason: PauseReason) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().unwrap();
        let state = guard
            .throttle_states
            .entry(connector_id)
            .or_insert_with(|| ThrottleState::new(connector_id));
        state.paused_until = Some(until);
        state.pause_reason = Some(reason);
        Ok(())
    }

    async fn clear_pause(&self, connector_id: ConnectorId) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().unwrap();
        let state = guard
            .throttle_states
            .entry(connector_id)
            .or_insert_with(|| ThrottleState::new(connector_id));
        state.paused_until = None;
        state.pause_reason = None;
        Ok(())
    }

    async fn reset_expired_windows(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut guard = self.inner.lock().unwrap();
        let mut touched = 0u64;
        for state in guard.throttle_states.values_mut() {
            let mut changed = false;
            if time::is_minute_window_expired(state.minute_window_start, now) && state.requests_this_minute != 0 {
                state.requests_this_minute = 0;
                state.minute_window_start = Some(now);
                changed = true;
            }
            if time::is_day_window_expired(state.day_window_start, now) && state.requests_today != 0 {
                state.requests_today = 0;
                state.day_window_start = Some(time::start_of_day_utc(now));
                changed = true;
            }
            if let Some(paused_until) = state.paused_until {
                if paused_until <= now {
                    state.paused_until = None;
                    state.pause_reason = None;
                    changed = true;
                }
            }
            if changed {
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn get_registry(&self, id: RegistryId) -> Result<SearchRegistry, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .registry
            .get(&id)
            .cloned()
            .ok_or(StoreError::RegistryNotFound(id))
    }

    async fn find_registry(
        &self,
        connector_id: ConnectorId,
        content: ContentRef,
        search_type: SearchType,
    ) -> Result<Option<SearchRegistry>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .registry
            .values()
            .find(|r| r.connector_id == connector_id && r.content == content && r.search_type == search_type)
            .cloned())
    }

    async fn enqueue(
        &self,
        connector_id: ConnectorId,
        content: ContentRef,
        search_type: SearchType,
        priority: i64,
        scheduled_at: DateTime<Utc>,
        discovered_at: DateTime<Utc>,
    ) -> Result<SearchRegistry, StoreError> {
        let mut guard = self.inner.lock().unwrap();
        let existing = guard
            .registry
            .values()
            .find(|r| r.connector_id == connector_id && r.content == content && r.search_type == search_type)
            .cloned();
        if let Some(existing) = &existing {
            if matches!(existing.state, RegistryState::Queued | RegistryState::Searching) {
                return Ok(existing.clone());
            }
        }

        let row = if let Some(id) = existing.map(|r| r.id) {
            let row = guard.registry.get_mut(&id).unwrap();
            row.state = RegistryState::Queued;
            row.priority = priority;
            row.clone()
        } else {
            let id = RegistryId::new(self.registry_ids.fetch_add(1, Ordering::SeqCst));
            let row = SearchRegistry {
                id,
                connector_id,
                content,
                search_type,
                state: RegistryState::Queued,
                attempt_count: 0,
                last_searched: None,
                next_eligible: None,
                failure_category: None,
                season_pack_failed: false,
                backlog_tier: 0,
                priority,
                discovered_at,
            };
            guard.registry.insert(id, row.clone());
            row
        };

        let queue_id = RequestQueueId::new(self.queue_ids.fetch_add(1, Ordering::SeqCst));
        guard.queue.insert(
            queue_id,
            RequestQueue {
                id: queue_id,
                registry_id: row.id,
                connector_id,
                priority,
                scheduled_at,
                batch_id: None,
            },
        );

        Ok(row)
    }

    async fn claim_for_search(&self, id: RegistryId) -> Result<SearchRegistry, StoreError> {
        let mut guard = self.inner.lock().unwrap();
        let row = guard.registry.get_mut(&id).ok_or(StoreError::RegistryNotFound(id))?;
        if !matches!(row.state, RegistryState::Pending | RegistryState::Queued) {
            return Err(StoreError::ClaimConflict(id));
        }
        row.state = RegistryState::Searching;
        Ok(row.clone())
    }

    async fn update_registry_outcome(
        &self,
        id: RegistryId,
        update: RegistryOutcomeUpdate,
    ) -> Result<SearchRegistry, StoreError> {
        let mut guard = self.inner.lock().unwrap();
        let row = guard.registry.get_mut(&id).ok_or(StoreError::RegistryNotFound(id))?;
        row.state = update.state;
        row.attempt_count = update.attempt_count;
        row.last_searched = Some(update.last_searched);
        row.next_eligible = update.next_eligible;
        row.failure_category = update.failure_category;
        row.season_pack_failed = update.season_pack_failed;
        row.backlog_tier = update.backlog_tier;
        Ok(row.clone())
    }

    async fn select_dispatch_eligible(
        &self,
        connector_id: ConnectorId,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<SearchRegistry>, StoreError> {
        let guard = self.inner.lock().unwrap();
        let mut rows: Vec<SearchRegistry> = guard
            .registry
            .values()
            .filter(|r| {
                r.connector_id == connector_id
                    && matches!(r.state, RegistryState::Pending | RegistryState::Queued)
                    && r.next_eligible.map_or(true, |t| t <= now)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.discovered_at.cmp(&b.discovered_at)));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn reactivate_cooldowns(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut guard = self.inner.lock().unwrap();
        let mut count = 0u64;
        for row in guard.registry.values_mut() {
            if row.state == RegistryState::Cooldown && row.next_eligible.is_some_and(|t| t <= now) {
                row.state = RegistryState::Pending;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn assign_batch(&self, queue_ids: &[RequestQueueId], batch_id: BatchId) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().unwrap();
        for id in queue_ids {
            if let Some(row) = guard.queue.get_mut(id) {
                row.batch_id = Some(batch_id);
            }
        }
        Ok(())
    }

    async fn delete_queue_row(&self, id: RequestQueueId) -> Result<(), StoreError> {
        self.inner.lock().unwrap().queue.remove(&id);
        Ok(())
    }

    async fn list_queue_rows_for_registry(&self, registry_id: RegistryId) -> Result<Vec<RequestQueue>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .queue
            .values()
            .filter(|q| q.registry_id == registry_id)
            .cloned()
            .collect())
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
        let mut guard = self.inner.lock().unwrap();
        let id = SearchHistoryId::new(self.history_ids.fetch_add(1, Ordering::SeqCst));
        guard.history.insert(
            id,
            SearchHistory {
                id,
                registry_id,
                connector_id,
                outcome,
                category,
                metadata,
                recorded_at,
            },
        );
        Ok(id)
    }

    async fn list_history_for_registry(&self, registry_id: RegistryId) -> Result<Vec<SearchHistory>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .history
            .values()
            .filter(|h| h.registry_id == registry_id)
            .cloned()
            .collect())
    }

    async fn get_sync_state(&self, connector_id: ConnectorId) -> Result<SyncState, StoreError> {
        let mut guard = self.inner.lock().unwrap();
        Ok(guard
            .sync_state
            .entry(connector_id)
            .or_insert_with(|| SyncState::new(connector_id))
            .clone())
    }

    async fn put_sync_state(&self, state: SyncState) -> Result<(), StoreError> {
        self.inner.lock().unwrap().sync_state.insert(state.connector_id, state);
        Ok(())
    }

    async fn select_reconnect_due(&self, now: DateTime<Utc>) -> Result<Vec<SyncState>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .sync_state
            .values()
            .filter(|s| !s.reconnect_paused && s.next_reconnect_at.is_some_and(|t| t <= now))
            .cloned()
            .collect())
    }
}

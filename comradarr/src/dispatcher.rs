//! A single connector's dispatch pass: select, batch, throttle-gate, send,
//! apply outcome. A pure decision core (`comradarr_registry`) driven by a
//! thin, side-effecting shell that owns the store, the throttle enforcer,
//! and one upstream client per connector.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use comradarr_core::{
    CancellationToken, Command, ComradarrError, ConnectorClient, ContentMirrorReader,
    RegistryOutcomeUpdate, SearchOutcome, Store, StoreError, UpstreamError, UpstreamErrorKind,
};
use comradarr_registry::{apply_outcome, batch_movies, batch_season, Batch, EpisodeCandidate, MovieCandidate, SearchEvent};
use comradarr_throttle::{DenyReason, DispatchDecision, ThrottleEnforcer};
use comradarr_types::{Connector, ConnectorHealth, ConnectorId, ContentRef, FailureCategory, Outcome, SearchRegistry, SeasonId};
use tracing::warn;

/// Cap on how many eligible rows a single pass will pull from the store
/// (`SPEC_FULL.md` §4.F step 1's "implementation-chosen cap (e.g. 500)").
pub const MAX_ROWS_PER_PASS: u32 = 500;

/// Advisory, best-effort indexer-health lookup (`SPEC_FULL.md` §1, §4.F step f).
///
/// The Prowlarr collaborator that populates this snapshot is out of scope;
/// this trait is the seam so the dispatcher can consult it without knowing
/// how it's populated. A lookup failure must never block dispatch, so
/// callers treat `Err` the same as "nothing to report" after logging it.
#[async_trait]
pub trait IndexerHealthProvider: Send + Sync {
    async fn snapshot(&self, connector_id: ConnectorId) -> Result<IndexerHealthSnapshot, ComradarrError>;
}

/// What the advisory check reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexerHealthSnapshot {
    pub any_rate_limited: bool,
}

/// Always reports a clean snapshot; used when no Prowlarr collaborator is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopIndexerHealth;

#[async_trait]
impl IndexerHealthProvider for NoopIndexerHealth {
    async fn snapshot(&self, _connector_id: ConnectorId) -> Result<IndexerHealthSnapshot, ComradarrError> {
        Ok(IndexerHealthSnapshot::default())
    }
}

/// What happened to one batch within a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Success,
    NoResults,
    RateLimited,
    /// `AuthenticationError`: rows moved straight to `exhausted`, connector
    /// health flagged `unhealthy` (`SPEC_FULL.md` §4.F step 3d).
    Authentication,
    /// Any other upstream fault, carrying the category written to history.
    Error(FailureCategory),
    /// Not attempted: either the pass halted on a throttle denial before
    /// reaching this batch, or it was the batch that triggered the denial.
    Skipped,
}

/// One batch's disposition, returned in [`PassResult::batches`] for callers
/// that want per-batch detail (tests, operator-facing summaries).
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub registry_ids: Vec<comradarr_types::RegistryId>,
    pub reason: &'static str,
    pub outcome: BatchOutcome,
}

/// Aggregate result of one [`Dispatcher::dispatch_pass`] call.
#[derive(Debug, Clone, Default)]
pub struct PassResult {
    pub batches: Vec<BatchResult>,
    /// Set once the pass aborted early on a `rate_limit`/`daily_budget_exhausted` denial.
    pub halted_on: Option<DenyReason>,
    /// The denying `canDispatch` call's retry-after estimate, alongside `halted_on`.
    pub halted_retry_after_ms: Option<u64>,
    /// Set when the pass stopped accepting new batches because its
    /// [`CancellationToken`] fired mid-pass (`SPEC_FULL.md` §5). A batch
    /// already in flight when this happens still runs to completion and its
    /// outcome is still recorded; only not-yet-started batches are skipped.
    pub cancelled: bool,
}

impl PassResult {
    #[must_use]
    pub fn dispatched_count(&self) -> usize {
        self.batches.iter().filter(|b| !matches!(b.outcome, BatchOutcome::Skipped)).count()
    }
}

/// Drives dispatch passes for the connectors it has a registered client for.
///
/// `S` is the shared store handle (typically `Arc<dyn Store>`, which
/// satisfies `Store` via the blanket impl); `C` is the read-only
/// library-mirror provider; `H` is the advisory indexer-health lookup.
pub struct Dispatcher<S, C, H> {
    store: S,
    throttle: ThrottleEnforcer<S>,
    content: C,
    indexer_health: H,
    config: comradarr_core::BatchingConfig,
    clients: HashMap<ConnectorId, Arc<dyn ConnectorClient>>,
}

impl<S, C, H> Dispatcher<S, C, H>
where
    S: Store + Clone,
    C: ContentMirrorReader,
    H: IndexerHealthProvider,
{
    pub fn new(store: S, content: C, indexer_health: H, config: comradarr_core::BatchingConfig) -> Self {
        let throttle = ThrottleEnforcer::new(store.clone());
        Self { store, throttle, content, indexer_health, config, clients: HashMap::new() }
    }

    /// Registers (or replaces) the upstream client used to dispatch for `connector_id`.
    pub fn register_client(&mut self, connector_id: ConnectorId, client: Arc<dyn ConnectorClient>) {
        self.clients.insert(connector_id, client);
    }

    /// Runs one dispatch pass for `connector_id` (`SPEC_FULL.md` §4.F).
    ///
    /// `cancel` is checked before every batch that hasn't yet started; once
    /// it fires, the pass stops accepting new batches, never mutates an
    /// in-flight batch's recorded outcome, and never refunds a throttle slot
    /// already charged (`SPEC_FULL.md` §5's cancellation contract).
    pub async fn dispatch_pass(&self, connector_id: ConnectorId, now: DateTime<Utc>, cancel: &CancellationToken) -> Result<PassResult, ComradarrError> {
        let connector = self.store.get_connector(connector_id).await?;
        let client = self
            .clients
            .get(&connector_id)
            .cloned()
            .ok_or_else(|| ComradarrError::not_found(format!("no connector client registered for {connector_id}")))?;

        let eligible = self.store.select_dispatch_eligible(connector_id, now, MAX_ROWS_PER_PASS).await?;
        if eligible.is_empty() {
            return Ok(PassResult::default());
        }

        // CAS-claim each row (`pending`/`queued` -> `searching`) before it's
        // eligible for batching, per `SPEC_FULL.md` §4.D's "pick" transition
        // and §5's "no two dispatch passes can claim the same row" rule. A
        // row another concurrent pass already claimed is dropped rather than
        // batched again. Claiming also consumes the row's `RequestQueue`
        // entry (if any), keeping invariant 3 ("state = queued iff a
        // matching RequestQueue row exists") intact once the row leaves
        // `queued`.
        let mut rows = Vec::with_capacity(eligible.len());
        for row in eligible {
            match self.store.claim_for_search(row.id).await {
                Ok(claimed) => {
                    for queued in self.store.list_queue_rows_for_registry(claimed.id).await? {
                        self.store.delete_queue_row(queued.id).await?;
                    }
                    rows.push(claimed);
                }
                Err(StoreError::ClaimConflict(_)) => continue,
                Err(err) => return Err(ComradarrError::storage(err.to_string())),
            }
        }
        if rows.is_empty() {
            return Ok(PassResult::default());
        }

        let profile = self.throttle.resolve_profile(&connector).await.map_err(|e| ComradarrError::storage(e.to_string()))?;
        let batches = self.build_batches(&rows, profile.batch_size).await?;

        let mut result = PassResult::default();
        let mut halted = false;

        for batch in batches {
            if halted {
                result.batches.push(BatchResult { registry_ids: batch.registry_ids, reason: batch.reason, outcome: BatchOutcome::Skipped });
                continue;
            }

            if cancel.is_cancelled() {
                result.batches.push(BatchResult { registry_ids: batch.registry_ids, reason: batch.reason, outcome: BatchOutcome::Skipped });
                result.cancelled = true;
                halted = true;
                continue;
            }

            self.check_indexer_health(connector_id).await;

            match self.throttle.can_dispatch(&connector, now).await {
                Ok(DispatchDecision::Allowed) => {}
                Ok(DispatchDecision::Denied { reason, retry_after_ms }) => {
                    result.batches.push(BatchResult { registry_ids: batch.registry_ids, reason: batch.reason, outcome: BatchOutcome::Skipped });
                    result.halted_on = Some(reason);
                    result.halted_retry_after_ms = Some(retry_after_ms);
                    halted = true;
                    continue;
                }
                Err(err) => return Err(ComradarrError::storage(err.to_string())),
            }

            let outcome = self.dispatch_one(&connector, client.as_ref(), &batch, now).await?;
            if outcome == BatchOutcome::RateLimited {
                // A 429 from upstream halts the rest of this pass same as a
                // pre-check throttle denial (`SPEC_FULL.md` §4.F step 3c:
                // "flag batch and remainder as rate-limited/skipped").
                halted = true;
            }
            result.batches.push(BatchResult { registry_ids: batch.registry_ids, reason: batch.reason, outcome });
        }

        Ok(result)
    }

    /// Best-effort advisory check; never allowed to block or fail the pass
    /// (`SPEC_FULL.md` §4.F step f).
    async fn check_indexer_health(&self, connector_id: ConnectorId) {
        match self.indexer_health.snapshot(connector_id).await {
            Ok(snapshot) if snapshot.any_rate_limited => {
                warn!(%connector_id, "advisory indexer-health snapshot reports rate-limited indexers; proceeding with dispatch");
            }
            Ok(_) => {}
            Err(err) => {
                warn!(%connector_id, error = %err, "indexer-health lookup failed; proceeding with dispatch");
            }
        }
    }

    /// Sends one batch's command and routes the outcome into the registry
    /// state machine and history (`SPEC_FULL.md` §4.F steps 3b-3e).
    async fn dispatch_one(
        &self,
        connector: &Connector,
        client: &dyn ConnectorClient,
        batch: &Batch,
        now: DateTime<Utc>,
    ) -> Result<BatchOutcome, ComradarrError> {
        match client.send_search(&batch.command).await {
            Ok(outcome) => {
                self.throttle.record_request(connector.id, now).await.map_err(|e| ComradarrError::storage(e.to_string()))?;
                let (event, history_outcome, batch_outcome) = match outcome {
                    SearchOutcome::Success => (SearchEvent::Success, Outcome::Success, BatchOutcome::Success),
                    SearchOutcome::NoResults => (
                        SearchEvent::NoResults { was_season_pack: matches!(batch.command, Command::SeasonSearch { .. }) },
                        Outcome::NoResults,
                        BatchOutcome::NoResults,
                    ),
                };
                self.apply_to_rows(batch, event, history_outcome, None, now).await?;
                Ok(batch_outcome)
            }
            Err(err) => self.handle_failure(connector, batch, &err, now).await,
        }
    }

    async fn handle_failure(
        &self,
        connector: &Connector,
        batch: &Batch,
        err: &UpstreamError,
        now: DateTime<Utc>,
    ) -> Result<BatchOutcome, ComradarrError> {
        if err.kind == UpstreamErrorKind::RateLimit {
            self.throttle
                .handle_rate_limit_response(connector, err.retry_after_seconds, now)
                .await
                .map_err(|e| ComradarrError::storage(e.to_string()))?;
            let status = self.throttle.get_status(connector).await.map_err(|e| ComradarrError::storage(e.to_string()))?;
            let event = SearchEvent::RateLimited { paused_until: status.paused_until };
            self.apply_to_rows(batch, event, Outcome::RateLimited, Some(FailureCategory::RateLimit), now).await?;
            return Ok(BatchOutcome::RateLimited);
        }

        let category = match err.kind {
            UpstreamErrorKind::Authentication => FailureCategory::Authentication,
            UpstreamErrorKind::Ssl => FailureCategory::Ssl,
            UpstreamErrorKind::Timeout => FailureCategory::Timeout,
            UpstreamErrorKind::Network => FailureCategory::Network,
            UpstreamErrorKind::Server => FailureCategory::Server,
            UpstreamErrorKind::NotFound => FailureCategory::NotFound,
            UpstreamErrorKind::Validation => FailureCategory::Validation,
            UpstreamErrorKind::RateLimit => unreachable!("handled above"),
        };

        if category == FailureCategory::Authentication {
            self.store.set_connector_health(connector.id, ConnectorHealth::Unhealthy).await?;
        }

        let history_outcome = if category == FailureCategory::Timeout { Outcome::Timeout } else { Outcome::Error };
        self.apply_to_rows(batch, SearchEvent::Error(category), history_outcome, Some(category), now).await?;

        Ok(if category == FailureCategory::Authentication { BatchOutcome::Authentication } else { BatchOutcome::Error(category) })
    }

    /// Applies one [`SearchEvent`] to every registry row a batch covers and
    /// writes the corresponding history entries.
    async fn apply_to_rows(
        &self,
        batch: &Batch,
        event: SearchEvent,
        history_outcome: Outcome,
        category: Option<FailureCategory>,
        now: DateTime<Utc>,
    ) -> Result<(), ComradarrError> {
        for registry_id in &batch.registry_ids {
            let row = self.store.get_registry(*registry_id).await?;
            let (next, _) = apply_outcome(&row, event.clone(), now);
            let update = RegistryOutcomeUpdate {
                state: next.state,
                attempt_count: next.attempt_count,
                last_searched: now,
                next_eligible: next.next_eligible,
                failure_category: next.failure_category,
                season_pack_failed: next.season_pack_failed,
                backlog_tier: next.backlog_tier,
            };
            self.store.update_registry_outcome(*registry_id, update).await?;
            self.store
                .append_history(*registry_id, row.connector_id, history_outcome, category, serde_json::json!({ "reason": batch.reason }), now)
                .await?;
        }
        Ok(())
    }

    /// Groups a connector's eligible rows into outbound command batches
    /// (`SPEC_FULL.md` §4.E): episodes by series+season, movies independently.
    /// Batches inherit their priority ordering from their highest-priority member.
    async fn build_batches(&self, rows: &[SearchRegistry], profile_batch_size: u32) -> Result<Vec<Batch>, ComradarrError> {
        // `SPEC_FULL.md` §4.E: batch size is bounded both by the
        // `MAX_*_PER_SEARCH` config ceiling and by the connector's own
        // throttle profile `batchSize`.
        let max_episodes = self.config.max_episodes_per_search.min(profile_batch_size);
        let max_movies = self.config.max_movies_per_search.min(profile_batch_size);

        let mut episode_groups: HashMap<SeasonId, (comradarr_types::SeasonMirror, Vec<EpisodeCandidate>)> = HashMap::new();
        let mut movie_candidates: Vec<MovieCandidate> = Vec::new();

        for row in rows {
            match row.content {
                ContentRef::Episode { episode_id, season_id } => {
                    if !episode_groups.contains_key(&season_id) {
                        let season = self
                            .content
                            .get_season(season_id)
                            .await?
                            .ok_or_else(|| ComradarrError::not_found(format!("season mirror row {season_id} missing")))?;
                        episode_groups.insert(season_id, (season, Vec::new()));
                    }
                    let (season, candidates) = episode_groups.get_mut(&season_id).expect("just inserted");
                    candidates.push(EpisodeCandidate {
                        registry_id: row.id,
                        episode_id,
                        series_id: season.series_id,
                        season_number: season.season_number,
                        season_pack_failed: row.season_pack_failed,
                    });
                }
                ContentRef::Movie { movie_id } => {
                    movie_candidates.push(MovieCandidate { registry_id: row.id, movie_id });
                }
            }
        }

        let mut batches = Vec::new();
        for (season, candidates) in episode_groups.into_values() {
            batches.extend(batch_season(season.series_id, season.season_number, &candidates, season.into(), &self.config, max_episodes));
        }
        if !movie_candidates.is_empty() {
            batches.extend(batch_movies(&movie_candidates, max_movies));
        }

        let priority_of = |b: &Batch| -> i64 {
            b.registry_ids
                .iter()
                .filter_map(|id| rows.iter().find(|r| r.id == *id))
                .map(|r| r.priority)
                .max()
                .unwrap_or(i64::MIN)
        };
        batches.sort_by(|a, b| priority_of(b).cmp(&priority_of(a)));
        Ok(batches)
    }
}

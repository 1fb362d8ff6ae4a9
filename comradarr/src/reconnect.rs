//! Keeps offline/unhealthy connectors probing on an exponential backoff
//! without flooding, and applies the sync-failure-driven health tiering the
//! (out-of-scope) sync collaborator reports into (`SPEC_FULL.md` §4.G).

use chrono::{DateTime, Duration, Utc};
use comradarr_core::{BackoffShape, ComradarrError, ConnectorClient, Store, UpstreamErrorKind};
use comradarr_types::{Connector, ConnectorHealth, ConnectorId, FailureCategory, SyncState};

/// Terminal health classification of one [`ReconnectService::attempt_reconnect`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectOutcome {
    Healthy,
    Offline,
    Unhealthy,
}

/// One completed (or skipped) reconnect attempt.
#[derive(Debug, Clone)]
pub struct AttemptResult {
    pub connector_id: ConnectorId,
    pub outcome: ReconnectOutcome,
    pub attempt_number: u32,
}

/// Aggregate counts from one [`ReconnectService::process_reconnections`] tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconnectTickSummary {
    pub healthy: u32,
    pub offline: u32,
    pub unhealthy: u32,
}

/// The outcome the (out-of-scope) sync collaborator reports after one sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Success,
    Failure(FailureCategory),
}

pub struct ReconnectService<S> {
    store: S,
    backoff: BackoffShape,
}

impl<S: Store> ReconnectService<S> {
    #[must_use]
    pub const fn new(store: S, backoff: BackoffShape) -> Self {
        Self { store, backoff }
    }

    fn next_delay(&self, attempt: u32) -> Duration {
        let mut rng = rand::rng();
        Duration::milliseconds(self.backoff.delay_ms(attempt, &mut rng) as i64)
    }

    /// Idempotent: a connector that already has an in-flight reconnect curve
    /// (`reconnectStartedAt` set) is left untouched.
    pub async fn initialize_reconnect(&self, connector_id: ConnectorId, now: DateTime<Utc>) -> Result<(), ComradarrError> {
        let mut state = self.store.get_sync_state(connector_id).await?;
        if state.reconnect_started_at.is_some() {
            return Ok(());
        }
        state.reconnect_attempts = 0;
        state.reconnect_started_at = Some(now);
        state.next_reconnect_at = Some(now + self.next_delay(0));
        self.store.put_sync_state(state).await?;
        Ok(())
    }

    /// Pings upstream (`ping` then `health`) and applies the corresponding
    /// health/backoff transition (`SPEC_FULL.md` §4.G bullet list).
    pub async fn attempt_reconnect(
        &self,
        client: &dyn ConnectorClient,
        connector: &Connector,
        current_attempt_count: u32,
        now: DateTime<Utc>,
    ) -> Result<AttemptResult, ComradarrError> {
        let (health, outcome, error_message) = if let Err(err) = client.ping().await {
            (ConnectorHealth::Offline, ReconnectOutcome::Offline, Some(err.to_string()))
        } else {
            match client.health().await {
                Ok(entries) if !entries.iter().any(|e| e.is_error()) => (ConnectorHealth::Healthy, ReconnectOutcome::Healthy, None),
                Ok(entries) => {
                    let errors: Vec<_> = entries.iter().filter(|e| e.is_error()).map(|e| e.message.clone()).collect();
                    (ConnectorHealth::Offline, ReconnectOutcome::Offline, Some(errors.join("; ")))
                }
                Err(err) if err.kind == UpstreamErrorKind::Authentication => (ConnectorHealth::Unhealthy, ReconnectOutcome::Unhealthy, Some(err.to_string())),
                Err(err) => (ConnectorHealth::Offline, ReconnectOutcome::Offline, Some(err.to_string())),
            }
        };

        let mut state = self.store.get_sync_state(connector.id).await?;

        if outcome == ReconnectOutcome::Healthy {
            state.reconnect_attempts = 0;
            state.reconnect_started_at = None;
            state.next_reconnect_at = None;
            state.last_reconnect_error = None;
        } else {
            let next_attempt = current_attempt_count + 1;
            state.reconnect_attempts = next_attempt;
            state.next_reconnect_at = Some(now + self.next_delay(next_attempt));
            state.last_reconnect_error = error_message;
            if state.reconnect_started_at.is_none() {
                state.reconnect_started_at = Some(now);
            }
        }
        self.store.put_sync_state(state).await?;
        self.store.set_connector_health(connector.id, health).await?;

        Ok(AttemptResult { connector_id: connector.id, outcome, attempt_number: current_attempt_count + 1 })
    }

    /// Resets the backoff curve to attempt 0 and runs an immediate attempt.
    /// The returned `attempt_number` is `previousAttempts + 1`, taken before the reset.
    pub async fn trigger_manual_reconnect(&self, client: &dyn ConnectorClient, connector: &Connector, now: DateTime<Utc>) -> Result<AttemptResult, ComradarrError> {
        let mut state = self.store.get_sync_state(connector.id).await?;
        let previous_attempts = state.reconnect_attempts;
        state.reconnect_attempts = 0;
        state.next_reconnect_at = None;
        self.store.put_sync_state(state).await?;

        let mut result = self.attempt_reconnect(client, connector, 0, now).await?;
        result.attempt_number = previous_attempts + 1;
        Ok(result)
    }

    pub async fn pause_reconnect(&self, connector_id: ConnectorId) -> Result<(), ComradarrError> {
        let mut state = self.store.get_sync_state(connector_id).await?;
        state.reconnect_paused = true;
        self.store.put_sync_state(state).await?;
        Ok(())
    }

    /// Resumes a paused reconnect curve, recomputing `nextReconnectAt` from
    /// the current `reconnectAttempts` (0 if the connector never attempted).
    pub async fn resume_reconnect(&self, connector_id: ConnectorId, now: DateTime<Utc>) -> Result<(), ComradarrError> {
        let mut state = self.store.get_sync_state(connector_id).await?;
        state.reconnect_paused = false;
        state.next_reconnect_at = Some(now + self.next_delay(state.reconnect_attempts));
        self.store.put_sync_state(state).await?;
        Ok(())
    }

    /// Tick: runs `attempt_reconnect` for every connector whose backoff has
    /// elapsed. `clients` must contain an entry for every connector that
    /// might be selected; a missing client is reported via `missing_client`
    /// rather than silently dropped.
    pub async fn process_reconnections(
        &self,
        clients: &std::collections::HashMap<ConnectorId, std::sync::Arc<dyn ConnectorClient>>,
        now: DateTime<Utc>,
    ) -> Result<ReconnectTickSummary, ComradarrError> {
        let due = self.store.select_reconnect_due(now).await?;
        let mut summary = ReconnectTickSummary::default();
        for state in due {
            let Some(client) = clients.get(&state.connector_id) else {
                tracing::warn!(connector_id = %state.connector_id, "reconnect due but no client registered; skipping");
                continue;
            };
            let connector = self.store.get_connector(state.connector_id).await?;
            let result = self.attempt_reconnect(client.as_ref(), &connector, state.reconnect_attempts, now).await?;
            match result.outcome {
                ReconnectOutcome::Healthy => summary.healthy += 1,
                ReconnectOutcome::Offline => summary.offline += 1,
                ReconnectOutcome::Unhealthy => summary.unhealthy += 1,
            }
        }
        Ok(summary)
    }

    /// Applies the sync-failure-driven health tier after one sync attempt
    /// (`SPEC_FULL.md` §4.G, final paragraph): `authentication` is
    /// immediately `unhealthy`; otherwise consecutive failures climb
    /// `healthy → degraded → unhealthy` at `config`'s thresholds. Any
    /// success restores `healthy` regardless of prior count.
    pub async fn record_sync_outcome(
        &self,
        connector_id: ConnectorId,
        outcome: SyncOutcome,
        config: &comradarr_core::SyncHealthConfig,
        now: DateTime<Utc>,
    ) -> Result<ConnectorHealth, ComradarrError> {
        let mut state: SyncState = self.store.get_sync_state(connector_id).await?;

        let health = match outcome {
            SyncOutcome::Success => {
                state.consecutive_failures = 0;
                state.last_sync = Some(now);
                ConnectorHealth::Healthy
            }
            SyncOutcome::Failure(FailureCategory::Authentication) => {
                state.consecutive_failures += 1;
                ConnectorHealth::Unhealthy
            }
            SyncOutcome::Failure(_) => {
                state.consecutive_failures += 1;
                if state.consecutive_failures >= config.unhealthy_threshold {
                    ConnectorHealth::Unhealthy
                } else if state.consecutive_failures >= config.degraded_threshold {
                    ConnectorHealth::Degraded
                } else {
                    ConnectorHealth::Healthy
                }
            }
        };

        self.store.put_sync_state(state).await?;
        self.store.set_connector_health(connector_id, health).await?;
        Ok(health)
    }
}

//! The periodic tick drivers that keep the control plane moving without an
//! operator pushing buttons (`SPEC_FULL.md` §4.H): the three named in
//! `spec.md` (throttle window, reconnect, dispatch) plus the selector-pass
//! discovery tick that `spec.md` §4.D's "enqueue" transition presupposes
//! but leaves undriven — `spec.md` §4.H itself calls its own list "a
//! minimum of three periodic drivers", so a fourth is within its contract.
//!
//! Ordering per tick call mirrors `spec.md` §2's flow: throttle windows
//! reset, reconnect sweep, discovery (new gaps/upgrades plus cooldown
//! reactivation), then dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use comradarr_core::{BackoffShape, BatchingConfig, CancellationToken, ComradarrError, ConnectorClient, ContentMirrorReader, Store};
use comradarr_types::{ConnectorHealth, ConnectorId};
use futures::future::join_all;

use crate::discovery::{DiscoveryService, DiscoverySummary};
use crate::dispatcher::{Dispatcher, IndexerHealthProvider, PassResult};
use crate::reconnect::{ReconnectService, ReconnectTickSummary};

/// Owns one [`Dispatcher`], one [`ReconnectService`], and one
/// [`DiscoveryService`] over a shared store, and exposes the tick methods
/// `SPEC_FULL.md` §4.H names. Each tick is idempotent and a no-op when
/// nothing is due — callers are expected to drive these on their own
/// interval (a `tokio::time::interval` loop per tick), not this type.
pub struct Scheduler<S, C, H> {
    store: S,
    dispatcher: Dispatcher<S, C, H>,
    reconnect: ReconnectService<S>,
    discovery: DiscoveryService<S, C>,
    clients: HashMap<ConnectorId, Arc<dyn ConnectorClient>>,
}

impl<S, C, H> Scheduler<S, C, H>
where
    S: Store + Clone,
    C: ContentMirrorReader + Clone,
    H: IndexerHealthProvider,
{
    pub fn new(store: S, content: C, indexer_health: H, batching: BatchingConfig, reconnect_backoff: BackoffShape) -> Self {
        let dispatcher = Dispatcher::new(store.clone(), content.clone(), indexer_health, batching);
        let reconnect = ReconnectService::new(store.clone(), reconnect_backoff);
        let discovery = DiscoveryService::new(store.clone(), content);
        Self { store, dispatcher, reconnect, discovery, clients: HashMap::new() }
    }

    /// Registers the upstream client used for both dispatch and reconnect
    /// probes of `connector_id`.
    pub fn register_client(&mut self, connector_id: ConnectorId, client: Arc<dyn ConnectorClient>) {
        self.dispatcher.register_client(connector_id, client.clone());
        self.clients.insert(connector_id, client);
    }

    /// Every second (or coarser): zeroes expired minute/day throttle windows
    /// and clears expired pauses. Returns the number of rows touched.
    pub async fn throttle_window_tick(&self, now: DateTime<Utc>) -> Result<u64, ComradarrError> {
        Ok(self.store.reset_expired_windows(now).await?)
    }

    /// Every 10-30 seconds: runs reconnect attempts for every connector whose backoff has elapsed.
    pub async fn reconnect_tick(&self, now: DateTime<Utc>) -> Result<ReconnectTickSummary, ComradarrError> {
        self.reconnect.process_reconnections(&self.clients, now).await
    }

    /// Runs the selector pass for every enabled connector: reactivates
    /// cooldown rows whose `next_eligible` has passed, then classifies and
    /// enqueues every gap/upgrade the content mirror reports
    /// (`SPEC_FULL.md` §4.D "enqueue").
    pub async fn discovery_tick(&self, now: DateTime<Utc>) -> Result<Vec<(ConnectorId, DiscoverySummary)>, ComradarrError> {
        self.store.reactivate_cooldowns(now).await?;
        let connectors = self.store.list_enabled_connectors().await?;
        let mut results = Vec::with_capacity(connectors.len());
        for connector in connectors {
            match self.discovery.run_pass(&connector, now).await {
                Ok(summary) => results.push((connector.id, summary)),
                Err(err) => tracing::error!(connector_id = %connector.id, error = %err, "discovery pass failed; other connectors unaffected"),
            }
        }
        Ok(results)
    }

    /// Every few seconds: one dispatch pass per enabled, non-queue-paused,
    /// non-offline connector, run in parallel across connectors
    /// (`SPEC_FULL.md` §5 "across connectors, dispatch passes are independent").
    ///
    /// `cancel` is shared by every connector's pass this tick; a caller
    /// shutting down the process cancels it once rather than threading a
    /// per-connector token.
    pub async fn dispatch_tick(&self, now: DateTime<Utc>, cancel: &CancellationToken) -> Result<Vec<(ConnectorId, PassResult)>, ComradarrError> {
        let connectors = self.store.list_enabled_connectors().await?;
        let eligible: Vec<_> = connectors
            .into_iter()
            .filter(|c| !c.queue_paused && c.health != ConnectorHealth::Offline)
            .collect();

        let passes = eligible.iter().map(|c| {
            let id = c.id;
            async move { (id, self.dispatcher.dispatch_pass(id, now, cancel).await) }
        });

        let mut results = Vec::with_capacity(eligible.len());
        for (id, outcome) in join_all(passes).await {
            match outcome {
                Ok(pass) => results.push((id, pass)),
                Err(err) => tracing::error!(connector_id = %id, error = %err, "dispatch pass failed; other connectors unaffected"),
            }
        }
        Ok(results)
    }
}

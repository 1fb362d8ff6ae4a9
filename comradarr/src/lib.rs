//! comradarr
//!
//! The search control plane's executable core: gap/upgrade discovery, a
//! single dispatch pass per connector, the reconnect service, and the tick
//! scheduler that drives all three (plus the throttle window) on their own
//! cadence. Everything here is generic over the
//! `Store`/`ConnectorClient`/`ContentMirrorReader` seams so the binary that
//! wires a real backend in lives outside this crate.

pub mod discovery;
pub mod dispatcher;
pub mod reconnect;
pub mod scheduler;

pub use discovery::{classify_episode, classify_movie, DiscoveryService, DiscoverySummary};
pub use dispatcher::{BatchOutcome, BatchResult, Dispatcher, IndexerHealthProvider, IndexerHealthSnapshot, NoopIndexerHealth, PassResult, MAX_ROWS_PER_PASS};
pub use reconnect::{AttemptResult, ReconnectOutcome, ReconnectService, ReconnectTickSummary, SyncOutcome};
pub use scheduler::Scheduler;

use std::sync::Arc;

use comradarr_core::{BackoffShape, BatchingConfig, Config, ContentMirrorReader, Store};

/// Convenience bundle wiring a store, content-mirror reader, and config into
/// a ready-to-use [`Scheduler`] over `Arc<dyn Store>`/`Arc<dyn
/// ContentMirrorReader>`, the shape every real deployment reaches for.
pub type ControlPlane<H> = Scheduler<Arc<dyn Store>, Arc<dyn ContentMirrorReader>, H>;

/// Builds a [`ControlPlane`] from its shared dependencies. Callers still
/// need to call [`Scheduler::register_client`] once per managed connector
/// before running any tick.
pub fn build_control_plane<H>(store: Arc<dyn Store>, content: Arc<dyn ContentMirrorReader>, indexer_health: H, config: &Config) -> ControlPlane<H>
where
    H: IndexerHealthProvider,
{
    Scheduler::new(store, content, indexer_health, batching_config(config), reconnect_backoff(config))
}

/// Builds the reconnect `BackoffShape` from `config.reconnect`'s
/// `RECONNECT_BASE_DELAY_MS`/`RECONNECT_MAX_DELAY_MS`/`RECONNECT_MULTIPLIER`/
/// `RECONNECT_JITTER` fields, rather than the compiled-in preset.
fn reconnect_backoff(config: &Config) -> BackoffShape {
    BackoffShape {
        base_ms: config.reconnect.base_delay.as_millis() as u64,
        max_ms: config.reconnect.max_delay.as_millis() as u64,
        multiplier: config.reconnect.multiplier,
        jitter: config.reconnect.jitter,
    }
}

fn batching_config(config: &Config) -> BatchingConfig {
    config.batching
}

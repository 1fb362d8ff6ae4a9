//! Exercises `Scheduler::dispatch_tick` against `InMemoryStore` and a
//! scripted `MockConnectorClient`, driving a full pass against fixture
//! connectors rather than a live socket.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use comradarr_core::{BackoffShape, BatchingConfig, CancellationToken, ContentMirrorReader, Store, UpstreamError, UpstreamErrorKind};
use comradarr_mock::{InMemoryContentMirror, InMemoryStore, MockConnectorClient, ScriptedResponse};
use comradarr_types::{Connector, ConnectorHealth, ConnectorId, ConnectorKind, ContentRef, MovieId, MovieMirror, SearchType};

fn ts(secs: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap()
}

fn test_connector(id: i64) -> Connector {
    Connector {
        id: ConnectorId::new(id),
        kind: ConnectorKind::KindB,
        base_url: "http://localhost:7878".to_string(),
        api_key: "key".to_string(),
        enabled: true,
        health: ConnectorHealth::Healthy,
        queue_paused: false,
        throttle_profile_id: None,
        created_at: ts(0),
        updated_at: ts(0),
    }
}

#[tokio::test]
async fn dispatch_tick_sends_pending_movie_and_updates_registry() {
    let store = Arc::new(InMemoryStore::new());
    let content = Arc::new(InMemoryContentMirror::new());
    let connector = test_connector(1);
    store.seed_connector(connector.clone());

    let movie_id = MovieId::new(1);
    content.seed_movie(MovieMirror {
        id: movie_id,
        connector_id: connector.id,
        upstream_id: 100,
        has_file: false,
        quality_cutoff_not_met: None,
        monitored: true,
    });

    let row = store
        .enqueue(connector.id, ContentRef::Movie { movie_id }, SearchType::Gap, 500, ts(0), ts(0))
        .await
        .unwrap();

    let client = Arc::new(MockConnectorClient::with_script(ConnectorKind::KindB, vec![ScriptedResponse::Success]));

    let mut scheduler = comradarr::Scheduler::new(
        store.clone() as Arc<dyn Store>,
        content.clone() as Arc<dyn ContentMirrorReader>,
        comradarr::dispatcher::NoopIndexerHealth,
        BatchingConfig::default(),
        BackoffShape::reconnect(),
    );
    scheduler.register_client(connector.id, client.clone());

    let results = scheduler.dispatch_tick(ts(1_000), &CancellationToken::none()).await.unwrap();
    assert_eq!(results.len(), 1);
    let (id, pass) = &results[0];
    assert_eq!(*id, connector.id);
    assert_eq!(pass.dispatched_count(), 1);

    assert_eq!(client.calls().len(), 1);

    let updated = store.peek_registry(row.id).unwrap();
    assert_eq!(updated.state, comradarr_types::RegistryState::Cooldown);
    assert_eq!(updated.attempt_count, 1);
}

#[tokio::test]
async fn dispatch_tick_skips_disabled_and_queue_paused_connectors() {
    let store = Arc::new(InMemoryStore::new());
    let content = Arc::new(InMemoryContentMirror::new());

    let mut disabled = test_connector(1);
    disabled.enabled = false;
    let mut paused = test_connector(2);
    paused.queue_paused = true;
    let healthy = test_connector(3);

    store.seed_connector(disabled);
    store.seed_connector(paused);
    store.seed_connector(healthy.clone());

    let scheduler = comradarr::Scheduler::new(
        store.clone() as Arc<dyn Store>,
        content.clone() as Arc<dyn ContentMirrorReader>,
        comradarr::dispatcher::NoopIndexerHealth,
        BatchingConfig::default(),
        BackoffShape::reconnect(),
    );

    let results = scheduler.dispatch_tick(ts(0), &CancellationToken::none()).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, healthy.id);
}

#[tokio::test]
async fn dispatch_tick_halts_remaining_batches_on_rate_limit() {
    let store = Arc::new(InMemoryStore::new());
    let content = Arc::new(InMemoryContentMirror::new());
    let connector = test_connector(1);
    store.seed_connector(connector.clone());

    for i in 0..2u32 {
        let movie_id = MovieId::new(i64::from(i) + 1);
        content.seed_movie(MovieMirror {
            id: movie_id,
            connector_id: connector.id,
            upstream_id: 100 + i64::from(i),
            has_file: false,
            quality_cutoff_not_met: None,
            monitored: true,
        });
        // One registry row per movie so each becomes its own batch under a
        // batch size of 1, forcing two dispatch attempts in the pass.
        store.enqueue(connector.id, ContentRef::Movie { movie_id }, SearchType::Gap, 500 - i64::from(i), ts(0), ts(i64::from(i))).await.unwrap();
    }

    let mut profile = comradarr_types::ThrottleProfile::aggressive();
    profile.id = comradarr_types::ThrottleProfileId::new(7);
    profile.batch_size = 1;
    store.seed_profile(profile.clone());
    let mut connector_with_profile = connector.clone();
    connector_with_profile.throttle_profile_id = Some(profile.id);
    store.seed_connector(connector_with_profile);

    let client = Arc::new(MockConnectorClient::with_script(
        ConnectorKind::KindB,
        vec![ScriptedResponse::Fail(
            UpstreamError::new(UpstreamErrorKind::RateLimit, "429").with_status(429).with_retry_after(30),
        )],
    ));

    let mut scheduler = comradarr::Scheduler::new(
        store.clone() as Arc<dyn Store>,
        content.clone() as Arc<dyn ContentMirrorReader>,
        comradarr::dispatcher::NoopIndexerHealth,
        BatchingConfig::default(),
        BackoffShape::reconnect(),
    );
    scheduler.register_client(connector.id, client.clone());

    let results = scheduler.dispatch_tick(ts(1_000), &CancellationToken::none()).await.unwrap();
    let (_, pass) = &results[0];

    assert_eq!(pass.batches.len(), 2);
    assert_eq!(pass.batches[0].outcome, comradarr::BatchOutcome::RateLimited);
    assert_eq!(pass.batches[1].outcome, comradarr::BatchOutcome::Skipped);
    assert_eq!(client.calls().len(), 1, "only the first batch should have been sent before the halt");

    // A second pass now sees the pause the first one recorded and halts
    // before sending anything, this time surfacing `halted_on`.
    let second = scheduler.dispatch_tick(ts(1_005), &CancellationToken::none()).await.unwrap();
    let (_, second_pass) = &second[0];
    assert_eq!(second_pass.halted_on, Some(comradarr_throttle::DenyReason::RateLimit));
    assert_eq!(client.calls().len(), 1, "the paused connector should not be dispatched to again");
}

#[tokio::test]
async fn cancelling_mid_pass_skips_not_yet_started_batches_only() {
    let store = Arc::new(InMemoryStore::new());
    let content = Arc::new(InMemoryContentMirror::new());
    let connector = test_connector(1);
    store.seed_connector(connector.clone());

    for i in 0..2u32 {
        let movie_id = MovieId::new(i64::from(i) + 1);
        content.seed_movie(MovieMirror {
            id: movie_id,
            connector_id: connector.id,
            upstream_id: 100 + i64::from(i),
            has_file: false,
            quality_cutoff_not_met: None,
            monitored: true,
        });
        store.enqueue(connector.id, ContentRef::Movie { movie_id }, SearchType::Gap, 500 - i64::from(i), ts(0), ts(i64::from(i))).await.unwrap();
    }

    let mut profile = comradarr_types::ThrottleProfile::aggressive();
    profile.id = comradarr_types::ThrottleProfileId::new(8);
    profile.batch_size = 1;
    store.seed_profile(profile.clone());
    let mut connector_with_profile = connector.clone();
    connector_with_profile.throttle_profile_id = Some(profile.id);
    store.seed_connector(connector_with_profile);

    let client = Arc::new(MockConnectorClient::with_script(ConnectorKind::KindB, vec![ScriptedResponse::Success]));

    let mut scheduler = comradarr::Scheduler::new(
        store.clone() as Arc<dyn Store>,
        content.clone() as Arc<dyn ContentMirrorReader>,
        comradarr::dispatcher::NoopIndexerHealth,
        BatchingConfig::default(),
        BackoffShape::reconnect(),
    );
    scheduler.register_client(connector.id, client.clone());

    let (token, guard) = CancellationToken::new();
    guard.cancel();

    let results = scheduler.dispatch_tick(ts(1_000), &token).await.unwrap();
    let (_, pass) = &results[0];

    assert!(pass.cancelled);
    assert!(pass.batches.iter().all(|b| b.outcome == comradarr::BatchOutcome::Skipped));
    assert_eq!(client.calls().len(), 0, "a pass cancelled before its first batch must not dispatch anything");
}

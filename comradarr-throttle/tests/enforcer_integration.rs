//! Full-lifecycle integration coverage over `InMemoryStore`: slot exhaustion,
//! window reset via the tick, and manual pause/resume (`spec.md` §4.C).

use chrono::{DateTime, TimeZone, Utc};
use comradarr_mock::InMemoryStore;
use comradarr_throttle::{DenyReason, DispatchDecision, ThrottleEnforcer};
use comradarr_types::{Connector, ConnectorHealth, ConnectorId, ConnectorKind, ThrottleProfile};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap()
}

fn test_connector(id: i64, profile_id: Option<comradarr_types::ThrottleProfileId>) -> Connector {
    Connector {
        id: ConnectorId::new(id),
        kind: ConnectorKind::KindA,
        base_url: "http://localhost:8989".to_string(),
        api_key: "key".to_string(),
        enabled: true,
        health: ConnectorHealth::Healthy,
        queue_paused: false,
        throttle_profile_id: profile_id,
        created_at: ts(0),
        updated_at: ts(0),
    }
}

#[tokio::test]
async fn exhausted_minute_window_reopens_after_tick_reset() {
    let store = InMemoryStore::new();
    let mut profile = ThrottleProfile::aggressive();
    profile.requests_per_minute = 2;
    let profile_id = profile.id;
    store.seed_profile(profile);
    let connector = test_connector(1, Some(profile_id));
    store.seed_connector(connector.clone());
    let enforcer = ThrottleEnforcer::new(store);

    assert!(enforcer.can_dispatch(&connector, ts(0)).await.unwrap().is_allowed());
    assert!(enforcer.can_dispatch(&connector, ts(0)).await.unwrap().is_allowed());
    let denied = enforcer.can_dispatch(&connector, ts(0)).await.unwrap();
    assert!(matches!(denied, DispatchDecision::Denied { reason: DenyReason::RateLimit, .. }));

    // A minute later the tick resets the window and capacity reopens.
    enforcer.reset_expired_windows(ts(61)).await.unwrap();
    assert!(enforcer.can_dispatch(&connector, ts(61)).await.unwrap().is_allowed());
}

#[tokio::test]
async fn manual_pause_blocks_until_resumed() {
    let store = InMemoryStore::new();
    let connector = test_connector(2, None);
    store.seed_connector(connector.clone());
    let enforcer = ThrottleEnforcer::new(store);

    enforcer.pause_dispatch(connector.id, 3600, ts(0)).await.unwrap();
    assert!(matches!(
        enforcer.can_dispatch(&connector, ts(10)).await.unwrap(),
        DispatchDecision::Denied { reason: DenyReason::Manual, .. }
    ));

    enforcer.resume_dispatch(connector.id).await.unwrap();
    assert!(enforcer.can_dispatch(&connector, ts(10)).await.unwrap().is_allowed());
}

#[tokio::test]
async fn rate_limit_response_pauses_for_retry_after_duration() {
    let store = InMemoryStore::new();
    let connector = test_connector(3, None);
    store.seed_connector(connector.clone());
    let enforcer = ThrottleEnforcer::new(store);

    enforcer.handle_rate_limit_response(&connector, Some(120), ts(0)).await.unwrap();
    let decision = enforcer.can_dispatch(&connector, ts(1)).await.unwrap();
    match decision {
        DispatchDecision::Denied { reason: DenyReason::RateLimit, retry_after_ms } => {
            assert_eq!(retry_after_ms, 119_000);
        }
        other => panic!("expected rate-limit denial, got {other:?}"),
    }
}

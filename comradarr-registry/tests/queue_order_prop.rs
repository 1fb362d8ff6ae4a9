//! P-QUEUE-ORDER (`spec.md` §8): items dequeued satisfy
//! `(priority DESC, scheduledAt ASC)`, and that ordering is antisymmetric
//! and transitive — exercised both as an abstract comparator property and
//! against `InMemoryStore::select_dispatch_eligible`, which resolves the
//! tiebreak against each row's `discovered_at` (its `scheduled_at`
//! equivalent, since rows here are enqueued once and never rescheduled).

use chrono::{DateTime, TimeZone, Utc};
use comradarr_mock::InMemoryStore;
use comradarr_types::{Connector, ConnectorHealth, ConnectorId, ConnectorKind, ContentRef, EpisodeId, SearchType, SeasonId};
use comradarr_core::Store;
use proptest::prelude::*;
use std::cmp::Ordering;

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap()
}

fn test_connector(id: i64) -> Connector {
    Connector {
        id: ConnectorId::new(id),
        kind: ConnectorKind::KindA,
        base_url: "http://localhost:8989".to_string(),
        api_key: "key".to_string(),
        enabled: true,
        health: ConnectorHealth::Healthy,
        queue_paused: false,
        throttle_profile_id: None,
        created_at: ts(0),
        updated_at: ts(0),
    }
}

/// Mirrors the ordering `select_dispatch_eligible` applies: higher priority
/// first, then earlier `discovered_at`.
fn queue_order(a: (i64, i64), b: (i64, i64)) -> Ordering {
    let (a_priority, a_discovered) = a;
    let (b_priority, b_discovered) = b;
    b_priority.cmp(&a_priority).then(a_discovered.cmp(&b_discovered))
}

proptest! {
    #[test]
    fn ordering_is_antisymmetric(
        p1 in -1000i64..1000, s1 in 0i64..1_000_000,
        p2 in -1000i64..1000, s2 in 0i64..1_000_000,
    ) {
        let forward = queue_order((p1, s1), (p2, s2));
        let backward = queue_order((p2, s2), (p1, s1));
        prop_assert_eq!(forward, backward.reverse());
    }

    #[test]
    fn ordering_is_transitive(
        p1 in -1000i64..1000, s1 in 0i64..1_000_000,
        p2 in -1000i64..1000, s2 in 0i64..1_000_000,
        p3 in -1000i64..1000, s3 in 0i64..1_000_000,
    ) {
        let ab = queue_order((p1, s1), (p2, s2));
        let bc = queue_order((p2, s2), (p3, s3));
        if ab != Ordering::Greater && bc != Ordering::Greater {
            let ac = queue_order((p1, s1), (p3, s3));
            prop_assert_ne!(ac, Ordering::Greater);
        }
    }
}

#[tokio::test]
async fn select_dispatch_eligible_returns_priority_desc_discovered_asc() {
    let store = InMemoryStore::new();
    let connector = test_connector(1);
    store.seed_connector(connector.clone());

    let rows = [
        (500i64, 100i64, 1i64),
        (900, 50, 2),
        (900, 10, 3),
        (100, 0, 4),
    ];
    for (priority, discovered_secs, episode_id) in rows {
        store
            .enqueue(
                connector.id,
                ContentRef::Episode { episode_id: EpisodeId::new(episode_id), season_id: SeasonId::new(1) },
                SearchType::Gap,
                priority,
                ts(0),
                ts(discovered_secs),
            )
            .await
            .unwrap();
    }

    let eligible = store.select_dispatch_eligible(connector.id, ts(1_000), 10).await.unwrap();
    let observed: Vec<(i64, i64)> = eligible.iter().map(|r| (r.priority, r.discovered_at.timestamp())).collect();
    let mut expected = observed.clone();
    expected.sort_by(|a, b| queue_order(*a, *b));
    assert_eq!(observed, expected);
}

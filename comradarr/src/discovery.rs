//! Gap/upgrade discovery: classifies library-mirror rows and drives the
//! `pending -> queued` "enqueue (selector pass)" transition (`SPEC_FULL.md`
//! §4.D). The sync/reconciliation collaborator that populates the library
//! mirror is out of scope; this module only reads what it wrote.

use chrono::{DateTime, Utc};
use comradarr_core::{ComradarrError, ContentMirrorReader, Store};
use comradarr_registry::{priority_score, PriorityInputs};
use comradarr_types::{Connector, ConnectorId, ContentRef, EpisodeMirror, MovieMirror, RegistryState, SearchType};

/// A gap is a monitored item with no file; an upgrade is monitored, has a
/// file, but sits below the quality cutoff (`spec.md` GLOSSARY).
#[must_use]
pub fn classify_episode(episode: &EpisodeMirror) -> Option<SearchType> {
    classify(episode.monitored, episode.has_file, episode.quality_cutoff_not_met)
}

#[must_use]
pub fn classify_movie(movie: &MovieMirror) -> Option<SearchType> {
    classify(movie.monitored, movie.has_file, movie.quality_cutoff_not_met)
}

fn classify(monitored: bool, has_file: bool, quality_cutoff_not_met: Option<bool>) -> Option<SearchType> {
    if !monitored {
        return None;
    }
    if !has_file {
        return Some(SearchType::Gap);
    }
    if quality_cutoff_not_met == Some(true) {
        return Some(SearchType::Upgrade);
    }
    None
}

/// Aggregate result of one [`DiscoveryService::run_pass`] call.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscoverySummary {
    pub enqueued: u32,
    /// Episodes whose parent season mirror row was missing; can't be scored
    /// (no `next_airing`) or batched (no `series_id`) without it.
    pub skipped_missing_season: u32,
}

/// Drives the selector pass for one connector at a time.
pub struct DiscoveryService<S, C> {
    store: S,
    content: C,
}

impl<S: Store, C: ContentMirrorReader> DiscoveryService<S, C> {
    #[must_use]
    pub const fn new(store: S, content: C) -> Self {
        Self { store, content }
    }

    /// Classifies every mirrored episode/movie for `connector` and enqueues
    /// the ones meeting gap/upgrade criteria whose `next_eligible` has
    /// passed (or which have never been discovered before). Idempotent:
    /// rows already `queued`/`searching` are left alone by
    /// [`Store::enqueue`].
    pub async fn run_pass(&self, connector: &Connector, now: DateTime<Utc>) -> Result<DiscoverySummary, ComradarrError> {
        let mut summary = DiscoverySummary::default();

        for episode in self.content.list_episodes(connector.id).await? {
            let Some(search_type) = classify_episode(&episode) else { continue };
            let Some(season) = self.content.get_season(episode.season_id).await? else {
                summary.skipped_missing_season += 1;
                continue;
            };
            let content = ContentRef::Episode { episode_id: episode.id, season_id: episode.season_id };
            if self
                .enqueue_if_eligible(connector.id, content, search_type, season.next_airing.is_some(), now)
                .await?
            {
                summary.enqueued += 1;
            }
        }

        for movie in self.content.list_movies(connector.id).await? {
            let Some(search_type) = classify_movie(&movie) else { continue };
            let content = ContentRef::Movie { movie_id: movie.id };
            if self.enqueue_if_eligible(connector.id, content, search_type, false, now).await? {
                summary.enqueued += 1;
            }
        }

        Ok(summary)
    }

    /// Looks up any existing row for this content so a rediscovered gap
    /// keeps its original `discovered_at` (the age bonus must track first
    /// discovery, not every selector pass) and so already-queued/exhausted
    /// rows aren't churned.
    async fn enqueue_if_eligible(
        &self,
        connector_id: ConnectorId,
        content: ContentRef,
        search_type: SearchType,
        currently_airing: bool,
        now: DateTime<Utc>,
    ) -> Result<bool, ComradarrError> {
        let existing = self.store.find_registry(connector_id, content, search_type).await?;

        if let Some(row) = &existing {
            let eligible = row.state == RegistryState::Pending && row.next_eligible.map_or(true, |t| now >= t);
            if !eligible {
                return Ok(false);
            }
        }

        let discovered_at = existing.as_ref().map_or(now, |r| r.discovered_at);
        let attempt_count = existing.as_ref().map_or(0, |r| r.attempt_count);
        let priority = priority_score(
            PriorityInputs { discovered_at, search_type, currently_airing, attempt_count },
            now,
        );
        self.store
            .enqueue(connector_id, content, search_type, priority, now, discovered_at)
            .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::TimeZone;
    use comradarr_mock::{InMemoryContentMirror, InMemoryStore};
    use comradarr_types::{ConnectorHealth, ConnectorKind, EpisodeId, MovieId, SeasonId, SeasonMirror, SeriesId};

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

    #[test]
    fn classify_requires_monitored() {
        assert_eq!(classify(false, false, None), None);
    }

    #[test]
    fn classify_missing_file_is_gap() {
        assert_eq!(classify(true, false, None), Some(SearchType::Gap));
    }

    #[test]
    fn classify_below_cutoff_is_upgrade() {
        assert_eq!(classify(true, true, Some(true)), Some(SearchType::Upgrade));
    }

    #[test]
    fn classify_at_cutoff_is_none() {
        assert_eq!(classify(true, true, Some(false)), None);
        assert_eq!(classify(true, true, None), None);
    }

    #[tokio::test]
    async fn discovers_gap_episode_and_enqueues_it() {
        let store = Arc::new(InMemoryStore::new());
        let content = Arc::new(InMemoryContentMirror::new());
        let connector = test_connector(1);
        store.seed_connector(connector.clone());
        content.seed_season(SeasonMirror {
            id: SeasonId::new(1),
            series_id: SeriesId::new(1),
            season_number: 1,
            total_episodes: 10,
            downloaded_episodes: 3,
            next_airing: None,
        });
        content.seed_episode(EpisodeMirror {
            id: EpisodeId::new(1),
            connector_id: connector.id,
            series_id: SeriesId::new(1),
            season_id: SeasonId::new(1),
            upstream_id: 100,
            has_file: false,
            quality_cutoff_not_met: None,
            monitored: true,
        });

        let service = DiscoveryService::new(store.clone(), content.clone());
        let summary = service.run_pass(&connector, ts(0)).await.unwrap();
        assert_eq!(summary.enqueued, 1);
        assert_eq!(store.peek_queue().len(), 1);
    }

    #[tokio::test]
    async fn does_not_rediscover_queued_row() {
        let store = Arc::new(InMemoryStore::new());
        let content = Arc::new(InMemoryContentMirror::new());
        let connector = test_connector(2);
        store.seed_connector(connector.clone());
        content.seed_season(SeasonMirror {
            id: SeasonId::new(1),
            series_id: SeriesId::new(1),
            season_number: 1,
            total_episodes: 10,
            downloaded_episodes: 3,
            next_airing: None,
        });
        content.seed_episode(EpisodeMirror {
            id: EpisodeId::new(2),
            connector_id: connector.id,
            series_id: SeriesId::new(1),
            season_id: SeasonId::new(1),
            upstream_id: 101,
            has_file: false,
            quality_cutoff_not_met: None,
            monitored: true,
        });

        let service = DiscoveryService::new(store.clone(), content.clone());
        service.run_pass(&connector, ts(0)).await.unwrap();
        let second = service.run_pass(&connector, ts(60)).await.unwrap();
        assert_eq!(second.enqueued, 0);
        assert_eq!(store.peek_queue().len(), 1);
    }

    #[tokio::test]
    async fn ignores_unmonitored_and_satisfied_upgrades() {
        let store = Arc::new(InMemoryStore::new());
        let content = Arc::new(InMemoryContentMirror::new());
        let connector = test_connector(3);
        store.seed_connector(connector.clone());
        content.seed_movie(comradarr_types::MovieMirror {
            id: MovieId::new(1),
            connector_id: connector.id,
            upstream_id: 1,
            has_file: true,
            quality_cutoff_not_met: Some(false),
            monitored: true,
        });
        content.seed_movie(comradarr_types::MovieMirror {
            id: MovieId::new(2),
            connector_id: connector.id,
            upstream_id: 2,
            has_file: false,
            quality_cutoff_not_met: None,
            monitored: false,
        });

        let service = DiscoveryService::new(store, content);
        let summary = service.run_pass(&connector, ts(0)).await.unwrap();
        assert_eq!(summary.enqueued, 0);
    }
}

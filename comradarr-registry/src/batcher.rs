//! Groups pending registry rows into connector-valid command batches
//! (`SPEC_FULL.md` §4.E).

use comradarr_core::{BatchingConfig, Command};
use comradarr_types::{EpisodeId, MovieId, RegistryId, SeasonStatistics, SeriesId};

/// `max(0, total - downloaded)`.
#[must_use]
pub const fn calculate_missing_count(total: u32, downloaded: u32) -> u32 {
    total.saturating_sub(downloaded)
}

/// `total == 0 ? 0 : floor((total - downloaded) * 100 / total)`.
#[must_use]
pub fn calculate_missing_percent(total: u32, downloaded: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    calculate_missing_count(total, downloaded) * 100 / total
}

/// `next_airing == None`.
#[must_use]
pub const fn is_season_fully_aired(next_airing: Option<chrono::DateTime<chrono::Utc>>) -> bool {
    next_airing.is_none()
}

/// Which command shape the batcher should use for one series+season group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonCommandKind {
    SeasonPack,
    EpisodeGranular,
}

/// The outcome of [`determine_batching_decision`]: a command kind plus the
/// externally-observed reason string recorded in history metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchingDecision {
    pub command: SeasonCommandKind,
    pub reason: &'static str,
}

/// Evaluates the season-pack-vs-episode-granular predicates in the order
/// the contract fixes: the first matching rule wins.
#[must_use]
pub fn determine_batching_decision(
    stats: SeasonStatistics,
    season_pack_failed: bool,
    config: &BatchingConfig,
) -> BatchingDecision {
    if season_pack_failed {
        return BatchingDecision { command: SeasonCommandKind::EpisodeGranular, reason: "season_pack_fallback" };
    }
    if !is_season_fully_aired(stats.next_airing) {
        return BatchingDecision { command: SeasonCommandKind::EpisodeGranular, reason: "season_currently_airing" };
    }
    let missing_count = calculate_missing_count(stats.total_episodes, stats.downloaded_episodes);
    if missing_count == 0 {
        return BatchingDecision { command: SeasonCommandKind::EpisodeGranular, reason: "no_missing_episodes" };
    }
    let missing_percent = calculate_missing_percent(stats.total_episodes, stats.downloaded_episodes);
    if missing_count < config.season_search_min_missing_count || missing_percent < config.season_search_min_missing_percent {
        return BatchingDecision { command: SeasonCommandKind::EpisodeGranular, reason: "below_missing_threshold" };
    }
    BatchingDecision { command: SeasonCommandKind::SeasonPack, reason: "season_fully_aired_high_missing" }
}

/// One dispatch-eligible episode row, enriched with the series/season
/// context the batcher needs but the bare `SearchRegistry` row doesn't carry.
#[derive(Debug, Clone)]
pub struct EpisodeCandidate {
    pub registry_id: RegistryId,
    pub episode_id: EpisodeId,
    pub series_id: SeriesId,
    pub season_number: u32,
    pub season_pack_failed: bool,
}

/// One dispatch-eligible movie row.
#[derive(Debug, Clone, Copy)]
pub struct MovieCandidate {
    pub registry_id: RegistryId,
    pub movie_id: MovieId,
}

/// One produced batch: the command to send plus the registry rows it covers
/// and the reason the batcher chose this shape.
#[derive(Debug, Clone)]
pub struct Batch {
    pub command: Command,
    pub registry_ids: Vec<RegistryId>,
    pub reason: &'static str,
}

/// Groups a series+season's episode candidates into outbound commands.
///
/// `stats` is the season's aggregate statistics; `max_per_search` is
/// `min(MAX_EPISODES_PER_SEARCH, profile.batch_size)`, already resolved by
/// the caller. Preserves the total item count and never mixes series.
#[must_use]
pub fn batch_season(
    series_id: SeriesId,
    season_number: u32,
    candidates: &[EpisodeCandidate],
    stats: SeasonStatistics,
    config: &BatchingConfig,
    max_per_search: u32,
) -> Vec<Batch> {
    if candidates.is_empty() {
        return Vec::new();
    }
    let season_pack_failed = candidates.iter().any(|c| c.season_pack_failed);
    let decision = determine_batching_decision(stats, season_pack_failed, config);

    match decision.command {
        SeasonCommandKind::SeasonPack => vec![Batch {
            command: Command::SeasonSearch { series_id, season_number },
            registry_ids: candidates.iter().map(|c| c.registry_id).collect(),
            reason: decision.reason,
        }],
        SeasonCommandKind::EpisodeGranular => chunk_episodes(series_id, candidates, max_per_search, decision.reason),
    }
}

fn chunk_episodes(
    series_id: SeriesId,
    candidates: &[EpisodeCandidate],
    max_per_search: u32,
    reason: &'static str,
) -> Vec<Batch> {
    let max_per_search = max_per_search.max(1) as usize;
    candidates
        .chunks(max_per_search)
        .map(|chunk| Batch {
            command: Command::EpisodeSearch {
                series_id,
                episode_ids: chunk.iter().map(|c| c.episode_id).collect(),
            },
            registry_ids: chunk.iter().map(|c| c.registry_id).collect(),
            reason,
        })
        .collect()
}

/// Splits a connector's movie candidates into batches of at most
/// `max_per_search`.
#[must_use]
pub fn batch_movies(candidates: &[MovieCandidate], max_per_search: u32) -> Vec<Batch> {
    let max_per_search = max_per_search.max(1) as usize;
    candidates
        .chunks(max_per_search)
        .map(|chunk| Batch {
            command: Command::MoviesSearch { movie_ids: chunk.iter().map(|c| c.movie_id).collect() },
            registry_ids: chunk.iter().map(|c| c.registry_id).collect(),
            reason: "movie_batch",
        })
        .collect()
}

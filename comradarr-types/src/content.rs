//! Library-mirror rows. These are populated by the out-of-scope sync/reconciliation
//! collaborator (`spec.md` §1); the control plane only reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ConnectorId, EpisodeId, MovieId, SeasonId, SeriesId};

/// One mirrored episode row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeMirror {
    pub id: EpisodeId,
    pub connector_id: ConnectorId,
    pub series_id: SeriesId,
    pub season_id: SeasonId,
    pub upstream_id: i64,
    pub has_file: bool,
    /// Tolerates both legacy shapes from `spec.md` §9 Open Question 1
    /// (`bool` and `bool | null`) via `deserialize_quality_cutoff`.
    #[serde(deserialize_with = "deserialize_quality_cutoff", default)]
    pub quality_cutoff_not_met: Option<bool>,
    pub monitored: bool,
}

/// One mirrored season row, carrying the aggregate stats the batcher needs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeasonMirror {
    pub id: SeasonId,
    pub series_id: SeriesId,
    pub season_number: u32,
    pub total_episodes: u32,
    pub downloaded_episodes: u32,
    pub next_airing: Option<DateTime<Utc>>,
}

/// One mirrored movie row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieMirror {
    pub id: MovieId,
    pub connector_id: ConnectorId,
    pub upstream_id: i64,
    pub has_file: bool,
    #[serde(deserialize_with = "deserialize_quality_cutoff", default)]
    pub quality_cutoff_not_met: Option<bool>,
    pub monitored: bool,
}

/// Accepts `true`/`false`/`null`/absent and normalizes all to `Option<bool>`.
fn deserialize_quality_cutoff<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<bool>::deserialize(deserializer)
}

/// Closed sum type identifying exactly one content row (invariant 2 in
/// `spec.md` §3), replacing the prose `(contentType, contentId)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentRef {
    Episode { episode_id: EpisodeId, season_id: SeasonId },
    Movie { movie_id: MovieId },
}

/// Aggregate season statistics consumed by the batcher (`spec.md` §4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonStatistics {
    pub total_episodes: u32,
    pub downloaded_episodes: u32,
    pub next_airing: Option<DateTime<Utc>>,
}

impl From<SeasonMirror> for SeasonStatistics {
    fn from(s: SeasonMirror) -> Self {
        Self {
            total_episodes: s.total_episodes,
            downloaded_episodes: s.downloaded_episodes,
            next_airing: s.next_airing,
        }
    }
}

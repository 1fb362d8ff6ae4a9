//! The outbound command union (`spec.md` §6, §9: "a single union type ...
//! replaces polymorphism").

use comradarr_types::{EpisodeId, MovieId, SeriesId};

/// One outbound upstream search command.
///
/// Maps 1:1 onto the `POST /api/v3/command` body's `name` field:
/// `EpisodeSearch`, `SeasonSearch`, `MoviesSearch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    EpisodeSearch { series_id: SeriesId, episode_ids: Vec<EpisodeId> },
    SeasonSearch { series_id: SeriesId, season_number: u32 },
    MoviesSearch { movie_ids: Vec<MovieId> },
}

impl Command {
    /// The upstream `command.name` value.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::EpisodeSearch { .. } => "EpisodeSearch",
            Self::SeasonSearch { .. } => "SeasonSearch",
            Self::MoviesSearch { .. } => "MoviesSearch",
        }
    }

    /// Number of registry rows this command covers, used to preserve the
    /// total item count across batching (`spec.md` §8 P-BATCH-CONSERVE).
    #[must_use]
    pub fn item_count(&self) -> usize {
        match self {
            Self::EpisodeSearch { episode_ids, .. } => episode_ids.len(),
            Self::SeasonSearch { .. } => 1,
            Self::MoviesSearch { movie_ids } => movie_ids.len(),
        }
    }
}

//! comradarr-registry
//!
//! The search registry state machine, priority scoring, and the batcher
//! that turns a connector's eligible rows into outbound command batches.

pub mod batcher;
pub mod priority;
pub mod sm;

pub use batcher::{
    batch_movies, batch_season, calculate_missing_count, calculate_missing_percent,
    determine_batching_decision, is_season_fully_aired, Batch, BatchingDecision, EpisodeCandidate,
    MovieCandidate, SeasonCommandKind,
};
pub use priority::{priority_score, PriorityInputs};
pub use sm::{apply_outcome, cooldown_for_tier, manual_reset, HistoryRecord, SearchEvent};

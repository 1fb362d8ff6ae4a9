//! comradarr-types
//!
//! Shared data model for the Comradarr search control plane: connectors,
//! throttle state, library-mirror rows, the search registry, the dispatch
//! queue, append-only history, and per-connector sync/reconnect state.
pub mod connector;
pub mod content;
pub mod history;
pub mod ids;
pub mod registry;
pub mod request_queue;
pub mod sync_state;
pub mod throttle_state;

pub use connector::{Connector, ConnectorHealth, ConnectorKind, ThrottleProfile};
pub use content::{ContentRef, EpisodeMirror, MovieMirror, SeasonMirror, SeasonStatistics};
pub use history::{Outcome, SearchHistory};
pub use ids::{
    ConnectorId, EpisodeId, MovieId, RegistryId, RequestQueueId, SearchHistoryId, SeasonId,
    SeriesId, ThrottleProfileId,
};
pub use registry::{FailureCategory, RegistryState, SearchRegistry, SearchType, MAX_ATTEMPTS, MAX_BACKLOG_TIER};
pub use request_queue::{BatchId, RequestQueue};
pub use sync_state::SyncState;
pub use throttle_state::{PauseReason, ThrottleState};

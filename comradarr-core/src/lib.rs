//! comradarr-core
//!
//! Shared traits, error taxonomy, configuration, and pure time/backoff
//! utilities used by every crate in the Comradarr search control plane.

pub mod cancel;
pub mod command;
pub mod config;
pub mod connector;
pub mod content_reader;
pub mod error;
pub mod pagination;
pub mod retry;
pub mod store;
pub mod time;

pub use cancel::{CancelGuard, CancellationToken};
pub use command::Command;
pub use config::{BatchingConfig, Config, ConfigError, ReconnectConfig, SyncHealthConfig, SyncRetryConfig};
pub use connector::{
    CommandStatus, ConnectorClient, HealthEntry, HealthEntryType, LenientPage, Page,
    QualityDefinition, QualityModel, QualitySource, SearchOutcome, SystemStatus, WantedEpisode,
    WantedMovie,
};
pub use content_reader::ContentMirrorReader;
pub use error::{ComradarrError, UpstreamError, UpstreamErrorKind};
pub use pagination::{fetch_all, fetch_all_lenient, DEFAULT_PAGE_SIZE};
pub use retry::request_with_retry;
pub use store::{RegistryOutcomeUpdate, SlotOutcome, Store, StoreError};
pub use time::BackoffShape;

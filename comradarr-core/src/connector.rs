//! The connector client abstraction (`spec.md` §4.B, §9).
//!
//! One `ConnectorClient` implementation per `ConnectorKind`, built by a
//! factory over the kind rather than a base-class hierarchy. Shared
//! retry/pagination logic lives in free functions (`retry`, `fetch_all`)
//! parameterized by config, not in a base implementation.

use async_trait::async_trait;
use comradarr_types::{ConnectorKind, EpisodeId, MovieId, SeasonId, SeriesId};
use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::UpstreamError;

/// Response shape of `GET /api/v3/system/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemStatus {
    #[serde(alias = "appName")]
    pub app_name: String,
    pub version: String,
}

/// One entry of `GET /api/v3/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthEntryType {
    Ok,
    Notice,
    Warning,
    Error,
}

/// One entry of `GET /api/v3/health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthEntry {
    pub source: String,
    #[serde(rename = "type")]
    pub entry_type: HealthEntryType,
    pub message: String,
}

impl HealthEntry {
    /// Whether this entry should count as a reportable error for reconnect purposes.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.entry_type == HealthEntryType::Error
    }
}

/// A wanted item as returned by `…/wanted/missing` or `…/wanted/cutoff`.
#[derive(Debug, Clone, Deserialize)]
pub struct WantedEpisode {
    pub episode_id: EpisodeId,
    pub series_id: SeriesId,
    pub season_id: SeasonId,
}

/// A wanted item as returned by a movie connector's wanted endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct WantedMovie {
    pub movie_id: MovieId,
}

/// Status of a previously-issued upstream command, from `GET /api/v3/command/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandStatus {
    pub id: i64,
    pub status: String,
}

/// The outcome of submitting a [`Command`] to an upstream connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Success,
    NoResults,
}

/// Typed HTTP client for a single connector instance.
///
/// Implementations speak the shared upstream API shape described in
/// `spec.md` §6: `X-Api-Key` auth, `Content-Type`/`Accept` JSON, a
/// configurable timeout, and the error-kind mapping table in §4.B.
#[async_trait]
pub trait ConnectorClient: Send + Sync {
    /// `GET /ping`, unauthenticated, plain-text response. `Ok(true)` iff the
    /// connector answered; `Ok(false)` is never returned — failures are errors.
    async fn ping(&self) -> Result<(), UpstreamError>;

    /// `GET /api/v3/system/status`.
    async fn system_status(&self) -> Result<SystemStatus, UpstreamError>;

    /// `GET /api/v3/health`.
    async fn health(&self) -> Result<Vec<HealthEntry>, UpstreamError>;

    /// `POST /api/v3/command`. Translates the upstream response into a
    /// success/no-results classification; any upstream HTTP fault is
    /// returned as an [`UpstreamError`] per the §4.B table.
    async fn send_search(&self, command: &Command) -> Result<SearchOutcome, UpstreamError>;

    /// `GET /api/v3/command/{id}`.
    async fn get_command(&self, id: i64) -> Result<CommandStatus, UpstreamError>;

    /// The kind this client was built for.
    fn kind(&self) -> ConnectorKind;
}

/// Lenient-mode pagination result: valid records plus a count of records that
/// failed schema validation and were skipped (`spec.md` §4.B, §7).
#[derive(Debug, Clone, Default, Serialize)]
pub struct LenientPage<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

/// One page of a paginated upstream envelope
/// (`{page, pageSize, sortKey, sortDirection, totalRecords, records[]}`).
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub total_records: usize,
}

/// The resolution/source pair a release was encoded at, as embedded in a
/// wanted-episode/movie record's `quality` field. Never constructed from
/// raw upstream input without going through `serde` — unknown fields are
/// ignored, not rejected (`spec.md` §4.B).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityDefinition {
    pub id: i32,
    pub resolution: u32,
    #[serde(default)]
    pub source: QualitySource,
}

/// Coarse encode source, used alongside resolution to rank qualities against
/// a profile's cutoff. Unrecognized values fall back to `Unknown` rather than
/// failing the parse, per the "never throws" parser contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualitySource {
    Television,
    Web,
    Bluray,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A single release's quality plus revision metadata
/// (`spec.md` §4.B "quality … parsing"; `spec.md` §8 P-QUALITY-ROUNDTRIP).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityModel {
    pub quality: QualityDefinition,
    pub revision_version: u32,
    #[serde(default)]
    pub is_repack: bool,
}

//! Read-only access to the library-mirror rows populated by the
//! out-of-scope sync/reconciliation collaborator (`SPEC_FULL.md` §1, §9).
//!
//! The control plane never writes these rows; this trait is the provider
//! seam so the dispatcher and batcher can read them without depending on
//! whatever reconciliation mechanism populates them.

use async_trait::async_trait;
use comradarr_types::{EpisodeId, EpisodeMirror, MovieId, MovieMirror, SeasonId, SeasonMirror};

use crate::error::ComradarrError;

use comradarr_types::ConnectorId;

#[async_trait]
pub trait ContentMirrorReader: Send + Sync {
    async fn get_episode(&self, id: EpisodeId) -> Result<Option<EpisodeMirror>, ComradarrError>;
    async fn get_season(&self, id: SeasonId) -> Result<Option<SeasonMirror>, ComradarrError>;
    async fn get_movie(&self, id: MovieId) -> Result<Option<MovieMirror>, ComradarrError>;

    /// Every mirrored episode for `connector_id`, for gap/upgrade discovery
    /// (the search registry's "enqueue (selector pass)", `SPEC_FULL.md` §4.D).
    async fn list_episodes(&self, connector_id: ConnectorId) -> Result<Vec<EpisodeMirror>, ComradarrError>;

    /// Every mirrored movie for `connector_id`, same purpose as [`Self::list_episodes`].
    async fn list_movies(&self, connector_id: ConnectorId) -> Result<Vec<MovieMirror>, ComradarrError>;
}

#[async_trait]
impl<T: ContentMirrorReader + ?Sized> ContentMirrorReader for std::sync::Arc<T> {
    async fn get_episode(&self, id: EpisodeId) -> Result<Option<EpisodeMirror>, ComradarrError> {
        (**self).get_episode(id).await
    }
    async fn get_season(&self, id: SeasonId) -> Result<Option<SeasonMirror>, ComradarrError> {
        (**self).get_season(id).await
    }
    async fn get_movie(&self, id: MovieId) -> Result<Option<MovieMirror>, ComradarrError> {
        (**self).get_movie(id).await
    }
    async fn list_episodes(&self, connector_id: ConnectorId) -> Result<Vec<EpisodeMirror>, ComradarrError> {
        (**self).list_episodes(connector_id).await
    }
    async fn list_movies(&self, connector_id: ConnectorId) -> Result<Vec<MovieMirror>, ComradarrError> {
        (**self).list_movies(connector_id).await
    }
}

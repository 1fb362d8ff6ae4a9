//! In-memory [`ContentMirrorReader`] fixture, seeded directly by test code.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use comradarr_core::{ComradarrError, ContentMirrorReader};
use comradarr_types::{ConnectorId, EpisodeId, EpisodeMirror, MovieId, MovieMirror, SeasonId, SeasonMirror};

#[derive(Default)]
pub struct InMemoryContentMirror {
    episodes: Mutex<HashMap<EpisodeId, EpisodeMirror>>,
    seasons: Mutex<HashMap<SeasonId, SeasonMirror>>,
    movies: Mutex<HashMap<MovieId, MovieMirror>>,
}

impl InMemoryContentMirror {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_episode(&self, episode: EpisodeMirror) {
        self.episodes.lock().unwrap().insert(episode.id, episode);
    }

    pub fn seed_season(&self, season: SeasonMirror) {
        self.seasons.lock().unwrap().insert(season.id, season);
    }

    pub fn seed_movie(&self, movie: MovieMirror) {
        self.movies.lock().unwrap().insert(movie.id, movie);
    }
}

#[async_trait]
impl ContentMirrorReader for InMemoryContentMirror {
    async fn get_episode(&self, id: EpisodeId) -> Result<Option<EpisodeMirror>, ComradarrError> {
        Ok(self.episodes.lock().unwrap().get(&id).cloned())
    }

    async fn get_season(&self, id: SeasonId) -> Result<Option<SeasonMirror>, ComradarrError> {
        Ok(self.seasons.lock().unwrap().get(&id).cloned())
    }

    async fn get_movie(&self, id: MovieId) -> Result<Option<MovieMirror>, ComradarrError> {
        Ok(self.movies.lock().unwrap().get(&id).cloned())
    }

    async fn list_episodes(&self, connector_id: ConnectorId) -> Result<Vec<EpisodeMirror>, ComradarrError> {
        Ok(self
            .episodes
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.connector_id == connector_id)
            .cloned()
            .collect())
    }

    async fn list_movies(&self, connector_id: ConnectorId) -> Result<Vec<MovieMirror>, ComradarrError> {
        Ok(self
            .movies
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.connector_id == connector_id)
            .cloned()
            .collect())
    }
}

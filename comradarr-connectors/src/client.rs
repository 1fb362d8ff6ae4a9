//! The HTTP+JSON client shared by all three connector kinds.
//!
//! One concrete type rather than one impl per kind: the wire shape
//! (`X-Api-Key`, JSON bodies, `/api/v3/...` paths) is identical across
//! kinds, so `ConnectorKind` is carried as data (`self.kind`), not as a
//! distinct implementation per connector.

use std::time::Duration;

use async_trait::async_trait;
use comradarr_core::{
    request_with_retry, CommandStatus, Command, ConnectorClient, HealthEntry, Page, SearchOutcome,
    SystemStatus, UpstreamError, UpstreamErrorKind, WantedEpisode, WantedMovie,
};
use comradarr_types::ConnectorKind;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

/// Default request timeout (`SPEC_FULL.md` §4.B).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default attempt ceiling for `requestWithRetry` (`SPEC_FULL.md` §4.B);
/// counts the first try, so a retryable fault gets two retries beyond it.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// A single connector instance's HTTP client.
pub struct HttpConnectorClient {
    kind: ConnectorKind,
    base_url: Url,
    api_key: String,
    http: reqwest::Client,
}

impl HttpConnectorClient {
    /// Builds a client for one connector instance. `base_url` must parse as
    /// an absolute URL; a malformed value is a [`UpstreamErrorKind::Validation`] error.
    pub fn new(kind: ConnectorKind, base_url: &str, api_key: String, timeout: Duration) -> Result<Self, UpstreamError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| UpstreamError::new(UpstreamErrorKind::Validation, format!("invalid base_url: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::new(UpstreamErrorKind::Network, e.to_string()))?;
        Ok(Self { kind, base_url, api_key, http })
    }

    fn url(&self, path: &str) -> Result<Url, UpstreamError> {
        self.base_url
            .join(path)
            .map_err(|e| UpstreamError::new(UpstreamErrorKind::Validation, format!("invalid path {path:?}: {e}")))
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, UpstreamError> {
        let url = self.url(path)?;
        let mut builder = self
            .http
            .request(method, url)
            .header("X-Api-Key", &self.api_key)
            .header("Accept", "application/json");
        if let Some(body) = body {
            builder = builder.header("Content-Type", "application/json").json(&body);
        }

        let response = builder.send().await.map_err(|e| classify_transport_error(&e))?;
        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            return Err(classify_status(status, retry_after));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| UpstreamError::new(UpstreamErrorKind::Validation, e.to_string()))
    }

    /// `GET /api/v3/wanted/missing`-style paginated fetch, typed for episodes.
    pub async fn fetch_wanted_episodes_page(&self, page: u32, page_size: u32) -> Result<Page<WantedEpisode>, UpstreamError> {
        self.fetch_wanted_page(page, page_size).await
    }

    /// `GET /api/v3/wanted/missing`-style paginated fetch, typed for movies.
    pub async fn fetch_wanted_movies_page(&self, page: u32, page_size: u32) -> Result<Page<WantedMovie>, UpstreamError> {
        self.fetch_wanted_page(page, page_size).await
    }

    async fn fetch_wanted_page<T: DeserializeOwned>(&self, page: u32, page_size: u32) -> Result<Page<T>, UpstreamError> {
        #[derive(serde::Deserialize)]
        struct Envelope<T> {
            #[serde(default, rename = "totalRecords")]
            total_records: usize,
            #[serde(default, alias = "records")]
            records: Vec<T>,
        }
        let path = format!("/api/v3/wanted/missing?page={page}&pageSize={page_size}");
        let envelope: Envelope<T> = request_with_retry(DEFAULT_MAX_ATTEMPTS, || self.request(Method::GET, &path, None)).await?;
        Ok(Page { records: envelope.records, total_records: envelope.total_records })
    }
}

#[async_trait]
impl ConnectorClient for HttpConnectorClient {
    async fn ping(&self) -> Result<(), UpstreamError> {
        request_with_retry(DEFAULT_MAX_ATTEMPTS, || async {
            let url = self.url("/ping")?;
            let response = self.http.get(url).send().await.map_err(|e| classify_transport_error(&e))?;
            if response.status().is_success() {
                Ok(())
            } else {
                Err(classify_status(response.status(), None))
            }
        })
        .await
    }

    async fn system_status(&self) -> Result<SystemStatus, UpstreamError> {
        request_with_retry(DEFAULT_MAX_ATTEMPTS, || self.request(Method::GET, "/api/v3/system/status", None)).await
    }

    async fn health(&self) -> Result<Vec<HealthEntry>, UpstreamError> {
        request_with_retry(DEFAULT_MAX_ATTEMPTS, || self.request(Method::GET, "/api/v3/health", None)).await
    }

    async fn send_search(&self, command: &Command) -> Result<SearchOutcome, UpstreamError> {
        let body = match command {
            Command::EpisodeSearch { series_id, episode_ids } => json!({
                "name": command.name(),
                "seriesId": series_id.get(),
                "episodeIds": episode_ids.iter().map(|id| id.get()).collect::<Vec<_>>(),
            }),
            Command::SeasonSearch { series_id, season_number } => json!({
                "name": command.name(),
                "seriesId": series_id.get(),
                "seasonNumber": season_number,
            }),
            Command::MoviesSearch { movie_ids } => json!({
                "name": command.name(),
                "movieIds": movie_ids.iter().map(|id| id.get()).collect::<Vec<_>>(),
            }),
        };
        let status: CommandStatus =
            request_with_retry(DEFAULT_MAX_ATTEMPTS, || self.request(Method::POST, "/api/v3/command", Some(body.clone()))).await?;
        match status.status.as_str() {
            "failed" => Ok(SearchOutcome::NoResults),
            _ => Ok(SearchOutcome::Success),
        }
    }

    async fn get_command(&self, id: i64) -> Result<CommandStatus, UpstreamError> {
        let path = format!("/api/v3/command/{id}");
        request_with_retry(DEFAULT_MAX_ATTEMPTS, || self.request(Method::GET, &path, None)).await
    }

    fn kind(&self) -> ConnectorKind {
        self.kind
    }
}

/// Maps a non-2xx HTTP status onto the shared error taxonomy
/// (`SPEC_FULL.md` §4.B table).
fn classify_status(status: StatusCode, retry_after_seconds: Option<u64>) -> UpstreamError {
    let err = match status {
        StatusCode::UNAUTHORIZED => UpstreamError::new(UpstreamErrorKind::Authentication, "401 Unauthorized").with_status(401),
        StatusCode::NOT_FOUND => UpstreamError::new(UpstreamErrorKind::NotFound, "404 Not Found").with_status(404),
        StatusCode::TOO_MANY_REQUESTS => {
            let mut err = UpstreamError::new(UpstreamErrorKind::RateLimit, "429 Too Many Requests").with_status(429);
            if let Some(secs) = retry_after_seconds {
                err = err.with_retry_after(secs);
            }
            err
        }
        s if s.is_server_error() => {
            UpstreamError::new(UpstreamErrorKind::Server, format!("{} {}", s.as_u16(), s)).with_status(s.as_u16())
        }
        s => UpstreamError::new(UpstreamErrorKind::Validation, format!("unexpected status {s}")).with_status(s.as_u16()),
    };
    err
}

/// Maps a transport-level `reqwest::Error` onto the taxonomy: timeout,
/// TLS validation failure, or generic network fault.
fn classify_transport_error(err: &reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        return UpstreamError::new(UpstreamErrorKind::Timeout, err.to_string());
    }
    if is_tls_error(err) {
        return UpstreamError::new(UpstreamErrorKind::Ssl, err.to_string());
    }
    UpstreamError::new(UpstreamErrorKind::Network, err.to_string())
}

fn is_tls_error(err: &reqwest::Error) -> bool {
    use std::error::Error as _;
    let mut source = err.source();
    while let Some(s) = source {
        let msg = s.to_string().to_ascii_lowercase();
        if msg.contains("certificate") || msg.contains("tls") || msg.contains("ssl handshake") {
            return true;
        }
        source = s.source();
    }
    false
}

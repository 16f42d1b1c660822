//! Blocking HTTP client for the Spotify Web API.
//!
//! Uses the client-credentials flow. The access token is cached until shortly
//! before it expires, and a request rejected with 401 is repeated once with a
//! fresh token. Requests are spaced by a minimum interval.

use super::models::{
    AudioFeaturesResponse, PlaylistItemsPage, PlaylistSearchResponse, PlaylistSummary,
    TokenResponse,
};
use super::{ApiError, ApiErrorKind, CatalogApi, RawAudioFeatures, RawEntry, MAX_PAGE_SIZE};
use crate::config::Credentials;
use crate::metrics;
use crate::pipeline::CollectionRef;
use reqwest::blocking::{Client, Response};
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Tokens are treated as expired this long before the provider says so.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Connection and pacing settings for [`SpotifyClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub token_url: String,
    pub request_timeout: Duration,
    pub min_request_interval: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            min_request_interval: Duration::from_millis(100),
        }
    }
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

pub struct SpotifyClient {
    client: Client,
    credentials: Credentials,
    api_base_url: String,
    token_url: String,
    min_request_interval: Duration,
    token: Mutex<Option<CachedToken>>,
    last_request: Mutex<Option<Instant>>,
}

impl SpotifyClient {
    pub fn new(credentials: Credentials, settings: ClientSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(settings.request_timeout)
            .user_agent(format!("PlaylistTelemetry/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ApiError::new(
                    ApiErrorKind::Connection,
                    format!("Failed to create HTTP client: {}", e),
                )
            })?;

        Ok(Self {
            client,
            credentials,
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            token_url: settings.token_url,
            min_request_interval: settings.min_request_interval,
            token: Mutex::new(None),
            last_request: Mutex::new(None),
        })
    }

    fn rate_limit(&self) {
        let mut last = self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_request_interval {
                std::thread::sleep(self.min_request_interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }

    /// Returns a valid access token, fetching a new one when needed.
    ///
    /// The token lock is not held during the token request, so concurrent
    /// callers may each fetch one; the last one stored wins.
    fn access_token(&self) -> Result<String, ApiError> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let token = self.fetch_token()?;
        let access_token = token.access_token.clone();
        *self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token);
        Ok(access_token)
    }

    fn cached_token(&self) -> Option<String> {
        let guard = self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard
            .as_ref()
            .filter(|token| token.expires_at > Instant::now())
            .map(|token| token.access_token.clone())
    }

    fn invalidate_token(&self) {
        let mut guard = self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = None;
    }

    fn fetch_token(&self) -> Result<CachedToken, ApiError> {
        const ENDPOINT: &str = "token";
        debug!("Requesting client-credentials token");

        self.rate_limit();
        let started = Instant::now();
        let result = self
            .client
            .post(&self.token_url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[("grant_type", "client_credentials")])
            .send();
        let response = record_outcome(ENDPOINT, started, result)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let kind = match status {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ApiErrorKind::Unauthorized
                }
                _ => ApiErrorKind::Status,
            };
            return Err(ApiError::new(
                kind,
                format!("token request failed with status {}: {}", status, body),
            ));
        }

        let body: TokenResponse = response.json().map_err(|e| {
            ApiError::new(ApiErrorKind::Parse, format!("token parse failed: {}", e))
        })?;

        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        Ok(CachedToken {
            access_token: body.access_token,
            expires_at: Instant::now() + lifetime,
        })
    }

    /// GET a JSON document, refreshing the token once on 401.
    fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let mut refreshed = false;
        loop {
            let token = self.access_token()?;

            self.rate_limit();
            let started = Instant::now();
            let result = self
                .client
                .get(url)
                .bearer_auth(&token)
                .query(query)
                .send();
            let response = record_outcome(endpoint, started, result)?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED && !refreshed {
                warn!("Access token rejected by {}, refreshing", endpoint);
                self.invalidate_token();
                refreshed = true;
                continue;
            }
            if !status.is_success() {
                return Err(status_error(endpoint, response));
            }

            return response.json::<T>().map_err(|e| {
                ApiError::new(
                    ApiErrorKind::Parse,
                    format!("{} parse failed: {}", endpoint, e),
                )
            });
        }
    }
}

/// Record the request in metrics and map transport failures.
fn record_outcome(
    endpoint: &str,
    started: Instant,
    result: reqwest::Result<Response>,
) -> Result<Response, ApiError> {
    let elapsed = started.elapsed();
    match result {
        Ok(response) => {
            let outcome = if response.status().is_success() {
                "ok"
            } else {
                "error_status"
            };
            metrics::record_api_request(endpoint, outcome, elapsed);
            Ok(response)
        }
        Err(e) => {
            let kind = if e.is_timeout() {
                ApiErrorKind::Timeout
            } else if e.is_connect() || e.is_request() {
                ApiErrorKind::Connection
            } else {
                ApiErrorKind::Status
            };
            metrics::record_api_request(endpoint, kind.as_str(), elapsed);
            Err(ApiError::new(
                kind,
                format!("{} request failed: {}", endpoint, e),
            ))
        }
    }
}

fn status_error(endpoint: &str, response: Response) -> ApiError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().unwrap_or_default();

    let kind = match status {
        StatusCode::NOT_FOUND => ApiErrorKind::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiErrorKind::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => ApiErrorKind::RateLimited,
        _ => ApiErrorKind::Status,
    };

    let error = ApiError::new(
        kind,
        format!("{} failed with status {}: {}", endpoint, status, body),
    );
    match retry_after {
        Some(delay) => error.with_retry_after(delay),
        None => error,
    }
}

impl CatalogApi for SpotifyClient {
    fn get_collection(&self, collection_id: &str) -> Result<CollectionRef, ApiError> {
        let url = format!(
            "{}/playlists/{}",
            self.api_base_url,
            urlencoding::encode(collection_id)
        );
        let playlist: PlaylistSummary =
            self.get_json("playlist", &url, &[("fields", "id,name".to_string())])?;

        let id = if playlist.id.is_empty() {
            collection_id.to_string()
        } else {
            playlist.id
        };
        Ok(CollectionRef {
            id,
            name: playlist.name,
        })
    }

    fn search_collection(&self, query: &str) -> Result<Option<CollectionRef>, ApiError> {
        let url = format!("{}/search", self.api_base_url);
        let response: PlaylistSearchResponse = self.get_json(
            "search",
            &url,
            &[
                ("q", query.to_string()),
                ("type", "playlist".to_string()),
                ("limit", "5".to_string()),
            ],
        )?;

        Ok(response
            .playlists
            .map(|page| page.items)
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .find(|p| !p.id.is_empty())
            .map(|p| CollectionRef {
                id: p.id,
                name: p.name,
            }))
    }

    fn collection_entries(
        &self,
        collection_id: &str,
        limit: usize,
    ) -> Result<Vec<RawEntry>, ApiError> {
        let url = format!(
            "{}/playlists/{}/tracks",
            self.api_base_url,
            urlencoding::encode(collection_id)
        );
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let page: PlaylistItemsPage =
            self.get_json("playlist_tracks", &url, &[("limit", limit.to_string())])?;

        debug!(
            "Collection {} returned {} entries (total {:?})",
            collection_id,
            page.items.len(),
            page.total
        );
        Ok(page.items)
    }

    fn audio_features(&self, ids: &[String]) -> Result<Vec<Option<RawAudioFeatures>>, ApiError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let url = format!("{}/audio-features", self.api_base_url);
        let response: AudioFeaturesResponse =
            self.get_json("audio_features", &url, &[("ids", ids.join(","))])?;

        Ok(response.audio_features)
    }
}

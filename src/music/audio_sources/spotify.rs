//! Podcast catalog search against the Spotify Web API.
//!
//! Spotify episodes cannot be streamed into a voice channel, so the catalog
//! is only used to pick the episode; the playable stream is then looked up
//! by episode name through a stream search provider (normally `yt-dlp`).

use async_trait::async_trait;
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use reqwest::header;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{AudioSourceResult, CatalogSearchProvider};
use crate::music::error::ResolutionError;
use crate::music::track::Track;

const ACCOUNTS_BASE: &str = "https://accounts.spotify.com";
const API_BASE: &str = "https://api.spotify.com";

/// Authentication tokens for Spotify API
#[derive(Debug, Deserialize)]
struct SpotifyToken {
    access_token: String,
    expires_in: u64,
    #[serde(skip, default = "Instant::now")]
    created_at: Instant,
}

impl SpotifyToken {
    fn is_expired(&self) -> bool {
        let expiry = Duration::from_secs(self.expires_in);
        // Consider it expired 30 seconds before actual expiry
        self.created_at.elapsed() > expiry.saturating_sub(Duration::from_secs(30))
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    episodes: Option<EpisodePage>,
}

#[derive(Debug, Deserialize)]
struct EpisodePage {
    #[serde(default)]
    items: Vec<Option<SpotifyEpisode>>,
}

/// An episode as listed by the search endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SpotifyEpisode {
    pub name: String,
    #[serde(default)]
    pub duration_ms: u64,
}

/// Client credentials for the Spotify Web API.
#[derive(Debug, Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// `CatalogSearchProvider` that picks podcast episodes from Spotify.
pub struct SpotifyPodcastSearch {
    http: reqwest::Client,
    credentials: SpotifyCredentials,
    market: String,
    accounts_base: String,
    api_base: String,
    token: Mutex<Option<SpotifyToken>>,
    streams: Arc<dyn CatalogSearchProvider>,
}

impl SpotifyPodcastSearch {
    pub fn new(
        http: reqwest::Client,
        credentials: SpotifyCredentials,
        streams: Arc<dyn CatalogSearchProvider>,
    ) -> Self {
        Self {
            http,
            credentials,
            market: "US".to_string(),
            accounts_base: ACCOUNTS_BASE.to_string(),
            api_base: API_BASE.to_string(),
            token: Mutex::new(None),
            streams,
        }
    }

    /// Point both Spotify hosts somewhere else (used against a mock server).
    pub fn with_base_urls(mut self, accounts: &str, api: &str) -> Self {
        self.accounts_base = accounts.trim_end_matches('/').to_string();
        self.api_base = api.trim_end_matches('/').to_string();
        self
    }

    pub fn with_market(mut self, market: impl Into<String>) -> Self {
        self.market = market.into();
        self
    }

    /// Get an access token, reusing the cached one until it is about to expire.
    async fn access_token(&self) -> AudioSourceResult<String> {
        let mut token_lock = self.token.lock().await;

        if let Some(token) = token_lock.as_ref().filter(|t| !t.is_expired()) {
            return Ok(token.access_token.clone());
        }

        // Basic auth with client_id:client_secret
        let auth = BASE64_STANDARD.encode(format!(
            "{}:{}",
            self.credentials.client_id, self.credentials.client_secret
        ));

        let response = self
            .http
            .post(format!("{}/api/token", self.accounts_base))
            .header(header::AUTHORIZATION, format!("Basic {}", auth))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| {
                ResolutionError::Provider(format!("Failed to request Spotify token: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(ResolutionError::Provider(format!(
                "Spotify token request failed: {}",
                response.status()
            )));
        }

        let token = response.json::<SpotifyToken>().await.map_err(|e| {
            ResolutionError::Parse(format!("Failed to parse Spotify token: {}", e))
        })?;
        debug!("Obtained Spotify token valid for {}s", token.expires_in);

        let access_token = token.access_token.clone();
        *token_lock = Some(token);
        Ok(access_token)
    }

    /// Find the best matching episode for `text`.
    pub async fn find_episode(&self, text: &str) -> AudioSourceResult<Option<SpotifyEpisode>> {
        let token = self.access_token().await?;

        let response = self
            .http
            .get(format!("{}/v1/search", self.api_base))
            .bearer_auth(token)
            .query(&[
                ("q", text),
                ("type", "episode"),
                ("limit", "1"),
                ("market", self.market.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ResolutionError::Provider(format!("Spotify search failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ResolutionError::Provider(format!(
                "Spotify search failed: {}",
                response.status()
            )));
        }

        let results = response.json::<SearchResponse>().await.map_err(|e| {
            ResolutionError::Parse(format!("Failed to parse Spotify search: {}", e))
        })?;

        Ok(results
            .episodes
            .and_then(|page| page.items.into_iter().flatten().next()))
    }
}

#[async_trait]
impl CatalogSearchProvider for SpotifyPodcastSearch {
    async fn search(&self, text: &str) -> AudioSourceResult<Option<Track>> {
        let Some(episode) = self.find_episode(text).await? else {
            info!("No Spotify episode matches {:?}", text);
            return Ok(None);
        };
        info!("Spotify episode for {:?}: {}", text, episode.name);

        let Some(mut track) = self.streams.search(&episode.name).await? else {
            return Err(ResolutionError::NoStream(episode.name));
        };

        track.title = episode.name;
        track.source_query = text.to_string();
        if track.duration.is_none() && episode.duration_ms > 0 {
            track.duration = Some(Duration::from_millis(episode.duration_ms));
        }
        Ok(Some(track))
    }
}

//! Spectator HTTP Client
//!
//! Pure HTTP client for the observer-mode REST API. Each method performs a
//! single request; retry and pacing belong to the caller.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use super::endpoints::EndpointSet;
use super::error::SpectatorError;
use super::types::{ChunkInfo, ChunkKind, ChunkPayload, Featured, GameMetadata, GameReference};

const USER_AGENT: &str = concat!("spectate/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Spectator HTTP Client
pub struct SpectatorClient {
    host: String,
    platform: String,
    client: Client,
}

impl SpectatorClient {
    /// Create a client with the default timeout and user agent
    pub fn new(host: impl Into<String>, platform: impl Into<String>) -> Result<Self, SpectatorError> {
        Self::with_options(host, platform, DEFAULT_REQUEST_TIMEOUT, USER_AGENT)
    }

    /// Create a client with an explicit request timeout and user agent
    pub fn with_options(
        host: impl Into<String>,
        platform: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, SpectatorError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| SpectatorError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            host: host.into(),
            platform: platform.into(),
            client,
        })
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Endpoints for this host and platform, no game selected yet
    #[must_use]
    pub fn endpoints(&self) -> EndpointSet {
        EndpointSet::new(&self.host, &self.platform)
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, SpectatorError> {
        tracing::trace!(url, "GET");
        let response = self.client.get(url).send().await?;
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SpectatorError> {
        let response = self.get(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SpectatorError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Fetch the featured game list
    pub async fn featured(&self) -> Result<Featured, SpectatorError> {
        self.get_json(&self.endpoints().featured_url()).await
    }

    /// Fetch the featured list and reduce each entry to a [`GameReference`]
    pub async fn list_featured_games(&self) -> Result<Vec<GameReference>, SpectatorError> {
        let featured = self.featured().await?;
        Ok(featured
            .game_list
            .iter()
            .map(|game| GameReference::from_game(game, &self.platform))
            .collect())
    }

    /// Fetch game metadata (`getGameMetaData`)
    pub async fn game_metadata(&self, endpoints: &EndpointSet) -> Result<GameMetadata, SpectatorError> {
        self.get_json(endpoints.metadata_url()).await
    }

    /// Fetch the current chunk horizon (`getLastChunkInfo`)
    pub async fn last_chunk_info(&self, endpoints: &EndpointSet) -> Result<ChunkInfo, SpectatorError> {
        self.get_json(endpoints.last_chunk_info_url()).await
    }

    /// Fetch one chunk or keyframe; the id is the endpoint token
    ///
    /// A 404 means the server has not published the id yet and is reported
    /// as [`ChunkPayload::NotYetAvailable`], not as an error.
    pub async fn chunk(
        &self,
        endpoints: &EndpointSet,
        kind: ChunkKind,
    ) -> Result<ChunkPayload, SpectatorError> {
        let url = match kind {
            ChunkKind::Data => endpoints.data_chunk_url(),
            ChunkKind::KeyFrame => endpoints.key_frame_url(),
        };

        let response = self.get(url).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(ChunkPayload::NotYetAvailable);
        }
        if !status.is_success() {
            return Err(SpectatorError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes: Bytes = response
            .bytes()
            .await
            .map_err(|e| SpectatorError::Network(e.to_string()))?;
        Ok(ChunkPayload::Ready(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::{DEFAULT_HOST, DEFAULT_PLATFORM};

    #[test]
    fn test_client_creation() {
        let client = SpectatorClient::new("http://localhost:8088", "EUW1").unwrap();
        assert_eq!(client.host(), "http://localhost:8088");
        assert_eq!(client.platform(), "EUW1");
        assert_eq!(client.endpoints().game_id(), 0);
    }

    #[test]
    fn test_default_host_client() {
        let client = SpectatorClient::new(DEFAULT_HOST, DEFAULT_PLATFORM).unwrap();
        assert_eq!(client.host(), DEFAULT_HOST);
        assert_eq!(client.platform(), DEFAULT_PLATFORM);
        assert_eq!(
            client.endpoints().featured_url(),
            format!("{DEFAULT_HOST}/observer-mode/rest/featured")
        );
    }
}

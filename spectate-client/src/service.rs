//! Spectator service interface
//!
//! The session coordinator talks to the spectator service through this
//! trait so it can be driven by the HTTP client or by a scripted mock.

use async_trait::async_trait;

use super::{
    ChunkInfo, ChunkKind, ChunkPayload, EndpointSet, GameMetadata, GameReference,
    SpectatorClient, SpectatorError,
};

#[async_trait]
pub trait SpectatorApi: Send + Sync {
    /// Endpoints for the configured host and platform, no game selected
    fn endpoints(&self) -> EndpointSet;

    async fn list_featured_games(&self) -> Result<Vec<GameReference>, SpectatorError>;

    async fn game_metadata(&self, endpoints: &EndpointSet) -> Result<GameMetadata, SpectatorError>;

    async fn last_chunk_info(&self, endpoints: &EndpointSet) -> Result<ChunkInfo, SpectatorError>;

    /// `endpoints.token()` is the id being requested
    async fn chunk(
        &self,
        endpoints: &EndpointSet,
        kind: ChunkKind,
    ) -> Result<ChunkPayload, SpectatorError>;
}

#[async_trait]
impl SpectatorApi for SpectatorClient {
    fn endpoints(&self) -> EndpointSet {
        SpectatorClient::endpoints(self)
    }

    async fn list_featured_games(&self) -> Result<Vec<GameReference>, SpectatorError> {
        SpectatorClient::list_featured_games(self).await
    }

    async fn game_metadata(&self, endpoints: &EndpointSet) -> Result<GameMetadata, SpectatorError> {
        SpectatorClient::game_metadata(self, endpoints).await
    }

    async fn last_chunk_info(&self, endpoints: &EndpointSet) -> Result<ChunkInfo, SpectatorError> {
        SpectatorClient::last_chunk_info(self, endpoints).await
    }

    async fn chunk(
        &self,
        endpoints: &EndpointSet,
        kind: ChunkKind,
    ) -> Result<ChunkPayload, SpectatorError> {
        SpectatorClient::chunk(self, endpoints, kind).await
    }
}

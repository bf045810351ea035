//! One-shot game metadata fetch

use spectate_client::{EndpointSet, GameMetadata, SpectatorApi};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{SessionError, SessionResult};
use crate::resilience::{retry_transient, RetryPolicy};

/// Fetch `getGameMetaData` once for the selected game
///
/// Transient failures are retried under `policy`; exhausting it yields
/// `SessionError::Failed`. A body that does not decode is fatal at once.
/// `Ok(None)` means the session was cancelled.
pub async fn fetch_metadata<A: SpectatorApi + ?Sized>(
    api: &A,
    endpoints: &EndpointSet,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> SessionResult<Option<GameMetadata>> {
    let metadata = match retry_transient(policy, cancel, "game metadata", || api.game_metadata(endpoints)).await {
        Ok(Some(metadata)) => metadata,
        Ok(None) => return Ok(None),
        Err(e) => return Err(SessionError::from_exhausted(e)),
    };

    info!(
        game_id = endpoints.game_id(),
        start_chunk = metadata.start_game_chunk_id,
        last_chunk = metadata.last_chunk_id,
        last_key_frame = metadata.last_key_frame_id,
        chunk_interval_ms = metadata.chunk_time_interval,
        game_ended = metadata.game_ended,
        "Fetched game metadata"
    );
    Ok(Some(metadata))
}

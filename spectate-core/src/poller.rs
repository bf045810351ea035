//! Chunk horizon polling
//!
//! `getLastChunkInfo` is polled until the game ends. Each successful poll
//! that moves the chunk or keyframe horizon reveals a contiguous run of new
//! ids, which are handed to the retriever. The poller never re-polls for a
//! failed retrieval; that is the retriever's job.
//!
//! ```text
//! Init --seed--> Polling <--> Advancing --> Done
//!                   |             |
//!                   +--> Failed <-+        (any) --> Cancelled
//! ```

use std::time::Duration;

use backon::ExponentialBackoff;
use spectate_client::{ChunkInfo, ChunkKind, EndpointSet, GameMetadata, SpectatorApi, SpectatorError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PollingConfig;
use crate::error::{SessionError, SessionResult};
use crate::resilience::sleep_or_cancel;

/// Keyframe ids start at 1; 0 means none published yet
const NO_KEY_FRAME: i64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Init,
    Polling,
    Advancing,
    Done,
    Failed,
    Cancelled,
}

/// One id to retrieve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkRequest {
    pub id: i64,
    pub kind: ChunkKind,
}

impl ChunkRequest {
    #[must_use]
    pub const fn data(id: i64) -> Self {
        Self {
            id,
            kind: ChunkKind::Data,
        }
    }

    #[must_use]
    pub const fn key_frame(id: i64) -> Self {
        Self {
            id,
            kind: ChunkKind::KeyFrame,
        }
    }
}

/// Result of one successful poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollTick {
    /// Newly revealed ids, possibly none
    Revealed(Vec<ChunkRequest>),
    Done,
    Cancelled,
}

pub struct ChunkIndexPoller {
    state: PollerState,
    endpoints: EndpointSet,
    config: PollingConfig,

    last_chunk: i64,
    last_key_frame: i64,
    chunk_time_interval: Duration,
    /// Known final chunk id, once the game is over
    end_chunk: Option<i64>,

    latest: Option<ChunkInfo>,
    /// The last advance stopped short of the horizon in `latest`
    backlog: bool,
    /// Wait before the next request: poll interval after an idle tick,
    /// backoff delay after a failure
    next_wait: Option<Duration>,
    consecutive_failures: u32,
    backoff: Option<ExponentialBackoff>,
    failure: Option<SpectatorError>,
}

impl ChunkIndexPoller {
    #[must_use]
    pub fn new(endpoints: EndpointSet, config: PollingConfig) -> Self {
        Self {
            state: PollerState::Init,
            endpoints,
            config,
            last_chunk: 0,
            last_key_frame: NO_KEY_FRAME,
            chunk_time_interval: Duration::ZERO,
            end_chunk: None,
            latest: None,
            backlog: false,
            next_wait: None,
            consecutive_failures: 0,
            backoff: None,
            failure: None,
        }
    }

    /// Seed the delivered counters from metadata and start polling
    pub fn seed(&mut self, metadata: &GameMetadata) {
        self.last_chunk = metadata.start_game_chunk_id.saturating_sub(1);
        self.last_key_frame = NO_KEY_FRAME;
        self.chunk_time_interval = Duration::from_millis(metadata.chunk_time_interval);
        if metadata.end_game_chunk_id > 0 {
            self.end_chunk = Some(metadata.end_game_chunk_id);
        } else if metadata.game_ended {
            self.end_chunk = Some(metadata.last_chunk_id);
        }
        self.state = PollerState::Polling;

        debug!(
            last_chunk = self.last_chunk,
            end_chunk = ?self.end_chunk,
            "Chunk poller seeded"
        );
    }

    #[must_use]
    pub const fn state(&self) -> PollerState {
        self.state
    }

    /// Endpoints with the token at the newest revealed chunk
    #[must_use]
    pub const fn endpoints(&self) -> &EndpointSet {
        &self.endpoints
    }

    #[must_use]
    pub const fn last_chunk_id(&self) -> i64 {
        self.last_chunk
    }

    #[must_use]
    pub const fn last_key_frame_id(&self) -> i64 {
        self.last_key_frame
    }

    #[must_use]
    pub const fn latest(&self) -> Option<&ChunkInfo> {
        self.latest.as_ref()
    }

    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Delay between polls that reveal nothing
    ///
    /// Uses the server's `nextAvailableChunk` hint when present, otherwise the
    /// chunk interval from metadata, clamped to the configured bounds.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        let hinted = self
            .latest
            .as_ref()
            .filter(|info| info.next_available_chunk > 0)
            .map_or(self.chunk_time_interval, |info| {
                Duration::from_millis(info.next_available_chunk)
            });

        let min = self.config.min_interval();
        let max = self.config.max_interval().max(min);
        hinted.max(min).min(max)
    }

    /// Ids of one kind still to reveal from the latest poll
    #[must_use]
    pub const fn has_backlog(&self) -> bool {
        self.backlog
    }

    /// Apply one poll response and return the ids it reveals
    ///
    /// At most `max_reveal_per_tick` ids of each kind are revealed; the
    /// remainder comes out of the following ticks without another poll.
    pub fn advance(&mut self, info: ChunkInfo) -> Vec<ChunkRequest> {
        self.state = PollerState::Advancing;

        if info.end_game_chunk_id > 0 {
            self.end_chunk = Some(info.end_game_chunk_id);
        }

        let step = i64::from(self.config.max_reveal_per_tick.max(1));
        let server_chunk = self
            .end_chunk
            .map_or(info.chunk_id, |end| info.chunk_id.min(end));
        let chunk_horizon = server_chunk.min(self.last_chunk.saturating_add(step));
        let key_frame_horizon = info.key_frame_id.min(self.last_key_frame.saturating_add(step));

        let mut requests = Vec::new();
        if chunk_horizon > self.last_chunk {
            requests.extend((self.last_chunk + 1..=chunk_horizon).map(ChunkRequest::data));
            self.last_chunk = chunk_horizon;
            self.endpoints = self.endpoints.with_token(chunk_horizon);
        }
        if key_frame_horizon > self.last_key_frame {
            requests.extend((self.last_key_frame + 1..=key_frame_horizon).map(ChunkRequest::key_frame));
            self.last_key_frame = key_frame_horizon;
        }

        self.backlog = chunk_horizon < server_chunk || key_frame_horizon < info.key_frame_id;
        if self.backlog {
            warn!(
                chunk = self.last_chunk,
                server_chunk,
                key_frame = self.last_key_frame,
                server_key_frame = info.key_frame_id,
                "Horizon jumped past the per-tick limit, revealing the rest over later ticks"
            );
        }

        if !requests.is_empty() {
            debug!(
                chunk = self.last_chunk,
                key_frame = self.last_key_frame,
                revealed = requests.len(),
                "Chunk horizon advanced"
            );
        }

        self.latest = Some(info);
        self.next_wait = requests.is_empty().then(|| self.poll_interval());

        self.state = match self.end_chunk {
            Some(end) if self.last_chunk >= end && !self.backlog => {
                info!(end_chunk = end, key_frame = self.last_key_frame, "Game ended, polling done");
                PollerState::Done
            }
            _ => PollerState::Polling,
        };

        requests
    }

    /// Poll until one request succeeds, the game is over, the retry ceiling
    /// is exceeded, or the token is cancelled
    pub async fn tick<A: SpectatorApi + ?Sized>(
        &mut self,
        api: &A,
        cancel: &CancellationToken,
    ) -> SessionResult<PollTick> {
        loop {
            match self.state {
                PollerState::Init => {
                    return Err(SessionError::InvalidConfig(
                        "chunk poller used before seeding".to_string(),
                    ));
                }
                PollerState::Done => return Ok(PollTick::Done),
                PollerState::Cancelled => return Ok(PollTick::Cancelled),
                PollerState::Failed => {
                    let source = self
                        .failure
                        .clone()
                        .unwrap_or_else(|| SpectatorError::Network("poller failed".to_string()));
                    return Err(SessionError::Failed { source });
                }
                PollerState::Polling | PollerState::Advancing => {}
            }

            if self.backlog {
                if cancel.is_cancelled() {
                    return Ok(self.cancelled());
                }
                if let Some(info) = self.latest.clone() {
                    return Ok(PollTick::Revealed(self.advance(info)));
                }
            }

            if let Some(wait) = self.next_wait.take() {
                if !sleep_or_cancel(wait, cancel).await {
                    return Ok(self.cancelled());
                }
            }
            if cancel.is_cancelled() {
                return Ok(self.cancelled());
            }

            let result = tokio::select! {
                r = api.last_chunk_info(&self.endpoints) => Some(r),
                () = cancel.cancelled() => None,
            };
            let Some(result) = result else {
                return Ok(self.cancelled());
            };

            match result {
                Ok(info) => {
                    self.consecutive_failures = 0;
                    self.backoff = None;
                    return Ok(PollTick::Revealed(self.advance(info)));
                }
                Err(e) if e.is_transient() => {
                    self.consecutive_failures += 1;
                    let policy = self.config.retry_policy();
                    let delay = self.backoff.get_or_insert_with(|| policy.backoff()).next();
                    match delay {
                        Some(delay) => {
                            warn!(
                                error = %e,
                                failures = self.consecutive_failures,
                                ?delay,
                                "Chunk info poll failed, backing off"
                            );
                            self.next_wait = Some(delay);
                        }
                        None => {
                            warn!(
                                error = %e,
                                failures = self.consecutive_failures,
                                "Chunk info poll exceeded its retry ceiling"
                            );
                            self.state = PollerState::Failed;
                            self.failure = Some(e.clone());
                            return Err(SessionError::Failed { source: e });
                        }
                    }
                }
                Err(e) => {
                    self.state = PollerState::Failed;
                    self.failure = Some(e.clone());
                    return Err(SessionError::Decode(e));
                }
            }
        }
    }

    fn cancelled(&mut self) -> PollTick {
        self.state = PollerState::Cancelled;
        PollTick::Cancelled
    }
}

// Scripted spectator service used by the session and retriever tests
//
// Every endpoint answers from a queue. Chunk ids without a script are
// served as `"{kind}-{id}"`. Polls repeat the last successful answer once
// their queue runs out, and fail with a network error if there never was one.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use spectate_client::{
    ChunkInfo, ChunkKind, ChunkPayload, EndpointSet, GameMetadata, GameReference, SpectatorApi,
    SpectatorError,
};
use spectate_core::{Config, Delivery};
use tokio_util::sync::CancellationToken;

pub const BASE: &str = "http://spectator.test:8088";

#[derive(Default)]
pub struct ScriptedApi {
    featured: Mutex<VecDeque<Result<Vec<GameReference>, SpectatorError>>>,
    metadata: Mutex<VecDeque<Result<GameMetadata, SpectatorError>>>,
    polls: Mutex<VecDeque<Result<ChunkInfo, SpectatorError>>>,
    last_poll: Mutex<Option<ChunkInfo>>,
    chunks: Mutex<HashMap<(ChunkKind, i64), VecDeque<Result<ChunkPayload, SpectatorError>>>>,
    delays: Mutex<HashMap<(ChunkKind, i64), Duration>>,
    cancel_after_polls: Mutex<Option<(usize, CancellationToken)>>,

    pub featured_calls: AtomicUsize,
    pub metadata_calls: AtomicUsize,
    pub poll_calls: AtomicUsize,
    chunk_calls: Mutex<HashMap<(ChunkKind, i64), usize>>,
    /// Tokens seen on poll requests, in call order
    poll_tokens: Mutex<Vec<i64>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn featured(self, games: Vec<GameReference>) -> Self {
        self.featured.lock().unwrap().push_back(Ok(games));
        self
    }

    pub fn featured_err(self, err: SpectatorError) -> Self {
        self.featured.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn metadata(self, metadata: GameMetadata) -> Self {
        self.metadata.lock().unwrap().push_back(Ok(metadata));
        self
    }

    pub fn metadata_err(self, err: SpectatorError) -> Self {
        self.metadata.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn poll(self, info: ChunkInfo) -> Self {
        self.polls.lock().unwrap().push_back(Ok(info));
        self
    }

    pub fn poll_err(self, err: SpectatorError) -> Self {
        self.polls.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn chunk(self, kind: ChunkKind, id: i64, response: Result<ChunkPayload, SpectatorError>) -> Self {
        self.chunks
            .lock()
            .unwrap()
            .entry((kind, id))
            .or_default()
            .push_back(response);
        self
    }

    pub fn chunk_repeat(
        mut self,
        kind: ChunkKind,
        id: i64,
        times: usize,
        response: Result<ChunkPayload, SpectatorError>,
    ) -> Self {
        for _ in 0..times {
            self = self.chunk(kind, id, response.clone());
        }
        self
    }

    /// Hold the response for `id` back by `delay`
    pub fn delay(self, kind: ChunkKind, id: i64, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert((kind, id), delay);
        self
    }

    /// Cancel `token` while serving the `n`th poll
    pub fn cancel_after_polls(&self, n: usize, token: CancellationToken) {
        *self.cancel_after_polls.lock().unwrap() = Some((n, token));
    }

    pub fn chunk_calls(&self, kind: ChunkKind, id: i64) -> usize {
        self.chunk_calls
            .lock()
            .unwrap()
            .get(&(kind, id))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_chunk_calls(&self) -> usize {
        self.chunk_calls.lock().unwrap().values().sum()
    }

    pub fn poll_tokens(&self) -> Vec<i64> {
        self.poll_tokens.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SpectatorApi for ScriptedApi {
    fn endpoints(&self) -> EndpointSet {
        EndpointSet::new(BASE, "NA1")
    }

    async fn list_featured_games(&self) -> Result<Vec<GameReference>, SpectatorError> {
        self.featured_calls.fetch_add(1, Ordering::SeqCst);
        self.featured
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn game_metadata(&self, _endpoints: &EndpointSet) -> Result<GameMetadata, SpectatorError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.metadata
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SpectatorError::Decode("no metadata scripted".into())))
    }

    async fn last_chunk_info(&self, endpoints: &EndpointSet) -> Result<ChunkInfo, SpectatorError> {
        let n = self.poll_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.poll_tokens.lock().unwrap().push(endpoints.token());

        if let Some((after, token)) = self.cancel_after_polls.lock().unwrap().as_ref() {
            if n >= *after {
                token.cancel();
            }
        }

        let next = self.polls.lock().unwrap().pop_front();
        match next {
            Some(Ok(info)) => {
                *self.last_poll.lock().unwrap() = Some(info.clone());
                Ok(info)
            }
            Some(Err(e)) => Err(e),
            None => self
                .last_poll
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| SpectatorError::Network("connection refused".into())),
        }
    }

    async fn chunk(&self, endpoints: &EndpointSet, kind: ChunkKind) -> Result<ChunkPayload, SpectatorError> {
        let id = endpoints.token();
        *self.chunk_calls.lock().unwrap().entry((kind, id)).or_default() += 1;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = self.delays.lock().unwrap().get(&(kind, id)).copied();
        tokio::time::sleep(delay.unwrap_or(Duration::from_millis(10))).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = self
            .chunks
            .lock()
            .unwrap()
            .get_mut(&(kind, id))
            .and_then(VecDeque::pop_front);
        scripted.unwrap_or_else(|| Ok(ChunkPayload::Ready(payload(kind, id))))
    }
}

pub fn payload(kind: ChunkKind, id: i64) -> Bytes {
    Bytes::from(format!("{kind}-{id}"))
}

pub fn metadata(start: i64, chunk_interval_ms: u64) -> GameMetadata {
    serde_json::from_value(serde_json::json!({
        "gameKey": {"gameId": 42, "platformId": "NA1"},
        "startGameChunkId": start,
        "lastChunkId": 0,
        "chunkTimeInterval": chunk_interval_ms,
        "gameEnded": false,
    }))
    .unwrap()
}

pub fn info(chunk_id: i64, key_frame_id: i64) -> ChunkInfo {
    ChunkInfo {
        chunk_id,
        key_frame_id,
        ..ChunkInfo::default()
    }
}

pub fn final_info(chunk_id: i64, key_frame_id: i64) -> ChunkInfo {
    ChunkInfo {
        end_game_chunk_id: chunk_id,
        ..info(chunk_id, key_frame_id)
    }
}

/// Small delays so paused-clock tests stay quick to reason about
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.polling.min_interval_ms = 100;
    config.polling.max_interval_ms = 1_000;
    config.polling.backoff_min_ms = 10;
    config.polling.backoff_max_ms = 100;
    config.polling.max_consecutive_failures = 3;
    config.retrieval.backoff_min_ms = 10;
    config.retrieval.backoff_max_ms = 100;
    config
}

pub fn ids(deliveries: &[Delivery], kind: ChunkKind) -> Vec<i64> {
    deliveries
        .iter()
        .filter_map(|d| match d {
            Delivery::Chunk(c) if c.kind == kind => Some(c.id),
            Delivery::Gap { kind: k, id } if *k == kind => Some(*id),
            _ => None,
        })
        .collect()
}

pub fn gaps(deliveries: &[Delivery]) -> Vec<(ChunkKind, i64)> {
    deliveries
        .iter()
        .filter_map(|d| match d {
            Delivery::Gap { kind, id } => Some((*kind, *id)),
            Delivery::Chunk(_) => None,
        })
        .collect()
}

//! Spectator session coordinator
//!
//! Drives discovery, metadata, polling and retrieval for one game and
//! publishes an ordered stream of [`Delivery`] items. The coordinator is the
//! only writer of the endpoint token, the delivered counters and the reorder
//! buffers; retrieval workers only read an endpoint snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use spectate_client::{ChunkKind, EndpointSet, GameReference, SpectatorApi, SpectatorError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

use crate::config::{Config, MissingChunkPolicy};
use crate::discovery::{discover_game, FirstGame, GameSelector};
use crate::error::{SessionError, SessionResult};
use crate::metadata::fetch_metadata;
use crate::poller::{ChunkIndexPoller, ChunkRequest, PollTick};
use crate::reorder::{Delivery, ReorderBuffer};
use crate::resilience::sleep_or_cancel;
use crate::retriever::{ChunkRetriever, FetchOutcome};

const STREAM_CAPACITY: usize = 64;

/// Ordered output of a spawned session
pub type ChunkStream = ReceiverStream<Delivery>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub game_id: u64,
    pub platform: String,
    pub chunks: u64,
    pub key_frames: u64,
    pub gaps: u64,
    pub last_chunk_id: i64,
    pub last_key_frame_id: i64,
}

/// How a session ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The game ended and every id up to the final chunk was handled
    Completed(SessionSummary),
    /// Cancelled by the caller, or the stream receiver was dropped
    Cancelled,
}

/// Handle to a spawned session
pub struct SessionHandle {
    cancel: CancellationToken,
    task: JoinHandle<SessionResult<SessionOutcome>>,
}

impl SessionHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the session to finish
    pub async fn join(self) -> SessionResult<SessionOutcome> {
        self.task
            .await
            .map_err(|e| SessionError::Aborted(e.to_string()))?
    }
}

pub struct SpectatorSession<A: ?Sized> {
    api: Arc<A>,
    config: Config,
    game: Option<GameReference>,
    selector: Box<dyn GameSelector>,
    cancel: CancellationToken,
}

impl<A: SpectatorApi + ?Sized + 'static> SpectatorSession<A> {
    #[must_use]
    pub fn new(api: Arc<A>, config: Config) -> Self {
        Self {
            api,
            config,
            game: None,
            selector: Box::new(FirstGame),
            cancel: CancellationToken::new(),
        }
    }

    /// Skip discovery and follow this game
    #[must_use]
    pub fn with_game(mut self, game: GameReference) -> Self {
        self.game = Some(game);
        self
    }

    /// Choose among featured games with a custom policy
    #[must_use]
    pub fn with_selector(mut self, selector: impl GameSelector + 'static) -> Self {
        self.selector = Box::new(selector);
        self
    }

    /// Use an externally owned cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the session on a new task
    pub fn spawn(self) -> (SessionHandle, ChunkStream) {
        let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
        let cancel = self.cancel.clone();
        let task = tokio::spawn(self.run(tx));
        (SessionHandle { cancel, task }, ReceiverStream::new(rx))
    }

    /// Run the session to completion, sending deliveries to `sink`
    pub async fn run(self, sink: mpsc::Sender<Delivery>) -> SessionResult<SessionOutcome> {
        let Self {
            api,
            config,
            game,
            selector,
            cancel,
        } = self;
        let retry = config.polling.retry_policy();

        let game = match game {
            Some(game) => game,
            None => match discover_game(api.as_ref(), selector.as_ref(), &retry, &cancel).await? {
                Some(game) => game,
                None => return Ok(SessionOutcome::Cancelled),
            },
        };

        let span = tracing::info_span!("session", game_id = game.game_id, platform = %game.platform);
        run_game(api, config, game, sink, cancel).instrument(span).await
    }
}

async fn run_game<A: SpectatorApi + ?Sized>(
    api: Arc<A>,
    config: Config,
    game: GameReference,
    sink: mpsc::Sender<Delivery>,
    cancel: CancellationToken,
) -> SessionResult<SessionOutcome> {
    let endpoints = EndpointSet::derive(api.endpoints().base(), &game.platform, game.game_id, 0);

    let retry = config.polling.retry_policy();
    let Some(metadata) = fetch_metadata(api.as_ref(), &endpoints, &retry, &cancel).await? else {
        return Ok(SessionOutcome::Cancelled);
    };

    let mut poller = ChunkIndexPoller::new(endpoints, config.polling.clone());
    poller.seed(&metadata);

    let retriever = ChunkRetriever::new(Arc::clone(&api), &config.retrieval);
    let mut delivery = DeliveryState {
        data: ReorderBuffer::new(ChunkKind::Data, metadata.start_game_chunk_id),
        key_frames: ReorderBuffer::new(ChunkKind::KeyFrame, 1),
        deferred: Vec::new(),
        deferrals: HashMap::new(),
        max_deferrals: config.retrieval.max_deferrals,
        policy: config.retrieval.missing_chunk_policy,
        sink,
        summary: SessionSummary {
            game_id: game.game_id,
            platform: game.platform.clone(),
            ..SessionSummary::default()
        },
    };

    loop {
        match poller.tick(api.as_ref(), &cancel).await? {
            PollTick::Revealed(revealed) => {
                let mut batch = std::mem::take(&mut delivery.deferred);
                batch.extend(revealed);
                if batch.is_empty() {
                    continue;
                }
                let endpoints = poller.endpoints().clone();
                if delivery.retrieve(&retriever, &endpoints, batch, &cancel).await? == Flow::Cancelled {
                    return Ok(SessionOutcome::Cancelled);
                }
            }
            PollTick::Done => break,
            PollTick::Cancelled => return Ok(SessionOutcome::Cancelled),
        }
    }

    // Polling is over; ids still ahead of the server get their remaining
    // attempts one poll interval apart.
    while !delivery.deferred.is_empty() {
        if !sleep_or_cancel(poller.poll_interval(), &cancel).await {
            return Ok(SessionOutcome::Cancelled);
        }
        let batch = std::mem::take(&mut delivery.deferred);
        let endpoints = poller.endpoints().clone();
        if delivery.retrieve(&retriever, &endpoints, batch, &cancel).await? == Flow::Cancelled {
            return Ok(SessionOutcome::Cancelled);
        }
    }

    let summary = delivery.summary;
    info!(
        chunks = summary.chunks,
        key_frames = summary.key_frames,
        gaps = summary.gaps,
        "Session completed"
    );
    Ok(SessionOutcome::Completed(summary))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Cancelled,
}

struct DeliveryState {
    data: ReorderBuffer,
    key_frames: ReorderBuffer,
    /// Ids to try again on the next poll tick
    deferred: Vec<ChunkRequest>,
    deferrals: HashMap<ChunkRequest, u32>,
    max_deferrals: u32,
    policy: MissingChunkPolicy,
    sink: mpsc::Sender<Delivery>,
    summary: SessionSummary,
}

impl DeliveryState {
    async fn retrieve<A: SpectatorApi + ?Sized>(
        &mut self,
        retriever: &ChunkRetriever<A>,
        endpoints: &EndpointSet,
        mut batch: Vec<ChunkRequest>,
        cancel: &CancellationToken,
    ) -> SessionResult<Flow> {
        // deferred ids are older than newly revealed ones
        batch.sort_by_key(|r| (r.kind, r.id));
        debug!(requests = batch.len(), "Retrieving batch");

        let mut outcomes = std::pin::pin!(retriever.fetch_all(endpoints, batch, cancel));
        while let Some(outcome) = outcomes.next().await {
            if cancel.is_cancelled() {
                return Ok(Flow::Cancelled);
            }

            let kind = match outcome {
                FetchOutcome::Ready(chunk) => {
                    let kind = chunk.kind;
                    self.deferrals.remove(&ChunkRequest { id: chunk.id, kind });
                    self.buffer(kind).insert(chunk.id, chunk.bytes);
                    kind
                }
                FetchOutcome::NotYetAvailable(request) => {
                    let count = self.deferrals.entry(request).or_insert(0);
                    *count += 1;
                    if *count > self.max_deferrals {
                        self.deferrals.remove(&request);
                        self.missing(request, None)?;
                    } else {
                        debug!(id = request.id, kind = %request.kind, attempt = *count, "Not yet available, deferring");
                        self.deferred.push(request);
                    }
                    request.kind
                }
                FetchOutcome::Missing { request, error } => {
                    self.deferrals.remove(&request);
                    self.missing(request, Some(error))?;
                    request.kind
                }
                FetchOutcome::Cancelled(_) => return Ok(Flow::Cancelled),
            };

            if self.flush(kind, cancel).await == Flow::Cancelled {
                return Ok(Flow::Cancelled);
            }
        }

        Ok(Flow::Continue)
    }

    fn buffer(&mut self, kind: ChunkKind) -> &mut ReorderBuffer {
        match kind {
            ChunkKind::Data => &mut self.data,
            ChunkKind::KeyFrame => &mut self.key_frames,
        }
    }

    fn missing(&mut self, request: ChunkRequest, error: Option<SpectatorError>) -> SessionResult<()> {
        let reason = error.map_or_else(|| "never published".to_string(), |e| e.to_string());
        match self.policy {
            MissingChunkPolicy::Abort => {
                warn!(id = request.id, kind = %request.kind, %reason, "Giving up on id, aborting session");
                Err(SessionError::MissingChunk {
                    kind: request.kind,
                    id: request.id,
                })
            }
            MissingChunkPolicy::Skip => {
                warn!(id = request.id, kind = %request.kind, %reason, "Giving up on id, reporting gap");
                self.buffer(request.kind).mark_missing(request.id);
                Ok(())
            }
        }
    }

    async fn flush(&mut self, kind: ChunkKind, cancel: &CancellationToken) -> Flow {
        for delivery in self.buffer(kind).drain() {
            let counted = match &delivery {
                Delivery::Chunk(chunk) => (chunk.kind, Some(chunk.id)),
                Delivery::Gap { kind, .. } => (*kind, None),
            };

            let sent = tokio::select! {
                r = self.sink.send(delivery) => r.is_ok(),
                () = cancel.cancelled() => return Flow::Cancelled,
            };
            if !sent {
                info!("Chunk stream receiver dropped, stopping session");
                cancel.cancel();
                return Flow::Cancelled;
            }
            self.record(counted);
        }
        Flow::Continue
    }

    /// Count an item the receiver has accepted
    fn record(&mut self, (kind, id): (ChunkKind, Option<i64>)) {
        match (kind, id) {
            (ChunkKind::Data, Some(id)) => {
                self.summary.chunks += 1;
                self.summary.last_chunk_id = id;
            }
            (ChunkKind::KeyFrame, Some(id)) => {
                self.summary.key_frames += 1;
                self.summary.last_key_frame_id = id;
            }
            (_, None) => self.summary.gaps += 1,
        }
    }
}

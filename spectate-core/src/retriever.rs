//! Chunk and keyframe payload retrieval

use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};
use spectate_client::{Chunk, ChunkPayload, EndpointSet, SpectatorApi, SpectatorError};
use tokio_util::sync::CancellationToken;

use crate::config::RetrievalConfig;
use crate::poller::ChunkRequest;
use crate::resilience::{retry_transient, RetryPolicy};

#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Ready(Chunk),
    /// Server has not published the id yet; try again next poll tick
    NotYetAvailable(ChunkRequest),
    /// Transient retries exhausted, or a non-transient failure
    Missing {
        request: ChunkRequest,
        error: SpectatorError,
    },
    Cancelled(ChunkRequest),
}

pub struct ChunkRetriever<A: ?Sized> {
    api: Arc<A>,
    policy: RetryPolicy,
    workers: usize,
}

impl<A: SpectatorApi + ?Sized> ChunkRetriever<A> {
    #[must_use]
    pub fn new(api: Arc<A>, config: &RetrievalConfig) -> Self {
        Self {
            api,
            policy: config.retry_policy(),
            workers: config.workers.max(1),
        }
    }

    /// Fetch a single id, retrying transient failures
    ///
    /// `endpoints` only supplies platform and game; the token is replaced by
    /// the requested id.
    pub async fn fetch(
        &self,
        endpoints: &EndpointSet,
        request: ChunkRequest,
        cancel: &CancellationToken,
    ) -> FetchOutcome {
        let endpoints = endpoints.with_token(request.id);
        let what = format!("{} {}", request.kind, request.id);

        let result = retry_transient(&self.policy, cancel, &what, || {
            self.api.chunk(&endpoints, request.kind)
        })
        .await;

        match result {
            Ok(Some(ChunkPayload::Ready(bytes))) => {
                tracing::trace!(id = request.id, kind = %request.kind, len = bytes.len(), "Retrieved");
                FetchOutcome::Ready(Chunk {
                    id: request.id,
                    kind: request.kind,
                    bytes,
                })
            }
            Ok(Some(ChunkPayload::NotYetAvailable)) => FetchOutcome::NotYetAvailable(request),
            Ok(None) => FetchOutcome::Cancelled(request),
            Err(error) => FetchOutcome::Missing { request, error },
        }
    }

    /// Fetch a batch with at most `workers` requests in flight
    ///
    /// Outcomes arrive in completion order, not id order.
    pub fn fetch_all<'a>(
        &'a self,
        endpoints: &'a EndpointSet,
        requests: Vec<ChunkRequest>,
        cancel: &'a CancellationToken,
    ) -> impl Stream<Item = FetchOutcome> + 'a {
        stream::iter(requests)
            .map(move |request| self.fetch(endpoints, request, cancel))
            .buffer_unordered(self.workers)
    }
}

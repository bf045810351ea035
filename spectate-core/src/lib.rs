// Spectate core
//
// Session coordination on top of the spectator client:
// - Featured game discovery and selection
// - Metadata fetch and chunk horizon polling
// - Concurrent chunk/keyframe retrieval with ordered delivery
// - Configuration, logging and retry policies

pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod poller;
pub mod reorder;
pub mod resilience;
pub mod retriever;
pub mod session;

pub use config::{Config, LoggingConfig, MissingChunkPolicy, PollingConfig, RetrievalConfig, SpectatorConfig};
pub use discovery::{discover_game, select_game, FirstGame, GameSelector};
pub use error::{SessionError, SessionResult};
pub use logging::init_logging;
pub use metadata::fetch_metadata;
pub use poller::{ChunkIndexPoller, ChunkRequest, PollTick, PollerState};
pub use reorder::{Delivery, ReorderBuffer};
pub use resilience::{retry_transient, sleep_or_cancel, RetryPolicy};
pub use retriever::{ChunkRetriever, FetchOutcome};
pub use session::{ChunkStream, SessionHandle, SessionOutcome, SessionSummary, SpectatorSession};

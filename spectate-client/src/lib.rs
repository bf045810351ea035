// Spectate Client
//
// Pure HTTP client for the spectator observer-mode REST API.
// No polling or ordering logic lives here; the coordinator in spectate-core
// drives these calls.
//
// Architecture:
// - endpoints: URL derivation from (platform, game id, token)
// - types: JSON wire types and the Chunk record
// - client: reqwest-based HTTP client
// - service: SpectatorApi trait (the seam used by spectate-core and its tests)

pub mod client;
pub mod endpoints;
pub mod error;
pub mod service;
pub mod types;

pub use client::SpectatorClient;
pub use endpoints::EndpointSet;
pub use error::SpectatorError;
pub use service::SpectatorApi;
pub use types::*;

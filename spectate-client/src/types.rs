//! Spectator API Data Structures

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Featured game list (`/observer-mode/rest/featured`)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Featured {
    pub game_list: Vec<Game>,
    #[serde(default)]
    pub client_refresh_interval: u64,
}

/// A live game as listed in the featured feed
///
/// Participants and bans are passed through untouched.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub game_id: u64,
    #[serde(default)]
    pub platform_id: String,
    #[serde(default)]
    pub game_start_time: i64,
    #[serde(default)]
    pub game_length: i64,
    #[serde(default)]
    pub game_type: String,
    #[serde(default)]
    pub game_mode: String,
    #[serde(default)]
    pub map_id: i64,
    #[serde(default)]
    pub game_queue_config_id: i64,
    #[serde(default)]
    pub game_type_config_id: i64,
    #[serde(default)]
    pub observers: Observers,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub banned_champions: Vec<BannedChampion>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observers {
    #[serde(default)]
    pub encryption_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[serde(default)]
    pub team_id: i64,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub summoner_name: String,
    #[serde(default)]
    pub skin_index: i64,
    #[serde(default)]
    pub spell1_id: i64,
    #[serde(default)]
    pub spell2_id: i64,
    #[serde(default)]
    pub champion_id: i64,
    #[serde(default)]
    pub profile_icon_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannedChampion {
    #[serde(default)]
    pub pick_turn: i64,
    #[serde(default)]
    pub team_id: i64,
    #[serde(default)]
    pub champion_id: i64,
}

/// Selected game: the only part of a featured entry the session needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameReference {
    pub platform: String,
    pub game_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<String>,
}

impl GameReference {
    #[must_use]
    pub fn new(platform: impl Into<String>, game_id: u64) -> Self {
        Self {
            platform: platform.into(),
            game_id,
            encryption_key: None,
        }
    }

    /// Build a reference from a featured entry, falling back to the
    /// caller's platform when the entry does not name one.
    #[must_use]
    pub fn from_game(game: &Game, default_platform: &str) -> Self {
        let platform = if game.platform_id.is_empty() {
            default_platform.to_string()
        } else {
            game.platform_id.clone()
        };
        let encryption_key = if game.observers.encryption_key.is_empty() {
            None
        } else {
            Some(game.observers.encryption_key.clone())
        };

        Self {
            platform,
            game_id: game.game_id,
            encryption_key,
        }
    }
}

/// `getGameMetaData` response
///
/// Fetched once per game. The horizon fields describe the server state at
/// fetch time only; later progress is tracked through [`ChunkInfo`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMetadata {
    pub game_key: GameKey,
    pub start_game_chunk_id: i64,
    pub last_chunk_id: i64,
    pub chunk_time_interval: u64,
    pub game_ended: bool,
    #[serde(default)]
    pub end_game_chunk_id: i64,
    #[serde(default)]
    pub last_key_frame_id: i64,
    #[serde(default)]
    pub key_frame_time_interval: u64,
    #[serde(default)]
    pub end_startup_chunk_id: i64,
    #[serde(default)]
    pub encryption_key: String,
    #[serde(default)]
    pub decoded_encryption_key: String,
    #[serde(default)]
    pub delay_time: u64,
    #[serde(default)]
    pub game_length: i64,
    #[serde(default)]
    pub client_added_lag: u64,
    #[serde(default)]
    pub client_back_fetching_enabled: bool,
    #[serde(default)]
    pub client_back_fetching_freq: u64,
    #[serde(default)]
    pub featured_game: bool,
    #[serde(default)]
    pub interest_score: i64,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub game_server_address: String,
    #[serde(default)]
    pub create_time: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub pending_available_chunk_info: Vec<PendingChunk>,
    #[serde(default)]
    pub pending_available_key_frame_info: Vec<PendingKeyFrame>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameKey {
    pub game_id: u64,
    #[serde(default)]
    pub platform_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChunk {
    pub id: i64,
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub received_time: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingKeyFrame {
    pub id: i64,
    #[serde(default)]
    pub next_chunk_id: i64,
    #[serde(default)]
    pub received_time: String,
}

/// `getLastChunkInfo` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkInfo {
    pub chunk_id: i64,
    pub key_frame_id: i64,
    #[serde(default)]
    pub next_chunk_id: i64,
    /// Milliseconds until the server expects to publish the next chunk
    #[serde(default)]
    pub next_available_chunk: u64,
    #[serde(default)]
    pub available_since: u64,
    #[serde(default)]
    pub end_game_chunk_id: i64,
    #[serde(default)]
    pub start_game_chunk_id: i64,
    #[serde(default)]
    pub end_startup_chunk_id: i64,
    #[serde(default)]
    pub duration: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Data,
    KeyFrame,
}

impl ChunkKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Data => "chunk",
            Self::KeyFrame => "keyframe",
        }
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One retrieved chunk or keyframe, payload untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: i64,
    pub kind: ChunkKind,
    pub bytes: Bytes,
}

/// Result of a single chunk/keyframe request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkPayload {
    Ready(Bytes),
    /// The id is ahead of what the server has published
    NotYetAvailable,
}

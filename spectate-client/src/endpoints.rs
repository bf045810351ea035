//! Spectator endpoint derivation
//!
//! Every URL is a pure function of `(base, platform, game_id, token)`.
//! An `EndpointSet` is an immutable snapshot: changing the game id or the
//! token produces a new, fully re-derived value, so a caller can never read
//! a URL that disagrees with the current `(game_id, token)` pair.

/// Default spectator host (North America).
pub const DEFAULT_HOST: &str = "http://spectator.na.lol.riotgames.com:8088";

/// Default platform identifier.
pub const DEFAULT_PLATFORM: &str = "NA1";

const CONSUMER_PATH: &str = "/observer-mode/rest/consumer";
const FEATURED_PATH: &str = "/observer-mode/rest/featured";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSet {
    platform: String,
    game_id: u64,
    token: i64,
    base: String,
    consumer_root: String,
    metadata_url: String,
    last_chunk_info_url: String,
    data_chunk_url: String,
    key_frame_url: String,
}

impl EndpointSet {
    /// Derive every URL from the four inputs.
    #[must_use]
    pub fn derive(base: &str, platform: &str, game_id: u64, token: i64) -> Self {
        let base = base.trim_end_matches('/').to_string();
        let consumer_root = format!("{base}{CONSUMER_PATH}");

        Self {
            metadata_url: format!("{consumer_root}/getGameMetaData/{platform}/{game_id}/0/token"),
            last_chunk_info_url: format!(
                "{consumer_root}/getLastChunkInfo/{platform}/{game_id}/0/token"
            ),
            data_chunk_url: format!(
                "{consumer_root}/getGameDataChunk/{platform}/{game_id}/{token}/token/"
            ),
            key_frame_url: format!("{consumer_root}/getKeyFrame/{platform}/{game_id}/{token}/token/"),
            platform: platform.to_string(),
            game_id,
            token,
            base,
            consumer_root,
        }
    }

    /// Endpoints for a host and platform before any game is selected.
    #[must_use]
    pub fn new(base: &str, platform: &str) -> Self {
        Self::derive(base, platform, 0, 0)
    }

    /// Recompute every derived field for a new game id and token.
    pub fn update(&mut self, game_id: u64, token: i64) {
        *self = Self::derive(&self.base, &self.platform, game_id, token);
    }

    #[must_use]
    pub fn with_game(&self, game_id: u64) -> Self {
        Self::derive(&self.base, &self.platform, game_id, 0)
    }

    #[must_use]
    pub fn with_token(&self, token: i64) -> Self {
        Self::derive(&self.base, &self.platform, self.game_id, token)
    }

    #[must_use]
    pub fn platform(&self) -> &str {
        &self.platform
    }

    #[must_use]
    pub const fn game_id(&self) -> u64 {
        self.game_id
    }

    #[must_use]
    pub const fn token(&self) -> i64 {
        self.token
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    #[must_use]
    pub fn consumer_root(&self) -> &str {
        &self.consumer_root
    }

    #[must_use]
    pub fn featured_url(&self) -> String {
        format!("{}{FEATURED_PATH}", self.base)
    }

    #[must_use]
    pub fn metadata_url(&self) -> &str {
        &self.metadata_url
    }

    #[must_use]
    pub fn last_chunk_info_url(&self) -> &str {
        &self.last_chunk_info_url
    }

    /// Data chunk URL for the current token.
    #[must_use]
    pub fn data_chunk_url(&self) -> &str {
        &self.data_chunk_url
    }

    /// Keyframe URL for the current token.
    #[must_use]
    pub fn key_frame_url(&self) -> &str {
        &self.key_frame_url
    }
}

impl Default for EndpointSet {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PLATFORM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_urls() {
        let e = EndpointSet::derive(DEFAULT_HOST, "NA1", 42, 7);
        assert_eq!(
            e.consumer_root(),
            "http://spectator.na.lol.riotgames.com:8088/observer-mode/rest/consumer"
        );
        assert_eq!(
            e.metadata_url(),
            "http://spectator.na.lol.riotgames.com:8088/observer-mode/rest/consumer/getGameMetaData/NA1/42/0/token"
        );
        assert_eq!(
            e.last_chunk_info_url(),
            "http://spectator.na.lol.riotgames.com:8088/observer-mode/rest/consumer/getLastChunkInfo/NA1/42/0/token"
        );
        assert_eq!(
            e.data_chunk_url(),
            "http://spectator.na.lol.riotgames.com:8088/observer-mode/rest/consumer/getGameDataChunk/NA1/42/7/token/"
        );
        assert_eq!(
            e.key_frame_url(),
            "http://spectator.na.lol.riotgames.com:8088/observer-mode/rest/consumer/getKeyFrame/NA1/42/7/token/"
        );
        assert_eq!(
            e.featured_url(),
            "http://spectator.na.lol.riotgames.com:8088/observer-mode/rest/featured"
        );
    }

    #[test]
    fn test_derive_is_idempotent() {
        let a = EndpointSet::derive(DEFAULT_HOST, "EUW1", 1001, 3);
        let b = EndpointSet::derive(DEFAULT_HOST, "EUW1", 1001, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_token_change_only_moves_chunk_urls() {
        let a = EndpointSet::derive(DEFAULT_HOST, "NA1", 9, 1);
        let b = a.with_token(2);
        assert_eq!(a.metadata_url(), b.metadata_url());
        assert_eq!(a.last_chunk_info_url(), b.last_chunk_info_url());
        assert_ne!(a.data_chunk_url(), b.data_chunk_url());
        assert_ne!(a.key_frame_url(), b.key_frame_url());
        assert_eq!(b.token(), 2);
    }

    #[test]
    fn test_update_rederives_everything() {
        let mut e = EndpointSet::default();
        assert_eq!(e.game_id(), 0);

        e.update(55, 12);
        assert_eq!(e, EndpointSet::derive(DEFAULT_HOST, DEFAULT_PLATFORM, 55, 12));
        assert!(e.metadata_url().contains("/55/0/token"));
        assert!(e.data_chunk_url().ends_with("/55/12/token/"));
    }

    #[test]
    fn test_trailing_slash_in_base() {
        let e = EndpointSet::new("http://localhost:8088/", "NA1");
        assert_eq!(e.base(), "http://localhost:8088");
        assert_eq!(e.featured_url(), "http://localhost:8088/observer-mode/rest/featured");
    }

    #[test]
    fn test_with_game_resets_token() {
        let e = EndpointSet::default().with_token(9).with_game(77);
        assert_eq!(e.game_id(), 77);
        assert_eq!(e.token(), 0);
    }
}

//! Featured game discovery and selection

use spectate_client::{GameReference, SpectatorApi};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{SessionError, SessionResult};
use crate::resilience::{retry_transient, RetryPolicy};

/// Picks one game out of the featured list
pub trait GameSelector: Send + Sync {
    fn select(&self, games: &[GameReference]) -> Option<GameReference>;
}

/// Default policy: the first featured entry
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstGame;

impl GameSelector for FirstGame {
    fn select(&self, games: &[GameReference]) -> Option<GameReference> {
        games.first().cloned()
    }
}

impl<F> GameSelector for F
where
    F: Fn(&[GameReference]) -> Option<GameReference> + Send + Sync,
{
    fn select(&self, games: &[GameReference]) -> Option<GameReference> {
        self(games)
    }
}

/// Apply a selection policy; an empty list is `NoGamesAvailable`
pub fn select_game(games: &[GameReference], selector: &dyn GameSelector) -> SessionResult<GameReference> {
    if games.is_empty() {
        return Err(SessionError::NoGamesAvailable);
    }
    selector.select(games).ok_or(SessionError::NoGamesAvailable)
}

/// Fetch the featured list (with bounded retry) and select a game
///
/// `Ok(None)` means the session was cancelled.
pub async fn discover_game<A: SpectatorApi + ?Sized>(
    api: &A,
    selector: &dyn GameSelector,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> SessionResult<Option<GameReference>> {
    let games = match retry_transient(policy, cancel, "featured games", || api.list_featured_games()).await {
        Ok(Some(games)) => games,
        Ok(None) => return Ok(None),
        Err(e) => return Err(SessionError::from_exhausted(e)),
    };

    let game = select_game(&games, selector)?;
    info!(
        game_id = game.game_id,
        platform = %game.platform,
        featured = games.len(),
        "Selected featured game"
    );
    Ok(Some(game))
}

//! Automated-opponent driver.
//!
//! The calling-context policies for playing against the engine: reply with a
//! searched move while the match is live, and the paired undo that takes
//! back both the engine's reply and the human move so control returns to the
//! human side. The match state machine itself knows nothing about either
//! policy.

use crate::match_state::{MatchError, MatchState};
use crate::search;
use crate::types::chess::Move;

const MIN_DEPTH: u8 = 1;
const MAX_DEPTH: u8 = 6;
const DEFAULT_DEPTH: u8 = 2;

/// Plays one side of a match using the search engine.
#[derive(Debug, Clone)]
pub struct EngineOpponent {
    depth: u8,
}

impl EngineOpponent {
    /// Create an opponent searching `depth` plies. Out-of-range depths are
    /// clamped rather than rejected.
    #[must_use]
    pub fn new(depth: u8) -> Self {
        Self {
            depth: depth.clamp(MIN_DEPTH, MAX_DEPTH),
        }
    }

    /// The clamped search depth in use.
    #[must_use]
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Search and apply the reply for the side currently to move.
    ///
    /// Returns the move that was played, or `None` when the match is
    /// already terminal (there is nothing to reply to).
    pub fn play_reply(&self, state: &mut MatchState) -> Result<Option<Move>, MatchError> {
        if state.status().is_terminal() {
            return Ok(None);
        }
        let Some(mv) = search::best_move(state.position(), self.depth) else {
            return Ok(None);
        };
        state.apply_move(mv)?;
        tracing::debug!(%mv, depth = self.depth, "engine reply applied");
        Ok(Some(mv))
    }

    /// Take back a full exchange: the engine's reply and the human move
    /// before it. Tolerates short histories; each underlying undo on an
    /// empty history is a no-op.
    pub fn undo_exchange(&self, state: &mut MatchState) {
        state.undo();
        state.undo();
    }
}

impl Default for EngineOpponent {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH)
    }
}

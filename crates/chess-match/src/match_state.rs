//! Authoritative per-match state machine.
//!
//! A [`MatchState`] owns exactly one current position, the ordered history of
//! applied moves, and a status that is always re-derived from the oracle's
//! report on the current position. Consumers hold a reference to the one
//! owner; there is never a second writable copy of a match.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::oracle::{OracleError, Position};
use crate::types::chess::{Color, Move, Piece, Square};

/// Status of a match, derived from its current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Game on, side to move is not in check.
    InProgress,
    /// Side to move is in check but has legal moves.
    Check,
    /// Side to move is checkmated. Terminal.
    Checkmate,
    /// Side to move has no legal move and is not in check. Terminal.
    Stalemate,
    /// Drawn position (insufficient material or 50-move rule). Terminal.
    Draw,
}

impl MatchStatus {
    /// Returns true once no further moves can be applied.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Checkmate | Self::Stalemate | Self::Draw)
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress => write!(f, "in_progress"),
            Self::Check => write!(f, "check"),
            Self::Checkmate => write!(f, "checkmate"),
            Self::Stalemate => write!(f, "stalemate"),
            Self::Draw => write!(f, "draw"),
        }
    }
}

/// Errors raised by match operations.
#[derive(Debug, Error)]
pub enum MatchError {
    /// The move is not legal for the current position and side to move.
    /// The match is left unchanged.
    #[error("illegal move {mv} for the current position")]
    IllegalMove {
        /// The rejected move.
        mv: Move,
    },

    /// No further moves can be applied.
    #[error("match is already over: {status}")]
    MatchOver {
        /// The terminal status.
        status: MatchStatus,
    },

    /// The rules engine rejected an operation; the match is left at its
    /// last known-good state.
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

/// A move retained in history together with the position it was played
/// from, so undo restores the exact prior snapshot.
#[derive(Debug, Clone)]
struct PlayedMove {
    mv: Move,
    prior: Position,
}

/// One match: current position, move history, and derived status.
#[derive(Debug, Clone)]
pub struct MatchState {
    initial: Position,
    position: Position,
    history: Vec<PlayedMove>,
    status: MatchStatus,
}

impl MatchState {
    /// Start a fresh match from the standard opening position.
    #[must_use]
    pub fn new() -> Self {
        Self::from_position(Position::new())
    }

    /// Start a match from an arbitrary position.
    #[must_use]
    pub fn from_position(position: Position) -> Self {
        let status = derive_status(&position);
        Self {
            initial: position.clone(),
            position,
            history: Vec::new(),
            status,
        }
    }

    /// The current position.
    #[must_use]
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// The current status.
    #[must_use]
    pub fn status(&self) -> MatchStatus {
        self.status
    }

    /// Whose turn it is.
    #[must_use]
    pub fn turn(&self) -> Color {
        self.position.turn()
    }

    /// Whether there is anything to undo.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// The applied moves, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<Move> {
        self.history.iter().map(|p| p.mv).collect()
    }

    /// Number of applied moves.
    #[must_use]
    pub fn move_count(&self) -> usize {
        self.history.len()
    }

    /// Legal moves for the side to move.
    #[must_use]
    pub fn legal_moves(&self) -> Vec<Move> {
        self.position.legal_moves()
    }

    /// The piece standing on one square, if any, for board display.
    #[must_use]
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.position.piece_at(square)
    }

    /// Destination squares reachable from one origin square, for move-hint
    /// display.
    #[must_use]
    pub fn legal_destinations(&self, from: Square) -> Vec<Square> {
        self.position
            .legal_moves_from(from)
            .into_iter()
            .map(|m| m.to)
            .collect()
    }

    /// Validate and apply a move, returning the new status.
    ///
    /// Rejects with [`MatchError::IllegalMove`] (no state change) when the
    /// move is not among the oracle's legal moves, and with
    /// [`MatchError::MatchOver`] once the match is terminal.
    pub fn apply_move(&mut self, mv: Move) -> Result<MatchStatus, MatchError> {
        if self.status.is_terminal() {
            return Err(MatchError::MatchOver {
                status: self.status,
            });
        }
        if !self.position.legal_moves().contains(&mv) {
            return Err(MatchError::IllegalMove { mv });
        }

        let next = self.position.apply(&mv)?;
        let prior = std::mem::replace(&mut self.position, next);
        self.history.push(PlayedMove { mv, prior });
        self.status = derive_status(&self.position);
        tracing::debug!(%mv, status = %self.status, "move applied");
        Ok(self.status)
    }

    /// Undo the most recent move, restoring the exact prior position.
    ///
    /// Returns the undone move, or `None` (a no-op) when the history is
    /// empty.
    pub fn undo(&mut self) -> Option<Move> {
        let entry = self.history.pop()?;
        self.position = entry.prior;
        self.status = derive_status(&self.position);
        Some(entry.mv)
    }

    /// Discard the history and return to the match's initial position.
    pub fn reset(&mut self) {
        self.position = self.initial.clone();
        self.history.clear();
        self.status = derive_status(&self.position);
    }

    /// Replace the current position wholesale, discarding the history.
    ///
    /// This is the adoption path for remote state: the moves that produced
    /// the new position were not played locally, so there is nothing to
    /// undo afterwards.
    pub fn load_position(&mut self, position: Position) {
        self.position = position;
        self.history.clear();
        self.status = derive_status(&self.position);
    }
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive a status from the oracle's report. Checkmate is checked before
/// check: a checkmating move is never merely "check".
fn derive_status(position: &Position) -> MatchStatus {
    if position.is_checkmate() {
        MatchStatus::Checkmate
    } else if position.is_stalemate() {
        MatchStatus::Stalemate
    } else if position.is_draw() {
        MatchStatus::Draw
    } else if position.is_check() {
        MatchStatus::Check
    } else {
        MatchStatus::InProgress
    }
}

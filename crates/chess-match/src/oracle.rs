//! Rules-engine boundary.
//!
//! Every legality, termination, and serialization question routes through
//! shakmaty here; no other module inspects board internals. Applying a move
//! returns a fresh [`Position`] and leaves the original untouched, so
//! exploration never needs paired apply/undo bookkeeping.

use shakmaty::{
    fen::Fen, uci::UciMove as EngineUci, CastlingMode, Chess, EnPassantMode, Position as _,
};
use thiserror::Error;

use crate::types::chess::{Color, Move, Piece, PieceType, Square};

/// Errors raised at the rules-engine boundary.
///
/// Any of these is fatal to the operation that triggered it; the caller's
/// state stays at its last known-good value.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The serialized position could not be decoded.
    #[error("invalid FEN: {0}")]
    InvalidFen(String),

    /// The move is not legal in the given position.
    #[error("illegal move: {0}")]
    IllegalMove(Move),
}

/// A complete, immutable snapshot of game state: board configuration, side
/// to move, and castling/en-passant rights.
#[derive(Debug, Clone)]
pub struct Position {
    inner: Chess,
}

impl Position {
    /// The standard starting position.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Chess::default(),
        }
    }

    /// Decode a position from a FEN string.
    pub fn from_fen(fen: &str) -> Result<Self, OracleError> {
        let fen: Fen = fen
            .parse()
            .map_err(|e| OracleError::InvalidFen(format!("{e}")))?;
        let inner: Chess = fen
            .into_position(CastlingMode::Standard)
            .map_err(|e| OracleError::InvalidFen(format!("{e}")))?;
        Ok(Self { inner })
    }

    /// Encode this position as a FEN string.
    #[must_use]
    pub fn to_fen(&self) -> String {
        Fen::from_position(self.inner.clone(), EnPassantMode::Legal).to_string()
    }

    /// Whose turn it is to move.
    #[must_use]
    pub fn turn(&self) -> Color {
        self.inner.turn().into()
    }

    /// Whether the side to move is in check.
    #[must_use]
    pub fn is_check(&self) -> bool {
        self.inner.is_check()
    }

    /// Whether the side to move is checkmated.
    #[must_use]
    pub fn is_checkmate(&self) -> bool {
        self.inner.is_checkmate()
    }

    /// Whether the side to move has no legal move but is not in check.
    #[must_use]
    pub fn is_stalemate(&self) -> bool {
        self.inner.is_stalemate()
    }

    /// Whether the position is drawn by insufficient material or the
    /// 50-move rule.
    #[must_use]
    pub fn is_draw(&self) -> bool {
        self.inner.is_insufficient_material() || self.inner.halfmoves() >= 100
    }

    /// All legal moves for the side to move, in the engine's native
    /// enumeration order. The order is deterministic for a given position.
    #[must_use]
    pub fn legal_moves(&self) -> Vec<Move> {
        self.inner
            .legal_moves()
            .iter()
            .map(|m| from_engine_move(m))
            .collect()
    }

    /// Legal moves originating from one square.
    #[must_use]
    pub fn legal_moves_from(&self, from: Square) -> Vec<Move> {
        self.legal_moves()
            .into_iter()
            .filter(|m| m.from == from)
            .collect()
    }

    /// Apply a move, producing the resulting position. The original is left
    /// unmodified.
    pub fn apply(&self, mv: &Move) -> Result<Self, OracleError> {
        let uci: EngineUci = mv
            .to_string()
            .parse()
            .map_err(|_| OracleError::IllegalMove(*mv))?;
        let engine_move = uci
            .to_move(&self.inner)
            .map_err(|_| OracleError::IllegalMove(*mv))?;
        if !self.inner.is_legal(&engine_move) {
            return Err(OracleError::IllegalMove(*mv));
        }
        let inner = self
            .inner
            .clone()
            .play(&engine_move)
            .map_err(|_| OracleError::IllegalMove(*mv))?;
        Ok(Self { inner })
    }

    /// The piece standing on one square, if any. This is the board readout
    /// a rendering collaborator draws from.
    #[must_use]
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.inner.board().piece_at(square.into()).map(Piece::from)
    }

    /// Number of pieces of the given color and type on the board.
    #[must_use]
    pub fn piece_count(&self, color: Color, piece: PieceType) -> u32 {
        let board = self.inner.board();
        let color: shakmaty::Color = color.into();
        let role: shakmaty::Role = piece.into();
        (board.by_color(color) & board.by_role(role)).count() as u32
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert an engine move into the crate's move type, with castling in the
/// standard king-destination form.
fn from_engine_move(m: &shakmaty::Move) -> Move {
    match EngineUci::from_move(m, CastlingMode::Standard) {
        EngineUci::Normal {
            from,
            to,
            promotion,
        } => Move {
            from: from.into(),
            to: to.into(),
            promotion: promotion.map(PieceType::from),
        },
        // Null and drop moves never appear among chess legal moves.
        _ => unreachable!("legal chess moves are always normal moves"),
    }
}

//! Static position evaluation.
//!
//! A pure material count from White's perspective: positive favors White,
//! negative favors Black. The search flips the sign for the side to move.

use crate::oracle::Position;
use crate::types::chess::{Color, PieceType};

/// Material weight of a piece type, in pawns. The king carries no weight;
/// losing it is expressed through the search's mate score instead.
#[must_use]
pub const fn piece_weight(piece: PieceType) -> i32 {
    match piece {
        PieceType::Pawn => 1,
        PieceType::Knight => 3,
        PieceType::Bishop => 3,
        PieceType::Rook => 5,
        PieceType::Queen => 9,
        PieceType::King => 0,
    }
}

/// Score a position from White's perspective.
#[must_use]
pub fn score(position: &Position) -> i32 {
    let mut total = 0;
    for piece in PieceType::ALL {
        let weight = piece_weight(piece);
        total += weight * position.piece_count(Color::White, piece) as i32;
        total -= weight * position.piece_count(Color::Black, piece) as i32;
    }
    total
}

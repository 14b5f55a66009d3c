//! Adversarial move search.
//!
//! Depth-limited negamax with alpha-beta pruning over the oracle's legal-move
//! enumeration. Candidate moves are tried in enumeration order and a
//! candidate only displaces the incumbent on a strictly better score, so
//! ties resolve to the first enumerated move and results are reproducible.

use crate::evaluate;
use crate::oracle::Position;
use crate::types::chess::{Color, Move};

/// Bound that exceeds any reachable score.
pub const INF: i32 = 30_000;

/// Score assigned to a checkmated side.
pub const MATE_SCORE: i32 = 10_000;

/// Find the best move for the side to move, searching `depth` plies ahead.
///
/// Returns `None` only when the position has no legal moves. A `depth` of 0
/// is treated as 1. The input position is never modified; exploration works
/// on derived positions.
#[must_use]
pub fn best_move(position: &Position, depth: u8) -> Option<Move> {
    let depth = depth.max(1);
    let mut best: Option<(Move, i32)> = None;
    let mut alpha = -INF;

    for mv in position.legal_moves() {
        let Ok(next) = position.apply(&mv) else {
            continue;
        };
        let score = -negamax(&next, depth - 1, -INF, -alpha);
        if best.map_or(true, |(_, incumbent)| score > incumbent) {
            best = Some((mv, score));
        }
        if score > alpha {
            alpha = score;
        }
    }

    best.map(|(mv, _)| mv)
}

/// Negamax with alpha-beta bounds. The returned score is from the
/// perspective of the side to move in `position`.
fn negamax(position: &Position, depth: u8, mut alpha: i32, beta: i32) -> i32 {
    if depth == 0 {
        return relative(evaluate::score(position), position.turn());
    }

    let moves = position.legal_moves();
    if moves.is_empty() {
        // Terminal leaf: mated sides score the full mate penalty, dead
        // positions score level.
        return if position.is_checkmate() {
            -MATE_SCORE
        } else {
            0
        };
    }

    let mut best = -INF;
    for mv in moves {
        let Ok(next) = position.apply(&mv) else {
            continue;
        };
        let score = -negamax(&next, depth - 1, -beta, -alpha);
        if score > best {
            best = score;
        }
        if score > alpha {
            alpha = score;
        }
        if beta <= alpha {
            break;
        }
    }
    best
}

/// Rewrites a White-perspective score into the given side's perspective.
const fn relative(score: i32, side: Color) -> i32 {
    match side {
        Color::White => score,
        Color::Black => -score,
    }
}

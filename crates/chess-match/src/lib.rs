//! # Chess Match
//!
//! Game engine and synchronization core for a two-player chess app.
//!
//! ## Components
//!
//! - **Oracle boundary** (`oracle`): the rules engine (shakmaty) behind a
//!   narrow capability surface - legal moves, immutable apply, terminal
//!   detection, FEN round-trips
//! - **Evaluator** (`evaluate`): material score from White's perspective
//! - **Search Engine** (`search`): depth-limited negamax with alpha-beta
//!   pruning and deterministic tie-breaking
//! - **Match State Machine** (`match_state`): one match's position, history,
//!   and derived status
//! - **Automated opponent** (`opponent`): engine replies and the paired undo
//!   for human-versus-engine play
//! - **Session store** (`store`): shared-record capability with an atomic
//!   pairing update and per-record update feeds
//! - **Synchronization Coordinator** (`sync`): push-on-move, pull-on-tick/
//!   notification reconciliation where the remote record wins on mismatch
//!
//! Rendering, input handling, and the store's persistence/transport layer
//! are external collaborators and live elsewhere.

pub mod config;
pub mod evaluate;
pub mod match_state;
pub mod opponent;
pub mod oracle;
pub mod search;
pub mod store;
pub mod sync;
pub mod types;

pub use config::SyncConfig;
pub use match_state::{MatchError, MatchState, MatchStatus};
pub use opponent::EngineOpponent;
pub use oracle::{OracleError, Position};
pub use store::{MemorySessionStore, SessionEvent, SessionStore, StoreError};
pub use sync::{SyncCoordinator, SyncError, SyncPhase};
pub use types::{Color, Move, ParticipantId, Piece, PieceType, SessionId, SessionRecord, Square};

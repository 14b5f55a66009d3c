//! Shared-session types.
//!
//! A [`SessionRecord`] is the remote counterpart of one networked match: the
//! serialized current position, whose turn it is, and the pairing state of
//! the two seats. One local match mirrors at most one record at a time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chess::Color;
use super::participant::ParticipantId;

/// Unique identifier for a shared session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random session ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a session ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Pairing state of a shared session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingStatus {
    /// The host published the session and is waiting for an opponent.
    AwaitingOpponent,
    /// Both seats are filled; the match is live.
    Active,
    /// The mirrored match reached a terminal status.
    Completed,
}

impl PairingStatus {
    /// Returns true while the second seat is still open.
    #[must_use]
    pub const fn is_awaiting(&self) -> bool {
        matches!(self, Self::AwaitingOpponent)
    }

    /// Returns true once both seats are filled and the match is live.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns true once the mirrored match has ended.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for PairingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitingOpponent => write!(f, "awaiting_opponent"),
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// The remote, shared record mirroring one networked match.
///
/// `fen` and `turn` are always written together in a single store write, so
/// a reader never observes a position paired with the wrong side to move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session identifier.
    pub id: SessionId,
    /// Participant that created the session. Always set.
    pub host: ParticipantId,
    /// Second participant, set when the session is paired.
    pub opponent: Option<ParticipantId>,
    /// Pairing state of the two seats.
    pub pairing: PairingStatus,
    /// Serialized current position (FEN).
    pub fen: String,
    /// Declared side to move.
    pub turn: Color,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Create a fresh waiting session owned by `host`.
    #[must_use]
    pub fn new(id: SessionId, host: ParticipantId, fen: String, turn: Color) -> Self {
        let now = Utc::now();
        Self {
            id,
            host,
            opponent: None,
            pairing: PairingStatus::AwaitingOpponent,
            fen,
            turn,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `participant` could take the open seat: the session must be
    /// waiting, the seat empty, and the host somebody else.
    #[must_use]
    pub fn is_joinable_by(&self, participant: ParticipantId) -> bool {
        self.pairing.is_awaiting() && self.opponent.is_none() && self.host != participant
    }

    /// Returns true if `participant` holds either seat.
    #[must_use]
    pub fn has_participant(&self, participant: ParticipantId) -> bool {
        self.host == participant || self.opponent == Some(participant)
    }
}

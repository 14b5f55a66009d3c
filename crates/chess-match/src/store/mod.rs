//! Session store capability.
//!
//! The store is the one shared resource in the system. Pairing exclusivity
//! is enforced here, by [`SessionStore::try_attach`]'s conditional-update
//! semantics, rather than by any local locking: two racing attach attempts
//! resolve inside the store, and losers simply keep waiting. Everything else
//! is plain point reads/writes plus a per-record update feed.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::types::participant::ParticipantId;
use crate::types::session::{SessionId, SessionRecord};

pub use memory::MemorySessionStore;

/// Errors raised by session store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists under the given ID.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// A record already exists under the given ID.
    #[error("session {0} already exists")]
    AlreadyExists(SessionId),

    /// The store could not be reached or the operation failed in transit.
    /// Transient: callers retry on their next cycle.
    #[error("store unavailable: {reason}")]
    Unavailable {
        /// Human-readable failure description.
        reason: String,
        /// Underlying transport/storage error, when known.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Change notification delivered to a record's subscribers.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The record was written; the payload is its new value.
    Updated(SessionRecord),
}

/// Point read/write access to shared session records, plus the atomic
/// pairing update and a subscription feed.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a fresh record. Fails with [`StoreError::AlreadyExists`] if
    /// the ID is taken.
    async fn create(&self, record: SessionRecord) -> Result<(), StoreError>;

    /// Read one record by ID. `Ok(None)` when it does not exist.
    async fn get(&self, id: SessionId) -> Result<Option<SessionRecord>, StoreError>;

    /// Overwrite one record. Last write wins; writing a value identical to
    /// the stored one is a no-op and produces no notification.
    async fn put(&self, record: SessionRecord) -> Result<(), StoreError>;

    /// Find one record `participant` could join: awaiting an opponent, seat
    /// empty, hosted by somebody else. Returns the oldest such record so
    /// repeated queries are deterministic.
    async fn find_awaiting(
        &self,
        participant: ParticipantId,
    ) -> Result<Option<SessionRecord>, StoreError>;

    /// Atomically take the open seat: succeeds iff the record is still
    /// awaiting an opponent and the seat is still empty, flipping the
    /// pairing to active. Returns the updated record, or `None` when the
    /// condition no longer holds (a lost race, not an error).
    async fn try_attach(
        &self,
        id: SessionId,
        participant: ParticipantId,
    ) -> Result<Option<SessionRecord>, StoreError>;

    /// Subscribe to updates of one record. The subscription ends when the
    /// receiver is dropped.
    async fn subscribe(
        &self,
        id: SessionId,
    ) -> Result<mpsc::UnboundedReceiver<SessionEvent>, StoreError>;
}

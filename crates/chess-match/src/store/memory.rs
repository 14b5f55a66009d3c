//! In-memory session store, for local play and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::store::{SessionEvent, SessionStore, StoreError};
use crate::types::participant::ParticipantId;
use crate::types::session::{PairingStatus, SessionId, SessionRecord};

/// In-memory [`SessionStore`].
///
/// All operations complete under one interior lock, which is what makes
/// `try_attach` atomic: at most one caller can observe the seat open and
/// take it.
pub struct MemorySessionStore {
    inner: Mutex<Inner>,
}

struct Inner {
    records: HashMap<SessionId, SessionRecord>,
    /// Watchers to notify per record; pruned when a receiver is gone.
    watchers: HashMap<SessionId, Vec<mpsc::UnboundedSender<SessionEvent>>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                records: HashMap::new(),
                watchers: HashMap::new(),
            }),
        }
    }

    fn notify_watchers(inner: &mut Inner, record: &SessionRecord) {
        if let Some(watchers) = inner.watchers.get_mut(&record.id) {
            watchers.retain(|tx| tx.send(SessionEvent::Updated(record.clone())).is_ok());
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, record: SessionRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.records.contains_key(&record.id) {
            return Err(StoreError::AlreadyExists(record.id));
        }
        Self::notify_watchers(&mut inner, &record);
        inner.records.insert(record.id, record);
        Ok(())
    }

    async fn get(&self, id: SessionId) -> Result<Option<SessionRecord>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner.records.get(&id).cloned())
    }

    async fn put(&self, record: SessionRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let Some(existing) = inner.records.get(&record.id) else {
            return Err(StoreError::NotFound(record.id));
        };
        // Identical content is a no-op; do not wake watchers for it.
        if existing.fen == record.fen
            && existing.turn == record.turn
            && existing.pairing == record.pairing
            && existing.opponent == record.opponent
        {
            return Ok(());
        }
        let mut record = record;
        record.updated_at = Utc::now();
        Self::notify_watchers(&mut inner, &record);
        inner.records.insert(record.id, record);
        Ok(())
    }

    async fn find_awaiting(
        &self,
        participant: ParticipantId,
    ) -> Result<Option<SessionRecord>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .records
            .values()
            .filter(|r| r.is_joinable_by(participant))
            .min_by_key(|r| r.created_at)
            .cloned())
    }

    async fn try_attach(
        &self,
        id: SessionId,
        participant: ParticipantId,
    ) -> Result<Option<SessionRecord>, StoreError> {
        let mut inner = self.inner.lock();
        let Some(record) = inner.records.get_mut(&id) else {
            return Err(StoreError::NotFound(id));
        };
        if !record.is_joinable_by(participant) {
            return Ok(None);
        }
        record.opponent = Some(participant);
        record.pairing = PairingStatus::Active;
        record.updated_at = Utc::now();
        let updated = record.clone();
        Self::notify_watchers(&mut inner, &updated);
        Ok(Some(updated))
    }

    async fn subscribe(
        &self,
        id: SessionId,
    ) -> Result<mpsc::UnboundedReceiver<SessionEvent>, StoreError> {
        let mut inner = self.inner.lock();
        let (tx, rx) = mpsc::unbounded_channel();
        inner.watchers.entry(id).or_default().push(tx);
        Ok(rx)
    }
}

//! Remote-session synchronization.
//!
//! A [`SyncCoordinator`] mirrors one local match against one shared
//! [`SessionRecord`]: it pushes the position after every locally applied
//! move, pulls on a fixed interval and on store update notifications, and on
//! any mismatch loads the remote position into the match verbatim. The
//! remote record is the source of truth on mismatch; no merge is attempted,
//! and two near-simultaneous local moves resolve as last-write-wins at the
//! store with the other side adopting on its next pull.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::{ConfigError, SyncConfig};
use crate::match_state::MatchState;
use crate::oracle::{OracleError, Position};
use crate::store::{SessionEvent, SessionStore, StoreError};
use crate::types::participant::ParticipantId;
use crate::types::session::{PairingStatus, SessionId, SessionRecord};

/// Errors raised by synchronization operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A store operation failed. Transient; the loop retries on its next
    /// cycle.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The remote record carried a position the oracle rejects.
    #[error("remote position rejected: {0}")]
    RemotePosition(#[from] OracleError),

    /// The mirrored record no longer exists in the store.
    #[error("session {0} disappeared from the store")]
    SessionGone(SessionId),

    /// Rejected configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Where the mirrored session currently stands, as observed locally. This is
/// the produced-event surface a HUD subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Waiting for a second participant to take the open seat.
    AwaitingOpponent,
    /// Both seats filled; reconciliation is live.
    Active,
    /// The mirrored match reached a terminal status.
    Completed,
    /// The transient-failure window was exhausted; the match continues
    /// local-only.
    Degraded,
    /// Torn down by [`SyncCoordinator::shutdown`].
    Closed,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitingOpponent => write!(f, "awaiting_opponent"),
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Degraded => write!(f, "degraded"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Reconciles one match against its shared session record.
pub struct SyncCoordinator {
    store: Arc<dyn SessionStore>,
    participant: ParticipantId,
    session_id: SessionId,
    state: Arc<Mutex<MatchState>>,
    config: SyncConfig,
    cancel: CancellationToken,
    phase_tx: watch::Sender<SyncPhase>,
    /// Serializes overlapping reconciliations: the poll tick and the
    /// notification path funnel through this one gate, so a logical push or
    /// pull completes before the next one reads its effects.
    gate: Mutex<()>,
}

impl SyncCoordinator {
    /// Join a waiting session if a compatible one exists, otherwise publish
    /// a new waiting record for this participant.
    ///
    /// A pairing attempt lost to a concurrent participant is treated as "no
    /// match found": the coordinator falls back to publishing its own
    /// record and keeps waiting. It is never a fatal error.
    pub async fn start(
        store: Arc<dyn SessionStore>,
        participant: ParticipantId,
        state: Arc<Mutex<MatchState>>,
        config: SyncConfig,
    ) -> Result<Self, SyncError> {
        config.validate()?;

        let paired = match store.find_awaiting(participant).await? {
            Some(candidate) => match store.try_attach(candidate.id, participant).await {
                Ok(attached) => attached,
                // The record vanished between find and attach: same as a
                // lost race.
                Err(StoreError::NotFound(_)) => None,
                Err(e) => return Err(e.into()),
            },
            None => None,
        };

        let (session_id, phase) = match paired {
            Some(record) => {
                // The waiting host owns the starting state; adopt it.
                let position = Position::from_fen(&record.fen)?;
                state.lock().await.load_position(position);
                tracing::info!(session = %record.id, %participant, "joined waiting session");
                (record.id, SyncPhase::Active)
            }
            None => {
                let snapshot = {
                    let state = state.lock().await;
                    (state.position().to_fen(), state.turn())
                };
                let record =
                    SessionRecord::new(SessionId::new(), participant, snapshot.0, snapshot.1);
                let id = record.id;
                store.create(record).await?;
                tracing::info!(session = %id, %participant, "published waiting session");
                (id, SyncPhase::AwaitingOpponent)
            }
        };

        let (phase_tx, _) = watch::channel(phase);
        Ok(Self {
            store,
            participant,
            session_id,
            state,
            config,
            cancel: CancellationToken::new(),
            phase_tx,
            gate: Mutex::new(()),
        })
    }

    /// The mirrored session's ID.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// The local participant identity.
    #[must_use]
    pub fn participant(&self) -> ParticipantId {
        self.participant
    }

    /// The currently observed phase.
    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        *self.phase_tx.borrow()
    }

    /// Subscribe to phase changes, for HUD display.
    #[must_use]
    pub fn watch_phase(&self) -> watch::Receiver<SyncPhase> {
        self.phase_tx.subscribe()
    }

    /// Push the local position to the session record. Called after every
    /// locally applied move.
    ///
    /// Writes the serialized position and the side to move together, and
    /// flips the pairing to completed when the match went terminal. Pushing
    /// an already-synchronized position is a no-op.
    pub async fn push_local(&self) -> Result<(), SyncError> {
        let _guard = self.gate.lock().await;

        let (fen, turn, terminal) = {
            let state = self.state.lock().await;
            (
                state.position().to_fen(),
                state.turn(),
                state.status().is_terminal(),
            )
        };

        let mut record = self
            .store
            .get(self.session_id)
            .await?
            .ok_or(SyncError::SessionGone(self.session_id))?;

        let pairing = if terminal {
            PairingStatus::Completed
        } else {
            record.pairing
        };
        if record.fen == fen && record.pairing == pairing {
            return Ok(());
        }

        record.fen = fen;
        record.turn = turn;
        record.pairing = pairing;
        self.store.put(record).await?;
        tracing::debug!(session = %self.session_id, "pushed local position");

        if terminal {
            self.set_phase(SyncPhase::Completed);
        }
        Ok(())
    }

    /// Pull the session record and adopt it on mismatch.
    pub async fn reconcile(&self) -> Result<(), SyncError> {
        let _guard = self.gate.lock().await;
        let record = self
            .store
            .get(self.session_id)
            .await?
            .ok_or(SyncError::SessionGone(self.session_id))?;
        self.adopt(&record).await
    }

    /// Adopt a freshly observed record: track pairing transitions and, when
    /// the serialized positions differ, load the remote position into the
    /// match. Remote wins on mismatch; an already-applied position changes
    /// nothing. Callers hold the gate.
    async fn adopt(&self, record: &SessionRecord) -> Result<(), SyncError> {
        match record.pairing {
            PairingStatus::Active if self.phase() == SyncPhase::AwaitingOpponent => {
                tracing::info!(session = %record.id, "opponent attached, session active");
                self.set_phase(SyncPhase::Active);
            }
            PairingStatus::Completed if self.phase() != SyncPhase::Completed => {
                self.set_phase(SyncPhase::Completed);
            }
            _ => {}
        }

        let mut state = self.state.lock().await;
        if state.position().to_fen() != record.fen {
            let position = Position::from_fen(&record.fen)?;
            state.load_position(position);
            tracing::debug!(session = %record.id, "adopted remote position");
        }
        Ok(())
    }

    /// Run the reconciliation loop until shutdown, completion, or
    /// degradation.
    ///
    /// Two triggers funnel into the same guarded entry point: a fixed
    /// polling interval and the store's update notifications. Failures are
    /// logged and retried silently on the next cycle; once
    /// `max_transient_failures` consecutive failures accumulate, the match
    /// degrades to local-only play and the loop ends.
    pub async fn run(&self) {
        let mut events = match self.store.subscribe(self.session_id).await {
            Ok(rx) => Some(rx),
            Err(e) => {
                // Polling still covers reconciliation without the feed.
                tracing::warn!(error = %e, "subscription unavailable, relying on polling");
                None
            }
        };

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures: u32 = 0;

        loop {
            if matches!(
                self.phase(),
                SyncPhase::Completed | SyncPhase::Degraded | SyncPhase::Closed
            ) {
                break;
            }

            let outcome = tokio::select! {
                () = self.cancel.cancelled() => {
                    self.set_phase(SyncPhase::Closed);
                    break;
                }
                _ = ticker.tick() => self.reconcile().await,
                event = Self::next_event(&mut events) => match event {
                    Some(SessionEvent::Updated(record)) => {
                        let _guard = self.gate.lock().await;
                        self.adopt(&record).await
                    }
                    None => {
                        // Feed closed; keep polling.
                        events = None;
                        continue;
                    }
                },
            };

            match outcome {
                Ok(()) => failures = 0,
                Err(e) => {
                    failures += 1;
                    tracing::warn!(
                        session = %self.session_id,
                        error = %e,
                        failures,
                        "reconciliation failed, retrying on next cycle"
                    );
                    if failures >= self.config.max_transient_failures {
                        tracing::warn!(
                            session = %self.session_id,
                            "failure window exhausted, degrading to local-only play"
                        );
                        self.set_phase(SyncPhase::Degraded);
                    }
                }
            }
        }
        tracing::debug!(session = %self.session_id, phase = %self.phase(), "sync loop ended");
    }

    /// Stop the loop and drop the subscription. No reconciliation action is
    /// left running against a torn-down match.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Convenience for driving the loop on a background task.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    fn set_phase(&self, phase: SyncPhase) {
        self.phase_tx.send_replace(phase);
    }

    async fn next_event(
        events: &mut Option<mpsc::UnboundedReceiver<SessionEvent>>,
    ) -> Option<SessionEvent> {
        match events {
            Some(rx) => rx.recv().await,
            None => std::future::pending().await,
        }
    }
}

impl std::fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("session_id", &self.session_id)
            .field("participant", &self.participant)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

//! Integration tests for session pairing and reconciliation:
//! - Pair-or-create on coordinator start
//! - Push/pull propagation between two participants
//! - Idempotent push and pull
//! - Racing attach attempts
//! - Degradation to local-only play and teardown

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use chess_match::store::SessionEvent;
use chess_match::types::PairingStatus;
use chess_match::{
    MatchState, MemorySessionStore, Move, ParticipantId, SessionId, SessionRecord, SessionStore,
    StoreError, SyncConfig, SyncCoordinator, SyncPhase,
};

fn mv(uci: &str) -> Move {
    uci.parse().unwrap()
}

fn shared_match() -> Arc<Mutex<MatchState>> {
    Arc::new(Mutex::new(MatchState::new()))
}

fn fast_config() -> SyncConfig {
    SyncConfig {
        poll_interval: Duration::from_millis(20),
        max_transient_failures: 3,
    }
}

/// Store wrapper that can be switched to fail every operation, for the
/// transient-failure window tests.
struct FlakySessionStore {
    inner: MemorySessionStore,
    failing: AtomicBool,
}

impl FlakySessionStore {
    fn new() -> Self {
        Self {
            inner: MemorySessionStore::new(),
            failing: AtomicBool::new(false),
        }
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable {
                reason: "injected outage".to_string(),
                source: None,
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SessionStore for FlakySessionStore {
    async fn create(&self, record: SessionRecord) -> Result<(), StoreError> {
        self.check()?;
        self.inner.create(record).await
    }

    async fn get(&self, id: SessionId) -> Result<Option<SessionRecord>, StoreError> {
        self.check()?;
        self.inner.get(id).await
    }

    async fn put(&self, record: SessionRecord) -> Result<(), StoreError> {
        self.check()?;
        self.inner.put(record).await
    }

    async fn find_awaiting(
        &self,
        participant: ParticipantId,
    ) -> Result<Option<SessionRecord>, StoreError> {
        self.check()?;
        self.inner.find_awaiting(participant).await
    }

    async fn try_attach(
        &self,
        id: SessionId,
        participant: ParticipantId,
    ) -> Result<Option<SessionRecord>, StoreError> {
        self.check()?;
        self.inner.try_attach(id, participant).await
    }

    async fn subscribe(
        &self,
        id: SessionId,
    ) -> Result<mpsc::UnboundedReceiver<SessionEvent>, StoreError> {
        self.check()?;
        self.inner.subscribe(id).await
    }
}

#[tokio::test]
async fn first_participant_publishes_waiting_session() {
    let store = Arc::new(MemorySessionStore::new());
    let host = ParticipantId::new();

    let coordinator = SyncCoordinator::start(
        store.clone(),
        host,
        shared_match(),
        SyncConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(coordinator.phase(), SyncPhase::AwaitingOpponent);
    let record = store.get(coordinator.session_id()).await.unwrap().unwrap();
    assert_eq!(record.host, host);
    assert!(record.opponent.is_none());
    assert_eq!(record.pairing, PairingStatus::AwaitingOpponent);
}

#[tokio::test]
async fn second_participant_joins_the_waiting_session() {
    let store = Arc::new(MemorySessionStore::new());
    let host = ParticipantId::new();
    let guest = ParticipantId::new();

    let host_coord =
        SyncCoordinator::start(store.clone(), host, shared_match(), SyncConfig::default())
            .await
            .unwrap();

    let guest_coord =
        SyncCoordinator::start(store.clone(), guest, shared_match(), SyncConfig::default())
            .await
            .unwrap();

    assert_eq!(guest_coord.phase(), SyncPhase::Active);
    assert_eq!(guest_coord.session_id(), host_coord.session_id());

    let record = store.get(host_coord.session_id()).await.unwrap().unwrap();
    assert_eq!(record.pairing, PairingStatus::Active);
    assert_eq!(record.opponent, Some(guest));

    // The host observes the attachment on its next pull.
    host_coord.reconcile().await.unwrap();
    assert_eq!(host_coord.phase(), SyncPhase::Active);
}

#[tokio::test]
async fn participant_never_joins_their_own_session() {
    let store = Arc::new(MemorySessionStore::new());
    let participant = ParticipantId::new();

    let first = SyncCoordinator::start(
        store.clone(),
        participant,
        shared_match(),
        SyncConfig::default(),
    )
    .await
    .unwrap();
    let second = SyncCoordinator::start(
        store.clone(),
        participant,
        shared_match(),
        SyncConfig::default(),
    )
    .await
    .unwrap();

    assert_ne!(first.session_id(), second.session_id());
    assert_eq!(second.phase(), SyncPhase::AwaitingOpponent);
}

#[tokio::test]
async fn racing_guests_produce_exactly_one_attachment() {
    let store = Arc::new(MemorySessionStore::new());
    let host = ParticipantId::new();

    let host_coord =
        SyncCoordinator::start(store.clone(), host, shared_match(), SyncConfig::default())
            .await
            .unwrap();

    let (a, b) = tokio::join!(
        SyncCoordinator::start(
            store.clone(),
            ParticipantId::new(),
            shared_match(),
            SyncConfig::default(),
        ),
        SyncCoordinator::start(
            store.clone(),
            ParticipantId::new(),
            shared_match(),
            SyncConfig::default(),
        ),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    // Exactly one guest took the seat; the loser keeps waiting on a fresh
    // session of its own.
    let attached: Vec<_> = [&a, &b]
        .into_iter()
        .filter(|c| c.session_id() == host_coord.session_id())
        .collect();
    assert_eq!(attached.len(), 1);
    assert_eq!(attached[0].phase(), SyncPhase::Active);

    let loser = if a.session_id() == host_coord.session_id() {
        &b
    } else {
        &a
    };
    assert_eq!(loser.phase(), SyncPhase::AwaitingOpponent);

    let record = store.get(host_coord.session_id()).await.unwrap().unwrap();
    assert_eq!(record.pairing, PairingStatus::Active);
    assert!(record.opponent.is_some());
}

#[tokio::test]
async fn local_move_propagates_to_the_other_side() {
    let store = Arc::new(MemorySessionStore::new());
    let host_state = shared_match();
    let guest_state = shared_match();

    let host_coord = SyncCoordinator::start(
        store.clone(),
        ParticipantId::new(),
        host_state.clone(),
        SyncConfig::default(),
    )
    .await
    .unwrap();
    let guest_coord = SyncCoordinator::start(
        store.clone(),
        ParticipantId::new(),
        guest_state.clone(),
        SyncConfig::default(),
    )
    .await
    .unwrap();

    host_state.lock().await.apply_move(mv("e2e4")).unwrap();
    host_coord.push_local().await.unwrap();

    guest_coord.reconcile().await.unwrap();
    let host_fen = host_state.lock().await.position().to_fen();
    let guest_fen = guest_state.lock().await.position().to_fen();
    assert_eq!(guest_fen, host_fen);
}

#[tokio::test]
async fn push_and_pull_are_idempotent() {
    let store = Arc::new(MemorySessionStore::new());
    let state = shared_match();

    let coordinator = SyncCoordinator::start(
        store.clone(),
        ParticipantId::new(),
        state.clone(),
        SyncConfig::default(),
    )
    .await
    .unwrap();

    state.lock().await.apply_move(mv("e2e4")).unwrap();
    coordinator.push_local().await.unwrap();
    let after_first = store
        .get(coordinator.session_id())
        .await
        .unwrap()
        .unwrap();

    // Pushing the same position again changes nothing remotely.
    coordinator.push_local().await.unwrap();
    let after_second = store
        .get(coordinator.session_id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after_second, after_first);

    // Pulling an already-applied position changes nothing locally: the
    // history survives because no overwrite happens.
    coordinator.reconcile().await.unwrap();
    let state = state.lock().await;
    assert_eq!(state.move_count(), 1);
    assert_eq!(state.position().to_fen(), after_first.fen);
}

#[tokio::test]
async fn remote_wins_on_mismatch() {
    let store = Arc::new(MemorySessionStore::new());
    let state = shared_match();

    let coordinator = SyncCoordinator::start(
        store.clone(),
        ParticipantId::new(),
        state.clone(),
        SyncConfig::default(),
    )
    .await
    .unwrap();

    // Somebody else rewrites the record out from under us.
    let mut record = store.get(coordinator.session_id()).await.unwrap().unwrap();
    let remote_pos = chess_match::Position::new().apply(&mv("d2d4")).unwrap();
    record.fen = remote_pos.to_fen();
    record.turn = remote_pos.turn();
    store.put(record.clone()).await.unwrap();

    // A divergent local move loses to the remote record on pull.
    state.lock().await.apply_move(mv("e2e4")).unwrap();
    coordinator.reconcile().await.unwrap();

    let state = state.lock().await;
    assert_eq!(state.position().to_fen(), record.fen);
    assert!(!state.can_undo());
}

#[tokio::test]
async fn terminal_push_completes_the_session() {
    let store = Arc::new(MemorySessionStore::new());
    let state = Arc::new(Mutex::new(MatchState::from_position(
        chess_match::Position::from_fen("6k1/5ppp/8/8/8/8/8/R3K3 w - - 0 1").unwrap(),
    )));

    let coordinator = SyncCoordinator::start(
        store.clone(),
        ParticipantId::new(),
        state.clone(),
        SyncConfig::default(),
    )
    .await
    .unwrap();

    state.lock().await.apply_move(mv("a1a8")).unwrap();
    coordinator.push_local().await.unwrap();

    assert_eq!(coordinator.phase(), SyncPhase::Completed);
    let record = store.get(coordinator.session_id()).await.unwrap().unwrap();
    assert_eq!(record.pairing, PairingStatus::Completed);
}

#[tokio::test]
async fn notification_drives_adoption_without_waiting_for_a_tick() {
    let store = Arc::new(MemorySessionStore::new());
    let host_state = shared_match();
    let guest_state = shared_match();

    let host_coord = Arc::new(
        SyncCoordinator::start(
            store.clone(),
            ParticipantId::new(),
            host_state.clone(),
            // A long poll interval: only the notification can explain a
            // quick adoption.
            SyncConfig {
                poll_interval: Duration::from_secs(3600),
                max_transient_failures: 3,
            },
        )
        .await
        .unwrap(),
    );
    let guest_coord = SyncCoordinator::start(
        store.clone(),
        ParticipantId::new(),
        guest_state.clone(),
        SyncConfig::default(),
    )
    .await
    .unwrap();

    let mut host_phases = host_coord.watch_phase();
    let loop_handle = host_coord.clone().spawn();

    // The loop subscribes before its first pull; once the host has observed
    // the attachment (first pull done), the subscription is in place.
    tokio::time::timeout(Duration::from_secs(5), async {
        while *host_phases.borrow() != SyncPhase::Active {
            host_phases.changed().await.unwrap();
        }
    })
    .await
    .expect("host never observed the attachment");

    guest_state.lock().await.apply_move(mv("e2e4")).unwrap();
    guest_coord.push_local().await.unwrap();
    let pushed_fen = guest_state.lock().await.position().to_fen();

    let host_state_probe = host_state.clone();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if host_state_probe.lock().await.position().to_fen() == pushed_fen {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("host never adopted the pushed position");

    host_coord.shutdown();
    loop_handle.await.unwrap();
    assert_eq!(host_coord.phase(), SyncPhase::Closed);
}

#[tokio::test]
async fn persistent_store_failure_degrades_to_local_only() {
    let store = Arc::new(FlakySessionStore::new());
    let state = shared_match();

    let coordinator = Arc::new(
        SyncCoordinator::start(store.clone(), ParticipantId::new(), state.clone(), fast_config())
            .await
            .unwrap(),
    );

    store.set_failing(true);
    let mut phases = coordinator.watch_phase();
    let loop_handle = coordinator.clone().spawn();

    tokio::time::timeout(Duration::from_secs(5), async {
        while *phases.borrow() != SyncPhase::Degraded {
            phases.changed().await.unwrap();
        }
    })
    .await
    .expect("coordinator never degraded");

    loop_handle.await.unwrap();

    // Local play continues after degradation.
    store.set_failing(false);
    state.lock().await.apply_move(mv("e2e4")).unwrap();
    assert_eq!(state.lock().await.move_count(), 1);
}

#[tokio::test]
async fn shutdown_stops_the_loop() {
    let store = Arc::new(MemorySessionStore::new());
    let coordinator = Arc::new(
        SyncCoordinator::start(
            store,
            ParticipantId::new(),
            shared_match(),
            fast_config(),
        )
        .await
        .unwrap(),
    );

    let loop_handle = coordinator.clone().spawn();
    // Let it take a few ticks first.
    tokio::time::sleep(Duration::from_millis(60)).await;
    coordinator.shutdown();

    tokio::time::timeout(Duration::from_secs(5), loop_handle)
        .await
        .expect("loop did not stop after shutdown")
        .unwrap();
    assert_eq!(coordinator.phase(), SyncPhase::Closed);
}

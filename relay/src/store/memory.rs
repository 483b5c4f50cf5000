//! In-memory storage backend for telemetry-relay.

use super::{
    ActiveFull, DeltaRecord, FragmentStore, FullRecord, HandshakeStatus, StartRecord,
    StoreStats, SyncSnapshot,
};
use async_trait::async_trait;
use bytes::Bytes;
use relay_types::{FragmentId, Handshake};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Process-wide state shared by all fragments.
#[derive(Debug, Default)]
struct GlobalSyncState {
    last_full_arrival: Option<Instant>,
    signup_fragment: FragmentId,
    handshake: Handshake,
    /// Latches to true on the first start and stays there.
    handshake_received: bool,
}

impl GlobalSyncState {
    fn status(&self) -> HandshakeStatus {
        if self.handshake_received {
            HandshakeStatus::Received
        } else {
            HandshakeStatus::Missing
        }
    }
}

#[derive(Debug, Default)]
struct Fragments {
    start: HashMap<FragmentId, StartRecord>,
    /// Ordered so the active fragment is the last key.
    full: BTreeMap<FragmentId, FullRecord>,
    delta: HashMap<FragmentId, DeltaRecord>,
    sync: GlobalSyncState,
}

/// Fragment store kept entirely in process memory.
///
/// One `RwLock` guards all three maps and the global sync state, so every
/// `put_*` is atomic and [`FragmentStore::sync_snapshot`] sees a consistent
/// view. Contents are lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Fragments>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FragmentStore for MemoryStore {
    async fn put_start(&self, fragment: FragmentId, payload: Bytes, handshake: Handshake) {
        let mut guard = self.inner.write().await;
        guard.start.insert(fragment, StartRecord { payload, handshake });
        guard.sync.signup_fragment = fragment;
        guard.sync.handshake = handshake;
        guard.sync.handshake_received = true;
    }

    async fn put_full(&self, fragment: FragmentId, payload: Bytes, tick: i64) -> HandshakeStatus {
        let mut guard = self.inner.write().await;
        // Stamped under the lock so arrival order matches write order.
        let now = Instant::now();
        guard.full.insert(
            fragment,
            FullRecord {
                payload,
                arrived_at: now,
                tick,
            },
        );
        guard.sync.last_full_arrival = Some(match guard.sync.last_full_arrival {
            Some(prev) => prev.max(now),
            None => now,
        });
        guard.sync.status()
    }

    async fn put_delta(&self, fragment: FragmentId, payload: Bytes) -> HandshakeStatus {
        let mut guard = self.inner.write().await;
        guard.delta.insert(fragment, DeltaRecord { payload });
        guard.sync.status()
    }

    async fn get_start(&self, fragment: FragmentId) -> Option<StartRecord> {
        self.inner.read().await.start.get(&fragment).cloned()
    }

    async fn get_full(&self, fragment: FragmentId) -> Option<FullRecord> {
        self.inner.read().await.full.get(&fragment).cloned()
    }

    async fn get_delta(&self, fragment: FragmentId) -> Option<DeltaRecord> {
        self.inner.read().await.delta.get(&fragment).cloned()
    }

    async fn select_active_fragment(&self) -> Option<FragmentId> {
        self.inner
            .read()
            .await
            .full
            .last_key_value()
            .map(|(fragment, _)| *fragment)
    }

    async fn sync_snapshot(&self) -> SyncSnapshot {
        let guard = self.inner.read().await;
        // Storing any full also sets last_full_arrival, so both are present
        // or neither is.
        let active = guard
            .full
            .last_key_value()
            .zip(guard.sync.last_full_arrival)
            .map(|((fragment, record), last_full_arrival)| ActiveFull {
                fragment: *fragment,
                tick: record.tick,
                arrived_at: record.arrived_at,
                last_full_arrival,
            });

        SyncSnapshot {
            active,
            signup_fragment: guard.sync.signup_fragment,
            handshake: guard.sync.handshake,
        }
    }

    async fn stats(&self) -> StoreStats {
        let guard = self.inner.read().await;

        let fragments: HashSet<FragmentId> = guard
            .start
            .keys()
            .chain(guard.full.keys())
            .chain(guard.delta.keys())
            .copied()
            .collect();

        let stored_bytes = guard.start.values().map(|r| r.payload.len()).sum::<usize>()
            + guard.full.values().map(|r| r.payload.len()).sum::<usize>()
            + guard.delta.values().map(|r| r.payload.len()).sum::<usize>();

        StoreStats {
            start_fragments: guard.start.len(),
            full_fragments: guard.full.len(),
            delta_fragments: guard.delta.len(),
            fragments: fragments.len(),
            stored_bytes: stored_bytes as u64,
            handshake_received: guard.sync.handshake_received,
        }
    }
}

//! Fragment store for telemetry-relay.
//!
//! Holds, per fragment, the latest start, full and delta payloads plus the
//! process-wide sync state. Every record is replaced wholesale on write; no
//! history is kept and nothing is evicted.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use bytes::Bytes;
use relay_types::{FragmentId, Handshake};
use tokio::time::Instant;

/// Latest start submission for a fragment.
#[derive(Debug, Clone)]
pub struct StartRecord {
    /// Opaque handshake blob.
    pub payload: Bytes,
    /// Parameters supplied alongside the blob.
    pub handshake: Handshake,
}

/// Latest full snapshot for a fragment.
#[derive(Debug, Clone)]
pub struct FullRecord {
    /// Opaque snapshot blob.
    pub payload: Bytes,
    /// When the relay stored this snapshot.
    pub arrived_at: Instant,
    /// Producer-declared tick.
    pub tick: i64,
}

/// Latest delta for a fragment.
#[derive(Debug, Clone)]
pub struct DeltaRecord {
    /// Opaque delta blob.
    pub payload: Bytes,
}

/// Whether a start handshake had been accepted when a write landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStatus {
    /// A start has been stored at some point in the store's lifetime.
    Received,
    /// No start yet; the producer should resend its handshake.
    Missing,
}

/// The active fragment's full snapshot metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveFull {
    /// Fragment chosen by [`FragmentStore::select_active_fragment`].
    pub fragment: FragmentId,
    /// Tick of its full snapshot.
    pub tick: i64,
    /// When that snapshot arrived.
    pub arrived_at: Instant,
    /// Arrival of the most recent full snapshot on any fragment.
    pub last_full_arrival: Instant,
}

/// Everything a sync report needs, read under one lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSnapshot {
    /// Active fragment, if any fragment holds a full snapshot.
    pub active: Option<ActiveFull>,
    /// Fragment of the most recent start handshake.
    pub signup_fragment: FragmentId,
    /// Parameters of the most recent start handshake.
    pub handshake: Handshake,
}

/// Counts used by the health and metrics endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Fragments holding a start record.
    pub start_fragments: usize,
    /// Fragments holding a full record.
    pub full_fragments: usize,
    /// Fragments holding a delta record.
    pub delta_fragments: usize,
    /// Distinct fragments with any record.
    pub fragments: usize,
    /// Payload bytes currently held.
    pub stored_bytes: u64,
    /// Whether a start handshake has ever been accepted.
    pub handshake_received: bool,
}

/// Trait for fragment store backends.
///
/// Each method is atomic with respect to every other: readers never see a
/// record in a partially written state.
#[async_trait]
pub trait FragmentStore: Send + Sync {
    /// Store the start payload for a fragment and record its handshake.
    ///
    /// Also sets the process-wide handshake parameters and signup fragment.
    async fn put_start(&self, fragment: FragmentId, payload: Bytes, handshake: Handshake);

    /// Store a full snapshot stamped with the current time.
    ///
    /// Returns the handshake status observed in the same critical section.
    async fn put_full(&self, fragment: FragmentId, payload: Bytes, tick: i64) -> HandshakeStatus;

    /// Store a delta.
    ///
    /// Returns the handshake status observed in the same critical section.
    async fn put_delta(&self, fragment: FragmentId, payload: Bytes) -> HandshakeStatus;

    /// Get the start record for a fragment.
    async fn get_start(&self, fragment: FragmentId) -> Option<StartRecord>;

    /// Get the full record for a fragment.
    async fn get_full(&self, fragment: FragmentId) -> Option<FullRecord>;

    /// Get the delta record for a fragment.
    async fn get_delta(&self, fragment: FragmentId) -> Option<DeltaRecord>;

    /// Pick the fragment sync reports describe.
    ///
    /// Returns the highest fragment id that holds a full record, or `None`
    /// when no full snapshot has been stored.
    async fn select_active_fragment(&self) -> Option<FragmentId>;

    /// Read the active fragment and global sync state consistently.
    async fn sync_snapshot(&self) -> SyncSnapshot;

    /// Current record counts.
    async fn stats(&self) -> StoreStats;
}

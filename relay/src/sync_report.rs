//! Freshness reports for monitoring consumers.

use crate::store::FragmentStore;
use relay_types::SyncReport;
use tokio::time::Instant;

/// Build a [`SyncReport`] from the store's current contents.
///
/// The store is read once through [`FragmentStore::sync_snapshot`], so the
/// active fragment and its snapshot fields always belong together. Ages are
/// truncated to whole seconds. With no full snapshot stored, the snapshot
/// fields are zero but `signup_fragment`, `tps` and `protocol` from the last
/// start are still reported.
pub async fn compute_sync_report<S>(store: &S) -> SyncReport
where
    S: FragmentStore + ?Sized,
{
    let snapshot = store.sync_snapshot().await;
    let mut report = SyncReport {
        signup_fragment: snapshot.signup_fragment,
        tps: snapshot.handshake.tps,
        protocol: snapshot.handshake.protocol,
        ..SyncReport::default()
    };

    let Some(active) = snapshot.active else {
        return report;
    };

    let now = Instant::now();
    report.tick = active.tick;
    report.fragment = active.fragment;
    report.rtdelay = now.saturating_duration_since(active.arrived_at).as_secs();
    report.rcvage = now.saturating_duration_since(active.last_full_arrival).as_secs();
    report
}

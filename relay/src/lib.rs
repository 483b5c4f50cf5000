//! # telemetry-relay
//!
//! In-memory relay between a simulation host and its consumers.
//!
//! The producer pushes three kinds of opaque payloads per fragment (a
//! session epoch): a one-time start blob, periodic full snapshots and
//! periodic deltas. Consumers poll for the latest payload of each kind, and
//! monitoring clients poll a sync report describing how fresh the active
//! fragment is.
//!
//! ## Architecture
//!
//! ```text
//! Producer ──POST /{token}/{fragment}/{start|full|delta}──┐
//!                                                        ▼
//!                                   ┌────────────────────────────┐
//!                                   │      telemetry-relay       │
//!                                   │  ┌──────────────────────┐  │
//!                                   │  │ MemoryStore (RwLock) │  │
//!                                   │  └──────────────────────┘  │
//!                                   └────────────────────────────┘
//!                                                        ▲
//! Consumer ──GET /match/{token}/{fragment}/{kind}, /match/{token}/sync
//! ```
//!
//! ## Protocol
//!
//! - start → 200 (400 on malformed `tps`/`protocol`)
//! - full/delta → 205 until any start has been received, then 200
//! - reads → stored bytes, or an empty 200 when nothing is stored
//!
//! Nothing is persisted; a restarted relay asks producers to handshake again
//! through the 205 response.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cleanup;
pub mod config;
pub mod error;
pub mod http;
pub mod limits;
pub mod server;
pub mod store;
pub mod sync_report;

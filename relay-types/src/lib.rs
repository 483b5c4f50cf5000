//! # relay-types
//!
//! Wire types shared by the telemetry relay and its clients.
//!
//! - [`FragmentId`] - the epoch key every payload is filed under
//! - [`PayloadKind`] - start, full snapshot or delta
//! - [`Handshake`] - `tps`/`protocol` parameters carried by a start submission
//! - [`SyncReport`] - freshness summary served to monitoring consumers
//! - [`TypesError`] - request parameter parse errors

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod kind;
mod report;

pub use error::TypesError;
pub use ids::FragmentId;
pub use kind::PayloadKind;
pub use report::{parse_tick, Handshake, SyncReport};

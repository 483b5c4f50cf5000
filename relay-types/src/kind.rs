//! Payload kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three payload kinds a producer submits per fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    /// One-time handshake blob.
    Start,
    /// Complete state snapshot tagged with a tick.
    Full,
    /// Incremental update since the last snapshot.
    Delta,
}

impl PayloadKind {
    /// Path segment and log label for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Start => "start",
            PayloadKind::Full => "full",
            PayloadKind::Delta => "delta",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Fragment identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one producer session (epoch).
///
/// All three payload kinds are filed under a fragment. The relay does not
/// check fragments for monotonicity or uniqueness; ordering is only used to
/// pick the active fragment for sync reports.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentId(i64);

impl FragmentId {
    /// Create a FragmentId from its numeric value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the numeric value of this FragmentId.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FragmentId({})", self.0)
    }
}

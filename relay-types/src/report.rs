//! Handshake parameters and the sync report.

use serde::{Deserialize, Serialize};

use crate::{FragmentId, TypesError};

/// Parameters a producer declares in its start submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Handshake {
    /// Expected simulation ticks per second.
    pub tps: u32,
    /// Producer protocol version.
    pub protocol: i64,
}

impl Handshake {
    /// Parse handshake parameters from raw query values.
    ///
    /// `tps` accepts any positive number and truncates it to an integer
    /// (`59.94` becomes `59`, `0.5` becomes `0`). `protocol` must be an
    /// integer.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::MissingParameter`] or
    /// [`TypesError::InvalidParameter`] naming the offending parameter.
    pub fn parse(tps: Option<&str>, protocol: Option<&str>) -> Result<Self, TypesError> {
        let raw_tps = tps.ok_or(TypesError::MissingParameter("tps"))?;
        let parsed: f64 = raw_tps.trim().parse().map_err(|_| TypesError::InvalidParameter {
            name: "tps",
            value: raw_tps.to_string(),
            reason: "not a number",
        })?;
        if !parsed.is_finite() || parsed <= 0.0 {
            return Err(TypesError::InvalidParameter {
                name: "tps",
                value: raw_tps.to_string(),
                reason: "must be positive",
            });
        }
        if parsed.trunc() > f64::from(u32::MAX) {
            return Err(TypesError::InvalidParameter {
                name: "tps",
                value: raw_tps.to_string(),
                reason: "out of range",
            });
        }

        let raw_protocol = protocol.ok_or(TypesError::MissingParameter("protocol"))?;
        let protocol = raw_protocol
            .trim()
            .parse::<i64>()
            .map_err(|_| TypesError::InvalidParameter {
                name: "protocol",
                value: raw_protocol.to_string(),
                reason: "not an integer",
            })?;

        Ok(Self {
            tps: parsed.trunc() as u32,
            protocol,
        })
    }
}

/// Parse the producer-declared `tick` of a full snapshot.
///
/// # Errors
///
/// Returns an error if the value is missing or not an integer.
pub fn parse_tick(tick: Option<&str>) -> Result<i64, TypesError> {
    let raw = tick.ok_or(TypesError::MissingParameter("tick"))?;
    raw.trim()
        .parse::<i64>()
        .map_err(|_| TypesError::InvalidParameter {
            name: "tick",
            value: raw.to_string(),
            reason: "not an integer",
        })
}

/// Freshness summary for the active fragment.
///
/// A relay that has never received a full snapshot reports zeros for
/// everything but the handshake values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncReport {
    /// Tick of the active fragment's latest full snapshot.
    pub tick: i64,
    /// Whole seconds since the active fragment's full snapshot arrived.
    pub rtdelay: u64,
    /// Whole seconds since any full snapshot arrived.
    pub rcvage: u64,
    /// The active fragment.
    pub fragment: FragmentId,
    /// Fragment of the most recent start handshake.
    pub signup_fragment: FragmentId,
    /// Ticks per second from the most recent start handshake.
    pub tps: u32,
    /// Protocol version from the most recent start handshake.
    pub protocol: i64,
}

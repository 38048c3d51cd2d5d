use std::fmt;

use serde::Serialize;

/// Which side of the engaged-couple count the requested capacities fell on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    /// Some engaged couples would be left without a mentor.
    Under,
    /// Mentors asked for more couples than are registered.
    Over,
}

/// Requested mentor capacities do not add up to the number of engaged couples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityMismatch {
    pub kind: MismatchKind,
    pub requested: u64,
    pub available: u64,
}

impl fmt::Display for CapacityMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MismatchKind::Under => write!(
                f,
                "mentor couples requested {} engaged couples but {} must be distributed; every engaged couple has to be drawn",
                self.requested, self.available
            ),
            MismatchKind::Over => write!(
                f,
                "mentor couples requested {} engaged couples but only {} are registered",
                self.requested, self.available
            ),
        }
    }
}

impl std::error::Error for CapacityMismatch {}

/// Gate run before any randomization or persistence: capacities must match supply exactly.
pub fn validate_capacity(total_engaged: usize, capacities: &[u32]) -> Result<(), CapacityMismatch> {
    let requested: u64 = capacities.iter().map(|&capacity| u64::from(capacity)).sum();
    let available = total_engaged as u64;

    let kind = match requested.cmp(&available) {
        std::cmp::Ordering::Equal => return Ok(()),
        std::cmp::Ordering::Less => MismatchKind::Under,
        std::cmp::Ordering::Greater => MismatchKind::Over,
    };

    Err(CapacityMismatch {
        kind,
        requested,
        available,
    })
}

//! Admission decision core.
//!
//! Decides on a snapshot of a locked slot's occupants. The caller holds the
//! slot's lock and commits the outcome before releasing it, so the snapshot
//! cannot go stale mid-decision.

use crate::config::AllocatorConfig;
use crate::policy;
use crate::token::{Token, TokenId};

/// Outcome of an admission decision for one locked slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// A free seat exists; admit directly.
    Admit,
    /// Slot is full but the worst occupant is strictly weaker; displace it
    /// and take the vacated seat.
    Preempt { victim: TokenId },
    /// Slot is full with no eligible victim.
    Full,
}

/// Decide admission for an incoming priority against a slot's current
/// occupants, given in policy order (worst last).
///
/// Equal priority never preempts: the earlier arrival keeps its seat.
pub fn decide(
    config: &AllocatorConfig,
    base_capacity: u32,
    active: &[Token],
    incoming_priority: u8,
) -> Decision {
    let capacity = policy::effective_capacity(base_capacity, active, config.max_emergency_overflow);
    if (active.len() as u32) < capacity {
        return Decision::Admit;
    }

    if !config.preemption_enabled {
        return Decision::Full;
    }

    match active.last() {
        Some(worst) if incoming_priority < worst.priority => Decision::Preempt { victim: worst.id },
        _ => Decision::Full,
    }
}

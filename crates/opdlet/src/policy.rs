//! Capacity and priority policy.
//!
//! Pure functions only. Effective capacity must be recomputed on every
//! decision: the emergency occupant count changes with each admission and
//! departure, so a cached value goes stale immediately.

use std::cmp::Ordering;

use crate::token::{Token, TokenSource};

/// Priority rank derived once from the request source. Lower = more urgent.
pub fn priority_for(source: TokenSource) -> u8 {
    match source {
        TokenSource::Emergency => 1,
        TokenSource::Paid => 2,
        TokenSource::FollowUp => 3,
        TokenSource::WalkIn => 4,
        TokenSource::Online => 5,
    }
}

/// Base capacity plus bounded overflow for emergency occupants.
///
/// The emergency count is measured among the occupants already seated,
/// never the incoming request.
pub fn effective_capacity(base: u32, active: &[Token], max_overflow: u32) -> u32 {
    let emergencies = active
        .iter()
        .filter(|t| t.source == TokenSource::Emergency)
        .count() as u32;
    base + emergencies.min(max_overflow)
}

/// Total order over a slot's occupants: priority ascending, then arrival
/// ascending. The worst occupant sorts last.
pub fn occupant_order(a: &Token, b: &Token) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| a.arrived_at.cmp(&b.arrived_at))
}

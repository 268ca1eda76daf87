//! Backfill planning for freed seats.
//!
//! Pure half of the reallocation engine: given a locked slot's occupancy and
//! the ordered unassigned pool, compute which tokens to promote. The service
//! commits the transitions while still holding the slot lock.

use crate::config::AllocatorConfig;
use crate::policy;
use crate::token::{Token, TokenId};

/// Seats currently free in a slot under the effective-capacity formula.
pub fn free_seats(config: &AllocatorConfig, base_capacity: u32, active: &[Token]) -> u32 {
    let capacity = policy::effective_capacity(base_capacity, active, config.max_emergency_overflow);
    capacity.saturating_sub(active.len() as u32)
}

/// Tokens to promote, taken greedily from the front of the ordered pool.
///
/// With no free seats or no candidates the plan is empty, which is what
/// makes a repeated reallocation pass a no-op.
pub fn fill_plan(free_seats: u32, candidates: &[Token]) -> Vec<TokenId> {
    candidates
        .iter()
        .take(free_seats as usize)
        .map(|t| t.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::DoctorId;
    use crate::token::{PatientInfo, TokenSource, TokenStatus};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn token(source: TokenSource, status: TokenStatus, arrived_secs: u32) -> Token {
        Token {
            id: TokenId::new(),
            doctor_id: DoctorId::new(),
            slot_id: None,
            date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            source,
            priority: policy::priority_for(source),
            status,
            arrived_at: Utc.with_ymd_and_hms(2026, 3, 14, 8, 0, arrived_secs).unwrap(),
            patient: PatientInfo {
                name: "p".to_string(),
                contact: "c".to_string(),
            },
        }
    }

    fn cfg(overflow: u32) -> AllocatorConfig {
        AllocatorConfig {
            max_emergency_overflow: overflow,
            ..AllocatorConfig::default()
        }
    }

    #[test]
    fn free_seats_counts_against_effective_capacity() {
        let active = vec![token(TokenSource::Online, TokenStatus::Active, 0)];
        assert_eq!(free_seats(&cfg(0), 2, &active), 1);
        assert_eq!(free_seats(&cfg(0), 1, &active), 0);
    }

    #[test]
    fn emergency_occupants_widen_free_seats() {
        let active = vec![token(TokenSource::Emergency, TokenStatus::Active, 0)];
        assert_eq!(free_seats(&cfg(1), 1, &active), 1);
        assert_eq!(free_seats(&cfg(0), 1, &active), 0);
    }

    #[test]
    fn overfull_slot_saturates_at_zero() {
        let active = vec![
            token(TokenSource::Online, TokenStatus::Active, 0),
            token(TokenSource::Online, TokenStatus::Active, 1),
        ];
        assert_eq!(free_seats(&cfg(0), 1, &active), 0);
    }

    #[test]
    fn plan_takes_front_of_ordered_pool() {
        let first = token(TokenSource::Paid, TokenStatus::Displaced, 0);
        let second = token(TokenSource::Online, TokenStatus::Waiting, 1);
        let third = token(TokenSource::Online, TokenStatus::Waiting, 2);
        let pool = vec![first.clone(), second.clone(), third];

        let plan = fill_plan(2, &pool);
        assert_eq!(plan, vec![first.id, second.id]);
    }

    #[test]
    fn plan_is_empty_when_no_seats_or_candidates() {
        let pool = vec![token(TokenSource::Online, TokenStatus::Displaced, 0)];
        assert!(fill_plan(0, &pool).is_empty());
        assert!(fill_plan(3, &[]).is_empty());
    }
}

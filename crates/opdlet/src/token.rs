//! Token records and their status state machine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::slot::{DoctorId, SlotId};

/// Unique identifier for a token.
///
/// UUID v4, assigned by the admission controller at creation time rather
/// than by a storage-layer default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(uuid::Uuid);

impl TokenId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        let uuid = uuid::Uuid::parse_str(s)?;
        Ok(Self(uuid))
    }
}

impl Default for TokenId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the request came from. Determines priority once, at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenSource {
    Online,
    WalkIn,
    Paid,
    FollowUp,
    Emergency,
}

impl TokenSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::WalkIn => "walk_in",
            Self::Paid => "paid",
            Self::FollowUp => "follow_up",
            Self::Emergency => "emergency",
        }
    }
}

/// Token lifecycle status.
///
/// `Waiting` is never written by this engine (admission rejects rather than
/// queues), but the reallocation pool drains it, so an external queueing
/// layer can seed waiters and have them backfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    /// Holding a seat in a slot.
    Active,
    /// Queued by an external layer, never seated.
    Waiting,
    /// Preemption victim, unassigned but eligible for reallocation.
    Displaced,
    Cancelled,
    Served,
    NoShow,
}

impl TokenStatus {
    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Served | Self::NoShow)
    }

    /// Statuses eligible for the reallocation candidate pool.
    pub fn is_unassigned(&self) -> bool {
        matches!(self, Self::Waiting | Self::Displaced)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Waiting => "waiting",
            Self::Displaced => "displaced",
            Self::Cancelled => "cancelled",
            Self::Served => "served",
            Self::NoShow => "no_show",
        }
    }
}

/// Patient identity fields, carried through opaquely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientInfo {
    pub name: String,
    pub contact: String,
}

/// One allocation request/record.
///
/// `priority` and `arrived_at` are immutable once assigned; `slot_id` is
/// `None` exactly while the token holds no seat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub doctor_id: DoctorId,
    pub slot_id: Option<SlotId>,
    /// The date the token was requested for, fixed at creation.
    pub date: NaiveDate,
    pub source: TokenSource,
    pub priority: u8,
    pub status: TokenStatus,
    pub arrived_at: DateTime<Utc>,
    pub patient: PatientInfo,
}

//! Collaborator seams for slot and token persistence.
//!
//! The engine never talks to a database directly. It consumes these traits,
//! and any locking failure or backend fault surfaces as a `StoreError` that
//! aborts the enclosing decision; the caller retries, the engine does not.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::slot::{DoctorId, Slot, SlotId};
use crate::token::{PatientInfo, Token, TokenId, TokenSource, TokenStatus};

mod memory;

pub use memory::MemoryStore;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("token {0} not found")]
    TokenMissing(TokenId),
    #[error("slot {0} not found")]
    SlotMissing(SlotId),
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Fields for a token the admission controller has decided to create.
///
/// Identity and arrival timestamp are supplied by the controller, not
/// generated by the store.
#[derive(Debug, Clone)]
pub struct NewToken {
    pub doctor_id: DoctorId,
    pub slot_id: Option<SlotId>,
    pub date: NaiveDate,
    pub source: TokenSource,
    pub priority: u8,
    pub arrived_at: DateTime<Utc>,
    pub patient: PatientInfo,
}

#[async_trait]
pub trait SlotStore: Send + Sync {
    async fn slot(&self, id: SlotId) -> Result<Option<Slot>, StoreError>;

    /// Slots for a doctor on a date, ordered by start time ascending.
    async fn slots_for_doctor_on(
        &self,
        doctor: DoctorId,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, StoreError>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn token(&self, id: TokenId) -> Result<Option<Token>, StoreError>;

    /// Active occupants of a slot, priority ascending then arrival ascending.
    async fn active_in_slot(&self, slot: SlotId) -> Result<Vec<Token>, StoreError>;

    /// Unassigned (waiting or displaced) tokens for a doctor and date, in
    /// the same order. Terminal tokens never appear here.
    async fn unassigned_for_doctor_on(
        &self,
        doctor: DoctorId,
        date: NaiveDate,
    ) -> Result<Vec<Token>, StoreError>;

    async fn create_active(&self, fields: NewToken) -> Result<Token, StoreError>;

    async fn set_status(&self, id: TokenId, status: TokenStatus) -> Result<(), StoreError>;

    async fn assign_slot(&self, id: TokenId, slot: SlotId) -> Result<(), StoreError>;

    async fn clear_slot(&self, id: TokenId) -> Result<(), StoreError>;

    /// Commit a preemption as one unit: the victim becomes displaced with
    /// its seat cleared, and the incoming token is created active in that
    /// seat. On error neither change may be visible; a database-backed
    /// store wraps this in a transaction.
    async fn displace_and_create(
        &self,
        victim: TokenId,
        incoming: NewToken,
    ) -> Result<Token, StoreError>;

    /// Commit a backfill plan as one unit: every listed token becomes
    /// active and seated in the slot. On error no token may have moved.
    async fn activate_in_slot(&self, ids: &[TokenId], slot: SlotId) -> Result<(), StoreError>;
}

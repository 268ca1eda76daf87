//! AllocationService: transport-agnostic slot admission and reallocation.
//!
//! This service owns:
//! - the per-slot locking scope (`SlotLocks`)
//! - the admission paths (explicit slot and auto-assign)
//! - release, and the backfill pass that follows every vacated seat
//!
//! Stores are collaborator seams; persistence mapping and transports (HTTP,
//! queues) live outside. Every decision runs its full read-decide-write
//! sequence under one slot's lock and commits as a single unit: a typed
//! failure leaves no token created and no occupant displaced.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::admission::{self, Decision};
use crate::config::AllocatorConfig;
use crate::locks::SlotLocks;
use crate::policy;
use crate::reallocation;
use crate::slot::{DoctorId, Slot, SlotId};
use crate::store::{NewToken, SlotStore, StoreError, TokenStore};
use crate::token::{PatientInfo, Token, TokenId, TokenSource, TokenStatus};

#[derive(Debug, thiserror::Error)]
pub enum AdmitError {
    #[error("slot not found")]
    NotFound,
    #[error("slot date does not match requested date")]
    DateMismatch,
    #[error("slot has already started")]
    SlotStarted,
    #[error("slot full and no occupant can be preempted")]
    SlotFull,
    #[error("no slot available for doctor on requested date")]
    NoSlotAvailable,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Admission request from the caller-facing boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmitRequest {
    pub doctor_id: DoctorId,
    /// Explicit target slot; `None` selects the auto-assign path.
    pub slot_id: Option<SlotId>,
    pub date: NaiveDate,
    pub source: TokenSource,
    pub patient: PatientInfo,
}

/// Why an active token is leaving its seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseReason {
    Cancel,
    Serve,
    NoShow,
}

impl ReleaseReason {
    fn terminal_status(self) -> TokenStatus {
        match self {
            Self::Cancel => TokenStatus::Cancelled,
            Self::Serve => TokenStatus::Served,
            Self::NoShow => TokenStatus::NoShow,
        }
    }
}

pub struct AllocationService {
    slots: Arc<dyn SlotStore>,
    tokens: Arc<dyn TokenStore>,
    locks: SlotLocks,
    config: AllocatorConfig,
}

impl AllocationService {
    pub fn new(
        slots: Arc<dyn SlotStore>,
        tokens: Arc<dyn TokenStore>,
        config: AllocatorConfig,
    ) -> Self {
        Self {
            slots,
            tokens,
            locks: SlotLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Admit a request against the wall clock.
    pub async fn admit(&self, request: AdmitRequest) -> Result<Token, AdmitError> {
        self.admit_at(request, Utc::now()).await
    }

    /// Admit a request with an explicit clock, for schedulers and tests.
    pub async fn admit_at(
        &self,
        request: AdmitRequest,
        now: DateTime<Utc>,
    ) -> Result<Token, AdmitError> {
        let incoming_priority = policy::priority_for(request.source);
        match request.slot_id {
            Some(slot_id) => {
                self.admit_explicit(&request, slot_id, incoming_priority, now)
                    .await
            }
            None => self.admit_auto(&request, incoming_priority, now).await,
        }
    }

    async fn admit_explicit(
        &self,
        request: &AdmitRequest,
        slot_id: SlotId,
        incoming_priority: u8,
        now: DateTime<Utc>,
    ) -> Result<Token, AdmitError> {
        let _guard = self.locks.acquire(slot_id).await;

        let slot = self
            .slots
            .slot(slot_id)
            .await?
            .ok_or(AdmitError::NotFound)?;
        if slot.date != request.date {
            return Err(AdmitError::DateMismatch);
        }
        if slot.started_by(now) {
            return Err(AdmitError::SlotStarted);
        }

        match self
            .try_admit_locked(request, &slot, incoming_priority, now)
            .await?
        {
            Some(token) => Ok(token),
            None => Err(AdmitError::SlotFull),
        }
    }

    /// Scan the doctor's slots chronologically and take the first that
    /// admits. Each candidate's lock is released before the next is tried.
    async fn admit_auto(
        &self,
        request: &AdmitRequest,
        incoming_priority: u8,
        now: DateTime<Utc>,
    ) -> Result<Token, AdmitError> {
        let slots = self
            .slots
            .slots_for_doctor_on(request.doctor_id, request.date)
            .await?;

        for slot in slots {
            if slot.started_by(now) {
                continue;
            }

            let admitted = {
                let _guard = self.locks.acquire(slot.id).await;
                self.try_admit_locked(request, &slot, incoming_priority, now)
                    .await?
            };
            if let Some(token) = admitted {
                return Ok(token);
            }
        }

        Err(AdmitError::NoSlotAvailable)
    }

    /// Capacity check, preemption, and token creation for one slot.
    /// Caller holds the slot's lock. Returns `None` when the slot cannot
    /// take this request.
    async fn try_admit_locked(
        &self,
        request: &AdmitRequest,
        slot: &Slot,
        incoming_priority: u8,
        now: DateTime<Utc>,
    ) -> Result<Option<Token>, AdmitError> {
        let active = self.tokens.active_in_slot(slot.id).await?;

        match admission::decide(&self.config, slot.capacity, &active, incoming_priority) {
            Decision::Full => Ok(None),
            Decision::Admit => {
                let token = self
                    .tokens
                    .create_active(new_token(request, slot.id, incoming_priority, now))
                    .await?;
                tracing::info!(
                    slot = %slot.id,
                    token = %token.id,
                    source = request.source.as_str(),
                    "request admitted"
                );
                Ok(Some(token))
            }
            Decision::Preempt { victim } => {
                // Demotion and admission land as one store commit; if it
                // fails the victim keeps its seat.
                let token = self
                    .tokens
                    .displace_and_create(victim, new_token(request, slot.id, incoming_priority, now))
                    .await?;
                tracing::info!(
                    slot = %slot.id,
                    token = %token.id,
                    victim = %victim,
                    source = request.source.as_str(),
                    "occupant displaced for higher-priority request"
                );
                Ok(Some(token))
            }
        }
    }

    /// Move an active token to a terminal status and backfill its seat.
    ///
    /// Returns `false` without touching anything when the token is absent or
    /// not active; callers treat that as an expected outcome. Every successful
    /// release is followed by a reallocation pass for the vacated slot,
    /// serve included: a served token stops occupying its seat all the same.
    pub async fn release(
        &self,
        token_id: TokenId,
        reason: ReleaseReason,
    ) -> Result<bool, StoreError> {
        loop {
            let Some(token) = self.tokens.token(token_id).await? else {
                return Ok(false);
            };
            if token.status != TokenStatus::Active {
                return Ok(false);
            }

            let Some(slot_id) = token.slot_id else {
                // An active token always holds a seat; a record like this is
                // corrupt, and inventing a transition for it would hide that.
                tracing::error!(token = %token_id, "active token has no slot; refusing release");
                return Ok(false);
            };

            let _guard = self.locks.acquire(slot_id).await;

            // Re-read under the lock: the token may have been displaced,
            // released, or reseated elsewhere while we waited.
            let Some(current) = self.tokens.token(token_id).await? else {
                return Ok(false);
            };
            if current.status != TokenStatus::Active {
                return Ok(false);
            }
            if current.slot_id != Some(slot_id) {
                // Moved while we were acquiring the wrong slot's lock; retry
                // against wherever it sits now.
                continue;
            }

            self.tokens.set_status(token_id, reason.terminal_status()).await?;
            tracing::info!(
                slot = %slot_id,
                token = %token_id,
                status = reason.terminal_status().as_str(),
                "token released"
            );

            self.reallocate_locked(slot_id).await?;
            return Ok(true);
        }
    }

    /// Idempotent maintenance pass: refill a slot's free seats from the
    /// ordered unassigned pool. Returns how many tokens were promoted.
    pub async fn reallocate(&self, slot_id: SlotId) -> Result<usize, StoreError> {
        let _guard = self.locks.acquire(slot_id).await;
        self.reallocate_locked(slot_id).await
    }

    async fn reallocate_locked(&self, slot_id: SlotId) -> Result<usize, StoreError> {
        let Some(slot) = self.slots.slot(slot_id).await? else {
            return Ok(0);
        };

        let active = self.tokens.active_in_slot(slot_id).await?;
        let free = reallocation::free_seats(&self.config, slot.capacity, &active);
        if free == 0 {
            return Ok(0);
        }

        let candidates = self
            .tokens
            .unassigned_for_doctor_on(slot.doctor_id, slot.date)
            .await?;
        let plan = reallocation::fill_plan(free, &candidates);
        if plan.is_empty() {
            return Ok(0);
        }

        // The whole plan lands as one store commit; a failure promotes
        // nobody rather than half the list.
        self.tokens.activate_in_slot(&plan, slot_id).await?;
        for id in &plan {
            tracing::info!(slot = %slot_id, token = %id, "freed seat backfilled");
        }
        Ok(plan.len())
    }

    /// Tokens queued by an external layer for a doctor on a date, in
    /// policy order.
    pub async fn waiting_tokens(
        &self,
        doctor: DoctorId,
        date: NaiveDate,
    ) -> Result<Vec<Token>, StoreError> {
        let pool = self.tokens.unassigned_for_doctor_on(doctor, date).await?;
        Ok(pool
            .into_iter()
            .filter(|t| t.status == TokenStatus::Waiting)
            .collect())
    }

    /// Slots still open for booking: the doctor's slots for a date, minus
    /// any whose start time has passed.
    pub async fn open_slots(
        &self,
        doctor: DoctorId,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<Slot>, StoreError> {
        let slots = self.slots.slots_for_doctor_on(doctor, date).await?;
        Ok(slots.into_iter().filter(|s| !s.started_by(now)).collect())
    }
}

fn new_token(
    request: &AdmitRequest,
    slot_id: SlotId,
    priority: u8,
    now: DateTime<Utc>,
) -> NewToken {
    NewToken {
        doctor_id: request.doctor_id,
        slot_id: Some(slot_id),
        date: request.date,
        source: request.source,
        priority,
        arrived_at: now,
        patient: request.patient.clone(),
    }
}

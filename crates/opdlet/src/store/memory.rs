//! In-memory store backed by dashmap.
//!
//! Serves tests and embedders that don't need a database. Ordering contracts
//! are implemented here with the same policy functions the engine uses.

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;

use super::{NewToken, SlotStore, StoreError, TokenStore};
use crate::policy;
use crate::slot::{Doctor, DoctorId, Slot, SlotId};
use crate::token::{Token, TokenId, TokenStatus};

#[derive(Default)]
pub struct MemoryStore {
    doctors: DashMap<DoctorId, Doctor>,
    slots: DashMap<SlotId, Slot>,
    tokens: DashMap<TokenId, Token>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_doctor(&self, doctor: Doctor) {
        self.doctors.insert(doctor.id, doctor);
    }

    pub fn insert_slot(&self, slot: Slot) {
        self.slots.insert(slot.id, slot);
    }

    /// Insert a pre-built token. Intended for external layers (queueing,
    /// migration) seeding state; the engine itself only creates tokens
    /// through `create_active`.
    pub fn insert_token(&self, token: Token) {
        self.tokens.insert(token.id, token);
    }

    pub fn doctor(&self, id: DoctorId) -> Option<Doctor> {
        self.doctors.get(&id).map(|d| d.clone())
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

#[async_trait]
impl SlotStore for MemoryStore {
    async fn slot(&self, id: SlotId) -> Result<Option<Slot>, StoreError> {
        Ok(self.slots.get(&id).map(|s| s.clone()))
    }

    async fn slots_for_doctor_on(
        &self,
        doctor: DoctorId,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, StoreError> {
        let mut slots: Vec<Slot> = self
            .slots
            .iter()
            .filter(|s| s.doctor_id == doctor && s.date == date)
            .map(|s| s.clone())
            .collect();
        slots.sort_by_key(|s| s.start_time);
        Ok(slots)
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn token(&self, id: TokenId) -> Result<Option<Token>, StoreError> {
        Ok(self.tokens.get(&id).map(|t| t.clone()))
    }

    async fn active_in_slot(&self, slot: SlotId) -> Result<Vec<Token>, StoreError> {
        let mut tokens: Vec<Token> = self
            .tokens
            .iter()
            .filter(|t| t.slot_id == Some(slot) && t.status == TokenStatus::Active)
            .map(|t| t.clone())
            .collect();
        tokens.sort_by(policy::occupant_order);
        Ok(tokens)
    }

    async fn unassigned_for_doctor_on(
        &self,
        doctor: DoctorId,
        date: NaiveDate,
    ) -> Result<Vec<Token>, StoreError> {
        let mut tokens: Vec<Token> = self
            .tokens
            .iter()
            .filter(|t| {
                t.doctor_id == doctor
                    && t.date == date
                    && t.status.is_unassigned()
                    && t.slot_id.is_none()
            })
            .map(|t| t.clone())
            .collect();
        tokens.sort_by(policy::occupant_order);
        Ok(tokens)
    }

    async fn create_active(&self, fields: NewToken) -> Result<Token, StoreError> {
        let token = Token {
            id: TokenId::new(),
            doctor_id: fields.doctor_id,
            slot_id: fields.slot_id,
            date: fields.date,
            source: fields.source,
            priority: fields.priority,
            status: TokenStatus::Active,
            arrived_at: fields.arrived_at,
            patient: fields.patient,
        };
        self.tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn set_status(&self, id: TokenId, status: TokenStatus) -> Result<(), StoreError> {
        let mut token = self
            .tokens
            .get_mut(&id)
            .ok_or(StoreError::TokenMissing(id))?;
        token.status = status;
        Ok(())
    }

    async fn assign_slot(&self, id: TokenId, slot: SlotId) -> Result<(), StoreError> {
        let mut token = self
            .tokens
            .get_mut(&id)
            .ok_or(StoreError::TokenMissing(id))?;
        token.slot_id = Some(slot);
        Ok(())
    }

    async fn clear_slot(&self, id: TokenId) -> Result<(), StoreError> {
        let mut token = self
            .tokens
            .get_mut(&id)
            .ok_or(StoreError::TokenMissing(id))?;
        token.slot_id = None;
        Ok(())
    }

    async fn displace_and_create(
        &self,
        victim: TokenId,
        incoming: NewToken,
    ) -> Result<Token, StoreError> {
        // The only failure mode is a missing victim; checking it before
        // any write keeps the commit all-or-nothing.
        {
            let mut token = self
                .tokens
                .get_mut(&victim)
                .ok_or(StoreError::TokenMissing(victim))?;
            token.status = TokenStatus::Displaced;
            token.slot_id = None;
        }
        self.create_active(incoming).await
    }

    async fn activate_in_slot(&self, ids: &[TokenId], slot: SlotId) -> Result<(), StoreError> {
        // Validate first so a bad id cannot leave a partial fill.
        for id in ids {
            if !self.tokens.contains_key(id) {
                return Err(StoreError::TokenMissing(*id));
            }
        }
        for id in ids {
            if let Some(mut token) = self.tokens.get_mut(id) {
                token.status = TokenStatus::Active;
                token.slot_id = Some(slot);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{PatientInfo, TokenSource};
    use chrono::{NaiveTime, TimeZone, Utc};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn new_token(
        doctor: DoctorId,
        slot: Option<SlotId>,
        source: TokenSource,
        arrived_secs: u32,
    ) -> NewToken {
        NewToken {
            doctor_id: doctor,
            slot_id: slot,
            date: date(),
            source,
            priority: policy::priority_for(source),
            arrived_at: Utc.with_ymd_and_hms(2026, 3, 14, 7, 0, arrived_secs).unwrap(),
            patient: PatientInfo {
                name: "p".to_string(),
                contact: "c".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn active_in_slot_is_ordered_and_filtered() {
        let store = MemoryStore::new();
        let doctor = DoctorId::new();
        let slot = SlotId::new();

        let online = store
            .create_active(new_token(doctor, Some(slot), TokenSource::Online, 0))
            .await
            .unwrap();
        let emergency = store
            .create_active(new_token(doctor, Some(slot), TokenSource::Emergency, 5))
            .await
            .unwrap();
        let cancelled = store
            .create_active(new_token(doctor, Some(slot), TokenSource::Paid, 9))
            .await
            .unwrap();
        store
            .set_status(cancelled.id, TokenStatus::Cancelled)
            .await
            .unwrap();

        let active = store.active_in_slot(slot).await.unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].id, emergency.id);
        assert_eq!(active[1].id, online.id);
    }

    #[tokio::test]
    async fn unassigned_pool_excludes_terminal_and_seated() {
        let store = MemoryStore::new();
        let doctor = DoctorId::new();
        let slot = SlotId::new();

        let displaced = store
            .create_active(new_token(doctor, None, TokenSource::Online, 0))
            .await
            .unwrap();
        store
            .set_status(displaced.id, TokenStatus::Displaced)
            .await
            .unwrap();

        let seated = store
            .create_active(new_token(doctor, Some(slot), TokenSource::Online, 1))
            .await
            .unwrap();

        let no_show = store
            .create_active(new_token(doctor, None, TokenSource::WalkIn, 2))
            .await
            .unwrap();
        store
            .set_status(no_show.id, TokenStatus::NoShow)
            .await
            .unwrap();

        let pool = store.unassigned_for_doctor_on(doctor, date()).await.unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].id, displaced.id);
        assert_ne!(pool[0].id, seated.id);
    }

    #[tokio::test]
    async fn slots_for_doctor_ordered_by_start_time() {
        let store = MemoryStore::new();
        let doctor = DoctorId::new();
        let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();

        let late = Slot::new(doctor, date(), t(14), t(15), 2).unwrap();
        let early = Slot::new(doctor, date(), t(9), t(10), 2).unwrap();
        store.insert_slot(late.clone());
        store.insert_slot(early.clone());

        let slots = store.slots_for_doctor_on(doctor, date()).await.unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].id, early.id);
        assert_eq!(slots[1].id, late.id);
    }

    #[tokio::test]
    async fn displace_and_create_swaps_seat_in_one_commit() {
        let store = MemoryStore::new();
        let doctor = DoctorId::new();
        let slot = SlotId::new();

        let victim = store
            .create_active(new_token(doctor, Some(slot), TokenSource::Online, 0))
            .await
            .unwrap();

        let winner = store
            .displace_and_create(victim.id, new_token(doctor, Some(slot), TokenSource::Emergency, 1))
            .await
            .unwrap();

        let victim = store.token(victim.id).await.unwrap().unwrap();
        assert_eq!(victim.status, TokenStatus::Displaced);
        assert_eq!(victim.slot_id, None);
        assert_eq!(winner.status, TokenStatus::Active);
        assert_eq!(winner.slot_id, Some(slot));
    }

    #[tokio::test]
    async fn displace_and_create_missing_victim_writes_nothing() {
        let store = MemoryStore::new();
        let doctor = DoctorId::new();
        let slot = SlotId::new();

        let err = store
            .displace_and_create(TokenId::new(), new_token(doctor, Some(slot), TokenSource::Emergency, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::TokenMissing(_)));
        assert_eq!(store.token_count(), 0);
    }

    #[tokio::test]
    async fn activate_in_slot_rejects_bad_plan_without_partial_fill() {
        let store = MemoryStore::new();
        let doctor = DoctorId::new();
        let slot = SlotId::new();

        let displaced = store
            .create_active(new_token(doctor, None, TokenSource::Online, 0))
            .await
            .unwrap();
        store
            .set_status(displaced.id, TokenStatus::Displaced)
            .await
            .unwrap();

        let err = store
            .activate_in_slot(&[displaced.id, TokenId::new()], slot)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::TokenMissing(_)));

        // The valid candidate must not have moved.
        let untouched = store.token(displaced.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, TokenStatus::Displaced);
        assert_eq!(untouched.slot_id, None);
    }

    #[tokio::test]
    async fn mutations_on_missing_token_error() {
        let store = MemoryStore::new();
        let id = TokenId::new();
        assert!(matches!(
            store.set_status(id, TokenStatus::Cancelled).await,
            Err(StoreError::TokenMissing(_))
        ));
        assert!(matches!(
            store.clear_slot(id).await,
            Err(StoreError::TokenMissing(_))
        ));
    }
}

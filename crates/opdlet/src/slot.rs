//! Doctor and slot reference data.
//!
//! Both are owned by the surrounding system; this engine reads them and
//! never mutates either.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a doctor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DoctorId(uuid::Uuid);

impl DoctorId {
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

impl Default for DoctorId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DoctorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a bookable slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(uuid::Uuid);

impl SlotId {
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

impl Default for SlotId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: DoctorId,
    pub name: String,
    pub specialization: String,
}

impl Doctor {
    pub fn new(name: impl Into<String>, specialization: impl Into<String>) -> Self {
        Self {
            id: DoctorId::new(),
            name: name.into(),
            specialization: specialization.into(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("slot start {start} must be before end {end}")]
pub struct InvalidSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// A doctor's bookable time window with a base occupant capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub doctor_id: DoctorId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Base capacity; overflow on top of this is a policy concern.
    pub capacity: u32,
}

impl Slot {
    pub fn new(
        doctor_id: DoctorId,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        capacity: u32,
    ) -> Result<Self, InvalidSlot> {
        if start_time >= end_time {
            return Err(InvalidSlot {
                start: start_time,
                end: end_time,
            });
        }
        Ok(Self {
            id: SlotId::new(),
            doctor_id,
            date,
            start_time,
            end_time,
            capacity,
        })
    }

    /// True when this is a same-day slot whose start time has passed.
    pub fn started_by(&self, now: DateTime<Utc>) -> bool {
        self.date == now.date_naive() && self.start_time <= now.time()
    }
}

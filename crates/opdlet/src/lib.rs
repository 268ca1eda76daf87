//! opdlet: slot admission and reallocation engine for OPD token queues.
//!
//! Given a request, decides whether it is admitted now, displaces a weaker
//! occupant, or is rejected, and backfills seats once occupants leave.
//! Persistence and transport stay behind the [`store`] traits.

pub mod admission;
pub mod config;
pub mod locks;
pub mod policy;
pub mod reallocation;
pub mod service;
pub mod slot;
pub mod store;
pub mod token;

pub use admission::Decision;
pub use config::AllocatorConfig;
pub use service::{AdmitError, AdmitRequest, AllocationService, ReleaseReason};
pub use slot::{Doctor, DoctorId, InvalidSlot, Slot, SlotId};
pub use store::{MemoryStore, NewToken, SlotStore, StoreError, TokenStore};
pub use token::{PatientInfo, Token, TokenId, TokenSource, TokenStatus};

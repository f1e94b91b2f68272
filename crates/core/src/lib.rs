//! # HMS Core
//!
//! Core business logic for the hospital room allocation service.
//!
//! This crate contains the data model and every rule that touches it:
//! - Patient and room documents, with validation at the write boundary
//! - The entity store abstraction with in-memory and sharded YAML backends
//! - The allocator, the assignment transaction and transfer suggestions
//! - State-change events for notification transports
//!
//! **No API concerns**: authentication, HTTP servers and wire types belong in `api-rest` and
//! `api-shared`.

pub mod allocator;
pub mod assignment;
pub mod config;
pub mod constants;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod models;
pub mod service;
pub mod store;
pub mod transfer;

pub use allocator::{pick_best_room, required_room_category, AllocationOutcome, Allocator};
pub use assignment::{Assignment, AssignmentTransaction};
pub use config::{CoreConfig, StoreBackend};
pub use dashboard::DashboardSummary;
pub use error::{ConflictReason, EntityKind, ErrorClass, HospitalError, HospitalResult};
pub use events::{BroadcastSink, EventSink, HospitalEvent, NullSink, RecordingSink};
pub use models::{
    derive_priority, Condition, NewPatient, NewRoom, Patient, PatientId, PatientStatus,
    PatientUpdate, Room, RoomId, RoomStatus, RoomType, RoomUpdate,
};
pub use service::{Admission, HospitalService};
pub use store::{EntityStore, FileStore, MemoryStore, PatientOrder, PatientQuery, RoomQuery};
pub use transfer::TransferSuggestion;

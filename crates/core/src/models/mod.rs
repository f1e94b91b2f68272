//! Patient and room documents plus the inputs used to create and edit them.

pub mod patient;
pub mod room;

pub use patient::{
    derive_priority, Condition, NewPatient, Patient, PatientId, PatientStatus, PatientUpdate,
};
pub use room::{NewRoom, Room, RoomId, RoomStatus, RoomType, RoomUpdate};

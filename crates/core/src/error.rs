//! Error types for the HMS core.
//!
//! [`HospitalError`] follows the four outcome classes callers care about: validation,
//! not-found, conflict and internal. Only the last one is a genuine failure; the others are
//! expected, reportable results of a request.

use crate::store::StoreError;
use std::fmt;

/// Which kind of record a lookup failed for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Patient,
    Room,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Patient => f.write_str("patient"),
            EntityKind::Room => f.write_str("room"),
        }
    }
}

/// State preconditions that can reject a request.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConflictReason {
    #[error("room {room_number} is not available")]
    RoomUnavailable { room_number: String },
    #[error("patient has no room")]
    PatientHasNoRoom,
    #[error("patient has been discharged and cannot be assigned a room")]
    PatientDischarged,
    #[error("patient still holds room {room_number}")]
    PatientHoldsRoom { room_number: String },
    #[error("room number {0} is already in use")]
    DuplicateRoomNumber(String),
    #[error("room {room_number} is occupied")]
    RoomOccupied { room_number: String },
    #[error("room status cannot change from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("record was modified concurrently; retry the request")]
    ConcurrentUpdate,
}

#[derive(Debug, thiserror::Error)]
pub enum HospitalError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },
    #[error("conflict: {0}")]
    Conflict(ConflictReason),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("store error: {0}")]
    Store(StoreError),
}

/// Coarse classification used by API layers to pick a status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    NotFound,
    Conflict,
    Internal,
}

impl HospitalError {
    pub fn not_found(entity: EntityKind, id: impl ToString) -> Self {
        HospitalError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            HospitalError::Validation(_) => ErrorClass::Validation,
            HospitalError::NotFound { .. } => ErrorClass::NotFound,
            HospitalError::Conflict(_) => ErrorClass::Conflict,
            HospitalError::Internal(_) | HospitalError::Store(_) => ErrorClass::Internal,
        }
    }
}

impl From<StoreError> for HospitalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateRoomNumber(number) => {
                HospitalError::Conflict(ConflictReason::DuplicateRoomNumber(number))
            }
            other => HospitalError::Store(other),
        }
    }
}

impl From<hms_uuid::UuidError> for HospitalError {
    fn from(err: hms_uuid::UuidError) -> Self {
        HospitalError::Validation(err.to_string())
    }
}

pub type HospitalResult<T> = std::result::Result<T, HospitalError>;

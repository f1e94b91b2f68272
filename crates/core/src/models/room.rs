//! Room records and their status lifecycle.
//!
//! ```text
//! Available -> Occupied -> Cleaning -> Available
//!     \___________________/  |
//!      Maintenance <---------'   (only while unoccupied)
//! ```
//!
//! `Occupied` is entered and left only by the assignment transaction. Every other move goes
//! through [`RoomStatus::can_set_manually`].

use crate::constants::{MAX_FLOOR, MAX_ROOM_CAPACITY, MIN_FLOOR, MIN_ROOM_CAPACITY};
use crate::error::{HospitalError, HospitalResult};
use crate::models::PatientId;
use chrono::{DateTime, Utc};
use hms_types::RoomNumber;
use hms_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a room record.
pub type RoomId = RecordId;

/// Kind of room. Doubles as the allocation "category".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomType {
    #[serde(rename = "ICU")]
    Icu,
    General,
    Private,
    Emergency,
    Surgery,
}

impl RoomType {
    pub const ALL: [RoomType; 5] = [
        RoomType::Icu,
        RoomType::General,
        RoomType::Private,
        RoomType::Emergency,
        RoomType::Surgery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoomType::Icu => "ICU",
            RoomType::General => "General",
            RoomType::Private => "Private",
            RoomType::Emergency => "Emergency",
            RoomType::Surgery => "Surgery",
        }
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomType {
    type Err = HospitalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "icu" => Ok(RoomType::Icu),
            "general" => Ok(RoomType::General),
            "private" => Ok(RoomType::Private),
            "emergency" => Ok(RoomType::Emergency),
            "surgery" => Ok(RoomType::Surgery),
            other => Err(HospitalError::Validation(format!(
                "unknown room type '{other}' (expected ICU, General, Private, Emergency or Surgery)"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomStatus {
    Available,
    Occupied,
    Maintenance,
    Cleaning,
}

impl RoomStatus {
    pub const ALL: [RoomStatus; 4] = [
        RoomStatus::Available,
        RoomStatus::Occupied,
        RoomStatus::Maintenance,
        RoomStatus::Cleaning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Available => "Available",
            RoomStatus::Occupied => "Occupied",
            RoomStatus::Maintenance => "Maintenance",
            RoomStatus::Cleaning => "Cleaning",
        }
    }

    /// Whether an operator may move an unoccupied room from `self` to `to`.
    pub fn can_set_manually(self, to: RoomStatus) -> bool {
        use RoomStatus::*;
        matches!(
            (self, to),
            (Cleaning, Available) | (Maintenance, Available) | (Available, Maintenance) | (Cleaning, Maintenance)
        )
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomStatus {
    type Err = HospitalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(RoomStatus::Available),
            "occupied" => Ok(RoomStatus::Occupied),
            "maintenance" => Ok(RoomStatus::Maintenance),
            "cleaning" => Ok(RoomStatus::Cleaning),
            other => Err(HospitalError::Validation(format!(
                "unknown room status '{other}' (expected Available, Occupied, Maintenance or Cleaning)"
            ))),
        }
    }
}

/// A stored room document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub room_number: RoomNumber,
    pub room_type: RoomType,
    pub floor: i32,
    pub capacity: u32,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub occupied: bool,
    pub status: RoomStatus,
    #[serde(default)]
    pub patient_id: Option<PatientId>,
    #[serde(default)]
    pub last_cleaned: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// True when the room can take a patient right now.
    pub fn is_available(&self) -> bool {
        self.status == RoomStatus::Available && !self.occupied && self.patient_id.is_none()
    }

    /// Checks the occupancy invariants: the flag mirrors the patient reference, an occupied
    /// room is `Occupied`, and an `Occupied` room has a patient.
    pub fn is_consistent(&self) -> bool {
        self.occupied == self.patient_id.is_some()
            && (self.occupied == (self.status == RoomStatus::Occupied))
    }

    /// Marks the room as held by `patient_id`.
    pub(crate) fn occupy(&mut self, patient_id: PatientId) {
        self.occupied = true;
        self.status = RoomStatus::Occupied;
        self.patient_id = Some(patient_id);
    }

    /// Frees the room after a discharge or transfer. Cleaning is mandatory before reuse.
    pub(crate) fn vacate(&mut self, now: DateTime<Utc>) {
        self.occupied = false;
        self.status = RoomStatus::Cleaning;
        self.patient_id = None;
        self.last_cleaned = Some(now);
    }

    /// Undoes [`Room::occupy`] when a later step of an assignment fails.
    pub(crate) fn unclaim(&mut self) {
        self.occupied = false;
        self.status = RoomStatus::Available;
        self.patient_id = None;
    }
}

/// Input for registering a room.
#[derive(Clone, Debug, Deserialize)]
pub struct NewRoom {
    pub room_number: String,
    pub room_type: RoomType,
    pub floor: i32,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    #[serde(default)]
    pub amenities: Vec<String>,
    /// Initial status; only `Available`, `Maintenance` or `Cleaning`. Defaults to `Available`.
    #[serde(default)]
    pub status: Option<RoomStatus>,
}

fn default_capacity() -> u32 {
    1
}

impl NewRoom {
    pub(crate) fn into_room(self, now: DateTime<Utc>) -> HospitalResult<Room> {
        let room_number = RoomNumber::new(&self.room_number)
            .map_err(|e| HospitalError::Validation(format!("room_number: {e}")))?;
        validate_floor(self.floor)?;
        validate_capacity(self.capacity)?;

        let status = self.status.unwrap_or(RoomStatus::Available);
        if status == RoomStatus::Occupied {
            return Err(HospitalError::Validation(
                "a room cannot be created as Occupied".into(),
            ));
        }

        Ok(Room {
            id: RoomId::new(),
            room_number,
            room_type: self.room_type,
            floor: self.floor,
            capacity: self.capacity,
            amenities: normalise_amenities(self.amenities),
            occupied: false,
            status,
            patient_id: None,
            last_cleaned: None,
            created_at: now,
        })
    }
}

/// Profile edit for an existing room. Never touches occupancy or status.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RoomUpdate {
    #[serde(default)]
    pub room_number: Option<String>,
    /// Only accepted while the room is unoccupied.
    #[serde(default)]
    pub room_type: Option<RoomType>,
    #[serde(default)]
    pub floor: Option<i32>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub amenities: Option<Vec<String>>,
}

impl RoomUpdate {
    /// Validates field values, returning the parsed room number if one was given.
    pub(crate) fn validate(&self) -> HospitalResult<Option<RoomNumber>> {
        if let Some(floor) = self.floor {
            validate_floor(floor)?;
        }
        if let Some(capacity) = self.capacity {
            validate_capacity(capacity)?;
        }
        self.room_number
            .as_ref()
            .map(|n| {
                RoomNumber::new(n)
                    .map_err(|e| HospitalError::Validation(format!("room_number: {e}")))
            })
            .transpose()
    }

    pub(crate) fn apply(&self, room: &mut Room, room_number: Option<&RoomNumber>) {
        if let Some(number) = room_number {
            room.room_number = number.clone();
        }
        if let Some(room_type) = self.room_type {
            room.room_type = room_type;
        }
        if let Some(floor) = self.floor {
            room.floor = floor;
        }
        if let Some(capacity) = self.capacity {
            room.capacity = capacity;
        }
        if let Some(amenities) = &self.amenities {
            room.amenities = normalise_amenities(amenities.clone());
        }
    }
}

fn validate_floor(floor: i32) -> HospitalResult<()> {
    if !(MIN_FLOOR..=MAX_FLOOR).contains(&floor) {
        return Err(HospitalError::Validation(format!(
            "floor must be between {MIN_FLOOR} and {MAX_FLOOR}, got {floor}"
        )));
    }
    Ok(())
}

fn validate_capacity(capacity: u32) -> HospitalResult<()> {
    if !(MIN_ROOM_CAPACITY..=MAX_ROOM_CAPACITY).contains(&capacity) {
        return Err(HospitalError::Validation(format!(
            "capacity must be between {MIN_ROOM_CAPACITY} and {MAX_ROOM_CAPACITY}, got {capacity}"
        )));
    }
    Ok(())
}

fn normalise_amenities(amenities: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = amenities
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    out.dedup();
    out
}

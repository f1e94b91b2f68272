//! Entity store abstraction.
//!
//! The store keeps one collection of [`Patient`] documents and one of [`Room`] documents. Beyond
//! plain create/find/query it offers *conditional* writes: an update is applied only if the
//! current document satisfies a predicate, and the check and the write happen under the same
//! lock. The assignment transaction builds its race-free behaviour on top of this.
//!
//! Two backends are provided:
//! - [`MemoryStore`]: process-local maps, used by tests and ephemeral deployments
//! - [`FileStore`]: one YAML document per record in a sharded directory tree
//!
//! Store handles are constructed at startup and passed around as `Arc<dyn EntityStore>`.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::models::{Condition, Patient, PatientId, PatientStatus, Room, RoomId, RoomStatus, RoomType};
use std::cmp::Ordering;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to create storage directory: {0}")]
    DirCreation(std::io::Error),
    #[error("failed to read {path}: {source}", path = path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}", path = path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to remove {path}: {source}", path = path.display())]
    FileRemove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize {path}: {source}", path = path.display())]
    YamlDeserialization {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("room number {0} is already in use")]
    DuplicateRoomNumber(String),
    #[error("record {0} already exists")]
    DuplicateId(String),
    #[error("store lock poisoned")]
    LockPoisoned,
    #[error("failed to lock {path}: {source}", path = path.display())]
    FileLock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result of a conditional write or delete.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOutcome<T> {
    /// The predicate held; carries the document as written (or as deleted).
    Applied(T),
    /// The predicate failed; carries the current, unchanged document.
    Rejected(T),
    /// No document with that id.
    Missing,
}

/// Sort orders for patient queries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PatientOrder {
    /// Oldest admission first.
    #[default]
    Admission,
    /// Allocation order: priority ascending, then admission ascending.
    Priority,
}

/// Filter and sort for patient queries. The default matches every patient.
#[derive(Clone, Debug, Default)]
pub struct PatientQuery {
    pub statuses: Option<Vec<PatientStatus>>,
    pub condition: Option<Condition>,
    pub unassigned_only: bool,
    pub assigned_only: bool,
    pub order: PatientOrder,
}

impl PatientQuery {
    /// Patients waiting for a room, in allocation order.
    pub fn waiting() -> Self {
        Self {
            statuses: Some(vec![PatientStatus::Admitted, PatientStatus::Pending]),
            unassigned_only: true,
            order: PatientOrder::Priority,
            ..Default::default()
        }
    }

    /// Patients currently holding a room.
    pub fn in_rooms() -> Self {
        Self {
            assigned_only: true,
            ..Default::default()
        }
    }

    pub fn matches(&self, patient: &Patient) -> bool {
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&patient.status) {
                return false;
            }
        }
        if let Some(condition) = self.condition {
            if patient.condition != condition {
                return false;
            }
        }
        if self.unassigned_only && patient.assigned_room.is_some() {
            return false;
        }
        if self.assigned_only && patient.assigned_room.is_none() {
            return false;
        }
        true
    }

    fn compare(&self, a: &Patient, b: &Patient) -> Ordering {
        let by_admission = a
            .admission_date
            .cmp(&b.admission_date)
            .then_with(|| a.id.cmp(&b.id));
        match self.order {
            PatientOrder::Admission => by_admission,
            PatientOrder::Priority => a.priority.cmp(&b.priority).then(by_admission),
        }
    }

    /// Filters and sorts a collection snapshot. Shared by every backend.
    pub fn apply<'a>(&self, patients: impl IntoIterator<Item = &'a Patient>) -> Vec<Patient> {
        let mut out: Vec<Patient> = patients
            .into_iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect();
        out.sort_by(|a, b| self.compare(a, b));
        out
    }
}

/// Filter for room queries. Results are always ordered by floor, then room number.
#[derive(Clone, Debug, Default)]
pub struct RoomQuery {
    pub room_types: Option<Vec<RoomType>>,
    pub status: Option<RoomStatus>,
    pub floor: Option<i32>,
    pub available_only: bool,
}

impl RoomQuery {
    /// Rooms that can take a patient now, optionally restricted to some types.
    pub fn available(room_types: Option<Vec<RoomType>>) -> Self {
        Self {
            room_types,
            available_only: true,
            ..Default::default()
        }
    }

    pub fn matches(&self, room: &Room) -> bool {
        if let Some(types) = &self.room_types {
            if !types.contains(&room.room_type) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if room.status != status {
                return false;
            }
        }
        if let Some(floor) = self.floor {
            if room.floor != floor {
                return false;
            }
        }
        if self.available_only && !room.is_available() {
            return false;
        }
        true
    }

    pub fn apply<'a>(&self, rooms: impl IntoIterator<Item = &'a Room>) -> Vec<Room> {
        let mut out: Vec<Room> = rooms
            .into_iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect();
        out.sort_by(room_order);
        out
    }
}

/// Floor ascending, then room number ascending.
pub fn room_order(a: &Room, b: &Room) -> Ordering {
    a.floor
        .cmp(&b.floor)
        .then_with(|| a.room_number.cmp(&b.room_number))
}

/// Persistent collections of patients and rooms.
///
/// Conditional operations take the predicate (`expected`) and the mutation (`apply`) as
/// closures so the backend can run both while holding its write lock. `apply` must not change
/// the document id; backends ignore such changes.
pub trait EntityStore: Send + Sync {
    fn query_patients(&self, query: &PatientQuery) -> StoreResult<Vec<Patient>>;

    fn find_patient(&self, id: &PatientId) -> StoreResult<Option<Patient>>;

    fn insert_patient(&self, patient: &Patient) -> StoreResult<()>;

    fn update_patient_if(
        &self,
        id: &PatientId,
        expected: &dyn Fn(&Patient) -> bool,
        apply: &mut dyn FnMut(&mut Patient),
    ) -> StoreResult<WriteOutcome<Patient>>;

    fn delete_patient_if(
        &self,
        id: &PatientId,
        expected: &dyn Fn(&Patient) -> bool,
    ) -> StoreResult<WriteOutcome<Patient>>;

    fn query_rooms(&self, query: &RoomQuery) -> StoreResult<Vec<Room>>;

    fn find_room(&self, id: &RoomId) -> StoreResult<Option<Room>>;

    /// Inserts a room, failing with [`StoreError::DuplicateRoomNumber`] if the number is taken.
    fn insert_room(&self, room: &Room) -> StoreResult<()>;

    /// Conditional room update. A change of room number that collides with another room fails
    /// with [`StoreError::DuplicateRoomNumber`] and writes nothing.
    fn update_room_if(
        &self,
        id: &RoomId,
        expected: &dyn Fn(&Room) -> bool,
        apply: &mut dyn FnMut(&mut Room),
    ) -> StoreResult<WriteOutcome<Room>>;

    /// Deletes a room only if nobody occupies it.
    fn delete_room_if_unoccupied(&self, id: &RoomId) -> StoreResult<WriteOutcome<Room>>;
}

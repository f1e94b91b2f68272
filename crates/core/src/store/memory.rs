use super::{EntityStore, PatientQuery, RoomQuery, StoreError, StoreResult, WriteOutcome};
use crate::models::{Patient, PatientId, Room, RoomId};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Collections {
    patients: HashMap<PatientId, Patient>,
    rooms: HashMap<RoomId, Room>,
}

/// In-process entity store. All conditional writes run under a single write lock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Collections>> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Collections>> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl EntityStore for MemoryStore {
    fn query_patients(&self, query: &PatientQuery) -> StoreResult<Vec<Patient>> {
        Ok(query.apply(self.read()?.patients.values()))
    }

    fn find_patient(&self, id: &PatientId) -> StoreResult<Option<Patient>> {
        Ok(self.read()?.patients.get(id).cloned())
    }

    fn insert_patient(&self, patient: &Patient) -> StoreResult<()> {
        let mut guard = self.write()?;
        if guard.patients.contains_key(&patient.id) {
            return Err(StoreError::DuplicateId(patient.id.to_string()));
        }
        guard.patients.insert(patient.id, patient.clone());
        Ok(())
    }

    fn update_patient_if(
        &self,
        id: &PatientId,
        expected: &dyn Fn(&Patient) -> bool,
        apply: &mut dyn FnMut(&mut Patient),
    ) -> StoreResult<WriteOutcome<Patient>> {
        let mut guard = self.write()?;
        let Some(current) = guard.patients.get_mut(id) else {
            return Ok(WriteOutcome::Missing);
        };
        if !expected(current) {
            return Ok(WriteOutcome::Rejected(current.clone()));
        }
        let mut next = current.clone();
        apply(&mut next);
        next.id = *id;
        *current = next.clone();
        Ok(WriteOutcome::Applied(next))
    }

    fn delete_patient_if(
        &self,
        id: &PatientId,
        expected: &dyn Fn(&Patient) -> bool,
    ) -> StoreResult<WriteOutcome<Patient>> {
        let mut guard = self.write()?;
        match guard.patients.get(id) {
            None => return Ok(WriteOutcome::Missing),
            Some(current) if !expected(current) => {
                return Ok(WriteOutcome::Rejected(current.clone()))
            }
            Some(_) => {}
        }
        Ok(guard
            .patients
            .remove(id)
            .map_or(WriteOutcome::Missing, WriteOutcome::Applied))
    }

    fn query_rooms(&self, query: &RoomQuery) -> StoreResult<Vec<Room>> {
        Ok(query.apply(self.read()?.rooms.values()))
    }

    fn find_room(&self, id: &RoomId) -> StoreResult<Option<Room>> {
        Ok(self.read()?.rooms.get(id).cloned())
    }

    fn insert_room(&self, room: &Room) -> StoreResult<()> {
        let mut guard = self.write()?;
        if guard.rooms.contains_key(&room.id) {
            return Err(StoreError::DuplicateId(room.id.to_string()));
        }
        if guard
            .rooms
            .values()
            .any(|r| r.room_number == room.room_number)
        {
            return Err(StoreError::DuplicateRoomNumber(room.room_number.to_string()));
        }
        guard.rooms.insert(room.id, room.clone());
        Ok(())
    }

    fn update_room_if(
        &self,
        id: &RoomId,
        expected: &dyn Fn(&Room) -> bool,
        apply: &mut dyn FnMut(&mut Room),
    ) -> StoreResult<WriteOutcome<Room>> {
        let mut guard = self.write()?;
        let Some(current) = guard.rooms.get(id) else {
            return Ok(WriteOutcome::Missing);
        };
        if !expected(current) {
            return Ok(WriteOutcome::Rejected(current.clone()));
        }
        let mut next = current.clone();
        apply(&mut next);
        next.id = *id;

        if next.room_number != current.room_number
            && guard
                .rooms
                .values()
                .any(|r| r.id != *id && r.room_number == next.room_number)
        {
            return Err(StoreError::DuplicateRoomNumber(next.room_number.to_string()));
        }

        guard.rooms.insert(*id, next.clone());
        Ok(WriteOutcome::Applied(next))
    }

    fn delete_room_if_unoccupied(&self, id: &RoomId) -> StoreResult<WriteOutcome<Room>> {
        let mut guard = self.write()?;
        match guard.rooms.get(id) {
            None => return Ok(WriteOutcome::Missing),
            Some(current) if current.occupied || current.patient_id.is_some() => {
                return Ok(WriteOutcome::Rejected(current.clone()))
            }
            Some(_) => {}
        }
        Ok(guard
            .rooms
            .remove(id)
            .map_or(WriteOutcome::Missing, WriteOutcome::Applied))
    }
}

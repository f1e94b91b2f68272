//! The assignment transaction: the only writer of the patient/room cross reference.
//!
//! The store has no multi-document transactions, so each link is built from conditional
//! single-document updates applied in a fixed order: the room is claimed first, then the
//! patient is pointed at it, then any previous room is vacated. If a later step fails, the
//! earlier ones are compensated before the error is returned. Callers therefore observe either
//! the state before the call or the fully linked state.

use crate::error::{ConflictReason, EntityKind, HospitalError, HospitalResult};
use crate::models::{Patient, PatientId, PatientStatus, Room, RoomId};
use crate::store::{EntityStore, WriteOutcome};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

/// Both sides of a link after an assign or release.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Assignment {
    pub patient: Patient,
    pub room: Room,
    /// The room the patient left, when an assign moved them between rooms.
    pub vacated_room: Option<Room>,
}

#[derive(Clone)]
pub struct AssignmentTransaction {
    store: Arc<dyn EntityStore>,
}

impl AssignmentTransaction {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Links `patient_id` to `room_id`.
    ///
    /// # Errors
    ///
    /// - [`HospitalError::NotFound`] if either record is absent
    /// - [`ConflictReason::PatientDischarged`] if the patient has been discharged
    /// - [`ConflictReason::RoomUnavailable`] if the room is occupied or not `Available`,
    ///   including when a concurrent request claimed it first
    /// - [`ConflictReason::ConcurrentUpdate`] if the patient changed while the room was held
    /// - [`HospitalError::Internal`] if a compensating write failed
    pub fn assign(&self, patient_id: &PatientId, room_id: &RoomId) -> HospitalResult<Assignment> {
        let patient = self.load_patient(patient_id)?;
        if patient.status == PatientStatus::Discharged {
            return Err(HospitalError::Conflict(ConflictReason::PatientDischarged));
        }
        let room = self.load_room(room_id)?;
        if !room.is_available() {
            return Err(room_unavailable(&room));
        }

        let claimed = match self.store.update_room_if(
            room_id,
            &|r| r.is_available(),
            &mut |r| r.occupy(*patient_id),
        )? {
            WriteOutcome::Applied(room) => room,
            WriteOutcome::Rejected(current) => return Err(room_unavailable(&current)),
            WriteOutcome::Missing => return Err(HospitalError::not_found(EntityKind::Room, room_id)),
        };

        let previous_room = patient.assigned_room;
        let linked = match self.store.update_patient_if(
            patient_id,
            &|p| p.status != PatientStatus::Discharged && p.assigned_room == previous_room,
            &mut |p| {
                p.status = PatientStatus::Admitted;
                p.assigned_room = Some(*room_id);
            },
        ) {
            Ok(WriteOutcome::Applied(p)) => p,
            Ok(WriteOutcome::Rejected(current)) => {
                self.unclaim_room(room_id, patient_id)?;
                return Err(HospitalError::Conflict(
                    if current.status == PatientStatus::Discharged {
                        ConflictReason::PatientDischarged
                    } else {
                        ConflictReason::ConcurrentUpdate
                    },
                ));
            }
            Ok(WriteOutcome::Missing) => {
                self.unclaim_room(room_id, patient_id)?;
                return Err(HospitalError::not_found(EntityKind::Patient, patient_id));
            }
            Err(e) => {
                self.unclaim_room(room_id, patient_id)?;
                return Err(e.into());
            }
        };

        let vacated_room = match previous_room {
            Some(previous) => match self.vacate_room(&previous, patient_id) {
                Ok(vacated) => vacated,
                Err(e) => {
                    self.restore_patient(&patient, &|p| p.assigned_room == Some(*room_id))?;
                    self.unclaim_room(room_id, patient_id)?;
                    return Err(e);
                }
            },
            None => None,
        };

        tracing::info!(
            "assigned patient {} to room {}",
            linked.id,
            claimed.room_number
        );
        Ok(Assignment {
            patient: linked,
            room: claimed,
            vacated_room,
        })
    }

    /// Discharges `patient_id` and frees their room for cleaning.
    ///
    /// # Errors
    ///
    /// - [`HospitalError::NotFound`] if the patient, or the room they reference, is absent
    /// - [`ConflictReason::PatientHasNoRoom`] if the patient holds no room
    /// - [`HospitalError::Internal`] if a compensating write failed
    pub fn release(&self, patient_id: &PatientId) -> HospitalResult<Assignment> {
        let patient = self.load_patient(patient_id)?;
        let Some(room_id) = patient.assigned_room else {
            return Err(HospitalError::Conflict(ConflictReason::PatientHasNoRoom));
        };
        let now = Utc::now();

        let discharged = match self.store.update_patient_if(
            patient_id,
            &|p| p.assigned_room == Some(room_id),
            &mut |p| {
                p.status = PatientStatus::Discharged;
                p.discharge_date = Some(now);
                p.assigned_room = None;
            },
        )? {
            WriteOutcome::Applied(p) => p,
            WriteOutcome::Rejected(_) => {
                return Err(HospitalError::Conflict(ConflictReason::PatientHasNoRoom))
            }
            WriteOutcome::Missing => {
                return Err(HospitalError::not_found(EntityKind::Patient, patient_id))
            }
        };

        let still_discharged =
            |p: &Patient| p.status == PatientStatus::Discharged && p.assigned_room.is_none();
        let room = match self.store.update_room_if(
            &room_id,
            &|r| r.patient_id == Some(*patient_id),
            &mut |r| r.vacate(now),
        ) {
            Ok(WriteOutcome::Applied(room)) => room,
            Ok(WriteOutcome::Rejected(current)) => {
                tracing::warn!(
                    "room {} did not reference patient {}; leaving it unchanged",
                    current.room_number,
                    patient_id
                );
                current
            }
            Ok(WriteOutcome::Missing) => {
                self.restore_patient(&patient, &still_discharged)?;
                return Err(HospitalError::not_found(EntityKind::Room, room_id));
            }
            Err(e) => {
                self.restore_patient(&patient, &still_discharged)?;
                return Err(e.into());
            }
        };

        tracing::info!(
            "released room {} held by patient {}",
            room.room_number,
            discharged.id
        );
        Ok(Assignment {
            patient: discharged,
            room,
            vacated_room: None,
        })
    }

    fn load_patient(&self, id: &PatientId) -> HospitalResult<Patient> {
        self.store
            .find_patient(id)?
            .ok_or_else(|| HospitalError::not_found(EntityKind::Patient, id))
    }

    fn load_room(&self, id: &RoomId) -> HospitalResult<Room> {
        self.store
            .find_room(id)?
            .ok_or_else(|| HospitalError::not_found(EntityKind::Room, id))
    }

    /// Moves the patient's previous room to Cleaning. A room that no longer points at the
    /// patient is left alone.
    fn vacate_room(&self, room_id: &RoomId, patient_id: &PatientId) -> HospitalResult<Option<Room>> {
        let now = Utc::now();
        match self.store.update_room_if(
            room_id,
            &|r| r.patient_id == Some(*patient_id),
            &mut |r| r.vacate(now),
        )? {
            WriteOutcome::Applied(room) => Ok(Some(room)),
            WriteOutcome::Rejected(current) => {
                tracing::warn!(
                    "previous room {} no longer references patient {}",
                    current.room_number,
                    patient_id
                );
                Ok(None)
            }
            WriteOutcome::Missing => {
                tracing::warn!("previous room {} of patient {} is gone", room_id, patient_id);
                Ok(None)
            }
        }
    }

    fn unclaim_room(&self, room_id: &RoomId, patient_id: &PatientId) -> HospitalResult<()> {
        match self.store.update_room_if(
            room_id,
            &|r| r.patient_id == Some(*patient_id),
            &mut |r| r.unclaim(),
        ) {
            Ok(WriteOutcome::Applied(_)) => Ok(()),
            Ok(_) => {
                tracing::error!("rollback of room {} found it changed", room_id);
                Err(HospitalError::Internal(format!(
                    "rollback of room {room_id} failed"
                )))
            }
            Err(e) => {
                tracing::error!("rollback of room {} failed: {:?}", room_id, e);
                Err(HospitalError::Internal(format!(
                    "rollback of room {room_id} failed: {e}"
                )))
            }
        }
    }

    /// Puts the link fields of a patient back to a previously read snapshot.
    ///
    /// `written` must hold for the stored record, i.e. it still carries what the forward step
    /// wrote. Anything else means another writer got in first and is left untouched.
    fn restore_patient(
        &self,
        snapshot: &Patient,
        written: &dyn Fn(&Patient) -> bool,
    ) -> HospitalResult<()> {
        let outcome = self.store.update_patient_if(&snapshot.id, written, &mut |p| {
            p.status = snapshot.status;
            p.assigned_room = snapshot.assigned_room;
            p.discharge_date = snapshot.discharge_date;
        });
        match outcome {
            Ok(WriteOutcome::Applied(_)) => Ok(()),
            Ok(WriteOutcome::Rejected(_)) => {
                tracing::error!("rollback of patient {} found it changed", snapshot.id);
                Err(HospitalError::Internal(format!(
                    "rollback of patient {} failed: record changed",
                    snapshot.id
                )))
            }
            Ok(WriteOutcome::Missing) => Err(HospitalError::Internal(format!(
                "rollback of patient {} failed: record is gone",
                snapshot.id
            ))),
            Err(e) => {
                tracing::error!("rollback of patient {} failed: {:?}", snapshot.id, e);
                Err(HospitalError::Internal(format!(
                    "rollback of patient {} failed: {e}",
                    snapshot.id
                )))
            }
        }
    }
}

fn room_unavailable(room: &Room) -> HospitalError {
    HospitalError::Conflict(ConflictReason::RoomUnavailable {
        room_number: room.room_number.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Condition, RoomStatus, RoomType};
    use crate::store::test_support::{patient, room};
    use crate::store::{FileStore, MemoryStore, PatientQuery, RoomQuery, StoreError, StoreResult};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Barrier, Mutex};
    use std::thread;
    use tempfile::TempDir;

    fn setup() -> (Arc<MemoryStore>, AssignmentTransaction) {
        let store = Arc::new(MemoryStore::new());
        let tx = AssignmentTransaction::new(store.clone());
        (store, tx)
    }

    #[test]
    fn test_assign_links_both_records() {
        let (store, tx) = setup();
        let p = patient("Ada", Condition::Critical, 0);
        let r = room("ICU-1", RoomType::Icu, 1);
        store.insert_patient(&p).unwrap();
        store.insert_room(&r).unwrap();

        let assignment = tx.assign(&p.id, &r.id).unwrap();

        assert_eq!(assignment.patient.status, PatientStatus::Admitted);
        assert_eq!(assignment.patient.assigned_room, Some(r.id));
        assert!(assignment.room.occupied);
        assert_eq!(assignment.room.status, RoomStatus::Occupied);
        assert_eq!(assignment.room.patient_id, Some(p.id));
        assert!(assignment.vacated_room.is_none());
        assert_eq!(store.find_room(&r.id).unwrap().unwrap(), assignment.room);
    }

    #[test]
    fn test_assign_pending_patient_becomes_admitted() {
        let (store, tx) = setup();
        let mut p = patient("Ada", Condition::Normal, 0);
        p.status = PatientStatus::Pending;
        let r = room("101", RoomType::General, 1);
        store.insert_patient(&p).unwrap();
        store.insert_room(&r).unwrap();

        let assignment = tx.assign(&p.id, &r.id).unwrap();
        assert_eq!(assignment.patient.status, PatientStatus::Admitted);
    }

    #[test]
    fn test_assign_rejects_unavailable_room() {
        let (store, tx) = setup();
        let p = patient("Ada", Condition::Normal, 0);
        let mut r = room("101", RoomType::General, 1);
        r.status = RoomStatus::Cleaning;
        store.insert_patient(&p).unwrap();
        store.insert_room(&r).unwrap();

        let err = tx.assign(&p.id, &r.id).unwrap_err();
        assert!(matches!(
            err,
            HospitalError::Conflict(ConflictReason::RoomUnavailable { .. })
        ));
        assert!(store.find_patient(&p.id).unwrap().unwrap().assigned_room.is_none());
    }

    #[test]
    fn test_assign_rejects_discharged_patient() {
        let (store, tx) = setup();
        let mut p = patient("Ada", Condition::Normal, 0);
        p.status = PatientStatus::Discharged;
        let r = room("101", RoomType::General, 1);
        store.insert_patient(&p).unwrap();
        store.insert_room(&r).unwrap();

        let err = tx.assign(&p.id, &r.id).unwrap_err();
        assert!(matches!(
            err,
            HospitalError::Conflict(ConflictReason::PatientDischarged)
        ));
        assert!(store.find_room(&r.id).unwrap().unwrap().is_available());
    }

    #[test]
    fn test_assign_missing_records_are_not_found() {
        let (store, tx) = setup();
        let p = patient("Ada", Condition::Normal, 0);
        store.insert_patient(&p).unwrap();

        let err = tx.assign(&p.id, &RoomId::new()).unwrap_err();
        assert!(matches!(
            err,
            HospitalError::NotFound {
                entity: EntityKind::Room,
                ..
            }
        ));

        let err = tx.assign(&PatientId::new(), &RoomId::new()).unwrap_err();
        assert!(matches!(
            err,
            HospitalError::NotFound {
                entity: EntityKind::Patient,
                ..
            }
        ));
    }

    #[test]
    fn test_assign_to_new_room_vacates_previous_room() {
        let (store, tx) = setup();
        let p = patient("Ada", Condition::Stable, 0);
        let first = room("101", RoomType::General, 1);
        let second = room("102", RoomType::Private, 1);
        store.insert_patient(&p).unwrap();
        store.insert_room(&first).unwrap();
        store.insert_room(&second).unwrap();
        tx.assign(&p.id, &first.id).unwrap();

        let moved = tx.assign(&p.id, &second.id).unwrap();

        assert_eq!(moved.patient.assigned_room, Some(second.id));
        let vacated = moved.vacated_room.expect("previous room should be vacated");
        assert_eq!(vacated.id, first.id);
        assert_eq!(vacated.status, RoomStatus::Cleaning);
        assert!(!vacated.occupied);
        assert!(vacated.patient_id.is_none());
    }

    #[test]
    fn test_release_discharges_and_sends_room_to_cleaning() {
        let (store, tx) = setup();
        let p = patient("Ada", Condition::Critical, 0);
        let r = room("ICU-1", RoomType::Icu, 1);
        store.insert_patient(&p).unwrap();
        store.insert_room(&r).unwrap();
        tx.assign(&p.id, &r.id).unwrap();

        let released = tx.release(&p.id).unwrap();

        assert_eq!(released.patient.status, PatientStatus::Discharged);
        assert!(released.patient.discharge_date.is_some());
        assert!(released.patient.assigned_room.is_none());
        assert_eq!(released.room.status, RoomStatus::Cleaning);
        assert!(!released.room.occupied);
        assert!(released.room.patient_id.is_none());
        assert!(released.room.last_cleaned.is_some());
        assert!(released.room.is_consistent());
    }

    #[test]
    fn test_release_without_room_is_conflict() {
        let (store, tx) = setup();
        let p = patient("Ada", Condition::Normal, 0);
        store.insert_patient(&p).unwrap();

        let err = tx.release(&p.id).unwrap_err();
        assert!(matches!(
            err,
            HospitalError::Conflict(ConflictReason::PatientHasNoRoom)
        ));
    }

    #[test]
    fn test_discharged_patient_cannot_be_reassigned() {
        let (store, tx) = setup();
        let p = patient("Ada", Condition::Normal, 0);
        let first = room("101", RoomType::General, 1);
        let second = room("102", RoomType::General, 1);
        store.insert_patient(&p).unwrap();
        store.insert_room(&first).unwrap();
        store.insert_room(&second).unwrap();
        tx.assign(&p.id, &first.id).unwrap();
        tx.release(&p.id).unwrap();

        let err = tx.assign(&p.id, &second.id).unwrap_err();
        assert!(matches!(
            err,
            HospitalError::Conflict(ConflictReason::PatientDischarged)
        ));
    }

    /// Races several patients for one ICU room, spreading the transactions over `stores`,
    /// which must all view the same data.
    fn assert_single_winner(stores: &[Arc<dyn EntityStore>]) {
        let r = room("ICU-1", RoomType::Icu, 1);
        stores[0].insert_room(&r).unwrap();
        let contenders: Vec<Patient> = (0..6)
            .map(|i| patient(&format!("p{i}"), Condition::Critical, i))
            .collect();
        for p in &contenders {
            stores[0].insert_patient(p).unwrap();
        }

        let barrier = Arc::new(Barrier::new(contenders.len()));
        let handles: Vec<_> = contenders
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let tx = AssignmentTransaction::new(stores[i % stores.len()].clone());
                let barrier = barrier.clone();
                let (patient_id, room_id) = (p.id, r.id);
                thread::spawn(move || {
                    barrier.wait();
                    tx.assign(&patient_id, &room_id)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners: Vec<&Assignment> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(
                err,
                HospitalError::Conflict(ConflictReason::RoomUnavailable { .. })
            ));
        }

        let final_room = stores[0].find_room(&r.id).unwrap().unwrap();
        assert!(final_room.is_consistent());
        assert_eq!(final_room.patient_id, Some(winners[0].patient.id));
        let linked = stores[0]
            .query_patients(&PatientQuery::in_rooms())
            .unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].id, winners[0].patient.id);
    }

    #[test]
    fn test_concurrent_assign_has_exactly_one_winner() {
        let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new());
        assert_single_winner(&[store]);
    }

    #[test]
    fn test_concurrent_assign_across_file_store_handles_has_exactly_one_winner() {
        for _ in 0..20 {
            let temp_dir = TempDir::new().expect("Failed to create temp dir");
            let stores: Vec<Arc<dyn EntityStore>> = vec![
                Arc::new(FileStore::open(temp_dir.path()).unwrap()),
                Arc::new(FileStore::open(temp_dir.path()).unwrap()),
            ];
            assert_single_winner(&stores);
        }
    }

    /// Store wrapper that fails selected writes, to exercise the compensating writes.
    struct FaultyStore {
        inner: MemoryStore,
        fail_patient_writes: AtomicBool,
        failing_room: Mutex<Option<RoomId>>,
    }

    impl FaultyStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                fail_patient_writes: AtomicBool::new(false),
                failing_room: Mutex::new(None),
            }
        }

        fn fail_patient_writes(&self) {
            self.fail_patient_writes.store(true, Ordering::SeqCst);
        }

        fn fail_writes_to_room(&self, id: RoomId) {
            *self.failing_room.lock().unwrap() = Some(id);
        }
    }

    impl EntityStore for FaultyStore {
        fn query_patients(&self, q: &PatientQuery) -> StoreResult<Vec<Patient>> {
            self.inner.query_patients(q)
        }
        fn find_patient(&self, id: &PatientId) -> StoreResult<Option<Patient>> {
            self.inner.find_patient(id)
        }
        fn insert_patient(&self, p: &Patient) -> StoreResult<()> {
            self.inner.insert_patient(p)
        }
        fn update_patient_if(
            &self,
            id: &PatientId,
            expected: &dyn Fn(&Patient) -> bool,
            apply: &mut dyn FnMut(&mut Patient),
        ) -> StoreResult<WriteOutcome<Patient>> {
            if self.fail_patient_writes.load(Ordering::SeqCst) {
                return Err(StoreError::LockPoisoned);
            }
            self.inner.update_patient_if(id, expected, apply)
        }
        fn delete_patient_if(
            &self,
            id: &PatientId,
            expected: &dyn Fn(&Patient) -> bool,
        ) -> StoreResult<WriteOutcome<Patient>> {
            self.inner.delete_patient_if(id, expected)
        }
        fn query_rooms(&self, q: &RoomQuery) -> StoreResult<Vec<Room>> {
            self.inner.query_rooms(q)
        }
        fn find_room(&self, id: &RoomId) -> StoreResult<Option<Room>> {
            self.inner.find_room(id)
        }
        fn insert_room(&self, r: &Room) -> StoreResult<()> {
            self.inner.insert_room(r)
        }
        fn update_room_if(
            &self,
            id: &RoomId,
            expected: &dyn Fn(&Room) -> bool,
            apply: &mut dyn FnMut(&mut Room),
        ) -> StoreResult<WriteOutcome<Room>> {
            if *self.failing_room.lock().unwrap() == Some(*id) {
                return Err(StoreError::LockPoisoned);
            }
            self.inner.update_room_if(id, expected, apply)
        }
        fn delete_room_if_unoccupied(&self, id: &RoomId) -> StoreResult<WriteOutcome<Room>> {
            self.inner.delete_room_if_unoccupied(id)
        }
    }

    #[test]
    fn test_failed_patient_write_rolls_back_room_claim() {
        let store = Arc::new(FaultyStore::new());
        let p = patient("Ada", Condition::Critical, 0);
        let r = room("ICU-1", RoomType::Icu, 1);
        store.insert_patient(&p).unwrap();
        store.insert_room(&r).unwrap();
        store.fail_patient_writes();
        let tx = AssignmentTransaction::new(store.clone());

        let err = tx.assign(&p.id, &r.id).unwrap_err();

        assert!(matches!(err, HospitalError::Store(_)));
        let after = store.find_room(&r.id).unwrap().unwrap();
        assert!(after.is_available());
        assert!(after.is_consistent());
    }

    #[test]
    fn test_failed_vacate_during_transfer_restores_both_links() {
        let store = Arc::new(FaultyStore::new());
        let p = patient("Ada", Condition::Stable, 0);
        let first = room("101", RoomType::General, 1);
        let second = room("102", RoomType::Private, 1);
        store.insert_patient(&p).unwrap();
        store.insert_room(&first).unwrap();
        store.insert_room(&second).unwrap();
        let tx = AssignmentTransaction::new(store.clone());
        let before = tx.assign(&p.id, &first.id).unwrap().patient;
        store.fail_writes_to_room(first.id);

        let err = tx.assign(&p.id, &second.id).unwrap_err();

        assert!(matches!(err, HospitalError::Store(_)));
        let restored = store.find_patient(&p.id).unwrap().unwrap();
        assert_eq!(restored, before);
        let kept = store.find_room(&first.id).unwrap().unwrap();
        assert!(kept.is_consistent());
        assert_eq!(kept.patient_id, Some(p.id));
        let freed = store.find_room(&second.id).unwrap().unwrap();
        assert!(freed.is_consistent());
        assert!(freed.is_available());
    }

    #[test]
    fn test_failed_room_write_during_release_restores_patient() {
        let store = Arc::new(FaultyStore::new());
        let p = patient("Ada", Condition::Critical, 0);
        let r = room("ICU-1", RoomType::Icu, 1);
        store.insert_patient(&p).unwrap();
        store.insert_room(&r).unwrap();
        let tx = AssignmentTransaction::new(store.clone());
        let before = tx.assign(&p.id, &r.id).unwrap().patient;
        store.fail_writes_to_room(r.id);

        let err = tx.release(&p.id).unwrap_err();

        assert!(matches!(err, HospitalError::Store(_)));
        let restored = store.find_patient(&p.id).unwrap().unwrap();
        assert_eq!(restored, before);
        assert!(restored.discharge_date.is_none());
        let held = store.find_room(&r.id).unwrap().unwrap();
        assert!(held.is_consistent());
        assert_eq!(held.patient_id, Some(p.id));
        assert_eq!(held.status, RoomStatus::Occupied);
    }

    #[test]
    fn test_release_into_missing_room_restores_patient() {
        let (store, tx) = setup();
        let mut p = patient("Ada", Condition::Normal, 0);
        p.assigned_room = Some(RoomId::new());
        store.insert_patient(&p).unwrap();

        let err = tx.release(&p.id).unwrap_err();

        assert!(matches!(
            err,
            HospitalError::NotFound {
                entity: EntityKind::Room,
                ..
            }
        ));
        assert_eq!(store.find_patient(&p.id).unwrap().unwrap(), p);
    }

    #[test]
    fn test_restore_leaves_concurrently_changed_patient_alone() {
        let (store, tx) = setup();
        let p = patient("Ada", Condition::Stable, 0);
        let r = room("101", RoomType::General, 1);
        let other = RoomId::new();
        store.insert_patient(&p).unwrap();
        store.insert_room(&r).unwrap();
        let linked = tx.assign(&p.id, &r.id).unwrap().patient;
        store
            .update_patient_if(&p.id, &|_| true, &mut |p| p.assigned_room = Some(other))
            .unwrap();

        let err = tx
            .restore_patient(&p, &|p| p.assigned_room == Some(r.id))
            .unwrap_err();

        assert!(matches!(err, HospitalError::Internal(_)));
        let current = store.find_patient(&p.id).unwrap().unwrap();
        assert_eq!(current.assigned_room, Some(other));
        assert_eq!(current.status, linked.status);
    }
}

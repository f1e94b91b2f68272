//! The hospital service: the one entry point API layers call.
//!
//! Every successful mutation publishes exactly one [`HospitalEvent`]. Admission that triggers an
//! allocation publishes the admission and then the allocation.

use crate::allocator::{AllocationOutcome, Allocator};
use crate::assignment::{Assignment, AssignmentTransaction};
use crate::config::CoreConfig;
use crate::dashboard::{summarize, DashboardSummary};
use crate::error::{ConflictReason, EntityKind, HospitalError, HospitalResult};
use crate::events::{EventSink, HospitalEvent};
use crate::models::{
    NewPatient, NewRoom, Patient, PatientId, PatientUpdate, Room, RoomId, RoomStatus, RoomUpdate,
};
use crate::store::{EntityStore, PatientQuery, RoomQuery, WriteOutcome};
use crate::transfer::{suggest_transfers, TransferSuggestion};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

/// Result of admitting a patient.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Admission {
    /// The admitted patient as stored after any allocation.
    pub patient: Patient,
    /// Present when admission triggered an allocation run.
    pub allocation: Option<AllocationOutcome>,
}

#[derive(Clone)]
pub struct HospitalService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn EntityStore>,
    events: Arc<dyn EventSink>,
    allocator: Allocator,
    transaction: AssignmentTransaction,
}

impl HospitalService {
    pub fn new(
        cfg: Arc<CoreConfig>,
        store: Arc<dyn EntityStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let transaction = AssignmentTransaction::new(store.clone());
        let allocator = Allocator::new(store.clone(), transaction.clone());
        Self {
            cfg,
            store,
            events,
            allocator,
            transaction,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    // ===== PATIENTS =====

    /// Admits a patient and, if they arrive as `Admitted`, runs auto-allocation.
    ///
    /// # Arguments
    ///
    /// * `input` - Patient details. `status` defaults to `Admitted`.
    ///
    /// # Returns
    ///
    /// The stored patient together with the allocation outcome, if allocation ran. Allocation
    /// serves the most urgent waiting patient, which is not necessarily the one just admitted.
    ///
    /// # Errors
    ///
    /// Returns [`HospitalError::Validation`] for malformed input and store errors otherwise.
    /// A failed allocation after a successful admission is logged and reported as no outcome.
    pub fn admit_patient(&self, input: NewPatient) -> HospitalResult<Admission> {
        let patient = input.into_patient(Utc::now())?;
        self.store.insert_patient(&patient)?;
        tracing::info!(
            "admitted patient {} ({}, priority {})",
            patient.id,
            patient.condition,
            patient.priority
        );
        self.events.publish(HospitalEvent::PatientAdmitted {
            patient: patient.clone(),
        });

        if !(self.cfg.auto_allocate_on_admission() && patient.is_waiting()) {
            return Ok(Admission {
                patient,
                allocation: None,
            });
        }

        let allocation = match self.auto_allocate() {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!("auto-allocation after admission error: {:?}", e);
                None
            }
        };
        let patient = self.store.find_patient(&patient.id)?.unwrap_or(patient);
        Ok(Admission {
            patient,
            allocation,
        })
    }

    pub fn list_patients(&self, query: &PatientQuery) -> HospitalResult<Vec<Patient>> {
        Ok(self.store.query_patients(query)?)
    }

    /// Waiting patients in the order auto-allocation will serve them.
    pub fn waiting_patients(&self) -> HospitalResult<Vec<Patient>> {
        self.list_patients(&PatientQuery::waiting())
    }

    pub fn get_patient(&self, id: &PatientId) -> HospitalResult<Patient> {
        self.store
            .find_patient(id)?
            .ok_or_else(|| HospitalError::not_found(EntityKind::Patient, id))
    }

    /// Edits a patient's profile. Priority is recomputed from the resulting condition.
    pub fn update_patient(&self, id: &PatientId, update: PatientUpdate) -> HospitalResult<Patient> {
        update.validate()?;
        match self
            .store
            .update_patient_if(id, &|_| true, &mut |p| update.apply(p))?
        {
            WriteOutcome::Applied(patient) => {
                self.events.publish(HospitalEvent::PatientUpdated {
                    patient: patient.clone(),
                });
                Ok(patient)
            }
            WriteOutcome::Rejected(_) | WriteOutcome::Missing => {
                Err(HospitalError::not_found(EntityKind::Patient, id))
            }
        }
    }

    /// Deletes a patient record. Patients holding a room must be released first.
    pub fn delete_patient(&self, id: &PatientId) -> HospitalResult<Patient> {
        match self
            .store
            .delete_patient_if(id, &|p| p.assigned_room.is_none())?
        {
            WriteOutcome::Applied(patient) => {
                tracing::info!("deleted patient {}", id);
                self.events
                    .publish(HospitalEvent::PatientDeleted { patient_id: *id });
                Ok(patient)
            }
            WriteOutcome::Rejected(current) => {
                let room_number = match current.assigned_room {
                    Some(room_id) => self
                        .store
                        .find_room(&room_id)?
                        .map(|r| r.room_number.to_string())
                        .unwrap_or_else(|| room_id.to_string()),
                    None => String::new(),
                };
                Err(HospitalError::Conflict(ConflictReason::PatientHoldsRoom {
                    room_number,
                }))
            }
            WriteOutcome::Missing => Err(HospitalError::not_found(EntityKind::Patient, id)),
        }
    }

    // ===== ROOMS =====

    pub fn create_room(&self, input: NewRoom) -> HospitalResult<Room> {
        let room = input.into_room(Utc::now())?;
        self.store.insert_room(&room)?;
        tracing::info!(
            "created room {} ({}, floor {})",
            room.room_number,
            room.room_type,
            room.floor
        );
        self.events
            .publish(HospitalEvent::RoomCreated { room: room.clone() });
        Ok(room)
    }

    pub fn list_rooms(&self, query: &RoomQuery) -> HospitalResult<Vec<Room>> {
        Ok(self.store.query_rooms(query)?)
    }

    pub fn get_room(&self, id: &RoomId) -> HospitalResult<Room> {
        self.store
            .find_room(id)?
            .ok_or_else(|| HospitalError::not_found(EntityKind::Room, id))
    }

    /// Edits a room's profile. The room type can only change while the room is unoccupied.
    pub fn update_room(&self, id: &RoomId, update: RoomUpdate) -> HospitalResult<Room> {
        let room_number = update.validate()?;
        let new_type = update.room_type;
        let outcome = self.store.update_room_if(
            id,
            &|r| new_type.map_or(true, |t| t == r.room_type || !r.occupied),
            &mut |r| update.apply(r, room_number.as_ref()),
        )?;
        match outcome {
            WriteOutcome::Applied(room) => {
                self.events
                    .publish(HospitalEvent::RoomUpdated { room: room.clone() });
                Ok(room)
            }
            WriteOutcome::Rejected(current) => {
                Err(HospitalError::Conflict(ConflictReason::RoomOccupied {
                    room_number: current.room_number.to_string(),
                }))
            }
            WriteOutcome::Missing => Err(HospitalError::not_found(EntityKind::Room, id)),
        }
    }

    /// Moves an unoccupied room between `Available`, `Cleaning` and `Maintenance`.
    ///
    /// `Occupied` is never set here; only assignment and release move rooms in and out of it.
    pub fn update_room_status(&self, id: &RoomId, to: RoomStatus) -> HospitalResult<Room> {
        let now = Utc::now();
        let outcome = self.store.update_room_if(
            id,
            &|r| !r.occupied && r.status.can_set_manually(to),
            &mut |r| {
                if r.status == RoomStatus::Cleaning && to == RoomStatus::Available {
                    r.last_cleaned = Some(now);
                }
                r.status = to;
            },
        )?;
        match outcome {
            WriteOutcome::Applied(room) => {
                tracing::info!("room {} is now {}", room.room_number, room.status);
                self.events
                    .publish(HospitalEvent::RoomUpdated { room: room.clone() });
                Ok(room)
            }
            WriteOutcome::Rejected(current) => {
                Err(HospitalError::Conflict(ConflictReason::InvalidTransition {
                    from: current.status.to_string(),
                    to: to.to_string(),
                }))
            }
            WriteOutcome::Missing => Err(HospitalError::not_found(EntityKind::Room, id)),
        }
    }

    pub fn delete_room(&self, id: &RoomId) -> HospitalResult<Room> {
        match self.store.delete_room_if_unoccupied(id)? {
            WriteOutcome::Applied(room) => {
                tracing::info!("deleted room {}", room.room_number);
                self.events.publish(HospitalEvent::RoomDeleted { room_id: *id });
                Ok(room)
            }
            WriteOutcome::Rejected(current) => {
                Err(HospitalError::Conflict(ConflictReason::RoomOccupied {
                    room_number: current.room_number.to_string(),
                }))
            }
            WriteOutcome::Missing => Err(HospitalError::not_found(EntityKind::Room, id)),
        }
    }

    // ===== ALLOCATION =====

    pub fn assign_room(&self, patient_id: &PatientId, room_id: &RoomId) -> HospitalResult<Assignment> {
        let assignment = self.transaction.assign(patient_id, room_id)?;
        self.events.publish(HospitalEvent::RoomAssigned {
            patient: assignment.patient.clone(),
            room: assignment.room.clone(),
            vacated_room: assignment.vacated_room.clone(),
        });
        Ok(assignment)
    }

    pub fn release_room(&self, patient_id: &PatientId) -> HospitalResult<Assignment> {
        let released = self.transaction.release(patient_id)?;
        self.events.publish(HospitalEvent::RoomReleased {
            patient: released.patient.clone(),
            room: released.room.clone(),
        });
        Ok(released)
    }

    pub fn auto_allocate(&self) -> HospitalResult<AllocationOutcome> {
        let outcome = self.allocator.auto_allocate()?;
        if let Some(event) = HospitalEvent::from_allocation(&outcome) {
            self.events.publish(event);
        }
        Ok(outcome)
    }

    // ===== READ MODELS =====

    pub fn transfer_suggestions(&self) -> HospitalResult<Vec<TransferSuggestion>> {
        let patients = self.store.query_patients(&PatientQuery::in_rooms())?;
        let rooms = self.store.query_rooms(&RoomQuery::default())?;
        Ok(suggest_transfers(&patients, &rooms))
    }

    pub fn summary(&self) -> HospitalResult<DashboardSummary> {
        let patients = self.store.query_patients(&PatientQuery::default())?;
        let rooms = self.store.query_rooms(&RoomQuery::default())?;
        Ok(summarize(&patients, &rooms))
    }
}

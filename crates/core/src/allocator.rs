//! Room allocation: which waiting patient goes next, and which room they get.
//!
//! The decision functions ([`required_room_category`], [`pick_best_room`]) are pure so they
//! can be tested without a store. [`Allocator`] feeds them from the store and hands the chosen
//! pair to the [`AssignmentTransaction`].

use crate::assignment::AssignmentTransaction;
use crate::constants::MAX_ALLOCATION_ATTEMPTS;
use crate::error::{HospitalError, HospitalResult};
use crate::models::{Condition, Patient, Room, RoomType};
use crate::store::{room_order, EntityStore, PatientQuery, RoomQuery};
use serde::Serialize;
use std::sync::Arc;

/// Room type a patient's condition calls for.
pub fn required_room_category(condition: Condition) -> RoomType {
    match condition {
        Condition::Critical => RoomType::Icu,
        Condition::Stable | Condition::Normal => RoomType::General,
    }
}

/// Picks the best room out of `rooms` for a patient in `condition` needing `category`.
///
/// Only available rooms are considered. Tiers, first match wins:
/// 1. a room of exactly `category`
/// 2. for Critical patients, any ICU room
/// 3. for everyone else, any General or Private room
///
/// Within a tier the lowest floor wins, then the lowest room number.
pub fn pick_best_room<'a>(
    rooms: impl IntoIterator<Item = &'a Room>,
    category: RoomType,
    condition: Condition,
) -> Option<&'a Room> {
    let mut candidates: Vec<&Room> = rooms.into_iter().filter(|r| r.is_available()).collect();
    candidates.sort_by(|a, b| room_order(a, b));

    let fallback: &[RoomType] = if condition == Condition::Critical {
        &[RoomType::Icu]
    } else {
        &[RoomType::General, RoomType::Private]
    };

    candidates
        .iter()
        .find(|r| r.room_type == category)
        .or_else(|| candidates.iter().find(|r| fallback.contains(&r.room_type)))
        .copied()
}

/// Result of one auto-allocation run. Absence of a match is a normal outcome.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AllocationOutcome {
    Allocated {
        patient: Patient,
        room: Room,
    },
    NoWaitingPatients,
    NoSuitableRoom {
        category: RoomType,
        patient: Patient,
    },
}

impl AllocationOutcome {
    pub fn is_allocated(&self) -> bool {
        matches!(self, AllocationOutcome::Allocated { .. })
    }

    /// Human readable explanation for the no-op outcomes.
    pub fn reason(&self) -> Option<String> {
        match self {
            AllocationOutcome::Allocated { .. } => None,
            AllocationOutcome::NoWaitingPatients => Some("no waiting patients".into()),
            AllocationOutcome::NoSuitableRoom { category, .. } => Some(format!(
                "no suitable room for category {category}, patient still waiting"
            )),
        }
    }
}

#[derive(Clone)]
pub struct Allocator {
    store: Arc<dyn EntityStore>,
    transaction: AssignmentTransaction,
}

impl Allocator {
    pub fn new(store: Arc<dyn EntityStore>, transaction: AssignmentTransaction) -> Self {
        Self { store, transaction }
    }

    /// The most urgent waiting patient: lowest priority number, then earliest admission.
    pub fn select_next_patient(&self) -> HospitalResult<Option<Patient>> {
        Ok(self
            .store
            .query_patients(&PatientQuery::waiting())?
            .into_iter()
            .next())
    }

    pub fn find_best_room(
        &self,
        category: RoomType,
        condition: Condition,
    ) -> HospitalResult<Option<Room>> {
        let rooms = self.store.query_rooms(&RoomQuery::available(None))?;
        Ok(pick_best_room(&rooms, category, condition).cloned())
    }

    /// Allocates a room to the next waiting patient.
    ///
    /// If the chosen room or patient is taken by a concurrent request between selection and
    /// assignment, selection is repeated, up to [`MAX_ALLOCATION_ATTEMPTS`] times.
    ///
    /// # Errors
    ///
    /// Only store failures and failed rollbacks are errors. Running out of patients or rooms is
    /// reported through the outcome.
    pub fn auto_allocate(&self) -> HospitalResult<AllocationOutcome> {
        let mut last_miss = None;

        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            let Some(patient) = self.select_next_patient()? else {
                return Ok(AllocationOutcome::NoWaitingPatients);
            };
            let category = required_room_category(patient.condition);
            let Some(room) = self.find_best_room(category, patient.condition)? else {
                tracing::info!(
                    "no {} room for patient {} ({}), still waiting",
                    category,
                    patient.id,
                    patient.condition
                );
                return Ok(AllocationOutcome::NoSuitableRoom { category, patient });
            };

            match self.transaction.assign(&patient.id, &room.id) {
                Ok(assignment) => {
                    tracing::info!(
                        "auto-allocated room {} to patient {} ({})",
                        assignment.room.room_number,
                        assignment.patient.id,
                        assignment.patient.condition
                    );
                    return Ok(AllocationOutcome::Allocated {
                        patient: assignment.patient,
                        room: assignment.room,
                    });
                }
                Err(e @ (HospitalError::Conflict(_) | HospitalError::NotFound { .. })) => {
                    tracing::debug!("allocation attempt {} lost a race: {}", attempt, e);
                    last_miss = Some((category, patient));
                }
                Err(e) => return Err(e),
            }
        }

        match last_miss {
            Some((category, patient)) => {
                tracing::warn!(
                    "giving up on patient {} after {} contended attempts",
                    patient.id,
                    MAX_ALLOCATION_ATTEMPTS
                );
                Ok(AllocationOutcome::NoSuitableRoom { category, patient })
            }
            None => Ok(AllocationOutcome::NoWaitingPatients),
        }
    }
}

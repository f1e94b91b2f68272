//! Ward overview figures.

use crate::models::{Condition, Patient, PatientStatus, Room, RoomStatus, RoomType};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_rooms: usize,
    /// Room count for every status, including zero counts.
    pub rooms_by_status: BTreeMap<String, usize>,
    /// Rooms that can take a patient now, per room type.
    pub available_by_type: BTreeMap<String, usize>,
    /// Patients not yet discharged.
    pub active_patients: usize,
    pub waiting_patients: usize,
    /// Active patients per condition.
    pub patients_by_condition: BTreeMap<String, usize>,
    /// Occupied rooms as a fraction of all rooms, 0.0 when there are none.
    pub occupancy_rate: f64,
}

pub fn summarize(patients: &[Patient], rooms: &[Room]) -> DashboardSummary {
    let mut rooms_by_status: BTreeMap<String, usize> = RoomStatus::ALL
        .iter()
        .map(|s| (s.to_string(), 0))
        .collect();
    let mut available_by_type: BTreeMap<String, usize> =
        RoomType::ALL.iter().map(|t| (t.to_string(), 0)).collect();
    for room in rooms {
        *rooms_by_status.entry(room.status.to_string()).or_default() += 1;
        if room.is_available() {
            *available_by_type.entry(room.room_type.to_string()).or_default() += 1;
        }
    }

    let active: Vec<&Patient> = patients
        .iter()
        .filter(|p| p.status != PatientStatus::Discharged)
        .collect();
    let mut patients_by_condition: BTreeMap<String, usize> = Condition::ALL
        .iter()
        .map(|c| (c.to_string(), 0))
        .collect();
    for patient in &active {
        *patients_by_condition
            .entry(patient.condition.to_string())
            .or_default() += 1;
    }

    let occupied = rooms.iter().filter(|r| r.occupied).count();
    let occupancy_rate = if rooms.is_empty() {
        0.0
    } else {
        occupied as f64 / rooms.len() as f64
    };

    DashboardSummary {
        total_rooms: rooms.len(),
        rooms_by_status,
        available_by_type,
        active_patients: active.len(),
        waiting_patients: active.iter().filter(|p| p.is_waiting()).count(),
        patients_by_condition,
        occupancy_rate,
    }
}

//! Advisory transfer suggestions.
//!
//! A patient is flagged when the room they occupy is not of the category their condition calls
//! for. Nothing here writes to the store.

use crate::allocator::required_room_category;
use crate::models::{Patient, Room, RoomId, RoomType};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TransferSuggestion {
    pub patient: Patient,
    pub current_room: Room,
    pub ideal_category: RoomType,
}

/// Lists assigned patients whose room type differs from their ideal category, most urgent
/// first. Patients whose referenced room is not in `rooms` are skipped.
pub fn suggest_transfers(patients: &[Patient], rooms: &[Room]) -> Vec<TransferSuggestion> {
    let by_id: HashMap<RoomId, &Room> = rooms.iter().map(|r| (r.id, r)).collect();

    let mut suggestions: Vec<TransferSuggestion> = patients
        .iter()
        .filter_map(|patient| {
            let room = by_id.get(&patient.assigned_room?)?;
            let ideal_category = required_room_category(patient.condition);
            (room.room_type != ideal_category).then(|| TransferSuggestion {
                patient: patient.clone(),
                current_room: (*room).clone(),
                ideal_category,
            })
        })
        .collect();

    suggestions.sort_by(|a, b| {
        a.patient
            .priority
            .cmp(&b.patient.priority)
            .then_with(|| a.patient.admission_date.cmp(&b.patient.admission_date))
    });
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Condition;
    use crate::store::test_support::{patient, room};

    fn placed(name: &str, condition: Condition, minutes: i64, room: &Room) -> Patient {
        let mut p = patient(name, condition, minutes);
        p.assigned_room = Some(room.id);
        p
    }

    #[test]
    fn test_flags_mismatched_rooms_only() {
        let icu = room("ICU-1", RoomType::Icu, 1);
        let general = room("101", RoomType::General, 1);
        let private = room("P-1", RoomType::Private, 2);
        let patients = vec![
            placed("stable-in-icu", Condition::Stable, 0, &icu),
            placed("critical-in-general", Condition::Critical, 10, &general),
            placed("normal-in-private", Condition::Normal, 20, &private),
            patient("waiting", Condition::Critical, 30),
        ];
        let rooms = vec![icu, general, private];

        let suggestions = suggest_transfers(&patients, &rooms);

        let flagged: Vec<(&str, RoomType)> = suggestions
            .iter()
            .map(|s| (s.patient.name.as_str(), s.ideal_category))
            .collect();
        assert_eq!(
            flagged,
            vec![
                ("critical-in-general", RoomType::Icu),
                ("stable-in-icu", RoomType::General),
                ("normal-in-private", RoomType::General),
            ]
        );
    }

    #[test]
    fn test_matching_rooms_yield_nothing() {
        let icu = room("ICU-1", RoomType::Icu, 1);
        let patients = vec![placed("ok", Condition::Critical, 0, &icu)];
        assert!(suggest_transfers(&patients, &[icu]).is_empty());
    }

    #[test]
    fn test_dangling_room_reference_is_skipped() {
        let ghost = room("X-1", RoomType::General, 1);
        let patients = vec![placed("lost", Condition::Critical, 0, &ghost)];
        assert!(suggest_transfers(&patients, &[]).is_empty());
    }
}

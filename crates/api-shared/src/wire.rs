//! Request and response bodies for the HMS APIs.
//!
//! Enumerations and timestamps travel as strings (RFC 3339 for timestamps, identifiers in their
//! 32-hex form). Requests are converted into core inputs with the `into_*` methods, which report
//! malformed values as [`HospitalError::Validation`].

use chrono::{DateTime, SecondsFormat, Utc};
use hms_core::{
    AllocationOutcome, Assignment, Condition, DashboardSummary, HospitalError, HospitalResult,
    NewPatient, NewRoom, Patient, PatientId, PatientStatus, PatientUpdate, Room, RoomId,
    RoomStatus, RoomType, RoomUpdate, TransferSuggestion,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(field: &str, value: &str) -> HospitalResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| HospitalError::Validation(format!("{field}: {e}")))
}

fn parse_opt<T>(value: Option<String>) -> HospitalResult<Option<T>>
where
    T: std::str::FromStr<Err = HospitalError>,
{
    value.map(|v| v.parse()).transpose()
}

// ===== HEALTH / ERRORS =====

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Body of every non-2xx response.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    /// Error class: `validation`, `not_found`, `conflict`, `unauthorized` or `internal`.
    pub error: String,
    pub message: String,
}

// ===== PATIENTS =====

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub condition: String,
    pub priority: u8,
    pub status: String,
    pub assigned_room: Option<String>,
    pub admission_date: String,
    pub discharge_date: Option<String>,
    pub notes: Option<String>,
}

impl From<&Patient> for PatientRes {
    fn from(p: &Patient) -> Self {
        Self {
            id: p.id.to_string(),
            name: p.name.clone(),
            age: p.age,
            condition: p.condition.to_string(),
            priority: p.priority,
            status: p.status.to_string(),
            assigned_room: p.assigned_room.map(|r| r.to_string()),
            admission_date: timestamp(&p.admission_date),
            discharge_date: p.discharge_date.as_ref().map(timestamp),
            notes: p.notes.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientRes>,
}

impl ListPatientsRes {
    pub fn from_patients(patients: &[Patient]) -> Self {
        Self {
            patients: patients.iter().map(PatientRes::from).collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AdmitPatientReq {
    pub name: String,
    pub age: u32,
    /// `Critical`, `Stable` or `Normal`.
    pub condition: String,
    /// `Admitted` (default) or `Pending`.
    #[serde(default)]
    pub status: Option<String>,
    /// RFC 3339; defaults to now.
    #[serde(default)]
    pub admission_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl AdmitPatientReq {
    pub fn into_new_patient(self) -> HospitalResult<NewPatient> {
        Ok(NewPatient {
            name: self.name,
            age: self.age,
            condition: self.condition.parse::<Condition>()?,
            status: parse_opt::<PatientStatus>(self.status)?,
            admission_date: self
                .admission_date
                .map(|v| parse_timestamp("admission_date", &v))
                .transpose()?,
            notes: self.notes,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AdmitPatientRes {
    pub patient: PatientRes,
    /// Present when admission triggered auto-allocation.
    pub allocation: Option<AllocationRes>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdatePatientReq {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub condition: Option<String>,
    /// An empty string clears the notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl UpdatePatientReq {
    pub fn into_update(self) -> HospitalResult<PatientUpdate> {
        Ok(PatientUpdate {
            name: self.name,
            age: self.age,
            condition: parse_opt::<Condition>(self.condition)?,
            notes: self.notes,
        })
    }
}

// ===== ROOMS =====

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RoomRes {
    pub id: String,
    pub room_number: String,
    pub room_type: String,
    pub floor: i32,
    pub capacity: u32,
    pub amenities: Vec<String>,
    pub occupied: bool,
    pub status: String,
    pub patient_id: Option<String>,
    pub last_cleaned: Option<String>,
    pub created_at: String,
}

impl From<&Room> for RoomRes {
    fn from(r: &Room) -> Self {
        Self {
            id: r.id.to_string(),
            room_number: r.room_number.to_string(),
            room_type: r.room_type.to_string(),
            floor: r.floor,
            capacity: r.capacity,
            amenities: r.amenities.clone(),
            occupied: r.occupied,
            status: r.status.to_string(),
            patient_id: r.patient_id.map(|p| p.to_string()),
            last_cleaned: r.last_cleaned.as_ref().map(timestamp),
            created_at: timestamp(&r.created_at),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListRoomsRes {
    pub rooms: Vec<RoomRes>,
}

impl ListRoomsRes {
    pub fn from_rooms(rooms: &[Room]) -> Self {
        Self {
            rooms: rooms.iter().map(RoomRes::from).collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateRoomReq {
    pub room_number: String,
    /// `ICU`, `General`, `Private`, `Emergency` or `Surgery`.
    pub room_type: String,
    pub floor: i32,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub amenities: Vec<String>,
    /// `Available` (default), `Maintenance` or `Cleaning`.
    #[serde(default)]
    pub status: Option<String>,
}

impl CreateRoomReq {
    pub fn into_new_room(self) -> HospitalResult<NewRoom> {
        Ok(NewRoom {
            room_number: self.room_number,
            room_type: self.room_type.parse::<RoomType>()?,
            floor: self.floor,
            capacity: self.capacity.unwrap_or(1),
            amenities: self.amenities,
            status: parse_opt::<RoomStatus>(self.status)?,
        })
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateRoomReq {
    #[serde(default)]
    pub room_number: Option<String>,
    #[serde(default)]
    pub room_type: Option<String>,
    #[serde(default)]
    pub floor: Option<i32>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub amenities: Option<Vec<String>>,
}

impl UpdateRoomReq {
    pub fn into_update(self) -> HospitalResult<RoomUpdate> {
        Ok(RoomUpdate {
            room_number: self.room_number,
            room_type: parse_opt::<RoomType>(self.room_type)?,
            floor: self.floor,
            capacity: self.capacity,
            amenities: self.amenities,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateRoomStatusReq {
    /// `Available`, `Maintenance` or `Cleaning`.
    pub status: String,
}

impl UpdateRoomStatusReq {
    pub fn target(&self) -> HospitalResult<RoomStatus> {
        self.status.parse()
    }
}

// ===== ALLOCATION =====

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AssignRoomReq {
    pub patient_id: String,
    pub room_id: String,
}

impl AssignRoomReq {
    pub fn ids(&self) -> HospitalResult<(PatientId, RoomId)> {
        Ok((
            PatientId::parse(&self.patient_id)?,
            RoomId::parse(&self.room_id)?,
        ))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ReleaseRoomReq {
    pub patient_id: String,
}

impl ReleaseRoomReq {
    pub fn id(&self) -> HospitalResult<PatientId> {
        Ok(PatientId::parse(&self.patient_id)?)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AssignmentRes {
    pub patient: PatientRes,
    pub room: RoomRes,
    /// The room a transferred patient left; it is now being cleaned.
    pub vacated_room: Option<RoomRes>,
}

impl From<&Assignment> for AssignmentRes {
    fn from(a: &Assignment) -> Self {
        Self {
            patient: PatientRes::from(&a.patient),
            room: RoomRes::from(&a.room),
            vacated_room: a.vacated_room.as_ref().map(RoomRes::from),
        }
    }
}

/// Outcome of an auto-allocation run. `success == false` is a normal result, with `reason`
/// explaining why nothing was allocated.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AllocationRes {
    pub success: bool,
    pub patient: Option<PatientRes>,
    pub room: Option<RoomRes>,
    /// The room category that was needed, when no room was found.
    pub category: Option<String>,
    pub reason: Option<String>,
}

impl From<&AllocationOutcome> for AllocationRes {
    fn from(outcome: &AllocationOutcome) -> Self {
        let reason = outcome.reason();
        match outcome {
            AllocationOutcome::Allocated { patient, room } => Self {
                success: true,
                patient: Some(PatientRes::from(patient)),
                room: Some(RoomRes::from(room)),
                category: None,
                reason,
            },
            AllocationOutcome::NoWaitingPatients => Self {
                success: false,
                patient: None,
                room: None,
                category: None,
                reason,
            },
            AllocationOutcome::NoSuitableRoom { category, patient } => Self {
                success: false,
                patient: Some(PatientRes::from(patient)),
                room: None,
                category: Some(category.to_string()),
                reason,
            },
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TransferSuggestionRes {
    pub patient: PatientRes,
    pub current_room: RoomRes,
    pub ideal_category: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListTransferSuggestionsRes {
    pub suggestions: Vec<TransferSuggestionRes>,
}

impl ListTransferSuggestionsRes {
    pub fn from_suggestions(suggestions: &[TransferSuggestion]) -> Self {
        Self {
            suggestions: suggestions
                .iter()
                .map(|s| TransferSuggestionRes {
                    patient: PatientRes::from(&s.patient),
                    current_room: RoomRes::from(&s.current_room),
                    ideal_category: s.ideal_category.to_string(),
                })
                .collect(),
        }
    }
}

// ===== DASHBOARD =====

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardRes {
    pub total_rooms: usize,
    pub rooms_by_status: BTreeMap<String, usize>,
    pub available_by_type: BTreeMap<String, usize>,
    pub active_patients: usize,
    pub waiting_patients: usize,
    pub patients_by_condition: BTreeMap<String, usize>,
    /// Occupied rooms as a fraction of all rooms.
    pub occupancy_rate: f64,
}

impl From<DashboardSummary> for DashboardRes {
    fn from(s: DashboardSummary) -> Self {
        Self {
            total_rooms: s.total_rooms,
            rooms_by_status: s.rooms_by_status,
            available_by_type: s.available_by_type,
            active_patients: s.active_patients,
            waiting_patients: s.waiting_patients,
            patients_by_condition: s.patients_by_condition,
            occupancy_rate: s.occupancy_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admit_request_parses_enums_case_insensitively() {
        let req: AdmitPatientReq = serde_json::from_str(
            r#"{"name":"Ada","age":40,"condition":"critical","status":"pending"}"#,
        )
        .unwrap();

        let input = req.into_new_patient().unwrap();

        assert_eq!(input.condition, Condition::Critical);
        assert_eq!(input.status, Some(PatientStatus::Pending));
        assert!(input.admission_date.is_none());
    }

    #[test]
    fn test_admit_request_rejects_unknown_condition() {
        let req = AdmitPatientReq {
            name: "Ada".into(),
            age: 40,
            condition: "grave".into(),
            status: None,
            admission_date: None,
            notes: None,
        };
        assert!(matches!(
            req.into_new_patient(),
            Err(HospitalError::Validation(_))
        ));
    }

    #[test]
    fn test_admit_request_parses_admission_date() {
        let req = AdmitPatientReq {
            name: "Ada".into(),
            age: 40,
            condition: "Stable".into(),
            status: None,
            admission_date: Some("2026-03-01T08:00:00+01:00".into()),
            notes: None,
        };
        let input = req.into_new_patient().unwrap();
        assert_eq!(
            timestamp(&input.admission_date.unwrap()),
            "2026-03-01T07:00:00Z"
        );
    }

    #[test]
    fn test_assign_request_rejects_malformed_ids() {
        let req = AssignRoomReq {
            patient_id: "not-an-id".into(),
            room_id: "550e8400e29b41d4a716446655440000".into(),
        };
        assert!(matches!(req.ids(), Err(HospitalError::Validation(_))));
    }

    #[test]
    fn test_no_waiting_patients_maps_to_unsuccessful_allocation() {
        let res = AllocationRes::from(&AllocationOutcome::NoWaitingPatients);
        assert!(!res.success);
        assert_eq!(res.reason.as_deref(), Some("no waiting patients"));
    }

    #[test]
    fn test_create_room_request_defaults_capacity() {
        let req: CreateRoomReq =
            serde_json::from_str(r#"{"room_number":"101","room_type":"icu","floor":1}"#).unwrap();
        let input = req.into_new_room().unwrap();
        assert_eq!(input.capacity, 1);
        assert_eq!(input.room_type, RoomType::Icu);
        assert!(input.status.is_none());
    }
}

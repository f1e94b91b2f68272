//! Patient records.
//!
//! A patient's `priority` is never chosen by callers: it is derived from `condition` with
//! [`derive_priority`], and the service layer calls that function before every write.

use crate::error::{HospitalError, HospitalResult};
use crate::constants::MAX_PATIENT_AGE;
use crate::models::RoomId;
use chrono::{DateTime, Utc};
use hms_types::NonEmptyText;
use hms_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a patient record.
pub type PatientId = RecordId;

/// Clinical condition reported at admission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Critical,
    Stable,
    Normal,
}

impl Condition {
    pub const ALL: [Condition; 3] = [Condition::Critical, Condition::Stable, Condition::Normal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Critical => "Critical",
            Condition::Stable => "Stable",
            Condition::Normal => "Normal",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = HospitalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Condition::Critical),
            "stable" => Ok(Condition::Stable),
            "normal" => Ok(Condition::Normal),
            other => Err(HospitalError::Validation(format!(
                "unknown condition '{other}' (expected Critical, Stable or Normal)"
            ))),
        }
    }
}

/// Maps a condition to its allocation priority. Lower is more urgent.
pub fn derive_priority(condition: Condition) -> u8 {
    match condition {
        Condition::Critical => 1,
        Condition::Stable => 3,
        Condition::Normal => 5,
    }
}

/// Where a patient is in the admission lifecycle.
///
/// `Pending`/`Admitted` patients without a room are waiting for allocation. `Discharged` is
/// terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatientStatus {
    Pending,
    Admitted,
    Discharged,
}

impl PatientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientStatus::Pending => "Pending",
            PatientStatus::Admitted => "Admitted",
            PatientStatus::Discharged => "Discharged",
        }
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatientStatus {
    type Err = HospitalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(PatientStatus::Pending),
            "admitted" => Ok(PatientStatus::Admitted),
            "discharged" => Ok(PatientStatus::Discharged),
            other => Err(HospitalError::Validation(format!(
                "unknown patient status '{other}' (expected Pending, Admitted or Discharged)"
            ))),
        }
    }
}

/// A stored patient document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
    pub age: u32,
    pub condition: Condition,
    pub priority: u8,
    pub status: PatientStatus,
    #[serde(default)]
    pub assigned_room: Option<RoomId>,
    pub admission_date: DateTime<Utc>,
    #[serde(default)]
    pub discharge_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Patient {
    /// True when the patient is queued for a room.
    pub fn is_waiting(&self) -> bool {
        matches!(
            self.status,
            PatientStatus::Admitted | PatientStatus::Pending
        ) && self.assigned_room.is_none()
    }
}

/// Input for admitting a new patient.
#[derive(Clone, Debug, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub age: u32,
    pub condition: Condition,
    /// Defaults to `Admitted`. `Discharged` is rejected.
    #[serde(default)]
    pub status: Option<PatientStatus>,
    /// Defaults to the time of admission.
    #[serde(default)]
    pub admission_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewPatient {
    /// Validates the input and builds the document to persist.
    pub(crate) fn into_patient(self, now: DateTime<Utc>) -> HospitalResult<Patient> {
        let name = NonEmptyText::new(&self.name)
            .map_err(|e| HospitalError::Validation(format!("name: {e}")))?;
        validate_age(self.age)?;

        let status = self.status.unwrap_or(PatientStatus::Admitted);
        if status == PatientStatus::Discharged {
            return Err(HospitalError::Validation(
                "a patient cannot be admitted as Discharged".into(),
            ));
        }

        Ok(Patient {
            id: PatientId::new(),
            name: name.into_inner(),
            age: self.age,
            condition: self.condition,
            priority: derive_priority(self.condition),
            status,
            assigned_room: None,
            admission_date: self.admission_date.unwrap_or(now),
            discharge_date: None,
            notes: normalise_notes(self.notes),
        })
    }
}

/// Profile edit for an existing patient. Absent fields are left unchanged.
///
/// There is deliberately no way to touch `status` or `assigned_room` from here.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PatientUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub condition: Option<Condition>,
    /// An empty string clears the notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl PatientUpdate {
    pub(crate) fn validate(&self) -> HospitalResult<()> {
        if let Some(name) = &self.name {
            NonEmptyText::new(name).map_err(|e| HospitalError::Validation(format!("name: {e}")))?;
        }
        if let Some(age) = self.age {
            validate_age(age)?;
        }
        Ok(())
    }

    /// Applies the edit. Callers must have run [`PatientUpdate::validate`] first.
    pub(crate) fn apply(&self, patient: &mut Patient) {
        if let Some(name) = &self.name {
            patient.name = name.trim().to_string();
        }
        if let Some(age) = self.age {
            patient.age = age;
        }
        if let Some(condition) = self.condition {
            patient.condition = condition;
        }
        if let Some(notes) = &self.notes {
            patient.notes = normalise_notes(Some(notes.clone()));
        }
        patient.priority = derive_priority(patient.condition);
    }
}

fn validate_age(age: u32) -> HospitalResult<()> {
    if age > MAX_PATIENT_AGE {
        return Err(HospitalError::Validation(format!(
            "age must be between 0 and {MAX_PATIENT_AGE}, got {age}"
        )));
    }
    Ok(())
}

fn normalise_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_patient(condition: Condition) -> NewPatient {
        NewPatient {
            name: "  Ada Lovelace ".into(),
            age: 36,
            condition,
            status: None,
            admission_date: None,
            notes: None,
        }
    }

    #[test]
    fn test_derive_priority_mapping() {
        assert_eq!(derive_priority(Condition::Critical), 1);
        assert_eq!(derive_priority(Condition::Stable), 3);
        assert_eq!(derive_priority(Condition::Normal), 5);
    }

    #[test]
    fn test_into_patient_derives_priority_and_defaults() {
        let now = Utc::now();
        let patient = new_patient(Condition::Stable).into_patient(now).unwrap();

        assert_eq!(patient.name, "Ada Lovelace");
        assert_eq!(patient.priority, 3);
        assert_eq!(patient.status, PatientStatus::Admitted);
        assert_eq!(patient.admission_date, now);
        assert!(patient.assigned_room.is_none());
        assert!(patient.is_waiting());
    }

    #[test]
    fn test_into_patient_rejects_invalid_input() {
        let mut blank = new_patient(Condition::Normal);
        blank.name = "   ".into();
        assert!(matches!(
            blank.into_patient(Utc::now()),
            Err(HospitalError::Validation(_))
        ));

        let mut too_old = new_patient(Condition::Normal);
        too_old.age = MAX_PATIENT_AGE + 1;
        assert!(too_old.into_patient(Utc::now()).is_err());

        let mut discharged = new_patient(Condition::Normal);
        discharged.status = Some(PatientStatus::Discharged);
        assert!(discharged.into_patient(Utc::now()).is_err());
    }

    #[test]
    fn test_update_recomputes_priority() {
        let mut patient = new_patient(Condition::Normal)
            .into_patient(Utc::now())
            .unwrap();
        assert_eq!(patient.priority, 5);

        let update = PatientUpdate {
            condition: Some(Condition::Critical),
            ..Default::default()
        };
        update.validate().unwrap();
        update.apply(&mut patient);

        assert_eq!(patient.condition, Condition::Critical);
        assert_eq!(patient.priority, 1);
    }

    #[test]
    fn test_update_empty_notes_clears() {
        let mut input = new_patient(Condition::Normal);
        input.notes = Some("allergic to penicillin".into());
        let mut patient = input.into_patient(Utc::now()).unwrap();

        let update = PatientUpdate {
            notes: Some("  ".into()),
            ..Default::default()
        };
        update.apply(&mut patient);
        assert!(patient.notes.is_none());
    }

    #[test]
    fn test_condition_and_status_parse_case_insensitively() {
        assert_eq!("CRITICAL".parse::<Condition>().unwrap(), Condition::Critical);
        assert_eq!(" pending ".parse::<PatientStatus>().unwrap(), PatientStatus::Pending);
        assert!("unwell".parse::<Condition>().is_err());
    }

    #[test]
    fn test_discharged_or_assigned_patient_is_not_waiting() {
        let mut patient = new_patient(Condition::Critical)
            .into_patient(Utc::now())
            .unwrap();
        patient.assigned_room = Some(RoomId::new());
        assert!(!patient.is_waiting());

        patient.assigned_room = None;
        patient.status = PatientStatus::Discharged;
        assert!(!patient.is_waiting());
    }
}

//! State-change notifications.
//!
//! The service publishes exactly one [`HospitalEvent`] per successful mutation through an
//! [`EventSink`]. How events reach clients is up to the sink: the server uses
//! [`BroadcastSink`] and forwards each event to WebSocket subscribers; the CLI uses
//! [`NullSink`].

use crate::allocator::AllocationOutcome;
use crate::models::{Patient, PatientId, Room, RoomId};
use serde::Serialize;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// A notification carrying the post-mutation snapshot.
///
/// Serialises as `{"event": "room-assigned", "data": {...}}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum HospitalEvent {
    PatientAdmitted {
        patient: Patient,
    },
    PatientUpdated {
        patient: Patient,
    },
    PatientDeleted {
        patient_id: PatientId,
    },
    RoomCreated {
        room: Room,
    },
    RoomUpdated {
        room: Room,
    },
    RoomDeleted {
        room_id: RoomId,
    },
    RoomAssigned {
        patient: Patient,
        room: Room,
        vacated_room: Option<Room>,
    },
    RoomReleased {
        patient: Patient,
        room: Room,
    },
    AutoAllocationComplete {
        patient: Patient,
        room: Room,
    },
}

impl HospitalEvent {
    /// The wire name of the event, e.g. `room-assigned`.
    pub fn name(&self) -> &'static str {
        match self {
            HospitalEvent::PatientAdmitted { .. } => "patient-admitted",
            HospitalEvent::PatientUpdated { .. } => "patient-updated",
            HospitalEvent::PatientDeleted { .. } => "patient-deleted",
            HospitalEvent::RoomCreated { .. } => "room-created",
            HospitalEvent::RoomUpdated { .. } => "room-updated",
            HospitalEvent::RoomDeleted { .. } => "room-deleted",
            HospitalEvent::RoomAssigned { .. } => "room-assigned",
            HospitalEvent::RoomReleased { .. } => "room-released",
            HospitalEvent::AutoAllocationComplete { .. } => "auto-allocation-complete",
        }
    }

    /// Builds the event for an allocation outcome, if it changed anything.
    pub fn from_allocation(outcome: &AllocationOutcome) -> Option<Self> {
        match outcome {
            AllocationOutcome::Allocated { patient, room } => {
                Some(HospitalEvent::AutoAllocationComplete {
                    patient: patient.clone(),
                    room: room.clone(),
                })
            }
            _ => None,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Destination for notifications.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: HospitalEvent);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, event: HospitalEvent) {
        tracing::trace!("dropping {} event", event.name());
    }
}

/// Fans events out to any number of subscribers over a bounded broadcast channel.
///
/// Subscribers that fall behind by more than the buffer size miss the oldest events.
#[derive(Clone, Debug)]
pub struct BroadcastSink {
    sender: broadcast::Sender<HospitalEvent>,
}

impl BroadcastSink {
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HospitalEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: HospitalEvent) {
        let name = event.name();
        match self.sender.send(event) {
            Ok(receivers) => tracing::debug!("published {} to {} subscriber(s)", name, receivers),
            Err(_) => tracing::debug!("no subscribers for {} event", name),
        }
    }
}

/// Keeps every published event in memory. Used by tests and the CLI's verbose mode.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<HospitalEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns and clears the recorded events.
    pub fn take(&self) -> Vec<HospitalEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: HospitalEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialises_with_kebab_case_tag() {
        let id = RoomId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let json = HospitalEvent::RoomDeleted { room_id: id }.to_json().unwrap();

        assert_eq!(
            json,
            r#"{"event":"room-deleted","data":{"room_id":"550e8400e29b41d4a716446655440000"}}"#
        );
    }

    #[test]
    fn test_broadcast_sink_delivers_to_subscribers() {
        let sink = BroadcastSink::new(8);
        let mut rx = sink.subscribe();
        let id = PatientId::new();

        sink.publish(HospitalEvent::PatientDeleted { patient_id: id });

        let received = rx.try_recv().unwrap();
        assert_eq!(received, HospitalEvent::PatientDeleted { patient_id: id });
    }

    #[test]
    fn test_broadcast_sink_without_subscribers_does_not_fail() {
        let sink = BroadcastSink::new(8);
        assert_eq!(sink.subscriber_count(), 0);
        sink.publish(HospitalEvent::RoomDeleted {
            room_id: RoomId::new(),
        });
    }

    #[test]
    fn test_recording_sink_take_clears() {
        let sink = RecordingSink::new();
        sink.publish(HospitalEvent::RoomDeleted {
            room_id: RoomId::new(),
        });
        assert_eq!(sink.take().len(), 1);
        assert!(sink.take().is_empty());
    }
}

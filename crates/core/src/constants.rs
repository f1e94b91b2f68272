//! Constants used throughout the HMS core crate.
//!
//! Storage directory names, filenames and validation bounds live here so the store backends,
//! the service layer and the binaries agree on them.

/// Default directory for hospital data when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "hospital_data";

/// Directory name for patient documents.
pub const PATIENTS_DIR_NAME: &str = "patients";

/// Directory name for room documents.
pub const ROOMS_DIR_NAME: &str = "rooms";

/// Filename for a patient document inside its sharded directory.
pub const PATIENT_FILENAME: &str = "patient.yaml";

/// Filename for a room document inside its sharded directory.
pub const ROOM_FILENAME: &str = "room.yaml";

/// Lock file in the data directory serialising writers across processes.
pub const STORE_LOCK_FILENAME: &str = ".store.lock";

/// Default capacity of the notification broadcast buffer.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// How many times auto-allocation re-selects after losing a race for a room.
pub const MAX_ALLOCATION_ATTEMPTS: usize = 3;

/// Oldest accepted patient age, in years.
pub const MAX_PATIENT_AGE: u32 = 150;

/// Accepted floor range (basements are negative).
pub const MIN_FLOOR: i32 = -5;
pub const MAX_FLOOR: i32 = 200;

/// Accepted room capacity range.
pub const MIN_ROOM_CAPACITY: u32 = 1;
pub const MAX_ROOM_CAPACITY: u32 = 20;

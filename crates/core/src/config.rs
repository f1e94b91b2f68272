//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the service. Nothing in
//! request handling reads process-wide environment variables.

use crate::constants::DEFAULT_EVENT_BUFFER;
use crate::error::{HospitalError, HospitalResult};
use crate::models::NewRoom;
use crate::store::{EntityStore, FileStore, MemoryStore};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Which [`EntityStore`] backend to open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    #[default]
    File,
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    store_backend: StoreBackend,
    event_buffer: usize,
    auto_allocate_on_admission: bool,
}

impl CoreConfig {
    pub fn new(
        data_dir: PathBuf,
        store_backend: StoreBackend,
        event_buffer: usize,
        auto_allocate_on_admission: bool,
    ) -> HospitalResult<Self> {
        if event_buffer == 0 {
            return Err(HospitalError::Validation(
                "event buffer must hold at least one event".into(),
            ));
        }
        if store_backend == StoreBackend::File && data_dir.as_os_str().is_empty() {
            return Err(HospitalError::Validation(
                "data directory cannot be empty for the file store".into(),
            ));
        }

        Ok(Self {
            data_dir,
            store_backend,
            event_buffer,
            auto_allocate_on_admission,
        })
    }

    /// In-memory configuration with defaults. Used by tests and throwaway servers.
    pub fn in_memory() -> Self {
        Self {
            data_dir: PathBuf::new(),
            store_backend: StoreBackend::Memory,
            event_buffer: DEFAULT_EVENT_BUFFER,
            auto_allocate_on_admission: true,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn store_backend(&self) -> StoreBackend {
        self.store_backend
    }

    pub fn event_buffer(&self) -> usize {
        self.event_buffer
    }

    pub fn auto_allocate_on_admission(&self) -> bool {
        self.auto_allocate_on_admission
    }
}

/// Parse the store backend from an optional string value (`memory` or `file`).
///
/// If `value` is `None` or empty/whitespace, returns [`StoreBackend::File`].
pub fn store_backend_from_env_value(value: Option<String>) -> HospitalResult<StoreBackend> {
    let value = value
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty());

    match value.as_deref() {
        None | Some("file") => Ok(StoreBackend::File),
        Some("memory") => Ok(StoreBackend::Memory),
        Some(other) => Err(HospitalError::Validation(format!(
            "unknown store backend '{other}' (expected 'file' or 'memory')"
        ))),
    }
}

/// Parse a boolean flag such as `HMS_AUTO_ALLOCATE`. Unset means `default`.
pub fn flag_from_env_value(value: Option<String>, default: bool) -> HospitalResult<bool> {
    let value = value
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty());

    match value.as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(HospitalError::Validation(format!(
            "expected a boolean flag, got '{other}'"
        ))),
    }
}

/// Opens the configured store backend.
///
/// # Errors
///
/// Returns an error if the file store's data directory cannot be created.
pub fn open_store(cfg: &CoreConfig) -> HospitalResult<Arc<dyn EntityStore>> {
    match cfg.store_backend() {
        StoreBackend::Memory => {
            tracing::info!("++ Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::File => {
            tracing::info!("++ Using file store at {}", cfg.data_dir().display());
            Ok(Arc::new(FileStore::open(cfg.data_dir())?))
        }
    }
}

#[derive(Debug, Deserialize)]
struct RoomSeed {
    rooms: Vec<NewRoom>,
}

/// Reads a YAML room seed file of the form `rooms: [{room_number, room_type, floor, ...}]`.
pub fn load_room_seed(path: &Path) -> HospitalResult<Vec<NewRoom>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        HospitalError::Validation(format!("cannot read seed file {}: {e}", path.display()))
    })?;
    let seed: RoomSeed = serde_yaml::from_str(&contents).map_err(|e| {
        HospitalError::Validation(format!("invalid seed file {}: {e}", path.display()))
    })?;
    Ok(seed.rooms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RoomType;
    use tempfile::TempDir;

    #[test]
    fn test_store_backend_from_env_value() {
        assert_eq!(store_backend_from_env_value(None).unwrap(), StoreBackend::File);
        assert_eq!(
            store_backend_from_env_value(Some("  ".into())).unwrap(),
            StoreBackend::File
        );
        assert_eq!(
            store_backend_from_env_value(Some("Memory".into())).unwrap(),
            StoreBackend::Memory
        );
        assert!(store_backend_from_env_value(Some("mongo".into())).is_err());
    }

    #[test]
    fn test_flag_from_env_value() {
        assert!(flag_from_env_value(None, true).unwrap());
        assert!(!flag_from_env_value(Some("off".into()), true).unwrap());
        assert!(flag_from_env_value(Some("YES".into()), false).unwrap());
        assert!(flag_from_env_value(Some("maybe".into()), false).is_err());
    }

    #[test]
    fn test_config_rejects_zero_event_buffer() {
        assert!(CoreConfig::new(PathBuf::from("data"), StoreBackend::File, 0, true).is_err());
        assert!(CoreConfig::new(PathBuf::new(), StoreBackend::File, 8, true).is_err());
        assert!(CoreConfig::new(PathBuf::new(), StoreBackend::Memory, 8, true).is_ok());
    }

    #[test]
    fn test_load_room_seed() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("rooms.yaml");
        std::fs::write(
            &path,
            "rooms:\n  - room_number: ICU-1\n    room_type: ICU\n    floor: 1\n  - room_number: \"101\"\n    room_type: General\n    floor: 1\n    capacity: 2\n",
        )
        .expect("Failed to write seed");

        let rooms = load_room_seed(&path).unwrap();

        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].room_type, RoomType::Icu);
        assert_eq!(rooms[0].capacity, 1);
        assert_eq!(rooms[1].capacity, 2);
    }

    #[test]
    fn test_open_file_store_creates_data_dir() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp_dir.path().join("hospital");
        let cfg = CoreConfig::new(data_dir.clone(), StoreBackend::File, 8, true).unwrap();

        open_store(&cfg).unwrap();

        assert!(data_dir.is_dir());
    }
}

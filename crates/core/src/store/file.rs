//! File-backed entity store.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/
//!   patients/<s1>/<s2>/<id>/patient.yaml
//!   rooms/<s1>/<s2>/<id>/room.yaml
//! ```
//!
//! where `s1` and `s2` are the first four hex characters of the record id.
//!
//! Every document is written to a temporary sibling and renamed into place, so readers see
//! either the old or the new version of a record, never a torn one. Writers hold an exclusive
//! advisory lock on `<data_dir>/.store.lock` for the whole read-check-write, so conditional
//! updates stay atomic when the server and the CLI open the same directory.

use super::{EntityStore, PatientQuery, RoomQuery, StoreError, StoreResult, WriteOutcome};
use crate::constants::{
    PATIENTS_DIR_NAME, PATIENT_FILENAME, ROOMS_DIR_NAME, ROOM_FILENAME, STORE_LOCK_FILENAME,
};
use crate::models::{Patient, PatientId, Room, RoomId};
use hms_uuid::RecordId;
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// A record type the file store knows how to place on disk.
trait Document: Serialize + DeserializeOwned + Clone {
    const DIR_NAME: &'static str;
    const FILENAME: &'static str;

    fn id(&self) -> RecordId;
    fn set_id(&mut self, id: RecordId);
}

impl Document for Patient {
    const DIR_NAME: &'static str = PATIENTS_DIR_NAME;
    const FILENAME: &'static str = PATIENT_FILENAME;

    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }
}

impl Document for Room {
    const DIR_NAME: &'static str = ROOMS_DIR_NAME;
    const FILENAME: &'static str = ROOM_FILENAME;

    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }
}

pub struct FileStore {
    data_dir: PathBuf,
    lock_path: PathBuf,
    lock_file: Mutex<fs::File>,
}

/// Exclusive hold on the store lock file. The advisory lock is released before the mutex.
struct StoreLock<'a> {
    file: MutexGuard<'a, fs::File>,
    path: &'a Path,
}

impl Drop for StoreLock<'_> {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&*self.file) {
            tracing::error!("Failed to release lock on {:?}: {}", self.path, e);
        }
    }
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `data_dir`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::DirCreation`] if the collection directories cannot be created
    /// - [`StoreError::FileLock`] if the lock file cannot be opened
    pub fn open(data_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(data_dir.join(PATIENTS_DIR_NAME)).map_err(StoreError::DirCreation)?;
        fs::create_dir_all(data_dir.join(ROOMS_DIR_NAME)).map_err(StoreError::DirCreation)?;

        let lock_path = data_dir.join(STORE_LOCK_FILENAME);
        let lock_file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|source| StoreError::FileLock {
                path: lock_path.clone(),
                source,
            })?;

        Ok(Self {
            data_dir,
            lock_path,
            lock_file: Mutex::new(lock_file),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Serialises writers: the mutex orders threads sharing this handle, the file lock orders
    /// every other handle on the directory, including ones in other processes.
    fn lock(&self) -> StoreResult<StoreLock<'_>> {
        let file = self.lock_file.lock().map_err(|_| StoreError::LockPoisoned)?;
        file.lock_exclusive().map_err(|source| StoreError::FileLock {
            path: self.lock_path.clone(),
            source,
        })?;
        Ok(StoreLock {
            file,
            path: &self.lock_path,
        })
    }

    fn record_dir<T: Document>(&self, id: &RecordId) -> PathBuf {
        id.sharded_dir(&self.data_dir.join(T::DIR_NAME))
    }

    fn find<T: Document>(&self, id: &RecordId) -> StoreResult<Option<T>> {
        read_document(&self.record_dir::<T>(id).join(T::FILENAME))
    }

    fn write<T: Document>(&self, doc: &T) -> StoreResult<()> {
        write_document(&self.record_dir::<T>(&doc.id()), T::FILENAME, doc)
    }

    /// Reads every document in a collection, skipping unreadable ones.
    fn scan<T: Document>(&self) -> StoreResult<Vec<T>> {
        let collection = self.data_dir.join(T::DIR_NAME);
        let mut docs = Vec::new();

        let s1_iter = match fs::read_dir(&collection) {
            Ok(it) => it,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(docs),
            Err(source) => {
                return Err(StoreError::FileRead {
                    path: collection,
                    source,
                })
            }
        };

        for s1 in s1_iter.flatten() {
            let Ok(s2_iter) = fs::read_dir(s1.path()) else {
                continue;
            };
            for s2 in s2_iter.flatten() {
                let Ok(id_iter) = fs::read_dir(s2.path()) else {
                    continue;
                };
                for id_ent in id_iter.flatten() {
                    let doc_path = id_ent.path().join(T::FILENAME);
                    if !doc_path.is_file() {
                        continue;
                    }
                    match read_document::<T>(&doc_path) {
                        Ok(Some(doc)) => docs.push(doc),
                        Ok(None) => {}
                        Err(e) => tracing::warn!("skipping unreadable document: {}", e),
                    }
                }
            }
        }

        Ok(docs)
    }

    fn update_if<T: Document>(
        &self,
        id: &RecordId,
        expected: &dyn Fn(&T) -> bool,
        apply: &mut dyn FnMut(&mut T),
        check: impl Fn(&T, &T) -> StoreResult<()>,
    ) -> StoreResult<WriteOutcome<T>> {
        let _guard = self.lock()?;
        let Some(current) = self.find::<T>(id)? else {
            return Ok(WriteOutcome::Missing);
        };
        if !expected(&current) {
            return Ok(WriteOutcome::Rejected(current));
        }
        let mut next = current.clone();
        apply(&mut next);
        next.set_id(*id);
        check(&current, &next)?;
        self.write(&next)?;
        Ok(WriteOutcome::Applied(next))
    }

    fn delete_if<T: Document>(
        &self,
        id: &RecordId,
        expected: &dyn Fn(&T) -> bool,
    ) -> StoreResult<WriteOutcome<T>> {
        let _guard = self.lock()?;
        let Some(current) = self.find::<T>(id)? else {
            return Ok(WriteOutcome::Missing);
        };
        if !expected(&current) {
            return Ok(WriteOutcome::Rejected(current));
        }
        let dir = self.record_dir::<T>(id);
        fs::remove_dir_all(&dir).map_err(|source| StoreError::FileRemove { path: dir, source })?;
        Ok(WriteOutcome::Applied(current))
    }

    fn ensure_room_number_free(&self, room: &Room) -> StoreResult<()> {
        if self
            .scan::<Room>()?
            .iter()
            .any(|r| r.id != room.id && r.room_number == room.room_number)
        {
            return Err(StoreError::DuplicateRoomNumber(room.room_number.to_string()));
        }
        Ok(())
    }
}

impl EntityStore for FileStore {
    fn query_patients(&self, query: &PatientQuery) -> StoreResult<Vec<Patient>> {
        Ok(query.apply(self.scan::<Patient>()?.iter()))
    }

    fn find_patient(&self, id: &PatientId) -> StoreResult<Option<Patient>> {
        self.find(id)
    }

    fn insert_patient(&self, patient: &Patient) -> StoreResult<()> {
        let _guard = self.lock()?;
        if self.find::<Patient>(&patient.id)?.is_some() {
            return Err(StoreError::DuplicateId(patient.id.to_string()));
        }
        self.write(patient)
    }

    fn update_patient_if(
        &self,
        id: &PatientId,
        expected: &dyn Fn(&Patient) -> bool,
        apply: &mut dyn FnMut(&mut Patient),
    ) -> StoreResult<WriteOutcome<Patient>> {
        self.update_if(id, expected, apply, |_, _| Ok(()))
    }

    fn delete_patient_if(
        &self,
        id: &PatientId,
        expected: &dyn Fn(&Patient) -> bool,
    ) -> StoreResult<WriteOutcome<Patient>> {
        self.delete_if(id, expected)
    }

    fn query_rooms(&self, query: &RoomQuery) -> StoreResult<Vec<Room>> {
        Ok(query.apply(self.scan::<Room>()?.iter()))
    }

    fn find_room(&self, id: &RoomId) -> StoreResult<Option<Room>> {
        self.find(id)
    }

    fn insert_room(&self, room: &Room) -> StoreResult<()> {
        let _guard = self.lock()?;
        if self.find::<Room>(&room.id)?.is_some() {
            return Err(StoreError::DuplicateId(room.id.to_string()));
        }
        self.ensure_room_number_free(room)?;
        self.write(room)
    }

    fn update_room_if(
        &self,
        id: &RoomId,
        expected: &dyn Fn(&Room) -> bool,
        apply: &mut dyn FnMut(&mut Room),
    ) -> StoreResult<WriteOutcome<Room>> {
        self.update_if(id, expected, apply, |current: &Room, next: &Room| {
            if current.room_number != next.room_number {
                self.ensure_room_number_free(next)?;
            }
            Ok(())
        })
    }

    fn delete_room_if_unoccupied(&self, id: &RoomId) -> StoreResult<WriteOutcome<Room>> {
        self.delete_if(id, &|room: &Room| !room.occupied && room.patient_id.is_none())
    }
}

fn read_document<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::FileRead {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_yaml::from_str(&contents)
        .map(Some)
        .map_err(|source| StoreError::YamlDeserialization {
            path: path.to_path_buf(),
            source,
        })
}

fn write_document<T: Serialize>(dir: &Path, filename: &str, doc: &T) -> StoreResult<()> {
    fs::create_dir_all(dir).map_err(StoreError::DirCreation)?;
    let yaml = serde_yaml::to_string(doc).map_err(StoreError::YamlSerialization)?;

    let target = dir.join(filename);
    let staging = dir.join(format!("{filename}.tmp"));
    fs::write(&staging, yaml).map_err(|source| StoreError::FileWrite {
        path: staging.clone(),
        source,
    })?;
    fs::rename(&staging, &target).map_err(|source| StoreError::FileWrite {
        path: target,
        source,
    })
}

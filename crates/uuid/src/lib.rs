//! Record identifiers and sharded-path utilities.
//!
//! Every patient and room in HMS is keyed by a [`RecordId`]: a UUID held in a *canonical*
//! textual form of **32 lowercase hexadecimal characters** (no hyphens).
//!
//! ## Canonical form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Identifiers arriving from outside (REST paths, CLI arguments) must already be canonical.
//! Use [`RecordId::parse`] to validate them; hyphenated or uppercase forms are rejected so that
//! the same record never appears under two spellings.
//!
//! ## Sharded directory layout
//! The file-backed entity store keeps one directory per record:
//! `parent_dir/<id[0..2]>/<id[2..4]>/<id>/`
//!
//! Example:
//! `hospital_data/rooms/55/0e/550e8400e29b41d4a716446655440000/`

mod record_id;

pub use record_id::{RecordId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;

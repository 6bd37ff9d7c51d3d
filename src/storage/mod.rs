//! Storage module for persisting finished documents
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Persisting assembled documents as items
//! - Recording each job's state for later inspection

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteItemStore;
pub use traits::{ItemStore, StorageError, StorageResult};

use crate::classify::Tag;
use crate::state::JobState;
use std::path::Path;

/// Opens or creates the item database at `path`
///
/// # Returns
///
/// * `Ok(SqliteItemStore)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_store(path: &Path) -> StorageResult<SqliteItemStore> {
    SqliteItemStore::new(path)
}

/// A finished document ready to be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub summary: String,
    pub full: String,
    pub tags: Vec<Tag>,
    pub config_hash: String,
    pub job_id: Option<i64>,
}

/// Handle returned for a persisted item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemHandle {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

/// Represents an item in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub id: i64,
    pub name: String,
    pub summary: String,
    pub full: String,
    pub tags: Vec<Tag>,
    pub config_hash: String,
    pub job_id: Option<i64>,
    pub created_at: String,
}

/// Represents a job in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub id: i64,
    pub root_url: String,
    pub config_hash: String,
    pub state: JobState,
    pub started_at: String,
    pub finished_at: Option<String>,
}

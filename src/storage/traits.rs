//! Storage traits and error types
//!
//! This module defines the trait interface for the persistence collaborator
//! and its associated error types.

use crate::state::JobState;
use crate::storage::{ItemHandle, ItemRecord, JobRecord, NewItem};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Item not found: {0}")]
    ItemNotFound(i64),

    #[error("Job not found: {0}")]
    JobNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence collaborator receiving finished documents
///
/// Besides items, implementations record each job's position in the state
/// machine so interrupted or failed runs remain visible.
pub trait ItemStore {
    // ===== Items =====

    /// Persists a finished document and returns its handle
    fn create_item(&mut self, item: &NewItem) -> StorageResult<ItemHandle>;

    /// Gets an item by ID
    fn get_item(&self, id: i64) -> StorageResult<ItemRecord>;

    /// Lists item handles, newest first
    fn list_items(&self) -> StorageResult<Vec<ItemHandle>>;

    // ===== Jobs =====

    /// Records the start of a job and returns its ID
    fn start_job(&mut self, root_url: &str, config_hash: &str) -> StorageResult<i64>;

    /// Records a job's new state; terminal states also set the finish time
    fn update_job_state(&mut self, job_id: i64, state: JobState) -> StorageResult<()>;

    /// Gets a job by ID
    fn get_job(&self, job_id: i64) -> StorageResult<JobRecord>;
}

//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ItemStore trait.

use crate::classify::Tag;
use crate::state::JobState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ItemStore, StorageError, StorageResult};
use crate::storage::{ItemHandle, ItemRecord, JobRecord, NewItem};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteItemStore {
    conn: Connection,
}

impl SqliteItemStore {
    /// Creates a new SqliteItemStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteItemStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn encode_tags(tags: &[Tag]) -> StorageResult<String> {
    serde_json::to_string(tags).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn decode_tags(raw: &str) -> StorageResult<Vec<Tag>> {
    serde_json::from_str(raw).map_err(|e| StorageError::Serialization(e.to_string()))
}

impl ItemStore for SqliteItemStore {
    // ===== Items =====

    fn create_item(&mut self, item: &NewItem) -> StorageResult<ItemHandle> {
        let created_at = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO items (name, summary, full, tags, config_hash, job_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                item.name,
                item.summary,
                item.full,
                encode_tags(&item.tags)?,
                item.config_hash,
                item.job_id,
                created_at
            ],
        )?;

        Ok(ItemHandle {
            id: self.conn.last_insert_rowid(),
            name: item.name.clone(),
            created_at,
        })
    }

    fn get_item(&self, id: i64) -> StorageResult<ItemRecord> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, summary, full, tags, config_hash, job_id, created_at
                 FROM items WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, Option<i64>>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()?
            .ok_or(StorageError::ItemNotFound(id))?;

        let (id, name, summary, full, tags, config_hash, job_id, created_at) = row;
        Ok(ItemRecord {
            id,
            name,
            summary,
            full,
            tags: decode_tags(&tags)?,
            config_hash,
            job_id,
            created_at,
        })
    }

    fn list_items(&self) -> StorageResult<Vec<ItemHandle>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM items ORDER BY id DESC")?;

        let items = stmt
            .query_map([], |row| {
                Ok(ItemHandle {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    // ===== Jobs =====

    fn start_job(&mut self, root_url: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO jobs (root_url, config_hash, state, started_at) VALUES (?1, ?2, ?3, ?4)",
            params![root_url, config_hash, JobState::Pending.to_db_string(), now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_job_state(&mut self, job_id: i64, state: JobState) -> StorageResult<()> {
        let finished_at = state.is_terminal().then(|| Utc::now().to_rfc3339());
        let updated = self.conn.execute(
            "UPDATE jobs SET state = ?1, finished_at = COALESCE(?2, finished_at) WHERE id = ?3",
            params![state.to_db_string(), finished_at, job_id],
        )?;
        if updated == 0 {
            return Err(StorageError::JobNotFound(job_id));
        }
        Ok(())
    }

    fn get_job(&self, job_id: i64) -> StorageResult<JobRecord> {
        self.conn
            .query_row(
                "SELECT id, root_url, config_hash, state, started_at, finished_at
                 FROM jobs WHERE id = ?1",
                params![job_id],
                |row| {
                    Ok(JobRecord {
                        id: row.get(0)?,
                        root_url: row.get(1)?,
                        config_hash: row.get(2)?,
                        state: JobState::from_db_string(&row.get::<_, String>(3)?)
                            .unwrap_or(JobState::Failed),
                        started_at: row.get(4)?,
                        finished_at: row.get(5)?,
                    })
                },
            )
            .optional()?
            .ok_or(StorageError::JobNotFound(job_id))
    }
}

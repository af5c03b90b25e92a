//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::records::OutputRecord;
use crate::state::Checkpoint;
use crate::storage::schema::{initialize_schema, CHECKPOINT_KEY};
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, StoreOutcome};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn map_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
        Ok(RunRecord {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            config_hash: row.get(3)?,
            status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                .unwrap_or(RunStatus::Running),
        })
    }
}

fn content_type_key(record: &OutputRecord) -> String {
    record
        .content_type()
        .map(|t| t.to_string())
        .unwrap_or_default()
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                Self::map_run,
            )
            .optional()?;

        Ok(run)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Completed.to_db_string(), now, run_id],
        )?;
        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Records =====

    fn store_records(
        &mut self,
        records: &[OutputRecord],
        run_id: Option<i64>,
        collected_since: Option<i64>,
    ) -> StorageResult<StoreOutcome> {
        let Some(primary) = records.first() else {
            return Err(StorageError::EmptyBatch);
        };

        let tx = self.conn.transaction()?;

        if let Some(since) = collected_since {
            let writer: Option<Option<i64>> = tx
                .query_row(
                    "SELECT run_id FROM records
                     WHERE data_type = ?1 AND source = ?2 AND content_type = ?3 AND record_key = ?4",
                    params![
                        primary.data_type(),
                        primary.source().as_str(),
                        content_type_key(primary),
                        primary.record_key() as i64,
                    ],
                    |row| row.get(0),
                )
                .optional()?;
            if matches!(writer, Some(Some(writer)) if writer >= since) {
                return Ok(StoreOutcome {
                    written: 0,
                    primary_existed: true,
                });
            }
        }

        let mut written = 0;
        for record in records {
            let payload = serde_json::to_value(record)?;
            let fetched_at = payload
                .get("fetched_at")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| Utc::now().to_rfc3339());

            written += tx.execute(
                "INSERT INTO records
                 (data_type, source, content_type, record_key, content_id, payload, fetched_at, run_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(data_type, source, content_type, record_key) DO UPDATE SET
                     content_id = excluded.content_id,
                     payload = excluded.payload,
                     fetched_at = excluded.fetched_at,
                     run_id = excluded.run_id",
                params![
                    record.data_type(),
                    record.source().as_str(),
                    content_type_key(record),
                    record.record_key() as i64,
                    record.content_id().map(|id| id as i64),
                    payload.to_string(),
                    fetched_at,
                    run_id,
                ],
            )?;
        }

        tx.commit()?;

        Ok(StoreOutcome {
            written,
            primary_existed: false,
        })
    }

    fn count_records_by_type(&self) -> StorageResult<HashMap<String, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT data_type, COUNT(*) FROM records GROUP BY data_type")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = HashMap::new();
        for row in rows {
            let (data_type, count) = row?;
            counts.insert(data_type, count as u64);
        }

        Ok(counts)
    }

    fn load_records(&self, data_type: Option<&str>) -> StorageResult<Vec<serde_json::Value>> {
        let mut stmt = self.conn.prepare(
            "SELECT payload FROM records WHERE ?1 IS NULL OR data_type = ?1 ORDER BY id",
        )?;

        let payloads = stmt
            .query_map(params![data_type], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        payloads
            .iter()
            .map(|payload| serde_json::from_str(payload).map_err(StorageError::from))
            .collect()
    }

    // ===== Checkpoint Slot =====

    fn load_checkpoint(&self) -> StorageResult<Option<Checkpoint>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM harvest_state WHERE key = ?1",
                params![CHECKPOINT_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save_checkpoint(&mut self, checkpoint: Option<&Checkpoint>) -> StorageResult<()> {
        match checkpoint {
            Some(checkpoint) => {
                let json = serde_json::to_string(checkpoint)?;
                let now = Utc::now().to_rfc3339();
                self.conn.execute(
                    "INSERT INTO harvest_state (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                    params![CHECKPOINT_KEY, json, now],
                )?;
            }
            None => {
                self.conn.execute(
                    "DELETE FROM harvest_state WHERE key = ?1",
                    params![CHECKPOINT_KEY],
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{ContentType, DataSource, Query};
    use crate::records::{ContentRecord, Keyword, KeywordsRecord};

    fn content(id: u64) -> OutputRecord {
        OutputRecord::Content(ContentRecord {
            source: DataSource::Api,
            content_type: ContentType::Movie,
            tmdb_id: id,
            title: Some(format!("Movie {}", id)),
            fetched_at: Utc::now(),
            ..ContentRecord::default()
        })
    }

    fn keywords(id: u64) -> OutputRecord {
        OutputRecord::Keywords(KeywordsRecord {
            source: DataSource::Api,
            content_type: ContentType::Movie,
            content_id: id,
            content_title: None,
            keywords: vec![Keyword {
                id: Some(1),
                name: Some("heist".to_string()),
            }],
            fetched_at: Utc::now(),
        })
    }

    #[test]
    fn test_create_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash").unwrap();
        assert!(run_id > 0);

        let latest = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(latest.id, run_id);
        assert_eq!(latest.status, RunStatus::Running);
    }

    #[test]
    fn test_complete_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash").unwrap();
        storage.complete_run(run_id).unwrap();

        let latest = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(latest.status, RunStatus::Completed);
        assert!(latest.finished_at.is_some());
    }

    #[test]
    fn test_update_missing_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let result = storage.update_run_status(42, RunStatus::Interrupted);
        assert!(matches!(result, Err(StorageError::RunNotFound(42))));
    }

    #[test]
    fn test_store_item_records() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let outcome = storage
            .store_records(&[content(603), keywords(603)], None, None)
            .unwrap();

        assert_eq!(outcome.written, 2);
        assert!(!outcome.primary_existed);

        let counts = storage.count_records_by_type().unwrap();
        assert_eq!(counts.get("content"), Some(&1));
        assert_eq!(counts.get("keywords"), Some(&1));
    }

    #[test]
    fn test_primary_from_current_harvest_is_not_rewritten() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let first = storage.create_run("hash").unwrap();
        storage
            .store_records(&[content(603)], Some(first), Some(first))
            .unwrap();

        let resumed = storage.create_run("hash").unwrap();
        let outcome = storage
            .store_records(&[content(603), keywords(603)], Some(resumed), Some(first))
            .unwrap();

        assert!(outcome.primary_existed);
        assert_eq!(outcome.written, 0);
        assert_eq!(storage.load_records(None).unwrap().len(), 1);
    }

    #[test]
    fn test_rows_from_earlier_harvest_are_refreshed() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let old_run = storage.create_run("hash").unwrap();
        storage
            .store_records(&[content(603)], Some(old_run), Some(old_run))
            .unwrap();

        let new_run = storage.create_run("hash").unwrap();
        let mut refreshed = content(603);
        if let OutputRecord::Content(record) = &mut refreshed {
            record.title = Some("The Matrix".to_string());
        }
        let outcome = storage
            .store_records(&[refreshed, keywords(603)], Some(new_run), Some(new_run))
            .unwrap();

        assert!(!outcome.primary_existed);
        assert_eq!(outcome.written, 2);
        let contents = storage.load_records(Some("content")).unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["title"], "The Matrix");
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.store_records(&[], None, None),
            Err(StorageError::EmptyBatch)
        ));
    }

    #[test]
    fn test_load_records_filters_by_type() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .store_records(&[content(1), keywords(1)], None, None)
            .unwrap();
        storage.store_records(&[content(2)], None, None).unwrap();

        let contents = storage.load_records(Some("content")).unwrap();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0]["tmdb_id"], 1);
        assert_eq!(contents[1]["tmdb_id"], 2);

        assert_eq!(storage.load_records(None).unwrap().len(), 3);
    }

    #[test]
    fn test_checkpoint_slot_roundtrip_and_clear() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.load_checkpoint().unwrap().is_none());

        let mut checkpoint = Checkpoint::default();
        checkpoint.enter_type(ContentType::Series, 10);
        checkpoint.enter_query(Query::Search("x".to_string()), 10);
        checkpoint.record_page(3, 2);
        storage.save_checkpoint(Some(&checkpoint)).unwrap();

        checkpoint.record_page(4, 5);
        storage.save_checkpoint(Some(&checkpoint)).unwrap();

        let loaded = storage.load_checkpoint().unwrap().unwrap();
        assert_eq!(loaded, checkpoint);

        storage.save_checkpoint(None).unwrap();
        assert!(storage.load_checkpoint().unwrap().is_none());
    }
}

//! Detection record store.
//!
//! Records are append-only and immutable: one row per frame that produced a
//! passing detection, carrying the label, confidence, artifact reference, and
//! capture time. The SQLite store runs in WAL mode so the dashboard process
//! can list and delete records while the capture daemon appends; every
//! operation is atomic at single-record granularity.
//!
//! `DetectionLog` couples a record store with an artifact store and owns the
//! pairing invariant: no record without its artifact, and no orphaned
//! artifact left behind by a delete (best effort; an artifact removal failure
//! is a warning, not a failed delete).

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::artifact::ArtifactStore;
use crate::frame::Frame;

const CAPTURED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One persisted detection event.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetectionRecord {
    pub id: i64,
    pub label: String,
    pub confidence: f64,
    /// Opaque artifact reference (file name in the artifact store).
    pub artifact: String,
    /// Store clock at write time, `%Y-%m-%d %H:%M:%S`.
    pub captured_at: String,
}

/// Outcome of a record-level delete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Aggregate view for the dashboard: total count and per-label tally.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DetectionSummary {
    pub total: usize,
    pub per_label: BTreeMap<String, usize>,
}

/// Append-only record sink with list/delete operations.
pub trait RecordStore: Send {
    fn append(
        &mut self,
        label: &str,
        confidence: f64,
        artifact: &str,
        captured_at: &str,
    ) -> Result<i64>;

    fn get(&self, id: i64) -> Result<Option<DetectionRecord>>;

    /// All records, newest first by capture time.
    fn list_all(&self) -> Result<Vec<DetectionRecord>>;

    /// Remove one record, returning it, or `None` when the id does not exist
    /// (the remaining records are untouched either way).
    fn delete(&mut self, id: i64) -> Result<Option<DetectionRecord>>;

    /// Remove every record, returning the removed set. Idempotent: a second
    /// call removes nothing.
    fn delete_all(&mut self) -> Result<Vec<DetectionRecord>>;
}

// ----------------------------------------------------------------------------
// SQLite store
// ----------------------------------------------------------------------------

pub struct SqliteRecordStore {
    conn: Connection,
}

impl SqliteRecordStore {
    /// Open the database, creating the schema on first use.
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("failed to open detection database {}", db_path))?;
        let mut store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS detections (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              label TEXT NOT NULL,
              confidence REAL NOT NULL,
              artifact TEXT NOT NULL,
              captured_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_detections_captured
              ON detections(captured_at);
            "#,
        )?;
        Ok(())
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<DetectionRecord> {
        Ok(DetectionRecord {
            id: row.get(0)?,
            label: row.get(1)?,
            confidence: row.get(2)?,
            artifact: row.get(3)?,
            captured_at: row.get(4)?,
        })
    }
}

impl RecordStore for SqliteRecordStore {
    fn append(
        &mut self,
        label: &str,
        confidence: f64,
        artifact: &str,
        captured_at: &str,
    ) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO detections(label, confidence, artifact, captured_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![label, confidence, artifact, captured_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<DetectionRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, label, confidence, artifact, captured_at
                 FROM detections WHERE id = ?1",
                params![id],
                Self::row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn list_all(&self) -> Result<Vec<DetectionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, label, confidence, artifact, captured_at
             FROM detections ORDER BY captured_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], Self::row_to_record)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn delete(&mut self, id: i64) -> Result<Option<DetectionRecord>> {
        let tx = self.conn.transaction()?;
        let record = tx
            .query_row(
                "SELECT id, label, confidence, artifact, captured_at
                 FROM detections WHERE id = ?1",
                params![id],
                Self::row_to_record,
            )
            .optional()?;
        if record.is_some() {
            tx.execute("DELETE FROM detections WHERE id = ?1", params![id])?;
        }
        tx.commit()?;
        Ok(record)
    }

    fn delete_all(&mut self) -> Result<Vec<DetectionRecord>> {
        let tx = self.conn.transaction()?;
        let removed = {
            let mut stmt = tx.prepare(
                "SELECT id, label, confidence, artifact, captured_at
                 FROM detections ORDER BY id ASC",
            )?;
            let rows = stmt.query_map([], Self::row_to_record)?;
            let mut removed = Vec::new();
            for row in rows {
                removed.push(row?);
            }
            removed
        };
        tx.execute("DELETE FROM detections", [])?;
        tx.commit()?;
        Ok(removed)
    }
}

// ----------------------------------------------------------------------------
// In-memory store (tests)
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: Vec<DetectionRecord>,
    next_id: i64,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            next_id: 1,
        }
    }
}

impl RecordStore for InMemoryRecordStore {
    fn append(
        &mut self,
        label: &str,
        confidence: f64,
        artifact: &str,
        captured_at: &str,
    ) -> Result<i64> {
        let id = self.next_id;
        self.next_id += 1;
        self.records.push(DetectionRecord {
            id,
            label: label.to_string(),
            confidence,
            artifact: artifact.to_string(),
            captured_at: captured_at.to_string(),
        });
        Ok(id)
    }

    fn get(&self, id: i64) -> Result<Option<DetectionRecord>> {
        Ok(self.records.iter().find(|r| r.id == id).cloned())
    }

    fn list_all(&self) -> Result<Vec<DetectionRecord>> {
        let mut out = self.records.clone();
        out.sort_by(|a, b| {
            b.captured_at
                .cmp(&a.captured_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(out)
    }

    fn delete(&mut self, id: i64) -> Result<Option<DetectionRecord>> {
        match self.records.iter().position(|r| r.id == id) {
            Some(index) => Ok(Some(self.records.remove(index))),
            None => Ok(None),
        }
    }

    fn delete_all(&mut self) -> Result<Vec<DetectionRecord>> {
        Ok(std::mem::take(&mut self.records))
    }
}

// ----------------------------------------------------------------------------
// DetectionLog: records + artifacts composed
// ----------------------------------------------------------------------------

pub struct DetectionLog {
    store: Box<dyn RecordStore>,
    artifacts: Box<dyn ArtifactStore>,
}

impl DetectionLog {
    pub fn new(store: Box<dyn RecordStore>, artifacts: Box<dyn ArtifactStore>) -> Self {
        Self { store, artifacts }
    }

    /// Persist one representative detection: artifact first, then the record.
    ///
    /// A failed artifact write aborts before any record exists. A failed
    /// append after a successful artifact write triggers best-effort cleanup
    /// of the artifact; if that cleanup also fails the orphan is logged and
    /// accepted.
    pub fn record_frame(&mut self, label: &str, confidence: f64, frame: &Frame) -> Result<i64> {
        let artifact = self
            .artifacts
            .write(frame)
            .context("artifact write failed")?;
        let captured_at = chrono::Local::now().format(CAPTURED_AT_FORMAT).to_string();

        match self.store.append(label, confidence, &artifact, &captured_at) {
            Ok(id) => Ok(id),
            Err(err) => {
                if let Err(cleanup_err) = self.artifacts.delete(&artifact) {
                    log::warn!(
                        "record append failed and artifact {} could not be cleaned up: {}",
                        artifact,
                        cleanup_err
                    );
                }
                Err(err.context("record append failed after artifact write"))
            }
        }
    }

    pub fn get(&self, id: i64) -> Result<Option<DetectionRecord>> {
        self.store.get(id)
    }

    pub fn list_all(&self) -> Result<Vec<DetectionRecord>> {
        self.store.list_all()
    }

    /// Delete one record and its artifact. The record row is authoritative:
    /// once it is gone the delete counts as complete even if the artifact
    /// removal failed (logged as a warning).
    pub fn delete(&mut self, id: i64) -> Result<DeleteOutcome> {
        let Some(record) = self.store.delete(id)? else {
            return Ok(DeleteOutcome::NotFound);
        };
        if let Err(err) = self.artifacts.delete(&record.artifact) {
            log::warn!(
                "record {} deleted but artifact {} was not removed: {}",
                record.id,
                record.artifact,
                err
            );
        }
        Ok(DeleteOutcome::Deleted)
    }

    /// Delete every record and every referenced artifact. Returns the number
    /// of records removed; calling it on an empty store is a no-op.
    pub fn delete_all(&mut self) -> Result<usize> {
        let removed = self.store.delete_all()?;
        for record in &removed {
            if let Err(err) = self.artifacts.delete(&record.artifact) {
                log::warn!(
                    "artifact {} for deleted record {} was not removed: {}",
                    record.artifact,
                    record.id,
                    err
                );
            }
        }
        Ok(removed.len())
    }

    pub fn summary(&self) -> Result<DetectionSummary> {
        let records = self.store.list_all()?;
        let mut per_label: BTreeMap<String, usize> = BTreeMap::new();
        for record in &records {
            *per_label.entry(record.label.clone()).or_default() += 1;
        }
        Ok(DetectionSummary {
            total: records.len(),
            per_label,
        })
    }

    pub fn artifacts(&self) -> &dyn ArtifactStore {
        self.artifacts.as_ref()
    }
}

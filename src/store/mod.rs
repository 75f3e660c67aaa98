//! Snapshot store: append-only SQLite history of scans.
//!
//! A single database file holds three tables:
//!
//! ```text
//! entries         one row per scan (snapshot JSON, counts, score breakdown)
//! entry_vectors   similarity index vectors, at most one per entry
//! entry_reports   generated narrative + alert flag, at most one per entry
//! ```
//!
//! Entries are never updated or deleted. Vectors are a derived cache owned by
//! the retriever and may be rebuilt at any time.

mod schema;

use std::fmt;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::score::SubScores;
use crate::snapshot::Snapshot;

/// Store-assigned identifier of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub i64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Narrative attached to an entry once the report was assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryReport {
    /// Generated (or fallback) narrative text.
    pub narrative: String,
    /// Whether the score met the alert threshold.
    pub alert: bool,
    /// Whether the narrative is the deterministic fallback.
    pub degraded: bool,
}

/// One persisted scan with its derived values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The scan result.
    pub snapshot: Snapshot,
    /// Messiness score in `[0, 10]`.
    pub score: f64,
    /// Score breakdown.
    pub sub_scores: SubScores,
    /// Similarity index vector, if one has been computed.
    pub embedding: Option<Vec<f32>>,
    /// Report, if one has been attached.
    pub report: Option<EntryReport>,
}

/// A history entry together with its identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    /// Store-assigned identifier.
    pub id: EntryId,
    /// The entry itself.
    pub entry: HistoryEntry,
}

/// Inclusive time window; open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    /// Earliest timestamp included.
    pub start: Option<DateTime<Utc>>,
    /// Latest timestamp included.
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Every entry.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Entries at or after `start`.
    #[must_use]
    pub fn since(start: DateTime<Utc>) -> Self {
        Self { start: Some(start), end: None }
    }

    /// Entries between `start` and `end`, both inclusive.
    #[must_use]
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start: Some(start), end: Some(end) }
    }

    fn bounds(&self) -> (i64, i64) {
        (
            self.start.map_or(i64::MIN, |t| t.timestamp_micros()),
            self.end.map_or(i64::MAX, |t| t.timestamp_micros()),
        )
    }
}

/// Aggregate statistics over the whole history.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of stored scans.
    pub total_scans: u64,
    /// Mean score (0 when empty).
    pub avg_score: f64,
    /// Lowest score (0 when empty).
    pub min_score: f64,
    /// Highest score (0 when empty).
    pub max_score: f64,
    /// Mean file count.
    pub avg_files: f64,
    /// Mean directory count.
    pub avg_dirs: f64,
    /// Number of reports that raised an alert.
    pub alerts: u64,
}

/// Persistence layer for history entries.
///
/// The connection sits behind a mutex, so writes from one process are
/// serialized and every append is a single transaction.
pub struct SnapshotStore {
    conn: Mutex<Connection>,
}

const SELECT_ENTRY: &str = "
    SELECT e.id, e.score, e.depth_score, e.naming_score, e.forbidden_score,
           e.oversized_score, e.density_score, e.snapshot_json,
           v.vector, r.narrative, r.alert, r.degraded
    FROM entries e
    LEFT JOIN entry_vectors v ON v.entry_id = e.id
    LEFT JOIN entry_reports r ON r.entry_id = e.id";

impl SnapshotStore {
    /// Opens (or creates) the store at `path`, applying pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the database
    /// cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        log::debug!("opened snapshot store at {}", path.display());
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Opens a private in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an entry atomically and returns its identifier.
    ///
    /// The embedding and report, when present, are written in the same
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any insert fails; nothing is
    /// written in that case.
    pub fn append(&self, entry: &HistoryEntry) -> Result<EntryId, StoreError> {
        let snapshot = &entry.snapshot;
        let snapshot_json = serde_json::to_string(snapshot)
            .map_err(|e| StoreError::Corrupt { id: 0, message: e.to_string() })?;

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO entries (
                timestamp, timestamp_us, root_path, total_files, total_dirs, max_depth,
                naming_violations, forbidden_hits, oversized_files,
                score, depth_score, naming_score, forbidden_score, oversized_score, density_score,
                snapshot_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                snapshot.timestamp.to_rfc3339(),
                snapshot.timestamp.timestamp_micros(),
                snapshot.root_path.display().to_string(),
                count(snapshot.total_files),
                count(snapshot.total_dirs),
                count(snapshot.max_depth),
                count(snapshot.naming_violations.len()),
                count(snapshot.forbidden_pattern_hits.len()),
                count(snapshot.oversized_files.len()),
                entry.score,
                entry.sub_scores.depth,
                entry.sub_scores.naming,
                entry.sub_scores.forbidden,
                entry.sub_scores.oversized,
                entry.sub_scores.density,
                snapshot_json,
            ],
        )?;
        let id = EntryId(tx.last_insert_rowid());

        if let Some(vector) = &entry.embedding {
            insert_vector(&tx, id, vector)?;
        }
        if let Some(report) = &entry.report {
            insert_report(&tx, id, report, snapshot.timestamp)?;
        }
        tx.commit()?;

        log::debug!("appended history entry {id} (score {:.2})", entry.score);
        Ok(id)
    }

    /// Attaches a report to an existing entry. Each entry takes one report.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown entry,
    /// [`StoreError::ReportExists`] if a report is already attached, or a
    /// SQLite error.
    pub fn attach_report(&self, id: EntryId, report: &EntryReport) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let timestamp: Option<i64> = tx
            .query_row("SELECT timestamp_us FROM entries WHERE id = ?1", params![id.0], |row| {
                row.get(0)
            })
            .optional()?;
        let Some(timestamp) = timestamp else {
            return Err(StoreError::NotFound(id.0));
        };
        let existing: Option<i64> = tx
            .query_row(
                "SELECT entry_id FROM entry_reports WHERE entry_id = ?1",
                params![id.0],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(StoreError::ReportExists(id.0));
        }
        let created_at = DateTime::from_timestamp_micros(timestamp).unwrap_or_default();
        insert_report(&tx, id, report, created_at)?;
        tx.commit()?;
        Ok(())
    }

    /// Returns entries whose timestamp falls in `range`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row cannot be decoded.
    pub fn query(&self, range: TimeRange) -> Result<Vec<StoredEntry>, StoreError> {
        let (start, end) = range.bounds();
        let sql = format!(
            "{SELECT_ENTRY} WHERE e.timestamp_us >= ?1 AND e.timestamp_us <= ?2
             ORDER BY e.timestamp_us ASC, e.id ASC"
        );
        self.select(&sql, params![start, end])
    }

    /// Returns the `n` most recent entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row cannot be decoded.
    pub fn latest(&self, n: usize) -> Result<Vec<StoredEntry>, StoreError> {
        let sql = format!("{SELECT_ENTRY} ORDER BY e.timestamp_us DESC, e.id DESC LIMIT ?1");
        self.select(&sql, params![count(n)])
    }

    /// Looks up a single entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row cannot be decoded.
    pub fn get(&self, id: EntryId) -> Result<Option<StoredEntry>, StoreError> {
        let sql = format!("{SELECT_ENTRY} WHERE e.id = ?1");
        Ok(self.select(&sql, params![id.0])?.into_iter().next())
    }

    /// Number of stored entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn len(&self) -> Result<u64, StoreError> {
        let n: i64 = self.conn().query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    /// Returns `true` when no scans have been stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Aggregate statistics over all entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        let conn = self.conn();
        let (total, avg, min, max, files, dirs): (
            i64,
            Option<f64>,
            Option<f64>,
            Option<f64>,
            Option<f64>,
            Option<f64>,
        ) = conn.query_row(
            "SELECT COUNT(*), AVG(score), MIN(score), MAX(score), AVG(total_files), AVG(total_dirs)
             FROM entries",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?)),
        )?;
        let alerts: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entry_reports WHERE alert = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(StoreStats {
            total_scans: u64::try_from(total).unwrap_or(0),
            avg_score: avg.unwrap_or(0.0),
            min_score: min.unwrap_or(0.0),
            max_score: max.unwrap_or(0.0),
            avg_files: files.unwrap_or(0.0),
            avg_dirs: dirs.unwrap_or(0.0),
            alerts: u64::try_from(alerts).unwrap_or(0),
        })
    }

    /// Identifier and timestamp of every entry, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn entry_stamps(&self) -> Result<Vec<(EntryId, DateTime<Utc>)>, StoreError> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id, timestamp_us FROM entries ORDER BY timestamp_us ASC, id ASC")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows
            .into_iter()
            .map(|(id, us)| (EntryId(id), DateTime::from_timestamp_micros(us).unwrap_or_default()))
            .collect())
    }

    /// Writes (or replaces) the index vector for an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn put_vector(&self, id: EntryId, vector: &[f32]) -> Result<(), StoreError> {
        let conn = self.conn();
        insert_vector(&conn, id, vector)
    }

    /// Removes index vectors. Entries themselves are untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete_vectors(&self, ids: &[EntryId]) -> Result<usize, StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut removed = 0;
        for id in ids {
            removed += tx.execute("DELETE FROM entry_vectors WHERE entry_id = ?1", params![id.0])?;
        }
        tx.commit()?;
        Ok(removed)
    }

    /// Every stored index vector, including ones whose entry no longer exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn vectors(&self) -> Result<Vec<(EntryId, Vec<f32>)>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT entry_id, vector FROM entry_vectors ORDER BY entry_id")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().map(|(id, blob)| (EntryId(id), blob_to_vector(&blob))).collect())
    }

    fn select(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<StoredEntry>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, |row| {
                Ok(RawEntry {
                    id: row.get(0)?,
                    score: row.get(1)?,
                    sub_scores: SubScores {
                        depth: row.get(2)?,
                        naming: row.get(3)?,
                        forbidden: row.get(4)?,
                        oversized: row.get(5)?,
                        density: row.get(6)?,
                    },
                    snapshot_json: row.get(7)?,
                    vector: row.get(8)?,
                    narrative: row.get(9)?,
                    alert: row.get(10)?,
                    degraded: row.get(11)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawEntry::decode).collect()
    }
}

/// Row as read from SQLite, before JSON decoding.
struct RawEntry {
    id: i64,
    score: f64,
    sub_scores: SubScores,
    snapshot_json: String,
    vector: Option<Vec<u8>>,
    narrative: Option<String>,
    alert: Option<bool>,
    degraded: Option<bool>,
}

impl RawEntry {
    fn decode(self) -> Result<StoredEntry, StoreError> {
        let snapshot: Snapshot = serde_json::from_str(&self.snapshot_json)
            .map_err(|e| StoreError::Corrupt { id: self.id, message: e.to_string() })?;
        let report = self.narrative.map(|narrative| EntryReport {
            narrative,
            alert: self.alert.unwrap_or(false),
            degraded: self.degraded.unwrap_or(false),
        });
        Ok(StoredEntry {
            id: EntryId(self.id),
            entry: HistoryEntry {
                snapshot,
                score: self.score,
                sub_scores: self.sub_scores,
                embedding: self.vector.as_deref().map(blob_to_vector),
                report,
            },
        })
    }
}

fn insert_vector(conn: &Connection, id: EntryId, vector: &[f32]) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO entry_vectors (entry_id, dimensions, vector) VALUES (?1, ?2, ?3)
         ON CONFLICT(entry_id) DO UPDATE SET dimensions = excluded.dimensions, vector = excluded.vector",
        params![id.0, count(vector.len()), vector_to_blob(vector)],
    )?;
    Ok(())
}

fn insert_report(
    conn: &Connection,
    id: EntryId,
    report: &EntryReport,
    created_at: DateTime<Utc>,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO entry_reports (entry_id, created_at, narrative, alert, degraded)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id.0, created_at.to_rfc3339(), report.narrative, report.alert, report.degraded],
    )?;
    Ok(())
}

fn count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Encodes a vector as little-endian `f32` bytes.
fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn blob_to_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect()
}

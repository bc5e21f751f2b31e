//! Append-only alert audit log backed by `SQLite`.
//!
//! Every Red/Yellow classification is persisted as an [`AlertRecord`];
//! records are immutable once written and are never updated or deleted.
//! WAL mode allows readers to proceed while appends are in flight, and
//! the connection mutex makes each append atomic, so concurrent devices
//! can log without client-side serialization.

// SQLite returns i64 for row IDs; they're always non-negative here.
#![allow(clippy::cast_sign_loss)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use rusqlite::{Connection, OpenFlags, params};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::Coordinate;
use crate::zone::Severity;

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Errors from audit log operations.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Database error from `SQLite`.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored row carried a zone type outside {Red, Yellow}.
    #[error("corrupt audit record {id}: unknown zone type '{zone_type}'")]
    CorruptRecord {
        /// Row ID of the corrupt record.
        id: u64,
        /// The unrecognized zone type text.
        zone_type: String,
    },
}

/// A persisted zone-entry event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    /// Row ID assigned by the store on append.
    pub id: u64,
    /// Latitude of the classified sample.
    pub lat: f64,
    /// Longitude of the classified sample.
    pub lng: f64,
    /// Severity of the zone entered.
    #[serde(rename = "zoneType")]
    pub zone_type: Severity,
    /// Server-assigned time of the append.
    pub timestamp: DateTime<Utc>,
}

/// The append-only alert store.
pub struct AuditLog {
    conn: Arc<Mutex<Connection>>,
}

impl AuditLog {
    /// Open or create an audit log at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be applied.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory audit log for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self, AuditError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Append a zone-entry event, assigning the server timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails; nothing partial is visible
    /// to readers on failure.
    pub fn append(
        &self,
        point: &Coordinate,
        zone_type: Severity,
    ) -> Result<AlertRecord, AuditError> {
        self.append_at(point, zone_type, Utc::now())
    }

    /// Append with an explicit timestamp. Used by tests; production
    /// appends go through [`append`](Self::append).
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn append_at(
        &self,
        point: &Coordinate,
        zone_type: Severity,
        timestamp: DateTime<Utc>,
    ) -> Result<AlertRecord, AuditError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());

        conn.execute(
            "INSERT INTO alerts (lat, lng, zone_type, timestamp_ms) VALUES (?1, ?2, ?3, ?4)",
            params![
                point.lat,
                point.lng,
                zone_type.as_str(),
                timestamp.timestamp_millis(),
            ],
        )?;

        Ok(AlertRecord {
            id: conn.last_insert_rowid() as u64,
            lat: point.lat,
            lng: point.lng,
            zone_type,
            timestamp,
        })
    }

    /// Records within a calendar-date range, ordered by timestamp
    /// ascending.
    ///
    /// The end date is widened by one day so the query covers the whole
    /// end day: effective condition is
    /// `timestamp >= start AND timestamp < end + 1 day`. Preserved from
    /// the original system for compatibility.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored row is corrupt.
    pub fn query_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AlertRecord>, AuditError> {
        let start_ms = day_start_ms(start);
        let effective_end = end.checked_add_days(Days::new(1)).unwrap_or(end);
        let end_ms = day_start_ms(effective_end);

        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());

        let mut stmt = conn.prepare(
            "SELECT id, lat, lng, zone_type, timestamp_ms
             FROM alerts
             WHERE timestamp_ms >= ?1 AND timestamp_ms < ?2
             ORDER BY timestamp_ms ASC",
        )?;

        let rows = stmt
            .query_map(params![start_ms, end_ms], |row| {
                Ok((
                    row.get::<_, i64>(0)? as u64,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, lat, lng, zone_type, ts_ms)| {
                let zone_type = Severity::parse(&zone_type)
                    .ok_or(AuditError::CorruptRecord { id, zone_type })?;
                Ok(AlertRecord {
                    id,
                    lat,
                    lng,
                    zone_type,
                    timestamp: Utc
                        .timestamp_millis_opt(ts_ms)
                        .single()
                        .unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Total number of records.
    ///
    /// # Errors
    ///
    /// Returns an error if the count query fails.
    pub fn len(&self) -> Result<u64, AuditError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM alerts", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Whether the log holds no records.
    ///
    /// # Errors
    ///
    /// Returns an error if the count query fails.
    pub fn is_empty(&self) -> Result<bool, AuditError> {
        Ok(self.len()? == 0)
    }
}

fn day_start_ms(date: NaiveDate) -> i64 {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
        .timestamp_millis()
}

//! SQLite persistence layer for the Olist dataset.
//!
//! RULE: Only the store talks to the database.
//! Engines receive rows through `OrderFactSource`; they never execute SQL.

use crate::{
    error::{AnalyticsError, AnalyticsResult},
    types::Timestamp,
};
use chrono::NaiveDateTime;
use rusqlite::{types::Type, Connection, OpenFlags};

mod queries;
mod records;

pub use records::{CustomerRow, OrderItemRow, OrderRow, ProductRow, ReviewRow, SellerRow};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct AnalyticsStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl AnalyticsStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> AnalyticsResult<Self> {
        Self::open_with(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )
    }

    /// Open an existing database without creating it. A missing file is
    /// reported as an unavailable upstream, not as an empty dataset.
    pub fn open_existing(path: &str) -> AnalyticsResult<Self> {
        Self::open_with(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_URI,
        )
    }

    fn open_with(path: &str, flags: OpenFlags) -> AnalyticsResult<Self> {
        let conn = Connection::open_with_flags(path, flags).map_err(|e| {
            AnalyticsError::UpstreamUnavailable {
                source_name: path.to_string(),
                reason:      e.to_string(),
            }
        })?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        log::debug!("store: opened {path}");
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> AnalyticsResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> AnalyticsResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_olist.sql"))?;
        Ok(())
    }

    /// Run `f` inside one transaction; roll back if it fails.
    pub fn in_transaction<T>(
        &self,
        f: impl FnOnce(&Self) -> AnalyticsResult<T>,
    ) -> AnalyticsResult<T> {
        self.conn.execute_batch("BEGIN")?;
        match f(self) {
            Ok(value) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }
}

// ── Timestamp text encoding ────────────────────────────────────────

pub fn timestamp_to_sql(ts: &Timestamp) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse the dataset's timestamp text. Fractional seconds are tolerated.
pub fn parse_timestamp(text: &str) -> Result<Timestamp, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text.trim(), TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text.trim(), "%Y-%m-%d %H:%M:%S%.f"))
}

/// Column reader for timestamp text inside `query_map` closures.
fn timestamp_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Timestamp> {
    let text: String = row.get(idx)?;
    parse_timestamp(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_timestamp_column(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<Timestamp>> {
    let text: Option<String> = row.get(idx)?;
    match text.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(t) => parse_timestamp(t)
            .map(Some)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
    }
}

//! Append-only SQLite log repository.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use thiserror::Error;

use crate::capture::record::{FlatMap, LogRecord, PayloadKind, StoredRecord};
use crate::storage::schema;

/// Error type for repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode record field: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("repository connection lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Listing direction for [`LogRepository::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListOrder {
    /// Oldest first; ties broken by insertion order.
    #[default]
    Ascending,
    /// Newest first.
    Descending,
}

const SELECT_COLUMNS: &str = "SELECT id, timestamp, method, path, headers, params, body, kind, \
     mime_type, file_name, original_file_name, file_content, raw_post_data FROM logs";

/// Durable, append-only store of [`LogRecord`]s.
///
/// Owns a single connection; concurrent callers are serialized on it, which
/// keeps identifiers unique and monotonic and makes each row visible whole.
pub struct LogRepository {
    conn: Mutex<Connection>,
}

impl LogRepository {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL lets readers proceed while a write is in flight
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        Self::from_connection(conn)
    }

    /// Repository backed by a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        schema::create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RepositoryError::Poisoned)
    }

    /// Append one record and return its identifier.
    pub fn append(&self, record: &LogRecord) -> Result<i64> {
        let conn = self.lock()?;
        insert(&conn, record)
    }

    /// Append the records of one ingestion event in a single transaction.
    ///
    /// Either every record becomes visible or none does.
    pub fn append_all(&self, records: &[LogRecord]) -> Result<Vec<i64>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            ids.push(insert(&tx, record)?);
        }
        tx.commit()?;
        Ok(ids)
    }

    /// Every record ever appended, oldest first.
    pub fn list_all(&self) -> Result<Vec<StoredRecord>> {
        self.list(ListOrder::Ascending)
    }

    pub fn list(&self, order: ListOrder) -> Result<Vec<StoredRecord>> {
        let sql = match order {
            ListOrder::Ascending => format!("{} ORDER BY timestamp ASC, id ASC", SELECT_COLUMNS),
            ListOrder::Descending => format!("{} ORDER BY timestamp DESC, id DESC", SELECT_COLUMNS),
        };

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map([], read_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Number of stored records.
    pub fn count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM logs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }
}

fn insert(conn: &Connection, record: &LogRecord) -> Result<i64> {
    let headers = serde_json::to_string(&record.headers)?;
    let params = serde_json::to_string(&record.query_params)?;

    conn.execute(
        "INSERT INTO logs (timestamp, method, path, headers, params, body, kind, mime_type, \
         file_name, original_file_name, file_content, raw_post_data) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            record.timestamp,
            record.method,
            record.path,
            headers,
            params,
            record.body,
            record.kind.map(|k| k.as_str()),
            record.mime_type,
            record.stored_file_name,
            record.original_file_name,
            record.file_content_preview,
            record.raw_post_data,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn read_record(row: &Row<'_>) -> rusqlite::Result<StoredRecord> {
    let headers: Option<String> = row.get(4)?;
    let params: Option<String> = row.get(5)?;
    let kind: Option<String> = row.get(7)?;

    let kind = match kind {
        Some(name) => Some(name.parse::<PayloadKind>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, Type::Text, e.into())
        })?),
        None => None,
    };

    Ok(StoredRecord {
        id: row.get(0)?,
        record: LogRecord {
            timestamp: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            method: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            path: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            headers: decode_map(headers, 4)?,
            query_params: decode_map(params, 5)?,
            body: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            kind,
            mime_type: row.get(8)?,
            stored_file_name: row.get(9)?,
            original_file_name: row.get(10)?,
            file_content_preview: row.get(11)?,
            raw_post_data: row.get(12)?,
        },
    })
}

fn decode_map(json: Option<String>, column: usize) -> rusqlite::Result<FlatMap> {
    match json {
        Some(json) if !json.is_empty() => serde_json::from_str(&json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e))),
        _ => Ok(FlatMap::new()),
    }
}

use rusqlite::Connection;

/// Columns added after the first release, with their SQL types.
///
/// Databases created by older builds are brought forward by adding any of
/// these that are missing.
const ADDITIVE_COLUMNS: &[(&str, &str)] = &[("kind", "TEXT"), ("raw_post_data", "TEXT")];

/// Create the log table and its ordering index if they do not exist.
pub fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            method TEXT NOT NULL,
            headers TEXT NOT NULL,
            params TEXT NOT NULL,
            body TEXT NOT NULL,
            mime_type TEXT,
            file_name TEXT,
            original_file_name TEXT,
            file_content TEXT,
            path TEXT NOT NULL,
            kind TEXT,
            raw_post_data TEXT
        );

        -- listing order
        CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON logs(timestamp, id);
        "#,
    )?;
    add_missing_columns(conn)
}

fn add_missing_columns(conn: &Connection) -> rusqlite::Result<()> {
    let existing = column_names(conn)?;
    for (name, sql_type) in ADDITIVE_COLUMNS {
        if !existing.iter().any(|c| c == name) {
            conn.execute_batch(&format!("ALTER TABLE logs ADD COLUMN {} {};", name, sql_type))?;
            tracing::info!(column = name, "Added column to logs table");
        }
    }
    Ok(())
}

/// Column names of the `logs` table.
pub fn column_names(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("PRAGMA table_info(logs)")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;

// ── App Config ─────────────────────────────────────────────────────

pub const KEY_AGING_THRESHOLDS: &str = "aging_thresholds";
pub const KEY_GRANULARITY: &str = "granularity";

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM app_config WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))",
        params![key, value],
    )?;
    Ok(())
}

/// Returns whether a value was present.
pub fn delete_config(conn: &Connection, key: &str) -> Result<bool> {
    let n = conn.execute("DELETE FROM app_config WHERE key = ?1", params![key])?;
    Ok(n > 0)
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

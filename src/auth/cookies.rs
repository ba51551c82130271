use rusqlite::{params, OptionalExtension};

use crate::db::models::StoredCookie;
use crate::error::ClientResult;
use crate::state::DbPool;

/// Persistent name/value store with expiry, standing in for browser cookies.
#[derive(Clone)]
pub struct CookieJar {
    pool: DbPool,
}

impl CookieJar {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Store a cookie that expires `seconds` from now. Negative values
    /// store an already-expired cookie.
    pub fn set(&self, name: &str, value: &str, seconds: i64) -> ClientResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO cookies (name, value, expires_at)
             VALUES (?1, ?2, datetime('now', ?3))
             ON CONFLICT(name) DO UPDATE SET
               value = excluded.value,
               expires_at = excluded.expires_at",
            params![name, value, format!("{:+} seconds", seconds)],
        )?;
        Ok(())
    }

    pub fn set_hours(&self, name: &str, value: &str, hours: i64) -> ClientResult<()> {
        self.set(name, value, hours * 3600)
    }

    /// Value of a live cookie. Expired cookies are dropped on read.
    pub fn get(&self, name: &str) -> ClientResult<Option<String>> {
        Ok(self.entry(name)?.map(|c| c.value))
    }

    pub fn entry(&self, name: &str) -> ClientResult<Option<StoredCookie>> {
        let conn = self.pool.get()?;
        conn.execute(
            "DELETE FROM cookies WHERE name = ?1 AND expires_at <= datetime('now')",
            params![name],
        )?;
        let cookie = conn
            .query_row(
                "SELECT name, value, expires_at FROM cookies WHERE name = ?1",
                params![name],
                |row| {
                    Ok(StoredCookie {
                        name: row.get(0)?,
                        value: row.get(1)?,
                        expires_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(cookie)
    }

    pub fn remove(&self, name: &str) -> ClientResult<()> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM cookies WHERE name = ?1", params![name])?;
        Ok(())
    }
}

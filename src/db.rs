// SQLite implementation of the record store and the draw registry.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use crate::player::{PlayerProfile, PlayerRecord};
use crate::store::{DrawRegistry, RecordStore, StoreError};

/// SQLite-backed persistence for player rows and drawn identifiers. One
/// handle implements both service contracts; every query is scoped to the
/// active season label, so seasons never see each other's rows.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    season: String,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at `path`, scoped to `season`,
    /// and ensure all tables exist. Pass `":memory:"` for an ephemeral
    /// in-memory database (useful for tests).
    pub fn open(path: &str, season: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS players (
                season   TEXT NOT NULL,
                ord      INTEGER NOT NULL,
                profile  TEXT NOT NULL,
                sold_to  TEXT,
                sold_for TEXT,
                PRIMARY KEY (season, ord)
            );

            CREATE TABLE IF NOT EXISTS drawn (
                season TEXT NOT NULL,
                ord    INTEGER NOT NULL,
                PRIMARY KEY (season, ord)
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
            season: season.to_string(),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// The season label this handle is scoped to.
    pub fn season(&self) -> &str {
        &self.season
    }
}

fn store_err(e: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn row_to_record(
    ord: usize,
    profile_json: &str,
    sold_to: Option<String>,
    sold_for: Option<String>,
) -> Result<PlayerRecord, StoreError> {
    let profile: PlayerProfile = serde_json::from_str(profile_json)
        .map_err(|e| StoreError::Unavailable(format!("corrupt profile at index {ord}: {e}")))?;
    Ok(PlayerRecord {
        id: ord,
        profile,
        sold_to,
        sold_for,
    })
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM players WHERE season = ?1",
                params![self.season],
                |row| row.get(0),
            )
            .map_err(store_err)?;
        Ok(count as usize)
    }

    async fn get(&self, id: usize) -> Result<PlayerRecord, StoreError> {
        let conn = self.conn();
        let row: Option<(String, Option<String>, Option<String>)> = conn
            .query_row(
                "SELECT profile, sold_to, sold_for FROM players
                 WHERE season = ?1 AND ord = ?2",
                params![self.season, id as i64],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(store_err)?;

        match row {
            Some((profile_json, sold_to, sold_for)) => {
                row_to_record(id, &profile_json, sold_to, sold_for)
            }
            None => Err(StoreError::NotFound { id }),
        }
    }

    async fn get_all(&self) -> Result<Vec<PlayerRecord>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT ord, profile, sold_to, sold_for FROM players
                 WHERE season = ?1 ORDER BY ord",
            )
            .map_err(store_err)?;

        let rows = stmt
            .query_map(params![self.season], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })
            .map_err(store_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(store_err)?;

        rows.into_iter()
            .map(|(ord, profile_json, sold_to, sold_for)| {
                row_to_record(ord as usize, &profile_json, sold_to, sold_for)
            })
            .collect()
    }

    async fn append(&self, profile: &PlayerProfile) -> Result<usize, StoreError> {
        let profile_json = serde_json::to_string(profile)
            .map_err(|e| StoreError::Unavailable(format!("failed to serialize profile: {e}")))?;

        let mut conn = self.conn();
        // Ordinal assignment and insert happen in one transaction so two
        // concurrent registrations cannot claim the same index.
        let tx = conn.transaction().map_err(store_err)?;
        let ord: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM players WHERE season = ?1",
                params![self.season],
                |row| row.get(0),
            )
            .map_err(store_err)?;
        tx.execute(
            "INSERT INTO players (season, ord, profile) VALUES (?1, ?2, ?3)",
            params![self.season, ord, profile_json],
        )
        .map_err(store_err)?;
        tx.commit().map_err(store_err)?;

        Ok(ord as usize)
    }

    async fn record_sale(&self, id: usize, team: &str, amount: &str) -> Result<(), StoreError> {
        let conn = self.conn();
        let changed = conn
            .execute(
                "UPDATE players SET sold_to = ?3, sold_for = ?4
                 WHERE season = ?1 AND ord = ?2",
                params![self.season, id as i64, team, amount],
            )
            .map_err(store_err)?;

        if changed == 0 {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }
}

#[async_trait]
impl DrawRegistry for SqliteStore {
    async fn size(&self) -> Result<usize, StoreError> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM drawn WHERE season = ?1",
                params![self.season],
                |row| row.get(0),
            )
            .map_err(store_err)?;
        Ok(count as usize)
    }

    async fn contains(&self, id: usize) -> Result<bool, StoreError> {
        let conn = self.conn();
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM drawn WHERE season = ?1 AND ord = ?2)",
                params![self.season, id as i64],
                |row| row.get(0),
            )
            .map_err(store_err)?;
        Ok(exists)
    }

    async fn add(&self, id: usize) -> Result<(), StoreError> {
        let conn = self.conn();
        // INSERT OR IGNORE gives the idempotent set semantics the contract
        // requires: re-adding a drawn identifier is a no-op.
        conn.execute(
            "INSERT OR IGNORE INTO drawn (season, ord) VALUES (?1, ?2)",
            params![self.season, id as i64],
        )
        .map_err(store_err)?;
        Ok(())
    }

    async fn list_all(&self) -> Result<HashSet<usize>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT ord FROM drawn WHERE season = ?1")
            .map_err(store_err)?;

        let ids = stmt
            .query_map(params![self.season], |row| row.get::<_, i64>(0))
            .map_err(store_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(store_err)?;

        Ok(ids.into_iter().map(|ord| ord as usize).collect())
    }
}

//! Persisted meter state: a single JSON blob in sqlite under a fixed key.
//!
//! The record is schema-light on purpose — `MeterState`'s per-field serde
//! defaults do the forward/backward-compatible merge on load, so a record
//! written by an older build hydrates cleanly.

use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::engine::state::MeterState;

const STATE_KEY: &str = "hypemeter";

pub struct StateStore {
    conn: Connection,
}

impl StateStore {
    pub fn open(path: &str) -> Result<Self> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn init(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS meter_state (
                key TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            COMMIT;",
        )?;
        Ok(())
    }

    /// Synchronous snapshot; called after every accepted mutation.
    pub fn save(&mut self, state: &MeterState) -> Result<()> {
        let body = serde_json::to_string(state)?;
        self.conn.execute(
            "INSERT INTO meter_state (key, body, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            params![STATE_KEY, body, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    /// `Ok(None)` when nothing was ever persisted. A corrupt body is an
    /// error; the caller logs it and falls back to defaults.
    pub fn load(&self) -> Result<Option<MeterState>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM meter_state WHERE key = ?1",
                params![STATE_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    #[cfg(test)]
    fn put_raw(&mut self, body: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO meter_state (key, body, updated_at) VALUES (?1, ?2, 0)
             ON CONFLICT(key) DO UPDATE SET body = excluded.body",
            params![STATE_KEY, body],
        )?;
        Ok(())
    }
}

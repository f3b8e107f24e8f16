//! Session flags behind a swappable interface
//!
//! A session maps to a single "authenticated" flag. Unknown or expired
//! sessions read as `false`.

use crate::database::{self, SharedConnection};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, session: &str, authenticated: bool) -> Result<(), AppError>;

    async fn get(&self, session: &str) -> bool;
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, bool>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, bool>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, session: &str, authenticated: bool) -> Result<(), AppError> {
        self.sessions().insert(session.to_string(), authenticated);
        Ok(())
    }

    async fn get(&self, session: &str) -> bool {
        self.sessions().get(session).copied().unwrap_or(false)
    }
}

/// Sessions persisted in the `sessions` table, valid for `ttl` after `put`
#[derive(Clone)]
pub struct SqliteSessionStore {
    conn: SharedConnection,
    ttl: Duration,
}

impl SqliteSessionStore {
    pub fn new(conn: SharedConnection, ttl: Duration) -> Self {
        Self { conn, ttl }
    }

    /// Drops expired sessions, returns how many were removed
    pub fn purge_expired(&self) -> Result<usize, AppError> {
        let conn = database::lock(&self.conn);
        let removed = conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            [Utc::now().timestamp()],
        )?;
        if removed > 0 {
            log::debug!("Purged {} expired session(s)", removed);
        }
        Ok(removed)
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn put(&self, session: &str, authenticated: bool) -> Result<(), AppError> {
        let conn = self.conn.clone();
        let session = session.to_string();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = Utc::now().timestamp().saturating_add(ttl);

        tokio::task::spawn_blocking(move || {
            let conn = database::lock(&conn);
            conn.execute(
                "INSERT INTO sessions (token, authenticated, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(token) DO UPDATE SET
                    authenticated = excluded.authenticated,
                    expires_at = excluded.expires_at",
                params![session, authenticated, expires_at],
            )?;
            Ok::<(), AppError>(())
        })
        .await
        .map_err(|e| AppError::Persistence(format!("Session task failed: {}", e)))?
    }

    async fn get(&self, session: &str) -> bool {
        let conn = self.conn.clone();
        let session = session.to_string();

        let lookup = tokio::task::spawn_blocking(move || {
            let conn = database::lock(&conn);
            conn.query_row(
                "SELECT authenticated FROM sessions WHERE token = ?1 AND expires_at > ?2",
                params![session, Utc::now().timestamp()],
                |row| row.get::<_, bool>(0),
            )
            .optional()
        })
        .await;

        match lookup {
            Ok(Ok(flag)) => flag.unwrap_or(false),
            Ok(Err(e)) => {
                log::error!("Session lookup failed: {}", e);
                false
            }
            Err(e) => {
                log::error!("Session lookup task failed: {}", e);
                false
            }
        }
    }
}

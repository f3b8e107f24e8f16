//! Painting persistence behind a swappable interface
//!
//! Every operation degrades instead of failing: a backend error or a timeout
//! is logged and turns into `None`, an empty list or `false`. Callers that
//! need to surface a failure treat those values as one.

use crate::database::{self, SharedConnection};
use crate::error::AppError;
use crate::models::{PaintingId, PaintingRecord, PaintingUpdate};
use crate::services::painting_service;
use async_trait::async_trait;
use rusqlite::{Connection, InterruptHandle};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Bound applied to every metadata call unless configured otherwise
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(15);

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Stores a new record; `None` if nothing was stored
    async fn save(&self, record: PaintingRecord) -> Option<PaintingId>;

    async fn list(&self) -> Vec<PaintingRecord>;

    /// Loads a record; `None` is the "no record" sentinel
    async fn get(&self, id: PaintingId) -> Option<PaintingRecord>;

    /// Writes only the fields present in `update`
    async fn update(&self, id: PaintingId, update: PaintingUpdate) -> bool;

    async fn delete(&self, id: PaintingId) -> bool;
}

/// SQLite-backed metadata store
///
/// A call that times out before it got hold of the connection never runs.
/// A call already running when the timeout fires is interrupted and its real
/// outcome is reported, so a `None`/`false` never hides a committed write.
#[derive(Clone)]
pub struct SqliteMetadataStore {
    conn: SharedConnection,
    interrupt: Arc<InterruptHandle>,
    timeout: Duration,
}

const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const CANCELLED: u8 = 2;

impl SqliteMetadataStore {
    pub fn new(conn: SharedConnection, timeout: Duration) -> Self {
        let interrupt = Arc::new(database::lock(&conn).get_interrupt_handle());
        Self {
            conn,
            interrupt,
            timeout,
        }
    }

    /// Runs `op` on a blocking thread, bounded by the configured timeout
    async fn run<T, F>(&self, name: &'static str, op: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, AppError> + Send + 'static,
    {
        let conn = self.conn.clone();
        let state = Arc::new(AtomicU8::new(PENDING));
        let task_state = state.clone();
        let mut task = tokio::task::spawn_blocking(move || {
            let guard = database::lock(&conn);
            if task_state
                .compare_exchange(PENDING, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return Err(AppError::Persistence("Cancelled after timeout".to_string()));
            }
            op(&guard)
        });

        let joined = match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                if state
                    .compare_exchange(PENDING, CANCELLED, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    log::error!("Metadata {} timed out after {:?}", name, self.timeout);
                    return None;
                }
                log::warn!(
                    "Metadata {} still running after {:?}, interrupting",
                    name,
                    self.timeout
                );
                self.interrupt.interrupt();
                task.await
            }
        };

        match joined {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                log::error!("Metadata {} failed: {}", name, e);
                None
            }
            Err(e) => {
                log::error!("Metadata {} task failed: {}", name, e);
                None
            }
        }
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn save(&self, record: PaintingRecord) -> Option<PaintingId> {
        self.run("save", move |conn| painting_service::insert_painting(conn, &record))
            .await
    }

    async fn list(&self) -> Vec<PaintingRecord> {
        self.run("list", painting_service::list_paintings)
            .await
            .unwrap_or_default()
    }

    async fn get(&self, id: PaintingId) -> Option<PaintingRecord> {
        self.run("get", move |conn| painting_service::get_painting(conn, id))
            .await
            .flatten()
    }

    async fn update(&self, id: PaintingId, update: PaintingUpdate) -> bool {
        self.run("update", move |conn| {
            painting_service::update_painting(conn, id, &update)
        })
        .await
        .unwrap_or(false)
    }

    async fn delete(&self, id: PaintingId) -> bool {
        self.run("delete", move |conn| painting_service::delete_painting(conn, id))
            .await
            .unwrap_or(false)
    }
}

/// Metadata store keeping records in a map, with switchable failures
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    records: Mutex<BTreeMap<PaintingId, PaintingRecord>>,
    fail_saves: AtomicBool,
    fail_updates: AtomicBool,
    fail_deletes: AtomicBool,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, BTreeMap<PaintingId, PaintingRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn save(&self, mut record: PaintingRecord) -> Option<PaintingId> {
        if self.fail_saves.load(Ordering::SeqCst) {
            log::error!("Metadata save failed: injected failure");
            return None;
        }
        if let Err(e) = record.validate() {
            log::error!("Metadata save failed: {}", e);
            return None;
        }

        let id = PaintingId::generate();
        record.id = Some(id);
        self.records().insert(id, record);
        Some(id)
    }

    async fn list(&self) -> Vec<PaintingRecord> {
        self.records().values().cloned().collect()
    }

    async fn get(&self, id: PaintingId) -> Option<PaintingRecord> {
        self.records().get(&id).cloned()
    }

    async fn update(&self, id: PaintingId, update: PaintingUpdate) -> bool {
        if self.fail_updates.load(Ordering::SeqCst) {
            log::error!("Metadata update failed: injected failure");
            return false;
        }
        match self.records().get_mut(&id) {
            Some(record) => {
                update.apply_to(record);
                true
            }
            None => false,
        }
    }

    async fn delete(&self, id: PaintingId) -> bool {
        if self.fail_deletes.load(Ordering::SeqCst) {
            log::error!("Metadata delete failed: injected failure");
            return false;
        }
        self.records().remove(&id).is_some()
    }
}

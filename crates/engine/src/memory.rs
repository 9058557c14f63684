//! In-memory backends for the storage coordinator.
//!
//! They behave like the PostgreSQL store and the Redis cache/queue, including
//! the `complete → pending` refusal, and can be switched into a failing mode to
//! exercise error paths. Only compiled for tests or with the `test-util`
//! feature.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;

use courier_common::types::{Notification, NotificationStatus};

use crate::store::{DelayQueue, NotificationCache, NotificationStore, StorageError};

fn injected(what: &str) -> StorageError {
    StorageError::Queue(format!("injected {what} failure"))
}

#[derive(Default)]
pub struct InMemoryStore {
    rows: Mutex<BTreeMap<i64, Notification>>,
    next_id: AtomicI64,
    reads: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// How many times `read` was called.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Direct look at a row, bypassing counters.
    pub fn row(&self, id: i64) -> Option<Notification> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn create(&self, n: &Notification) -> Result<i64, StorageError> {
        self.check()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let row = Notification {
            id,
            status: NotificationStatus::Pending,
            ..n.clone()
        };
        self.rows.lock().unwrap().insert(id, row);
        Ok(id)
    }

    async fn read(&self, id: i64) -> Result<Option<Notification>, StorageError> {
        self.check()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.row(id))
    }

    async fn update_status(
        &self,
        status: NotificationStatus,
        id: i64,
    ) -> Result<u64, StorageError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&id) {
            Some(row)
                if row.status == NotificationStatus::Pending
                    || status == NotificationStatus::Complete =>
            {
                row.status = status;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn delete(&self, id: i64) -> Result<u64, StorageError> {
        self.check()?;
        Ok(self.rows.lock().unwrap().remove(&id).map_or(0, |_| 1))
    }
}

#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<i64, Vec<u8>>>,
    failing_writes: AtomicBool,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `set` fail; reads and deletes keep working.
    pub fn set_failing_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }

    pub fn contains(&self, id: i64) -> bool {
        self.entries.lock().unwrap().contains_key(&id)
    }

    pub fn raw(&self, id: i64) -> Option<Vec<u8>> {
        self.entries.lock().unwrap().get(&id).cloned()
    }

    /// Store bytes as-is, e.g. a stale or corrupt entry.
    pub fn insert_raw(&self, id: i64, bytes: Vec<u8>) {
        self.entries.lock().unwrap().insert(id, bytes);
    }
}

#[async_trait]
impl NotificationCache for InMemoryCache {
    async fn set(&self, id: i64, encoded: &[u8]) -> Result<(), StorageError> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(injected("cache write"));
        }
        self.insert_raw(id, encoded.to_vec());
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.raw(id))
    }

    async fn delete(&self, id: i64) -> Result<u64, StorageError> {
        Ok(self.entries.lock().unwrap().remove(&id).map_or(0, |_| 1))
    }
}

/// Records every publish as `(payload, delay_ms)`.
#[derive(Default)]
pub struct InMemoryQueue {
    published: Mutex<Vec<(Vec<u8>, i64)>>,
    failing: AtomicBool,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<(Vec<u8>, i64)> {
        self.published.lock().unwrap().clone()
    }

    /// Take the oldest published payload, as a consumer would.
    pub fn pop(&self) -> Option<Vec<u8>> {
        let mut published = self.published.lock().unwrap();
        if published.is_empty() {
            None
        } else {
            Some(published.remove(0).0)
        }
    }
}

#[async_trait]
impl DelayQueue for InMemoryQueue {
    async fn publish(&self, payload: &[u8], delay_ms: i64) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected("publish"));
        }
        self.published
            .lock()
            .unwrap()
            .push((payload.to_vec(), delay_ms));
        Ok(())
    }
}

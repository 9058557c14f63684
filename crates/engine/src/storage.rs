//! Storage coordinator: cache-aside orchestration over the durable store, the
//! cache and the delay queue.
//!
//! Reads go to the cache first and fall back to the store, populating the
//! cache on the way out. Writes never update the cache; they invalidate it, so
//! the next read reloads the durable row. There is no lock across the pair: a
//! read racing a write can repopulate a stale entry, which the next
//! invalidation clears.

use std::sync::Arc;

use chrono::Utc;

use courier_common::codec;
use courier_common::types::{Notification, NotificationStatus};

use crate::store::{DelayQueue, NotificationCache, NotificationStore, StorageError};

pub struct NotificationStorage {
    store: Arc<dyn NotificationStore>,
    cache: Arc<dyn NotificationCache>,
    queue: Arc<dyn DelayQueue>,
}

impl NotificationStorage {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        cache: Arc<dyn NotificationCache>,
        queue: Arc<dyn DelayQueue>,
    ) -> Self {
        Self {
            store,
            cache,
            queue,
        }
    }

    /// Persist `n`, then schedule its delivery at `n.scheduled_at`.
    ///
    /// If publishing fails the durable row is kept: it stays `pending` with no
    /// delivery scheduled, and the error is returned so an operator can react.
    pub async fn create(&self, mut n: Notification) -> Result<i64, StorageError> {
        let id = self.store.create(&n).await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to insert notification");
        })?;
        if id < 1 {
            return Err(StorageError::MissingIdentifier);
        }
        n.id = id;

        let delay_ms = n.delay_millis(Utc::now());
        let scheduled = match codec::encode(&n) {
            Ok(payload) => self.queue.publish(&payload, delay_ms).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = scheduled {
            tracing::error!(
                notification_id = id,
                error = %e,
                "Notification persisted but not scheduled; it will stay pending"
            );
            return Err(e);
        }

        tracing::info!(notification_id = id, delay_ms, "Notification scheduled");
        Ok(id)
    }

    /// Cache-aside read.
    pub async fn get(&self, id: i64) -> Result<Notification, StorageError> {
        if let Some(bytes) = self.cache.get(id).await? {
            match codec::decode(&bytes) {
                Ok(n) if n.id != 0 => {
                    tracing::debug!(notification_id = id, "Cache hit");
                    return Ok(n);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        notification_id = id,
                        error = %e,
                        "Discarding undecodable cache entry"
                    );
                }
            }
        }

        let n = self.store.read(id).await?.ok_or(StorageError::NotFound)?;

        match codec::encode(&n) {
            Ok(bytes) => {
                if let Err(e) = self.cache.set(id, &bytes).await {
                    tracing::error!(notification_id = id, error = %e, "Failed to populate cache");
                }
            }
            Err(e) => {
                tracing::error!(notification_id = id, error = %e, "Failed to encode for cache");
            }
        }

        Ok(n)
    }

    /// Update the durable status, then invalidate the cached copy.
    pub async fn update_status(
        &self,
        status: NotificationStatus,
        id: i64,
    ) -> Result<(), StorageError> {
        let affected = self.store.update_status(status, id).await.inspect_err(|e| {
            tracing::error!(notification_id = id, error = %e, "Failed to update status");
        })?;

        if affected == 0 {
            return match self.store.read(id).await? {
                Some(existing) => Err(StorageError::InvalidTransition {
                    from: existing.status,
                    to: status,
                }),
                None => Err(StorageError::NotAffected),
            };
        }

        self.cache.delete(id).await?;

        tracing::info!(notification_id = id, %status, "Notification status updated");
        Ok(())
    }

    /// Invalidate the cached copy, then delete the durable row.
    pub async fn delete(&self, id: i64) -> Result<(), StorageError> {
        self.cache.delete(id).await?;

        let affected = self.store.delete(id).await.inspect_err(|e| {
            tracing::error!(notification_id = id, error = %e, "Failed to delete notification");
        })?;
        if affected == 0 {
            return Err(StorageError::NotAffected);
        }

        tracing::info!(notification_id = id, "Notification deleted");
        Ok(())
    }
}

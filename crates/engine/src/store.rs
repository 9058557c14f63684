//! Collaborators of the storage coordinator and their production backends.
//!
//! - [`NotificationStore`]: the durable, authoritative record (PostgreSQL)
//! - [`NotificationCache`]: the volatile lookup store (Redis)
//! - [`DelayQueue`]: the producer side of the delay-capable transport (Redis)

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use courier_common::codec::CodecError;
use courier_common::delay_queue::RedisDelayQueue;
use courier_common::types::{Notification, NotificationStatus};

/// Failures of the storage layer, by category.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("notification not found")]
    NotFound,

    #[error("no notification was affected")]
    NotAffected,

    #[error("store returned no usable identifier")]
    MissingIdentifier,

    #[error("status cannot change from {from} to {to}")]
    InvalidTransition {
        from: NotificationStatus,
        to: NotificationStatus,
    },

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("cache: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("queue: {0}")]
    Queue(String),

    #[error("codec: {0}")]
    Codec(#[from] CodecError),
}

/// Durable record store.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Insert a record and return the identifier the store assigned.
    async fn create(&self, n: &Notification) -> Result<i64, StorageError>;

    /// Read a record; `None` means no such row.
    async fn read(&self, id: i64) -> Result<Option<Notification>, StorageError>;

    /// Set the status of a record, refusing `complete → pending`.
    /// Returns the number of affected rows.
    async fn update_status(&self, status: NotificationStatus, id: i64)
    -> Result<u64, StorageError>;

    /// Remove a record. Returns the number of affected rows.
    async fn delete(&self, id: i64) -> Result<u64, StorageError>;
}

/// Volatile cache holding encoded records keyed by identifier.
#[async_trait]
pub trait NotificationCache: Send + Sync {
    async fn set(&self, id: i64, encoded: &[u8]) -> Result<(), StorageError>;

    /// `None` means the key is absent, which is not an error.
    async fn get(&self, id: i64) -> Result<Option<Vec<u8>>, StorageError>;

    /// Returns how many keys were removed; `0` when already absent.
    async fn delete(&self, id: i64) -> Result<u64, StorageError>;
}

/// Producer side of the delay queue.
#[async_trait]
pub trait DelayQueue: Send + Sync {
    /// Publish an encoded payload for delivery after `delay_ms`.
    /// Non-positive delays mean "deliver immediately".
    async fn publish(&self, payload: &[u8], delay_ms: i64) -> Result<(), StorageError>;
}

/// PostgreSQL-backed [`NotificationStore`].
#[derive(Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn create(&self, n: &Notification) -> Result<i64, StorageError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO notifications (chat_id, message, email, status, scheduled_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(n.chat_id)
        .bind(&n.message)
        .bind(&n.email)
        .bind(n.status)
        .bind(n.scheduled_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id,)| id).ok_or(StorageError::MissingIdentifier)
    }

    async fn read(&self, id: i64) -> Result<Option<Notification>, StorageError> {
        let n: Option<Notification> = sqlx::query_as(
            "SELECT id, chat_id, message, email, status, scheduled_at FROM notifications WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(n)
    }

    async fn update_status(
        &self,
        status: NotificationStatus,
        id: i64,
    ) -> Result<u64, StorageError> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET status = $1
            WHERE id = $2
              AND (status = 'pending' OR $1 = 'complete')
            "#,
        )
        .bind(status)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: i64) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl DelayQueue for RedisDelayQueue {
    async fn publish(&self, payload: &[u8], delay_ms: i64) -> Result<(), StorageError> {
        RedisDelayQueue::publish(self, payload, delay_ms)
            .await
            .map_err(|e| StorageError::Queue(e.to_string()))
    }
}

//! Redis-backed notification cache.
//!
//! Values are the codec's byte form, keyed by the identifier as a decimal
//! string. Entries carry no TTL: they are removed explicitly when the durable
//! record changes.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::store::{NotificationCache, StorageError};

#[derive(Clone)]
pub struct RedisNotificationCache {
    redis: ConnectionManager,
}

impl RedisNotificationCache {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl NotificationCache for RedisNotificationCache {
    async fn set(&self, id: i64, encoded: &[u8]) -> Result<(), StorageError> {
        let mut conn = self.redis.clone();
        conn.set::<_, _, ()>(id.to_string(), encoded).await?;
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Option<Vec<u8>>, StorageError> {
        let mut conn = self.redis.clone();
        let value: Option<Vec<u8>> = conn.get(id.to_string()).await?;
        Ok(value)
    }

    async fn delete(&self, id: i64) -> Result<u64, StorageError> {
        let mut conn = self.redis.clone();
        let removed: u64 = conn.del(id.to_string()).await?;
        Ok(removed)
    }
}

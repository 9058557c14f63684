//! Where the dispatch loop gets its payloads from.

use async_trait::async_trait;

use courier_common::delay_queue::RedisDelayQueue;

/// Consumer side of the delay queue.
///
/// Delivery is at-least-once: a claimed payload that is never acknowledged
/// becomes claimable again once [`requeue_expired`](Self::requeue_expired)
/// runs after its visibility timeout.
#[async_trait]
pub trait DeliverySource: Send + Sync {
    /// Take the next payload whose delay has elapsed, if any.
    async fn claim_due(&self) -> anyhow::Result<Option<Vec<u8>>>;

    /// Mark a claimed payload as handled.
    async fn ack(&self, payload: &[u8]) -> anyhow::Result<()>;

    /// Return abandoned claims to the queue. Returns how many were moved.
    async fn requeue_expired(&self) -> anyhow::Result<u64>;
}

#[async_trait]
impl DeliverySource for RedisDelayQueue {
    async fn claim_due(&self) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(RedisDelayQueue::claim_due(self).await?)
    }

    async fn ack(&self, payload: &[u8]) -> anyhow::Result<()> {
        Ok(RedisDelayQueue::ack(self, payload).await?)
    }

    async fn requeue_expired(&self) -> anyhow::Result<u64> {
        Ok(RedisDelayQueue::requeue_expired(self).await?)
    }
}

//! Redis-backed delay queue.
//!
//! Pending messages live in a sorted set scored by their due time in unix
//! milliseconds. A consumer claims a due message by atomically moving it into
//! an in-flight set scored by its visibility deadline, and acknowledges it once
//! handled. Messages whose deadline passes without an ack are moved back and
//! delivered again, so delivery is at-least-once.

use std::time::Duration;

use chrono::Utc;
use redis::Script;
use redis::aio::ConnectionManager;

/// Move at most one due member from KEYS[1] to KEYS[2] (scored ARGV[2]) and return it.
const CLAIM_SCRIPT: &str = r#"
local due = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1], 'LIMIT', 0, 1)
if #due == 0 then
    return false
end
redis.call('ZREM', KEYS[1], due[1])
redis.call('ZADD', KEYS[2], ARGV[2], due[1])
return due[1]
"#;

/// Move every member of KEYS[2] scored at or below ARGV[1] back to KEYS[1].
const REQUEUE_SCRIPT: &str = r#"
local expired = redis.call('ZRANGEBYSCORE', KEYS[2], '-inf', ARGV[1])
for _, member in ipairs(expired) do
    redis.call('ZREM', KEYS[2], member)
    redis.call('ZADD', KEYS[1], ARGV[1], member)
end
return #expired
"#;

/// Delay queue over two Redis sorted sets: `<key>` and `<key>:inflight`.
#[derive(Clone)]
pub struct RedisDelayQueue {
    redis: ConnectionManager,
    key: String,
    inflight_key: String,
    visibility_timeout: Duration,
    claim: Script,
    requeue: Script,
}

impl RedisDelayQueue {
    pub fn new(redis: ConnectionManager, key: impl Into<String>, visibility_timeout: Duration) -> Self {
        let key = key.into();
        Self {
            redis,
            inflight_key: format!("{}:inflight", key),
            key,
            visibility_timeout,
            claim: Script::new(CLAIM_SCRIPT),
            requeue: Script::new(REQUEUE_SCRIPT),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Schedule `payload` for delivery after `delay_ms`.
    ///
    /// A zero or negative delay makes the message due immediately.
    pub async fn publish(&self, payload: &[u8], delay_ms: i64) -> redis::RedisResult<()> {
        let due_at = due_score(Utc::now().timestamp_millis(), delay_ms);
        let mut conn = self.redis.clone();

        let _: i64 = redis::cmd("ZADD")
            .arg(&self.key)
            .arg(due_at)
            .arg(payload)
            .query_async(&mut conn)
            .await?;

        tracing::debug!(key = %self.key, due_at, delay_ms, "Message scheduled");
        Ok(())
    }

    /// Claim the next due message, if any.
    ///
    /// The claimed message stays invisible to other consumers until it is
    /// acknowledged or its visibility timeout expires.
    pub async fn claim_due(&self) -> redis::RedisResult<Option<Vec<u8>>> {
        let now = Utc::now().timestamp_millis();
        let deadline = visibility_deadline(now, self.visibility_timeout);
        let mut conn = self.redis.clone();

        self.claim
            .key(&self.key)
            .key(&self.inflight_key)
            .arg(now)
            .arg(deadline)
            .invoke_async(&mut conn)
            .await
    }

    /// Acknowledge a claimed message so it is never redelivered.
    pub async fn ack(&self, payload: &[u8]) -> redis::RedisResult<()> {
        let mut conn = self.redis.clone();
        let _: i64 = redis::cmd("ZREM")
            .arg(&self.inflight_key)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Make every claimed-but-unacknowledged message past its deadline due again.
    ///
    /// Returns how many messages were moved back.
    pub async fn requeue_expired(&self) -> redis::RedisResult<u64> {
        let now = Utc::now().timestamp_millis();
        let mut conn = self.redis.clone();

        let moved: u64 = self
            .requeue
            .key(&self.key)
            .key(&self.inflight_key)
            .arg(now)
            .invoke_async(&mut conn)
            .await?;

        if moved > 0 {
            tracing::warn!(key = %self.key, moved, "Requeued unacknowledged messages");
        }
        Ok(moved)
    }
}

/// Sorted-set score for a message published at `now_ms` with `delay_ms`.
fn due_score(now_ms: i64, delay_ms: i64) -> i64 {
    now_ms.saturating_add(delay_ms.max(0))
}

/// In-flight score of a message claimed at `now_ms`.
fn visibility_deadline(now_ms: i64, timeout: Duration) -> i64 {
    now_ms.saturating_add(i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX))
}

//! Redis-backed rate limiter implementation for production deployments.
//!
//! Keeps a sorted set per key whose scores are request times in unix millis.
//! The check runs as one Lua script so pruning, counting and recording are
//! atomic across servers.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use uuid::Uuid;

use crate::domain::foundation::Timestamp;
use crate::ports::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitQuota, RateLimitResult,
    RateLimitStatus, RateLimiter,
};

/// KEYS[1] = log key; ARGV = now ms, window ms, limit, member.
/// Returns {allowed, count, oldest ms}.
const SLIDING_LOG: &str = r#"
local now = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
redis.call('ZREMRANGEBYSCORE', KEYS[1], '-inf', now - window)
local count = redis.call('ZCARD', KEYS[1])
if count >= tonumber(ARGV[3]) then
    local oldest = redis.call('ZRANGE', KEYS[1], 0, 0, 'WITHSCORES')
    return {0, count, tonumber(oldest[2]) or now}
end
redis.call('ZADD', KEYS[1], now, ARGV[4])
redis.call('PEXPIRE', KEYS[1], window)
local first = redis.call('ZRANGE', KEYS[1], 0, 0, 'WITHSCORES')
return {1, count + 1, tonumber(first[2]) or now}
"#;

/// Redis-backed sliding-log rate limiter.
#[derive(Clone)]
pub struct RedisRateLimiter {
    conn: MultiplexedConnection,
    key_prefix: String,
}

impl RedisRateLimiter {
    pub fn new(conn: MultiplexedConnection, key_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    fn redis_key(&self, key: &RateLimitKey) -> String {
        format!("{}{}", self.key_prefix, key.as_str())
    }
}

fn unavailable(e: redis::RedisError) -> RateLimitError {
    RateLimitError::Unavailable(e.to_string())
}

fn window_millis(quota: RateLimitQuota) -> i64 {
    i64::try_from(quota.window_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
}

fn reset_at(oldest: i64, window: i64) -> Timestamp {
    Timestamp::from_unix_secs(((oldest + window).max(0) as u64).div_ceil(1000))
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(
        &self,
        key: &RateLimitKey,
        quota: RateLimitQuota,
    ) -> Result<RateLimitResult, RateLimitError> {
        let now = Timestamp::now().as_unix_millis();
        let window = window_millis(quota);
        let member = format!("{}-{}", now, Uuid::new_v4());
        let mut conn = self.conn.clone();

        let reply: Vec<i64> = redis::Script::new(SLIDING_LOG)
            .key(self.redis_key(key))
            .arg(now)
            .arg(window)
            .arg(quota.max_requests)
            .arg(member)
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;

        let [allowed, count, oldest] = reply[..] else {
            return Err(RateLimitError::Unavailable(format!(
                "unexpected script reply: {:?}",
                reply
            )));
        };

        if allowed == 0 {
            let wait_ms = (oldest + window - now).max(0) as u64;
            return Ok(RateLimitResult::Denied(RateLimitDenied {
                limit: quota.max_requests,
                window_secs: quota.window_secs,
                retry_after_secs: wait_ms.div_ceil(1000).max(1),
            }));
        }

        Ok(RateLimitResult::Allowed(RateLimitStatus {
            limit: quota.max_requests,
            remaining: quota.max_requests.saturating_sub(count.max(0) as u32),
            reset_at: reset_at(oldest, window),
            window_secs: quota.window_secs,
        }))
    }

    async fn status(
        &self,
        key: &RateLimitKey,
        quota: RateLimitQuota,
    ) -> Result<RateLimitStatus, RateLimitError> {
        let now = Timestamp::now().as_unix_millis();
        let window = window_millis(quota);
        let redis_key = self.redis_key(key);
        let mut conn = self.conn.clone();

        let (count, oldest): (i64, Vec<(String, i64)>) = redis::pipe()
            .cmd("ZCOUNT")
            .arg(&redis_key)
            .arg(format!("({}", now - window))
            .arg("+inf")
            .cmd("ZRANGEBYSCORE")
            .arg(&redis_key)
            .arg(format!("({}", now - window))
            .arg("+inf")
            .arg("WITHSCORES")
            .arg("LIMIT")
            .arg(0)
            .arg(1)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        let oldest = oldest.first().map_or(now, |(_, score)| *score);
        Ok(RateLimitStatus {
            limit: quota.max_requests,
            remaining: quota.max_requests.saturating_sub(count.max(0) as u32),
            reset_at: reset_at(oldest, window),
            window_secs: quota.window_secs,
        })
    }

    async fn reset(&self, key: &RateLimitKey) -> Result<(), RateLimitError> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(self.redis_key(key))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable)
    }
}

impl std::fmt::Debug for RedisRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisRateLimiter")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

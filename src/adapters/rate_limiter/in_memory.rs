//! Process-local sliding-log rate limiter.
//!
//! Each accepted request's time stays in the key's log until it falls out
//! of the window, and a key whose log has emptied is forgotten on the next
//! check. Counts are per process, so several servers each allow the full
//! quota.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::Timestamp;
use crate::ports::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitQuota, RateLimitResult,
    RateLimitStatus, RateLimiter,
};

#[derive(Debug, Clone, Default)]
pub struct InMemoryRateLimiter {
    logs: Arc<RwLock<HashMap<RateLimitKey, Log>>>,
}

#[derive(Debug, Clone, Default)]
struct Log {
    /// Window of the quota last checked against this key, in millis.
    window: i64,
    /// Accepted request times in unix millis, oldest first.
    times: VecDeque<i64>,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    fn now_millis() -> i64 {
        Timestamp::now().as_unix_millis()
    }
}

fn window_millis(quota: RateLimitQuota) -> i64 {
    i64::try_from(quota.window_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
}

/// Drops entries older than the window.
fn prune(log: &mut VecDeque<i64>, now: i64, window: i64) {
    while log.front().is_some_and(|&t| t <= now - window) {
        log.pop_front();
    }
}

/// Whole seconds until `oldest` leaves the window, at least one.
fn retry_after_secs(oldest: i64, now: i64, window: i64) -> u64 {
    let wait_ms = (oldest + window - now).max(0) as u64;
    wait_ms.div_ceil(1000).max(1)
}

fn reset_at(log: &VecDeque<i64>, now: i64, window: i64) -> Timestamp {
    let oldest = log.front().copied().unwrap_or(now);
    Timestamp::from_unix_secs(((oldest + window).max(0) as u64).div_ceil(1000))
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(
        &self,
        key: &RateLimitKey,
        quota: RateLimitQuota,
    ) -> Result<RateLimitResult, RateLimitError> {
        let now = Self::now_millis();
        let window = window_millis(quota);

        let mut logs = self.logs.write().await;
        logs.retain(|_, log| {
            prune(&mut log.times, now, log.window);
            !log.times.is_empty()
        });

        let entry = logs.entry(key.clone()).or_default();
        entry.window = window;
        let log = &mut entry.times;
        prune(log, now, window);

        if log.len() >= quota.max_requests as usize {
            let oldest = log.front().copied().unwrap_or(now);
            return Ok(RateLimitResult::Denied(RateLimitDenied {
                limit: quota.max_requests,
                window_secs: quota.window_secs,
                retry_after_secs: retry_after_secs(oldest, now, window),
            }));
        }

        log.push_back(now);
        Ok(RateLimitResult::Allowed(RateLimitStatus {
            limit: quota.max_requests,
            remaining: quota.max_requests.saturating_sub(log.len() as u32),
            reset_at: reset_at(log, now, window),
            window_secs: quota.window_secs,
        }))
    }

    async fn status(
        &self,
        key: &RateLimitKey,
        quota: RateLimitQuota,
    ) -> Result<RateLimitStatus, RateLimitError> {
        let now = Self::now_millis();
        let window = window_millis(quota);

        let logs = self.logs.read().await;
        let mut log = logs.get(key).map(|l| l.times.clone()).unwrap_or_default();
        prune(&mut log, now, window);

        Ok(RateLimitStatus {
            limit: quota.max_requests,
            remaining: quota.max_requests.saturating_sub(log.len() as u32),
            reset_at: reset_at(&log, now, window),
            window_secs: quota.window_secs,
        })
    }

    async fn reset(&self, key: &RateLimitKey) -> Result<(), RateLimitError> {
        self.logs.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use std::time::Duration;

    fn key(user: &str) -> RateLimitKey {
        RateLimitKey::for_user(&UserId::new(user).unwrap(), "wizard_start")
    }

    #[tokio::test]
    async fn sixth_request_in_window_is_denied() {
        let limiter = InMemoryRateLimiter::new();
        let quota = RateLimitQuota::new(5, 3600);

        for _ in 0..5 {
            assert!(limiter.check(&key("u1"), quota).await.unwrap().is_allowed());
        }

        match limiter.check(&key("u1"), quota).await.unwrap() {
            RateLimitResult::Denied(denied) => {
                assert_eq!(denied.limit, 5);
                assert_eq!(denied.window_secs, 3600);
                assert!(denied.retry_after_secs > 3500 && denied.retry_after_secs <= 3600);
            }
            RateLimitResult::Allowed(_) => panic!("sixth request should be denied"),
        }
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = InMemoryRateLimiter::new();
        let quota = RateLimitQuota::new(1, 3600);

        assert!(limiter.check(&key("u1"), quota).await.unwrap().is_allowed());
        assert!(limiter.check(&key("u2"), quota).await.unwrap().is_allowed());
        assert!(limiter.check(&key("u1"), quota).await.unwrap().is_denied());
    }

    #[tokio::test]
    async fn requests_slide_out_of_the_window() {
        let limiter = InMemoryRateLimiter::new();
        let quota = RateLimitQuota::new(1, 1);

        assert!(limiter.check(&key("u1"), quota).await.unwrap().is_allowed());
        assert!(limiter.check(&key("u1"), quota).await.unwrap().is_denied());

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(limiter.check(&key("u1"), quota).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn emptied_logs_are_forgotten() {
        let limiter = InMemoryRateLimiter::new();
        let short = RateLimitQuota::new(5, 1);
        let long = RateLimitQuota::new(5, 3600);

        limiter.check(&key("u1"), short).await.unwrap();
        limiter.check(&key("u2"), long).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        limiter.check(&key("u3"), short).await.unwrap();

        let logs = limiter.logs.read().await;
        assert!(!logs.contains_key(&key("u1")));
        assert!(logs.contains_key(&key("u2")));
        assert!(logs.contains_key(&key("u3")));
    }

    #[tokio::test]
    async fn status_does_not_consume_quota() {
        let limiter = InMemoryRateLimiter::new();
        let quota = RateLimitQuota::new(2, 60);

        limiter.check(&key("u1"), quota).await.unwrap();
        let status = limiter.status(&key("u1"), quota).await.unwrap();
        let again = limiter.status(&key("u1"), quota).await.unwrap();

        assert_eq!(status.remaining, 1);
        assert_eq!(again.remaining, 1);
    }

    #[tokio::test]
    async fn reset_restores_quota() {
        let limiter = InMemoryRateLimiter::new();
        let quota = RateLimitQuota::new(1, 60);

        limiter.check(&key("u1"), quota).await.unwrap();
        limiter.reset(&key("u1")).await.unwrap();

        assert!(limiter.check(&key("u1"), quota).await.unwrap().is_allowed());
    }

    #[test]
    fn retry_after_rounds_up() {
        assert_eq!(retry_after_secs(0, 500, 1000), 1);
        assert_eq!(retry_after_secs(0, 0, 2500), 3);
        assert_eq!(retry_after_secs(0, 5000, 1000), 1);
    }
}

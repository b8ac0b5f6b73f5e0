//! Per-user fixed-window rate limiting.
//!
//! This is a fixed-window counter, not a true sliding window: a burst
//! straddling a window boundary can admit up to `2 * limit` requests in a
//! short span. That approximation matches the observable throttling behavior
//! this bot has always had and is kept deliberately.

use crate::error::{RelayError, Result};
use crate::types::Acct;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Usage state for one account. `window_start` only moves forward, except on
/// an explicit window reset; `count` is at least 1 once the record exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub window_start: DateTime<Utc>,
    pub count: u32,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Throttled,
}

/// Keyed storage for usage records.
///
/// Implementations must provide read-your-writes consistency per key. The
/// limiter never deletes entries; capping map growth (TTL, LRU) is the
/// store implementation's concern. Callers must serialize read-modify-write
/// cycles for the same account (the relay's single-consumer loop does).
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn get(&self, user: &Acct) -> Result<Option<UsageRecord>>;
    async fn put(&self, user: &Acct, record: UsageRecord) -> Result<()>;
}

/// In-memory [`UsageStore`] over a mutex-guarded map. Unbounded.
#[derive(Default)]
pub struct InMemoryUsageStore {
    inner: Mutex<HashMap<String, UsageRecord>>,
}

impl InMemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn get(&self, user: &Acct) -> Result<Option<UsageRecord>> {
        Ok(self.inner.lock().await.get(&user.handle()).cloned())
    }

    async fn put(&self, user: &Acct, record: UsageRecord) -> Result<()> {
        self.inner.lock().await.insert(user.handle(), record);
        Ok(())
    }
}

/// Fixed-window admission control over an injected [`UsageStore`].
pub struct RateLimiter {
    store: Arc<dyn UsageStore>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    /// `limit` and `window` must both be positive.
    pub fn new(store: Arc<dyn UsageStore>, limit: u32, window: Duration) -> Result<Self> {
        if limit == 0 {
            return Err(RelayError::Config("rate limit must be > 0".to_string()));
        }
        if window <= Duration::zero() {
            return Err(RelayError::Config("rate window must be > 0".to_string()));
        }
        Ok(Self {
            store,
            limit,
            window,
        })
    }

    /// Admits or throttles one request from `user` at time `now`.
    ///
    /// First request creates the record with count 1. Under the limit the
    /// count increments in place. At or over the limit, an expired window
    /// resets the record to `{now, 1}`; otherwise the request is throttled
    /// and the record is left untouched.
    pub async fn admit(&self, user: &Acct, now: DateTime<Utc>) -> Result<Admission> {
        let record = match self.store.get(user).await? {
            None => UsageRecord {
                window_start: now,
                count: 1,
            },
            Some(r) if r.count < self.limit => UsageRecord {
                window_start: r.window_start,
                count: r.count + 1,
            },
            Some(r) => {
                if now - r.window_start > self.window {
                    // Window expired; start a fresh one.
                    UsageRecord {
                        window_start: now,
                        count: 1,
                    }
                } else {
                    debug!(user = %user, count = r.count, "request throttled");
                    return Ok(Admission::Throttled);
                }
            }
        };
        self.store.put(user, record).await?;
        Ok(Admission::Allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(limit: u32, window_hours: i64) -> (RateLimiter, Arc<InMemoryUsageStore>) {
        let store = Arc::new(InMemoryUsageStore::new());
        let limiter =
            RateLimiter::new(store.clone(), limit, Duration::hours(window_hours)).unwrap();
        (limiter, store)
    }

    #[tokio::test]
    async fn first_limit_requests_allowed_then_throttled() {
        let (limiter, _) = limiter(3, 24);
        let user = Acct::new("alice", "example.social");
        let now = Utc::now();

        for _ in 0..3 {
            assert_eq!(limiter.admit(&user, now).await.unwrap(), Admission::Allowed);
        }
        assert_eq!(
            limiter.admit(&user, now).await.unwrap(),
            Admission::Throttled
        );
    }

    #[tokio::test]
    async fn throttled_request_does_not_mutate_record() {
        let (limiter, store) = limiter(1, 24);
        let user = Acct::new("alice", "example.social");
        let now = Utc::now();

        limiter.admit(&user, now).await.unwrap();
        let before = store.get(&user).await.unwrap().unwrap();

        let later = now + Duration::minutes(5);
        assert_eq!(
            limiter.admit(&user, later).await.unwrap(),
            Admission::Throttled
        );
        assert_eq!(store.get(&user).await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn expired_window_resets_count() {
        let (limiter, store) = limiter(2, 24);
        let user = Acct::new("alice", "example.social");
        let now = Utc::now();

        limiter.admit(&user, now).await.unwrap();
        limiter.admit(&user, now).await.unwrap();
        assert_eq!(
            limiter.admit(&user, now).await.unwrap(),
            Admission::Throttled
        );

        let later = now + Duration::hours(25);
        assert_eq!(
            limiter.admit(&user, later).await.unwrap(),
            Admission::Allowed
        );
        let record = store.get(&user).await.unwrap().unwrap();
        assert_eq!(record.count, 1);
        assert_eq!(record.window_start, later);
    }

    #[tokio::test]
    async fn under_limit_keeps_window_start() {
        let (limiter, store) = limiter(5, 24);
        let user = Acct::new("alice", "example.social");
        let now = Utc::now();

        limiter.admit(&user, now).await.unwrap();
        let later = now + Duration::hours(1);
        limiter.admit(&user, later).await.unwrap();

        let record = store.get(&user).await.unwrap().unwrap();
        assert_eq!(record.window_start, now);
        assert_eq!(record.count, 2);
    }

    #[tokio::test]
    async fn users_are_limited_independently() {
        let (limiter, _) = limiter(1, 24);
        let alice = Acct::new("alice", "example.social");
        let bob = Acct::new("bob", "example.social");
        let now = Utc::now();

        assert_eq!(
            limiter.admit(&alice, now).await.unwrap(),
            Admission::Allowed
        );
        assert_eq!(limiter.admit(&bob, now).await.unwrap(), Admission::Allowed);
        assert_eq!(
            limiter.admit(&alice, now).await.unwrap(),
            Admission::Throttled
        );
    }

    #[test]
    fn zero_limit_rejected() {
        let store = Arc::new(InMemoryUsageStore::new());
        assert!(RateLimiter::new(store, 0, Duration::hours(1)).is_err());
    }
}

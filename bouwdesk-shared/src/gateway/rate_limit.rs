/// Plan-based request rate limiting
///
/// Every authenticated request is counted per actor and endpoint in three
/// fixed windows (minute, hour, day) and checked against the caps of the
/// company's plan. Counters live in Redis so limits hold across
/// instances; without Redis a mutex-guarded in-process store enforces the
/// same three windows.
///
/// A counter-store failure fails open: an unavailable backend must not
/// take the API down with it.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::billing::catalog::PlanType;

const MINUTE_SECS: u64 = 60;
const HOUR_SECS: u64 = 3600;
const DAY_SECS: u64 = 86400;

/// Request caps per plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanRateLimits {
    pub per_minute: u64,
    pub per_hour: u64,
    pub per_day: u64,
}

impl PlanRateLimits {
    pub fn for_plan(plan: PlanType) -> Self {
        match plan {
            PlanType::Free => PlanRateLimits {
                per_minute: 60,
                per_hour: 1_000,
                per_day: 10_000,
            },
            PlanType::Basic => PlanRateLimits {
                per_minute: 120,
                per_hour: 5_000,
                per_day: 50_000,
            },
            PlanType::Professional => PlanRateLimits {
                per_minute: 300,
                per_hour: 20_000,
                per_day: 200_000,
            },
            PlanType::Enterprise => PlanRateLimits {
                per_minute: 1_000,
                per_hour: 100_000,
                per_day: 1_000_000,
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// A windowed counter backend
///
/// `incr` bumps the counter behind `key` and returns the new count. The
/// backend guarantees the counter disappears once `window_secs` have
/// passed since the first increment.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn incr(&self, key: &str, window_secs: u64) -> Result<u64, CounterError>;
}

/// Redis-backed counters shared across API instances
///
/// INCR followed by EXPIRE on the first increment of a bucket; bucket
/// boundaries are baked into the key so a plain TTL suffices.
pub struct RedisCounterStore {
    conn: ConnectionManager,
}

impl RedisCounterStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr(&self, key: &str, window_secs: u64) -> Result<u64, CounterError> {
        let mut conn = self.conn.clone();

        let count: u64 = redis::cmd("INCR").arg(key).query_async(&mut conn).await?;

        if count == 1 {
            let _: () = redis::cmd("EXPIRE")
                .arg(key)
                .arg(window_secs)
                .query_async(&mut conn)
                .await?;
        }

        Ok(count)
    }
}

/// In-process fallback counters
///
/// Buckets are pruned when touched after expiry. The clock is injectable
/// so window rollover is testable without sleeping.
pub struct MemoryCounterStore {
    buckets: Mutex<HashMap<String, (u64, u64)>>,
    clock: Arc<dyn Fn() -> u64 + Send + Sync>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(unix_now))
    }

    pub fn with_clock(clock: Arc<dyn Fn() -> u64 + Send + Sync>) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn incr(&self, key: &str, window_secs: u64) -> Result<u64, CounterError> {
        let now = (self.clock)();
        let mut buckets = self.buckets.lock().await;

        let entry = buckets.entry(key.to_string()).or_insert((now + window_secs, 0));
        if now >= entry.0 {
            *entry = (now + window_secs, 0);
        }
        entry.1 += 1;

        Ok(entry.1)
    }
}

/// Outcome of a rate limit check, also used for response headers
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub allowed: bool,

    /// The per-minute cap in force
    pub limit: u64,

    /// Requests left in the current minute
    pub remaining: u64,

    /// Unix timestamp when the minute window rolls over
    pub reset_time: u64,
}

/// Checks requests against all three windows of the actor's plan
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    /// Counts this request and decides whether it may proceed
    ///
    /// `actor` identifies who is being limited (user ID or API key ID).
    /// `minute_override` replaces the plan's per-minute cap for API keys
    /// that carry their own limit; hour and day caps stay plan-based.
    ///
    /// Backend errors log a warning and allow the request.
    pub async fn check(
        &self,
        actor: &str,
        plan: PlanType,
        endpoint: &str,
        minute_override: Option<u64>,
    ) -> RateLimitDecision {
        let mut limits = PlanRateLimits::for_plan(plan);
        if let Some(cap) = minute_override {
            limits.per_minute = cap;
        }

        let now = unix_now();

        match self.count_windows(actor, endpoint, now).await {
            Ok((minute, hour, day)) => {
                let allowed = minute <= limits.per_minute
                    && hour <= limits.per_hour
                    && day <= limits.per_day;

                RateLimitDecision {
                    allowed,
                    limit: limits.per_minute,
                    remaining: limits.per_minute.saturating_sub(minute),
                    reset_time: (now / MINUTE_SECS + 1) * MINUTE_SECS,
                }
            }
            Err(e) => {
                tracing::warn!(actor, endpoint, error = %e, "rate limit check failed, allowing request");
                RateLimitDecision {
                    allowed: true,
                    limit: limits.per_minute,
                    remaining: limits.per_minute,
                    reset_time: (now / MINUTE_SECS + 1) * MINUTE_SECS,
                }
            }
        }
    }

    async fn count_windows(
        &self,
        actor: &str,
        endpoint: &str,
        now: u64,
    ) -> Result<(u64, u64, u64), CounterError> {
        let minute_key = format!("rate_limit:{}:{}:minute:{}", actor, endpoint, now / MINUTE_SECS);
        let hour_key = format!("rate_limit:{}:{}:hour:{}", actor, endpoint, now / HOUR_SECS);
        let day_key = format!("rate_limit:{}:{}:day:{}", actor, endpoint, now / DAY_SECS);

        let minute = self.store.incr(&minute_key, MINUTE_SECS).await?;
        let hour = self.store.incr(&hour_key, HOUR_SECS).await?;
        let day = self.store.incr(&day_key, DAY_SECS).await?;

        Ok((minute, hour, day))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn limiter_with_clock(start: u64) -> (RateLimiter, Arc<AtomicU64>) {
        let time = Arc::new(AtomicU64::new(start));
        let clock_time = time.clone();
        let store = MemoryCounterStore::with_clock(Arc::new(move || {
            clock_time.load(Ordering::SeqCst)
        }));
        (RateLimiter::new(Arc::new(store)), time)
    }

    #[test]
    fn test_plan_caps() {
        let free = PlanRateLimits::for_plan(PlanType::Free);
        assert_eq!((free.per_minute, free.per_hour, free.per_day), (60, 1_000, 10_000));

        let ent = PlanRateLimits::for_plan(PlanType::Enterprise);
        assert_eq!(
            (ent.per_minute, ent.per_hour, ent.per_day),
            (1_000, 100_000, 1_000_000)
        );
    }

    #[tokio::test]
    async fn test_allows_up_to_minute_cap() {
        let (limiter, _) = limiter_with_clock(1_000_000);

        for _ in 0..60 {
            let decision = limiter
                .check("user-1", PlanType::Free, "GET /v1/projects", None)
                .await;
            assert!(decision.allowed);
        }

        let decision = limiter
            .check("user-1", PlanType::Free, "GET /v1/projects", None)
            .await;
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[tokio::test]
    async fn test_minute_window_resets() {
        let (limiter, time) = limiter_with_clock(1_000_000);

        for _ in 0..61 {
            limiter
                .check("user-1", PlanType::Free, "GET /v1/projects", None)
                .await;
        }
        assert!(
            !limiter
                .check("user-1", PlanType::Free, "GET /v1/projects", None)
                .await
                .allowed
        );

        time.fetch_add(60, Ordering::SeqCst);

        let decision = limiter
            .check("user-1", PlanType::Free, "GET /v1/projects", None)
            .await;
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn test_actors_and_endpoints_are_independent() {
        let (limiter, _) = limiter_with_clock(1_000_000);

        for _ in 0..60 {
            limiter
                .check("user-1", PlanType::Free, "GET /v1/projects", None)
                .await;
        }
        assert!(
            !limiter
                .check("user-1", PlanType::Free, "GET /v1/projects", None)
                .await
                .allowed
        );

        // A different user and a different endpoint still get through.
        assert!(
            limiter
                .check("user-2", PlanType::Free, "GET /v1/projects", None)
                .await
                .allowed
        );
        assert!(
            limiter
                .check("user-1", PlanType::Free, "GET /v1/tasks", None)
                .await
                .allowed
        );
    }

    #[tokio::test]
    async fn test_hour_cap_enforced_by_fallback_store() {
        let (limiter, time) = limiter_with_clock(1_000_000);

        // Free plan: 1000/hour. Spread requests over minutes so the
        // minute cap never trips, then watch the hour cap deny.
        let mut allowed = 0u64;
        for _ in 0..20 {
            for _ in 0..60 {
                let decision = limiter
                    .check("user-1", PlanType::Free, "GET /v1/projects", None)
                    .await;
                if decision.allowed {
                    allowed += 1;
                }
            }
            time.fetch_add(60, Ordering::SeqCst);
        }

        assert_eq!(allowed, 1_000);
    }

    #[tokio::test]
    async fn test_api_key_minute_override() {
        let (limiter, _) = limiter_with_clock(1_000_000);

        for _ in 0..5 {
            let decision = limiter
                .check("key-1", PlanType::Enterprise, "GET /v1/api/usage", Some(5))
                .await;
            assert!(decision.allowed);
            assert_eq!(decision.limit, 5);
        }

        let decision = limiter
            .check("key-1", PlanType::Enterprise, "GET /v1/api/usage", Some(5))
            .await;
        assert!(!decision.allowed);
    }

    #[tokio::test]
    async fn test_fails_open_on_store_error() {
        struct BrokenStore;

        #[async_trait]
        impl CounterStore for BrokenStore {
            async fn incr(&self, _key: &str, _window_secs: u64) -> Result<u64, CounterError> {
                Err(CounterError::Redis(redis::RedisError::from((
                    redis::ErrorKind::IoError,
                    "connection refused",
                ))))
            }
        }

        let limiter = RateLimiter::new(Arc::new(BrokenStore));
        let decision = limiter
            .check("user-1", PlanType::Free, "GET /v1/projects", None)
            .await;

        assert!(decision.allowed);
    }
}

//! Abuse rate limiting.
//!
//! # Responsibilities
//! - Sliding-window counting keyed by (route, client IP)
//! - Preferred path: shared Redis store so every process sees one count
//! - Fallback path: per-process timestamp window
//! - Produce the decision fields the handlers echo as headers
//!
//! # Design Decisions
//! - The shared store's window primitive is an atomic INCR + EXPIRE-NX
//!   pipeline; the key's representation is the store's own
//! - The local fallback is a true sliding window over request timestamps
//! - Store errors follow a named policy: soft-fail to the local window
//!   (default) or fail closed, per `rate_limit.on_store_error`
//! - The store connection is built lazily exactly once per process;
//!   concurrent first use elects a single constructing winner

use dashmap::DashMap;
use redis::aio::ConnectionManager;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::OnceCell;

use crate::config::{RateLimitConfig, StoreErrorPolicy};
use crate::observability::metrics;

/// Outcome of one rate-limit call. Derived per call, never stored.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Epoch seconds at which the window's oldest entry expires.
    pub reset: u64,
}

impl RateLimitDecision {
    /// Seconds a rejected caller should wait, for `Retry-After`.
    pub fn retry_after(&self) -> u64 {
        self.reset.saturating_sub(now_epoch_secs())
    }
}

struct RedisHandle {
    url: String,
    conn: OnceCell<ConnectionManager>,
}

impl RedisHandle {
    async fn connection(&self) -> Result<&ConnectionManager, redis::RedisError> {
        self.conn
            .get_or_try_init(|| async {
                let client = redis::Client::open(self.url.as_str())?;
                ConnectionManager::new(client).await
            })
            .await
    }
}

/// Every `SWEEP_EVERY` local checks, drop keys whose whole window has
/// elapsed so the fallback map does not grow with every (route, IP) pair
/// ever seen.
const SWEEP_EVERY: u64 = 512;

/// Sliding-window limiter shared by all request handlers in the process.
pub struct RateLimiter {
    max: u32,
    window: Duration,
    policy: StoreErrorPolicy,
    redis: Option<RedisHandle>,
    local: DashMap<String, Vec<u64>>,
    local_calls: AtomicU64,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max: config.max_requests,
            window: Duration::from_secs(config.window_secs),
            policy: config.on_store_error,
            redis: config.redis_url.as_ref().map(|url| RedisHandle {
                url: url.clone(),
                conn: OnceCell::new(),
            }),
            local: DashMap::new(),
            local_calls: AtomicU64::new(0),
        }
    }

    /// Check and record one request for `route` from `client_ip`.
    pub async fn check(&self, route: &str, client_ip: &str) -> RateLimitDecision {
        let key = format!("rl:{}:{}", route, client_ip);

        if let Some(handle) = &self.redis {
            match self.check_shared(handle, &key).await {
                Ok(decision) => return decision,
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, policy = ?self.policy, "Rate-limit store call failed");
                    metrics::record_store_error();
                    if self.policy == StoreErrorPolicy::FailClosed {
                        return RateLimitDecision {
                            allowed: false,
                            limit: self.max,
                            remaining: 0,
                            reset: now_epoch_secs() + self.window.as_secs(),
                        };
                    }
                    // Soft-fail: the limit narrows to per-process scope
                    // for this call.
                }
            }
        }

        self.check_local(&key, now_epoch_millis())
    }

    async fn check_shared(
        &self,
        handle: &RedisHandle,
        key: &str,
    ) -> Result<RateLimitDecision, redis::RedisError> {
        let mut conn = handle.connection().await?.clone();
        let window_secs = self.window.as_secs();

        let (count, ttl): (u64, i64) = redis::pipe()
            .atomic()
            .cmd("INCR")
            .arg(key)
            .cmd("EXPIRE")
            .arg(key)
            .arg(window_secs as i64)
            .arg("NX")
            .ignore()
            .cmd("TTL")
            .arg(key)
            .query_async(&mut conn)
            .await?;

        let reset = now_epoch_secs() + ttl.max(0) as u64;
        Ok(RateLimitDecision {
            allowed: count <= self.max as u64,
            limit: self.max,
            remaining: (self.max as u64).saturating_sub(count) as u32,
            reset,
        })
    }

    /// Per-process sliding window. `now_ms` is injected so the window
    /// behavior is testable without waiting out real time.
    fn check_local(&self, key: &str, now_ms: u64) -> RateLimitDecision {
        let window_ms = self.window.as_millis() as u64;
        if self.local_calls.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.local
                .retain(|_, stamps| stamps.iter().any(|&t| t + window_ms > now_ms));
        }
        let mut entry = self.local.entry(key.to_string()).or_default();
        let stamps = entry.value_mut();
        stamps.retain(|&t| t + window_ms > now_ms);

        if (stamps.len() as u32) < self.max {
            stamps.push(now_ms);
            RateLimitDecision {
                allowed: true,
                limit: self.max,
                remaining: self.max - stamps.len() as u32,
                reset: (stamps[0] + window_ms).div_ceil(1000),
            }
        } else {
            RateLimitDecision {
                allowed: false,
                limit: self.max,
                remaining: 0,
                reset: (stamps[0] + window_ms).div_ceil(1000),
            }
        }
    }
}

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn now_epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;

    fn limiter(max: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            max_requests: max,
            window_secs,
            redis_url: None,
            on_store_error: StoreErrorPolicy::FallbackLocal,
        })
    }

    #[test]
    fn window_admits_max_then_rejects() {
        // Ceiling of 5 requests per 60s window.
        let limiter = limiter(5, 60);
        let t0 = 1_000_000;

        for i in 0..5 {
            let d = limiter.check_local("rl:lead:1.2.3.4", t0 + i * 1000);
            assert!(d.allowed, "request {} should pass", i + 1);
            assert_eq!(d.remaining, 4 - i as u32);
        }
        let sixth = limiter.check_local("rl:lead:1.2.3.4", t0 + 5000);
        assert!(!sixth.allowed);
        assert_eq!(sixth.remaining, 0);
        // Oldest entry at t0 expires at t0 + 60s.
        assert_eq!(sixth.reset, (t0 + 60_000).div_ceil(1000));
    }

    #[test]
    fn window_slides_after_expiry() {
        let limiter = limiter(5, 60);
        let t0 = 1_000_000;
        for i in 0..5 {
            assert!(limiter.check_local("rl:k", t0 + i * 100).allowed);
        }
        assert!(!limiter.check_local("rl:k", t0 + 1000).allowed);
        // WINDOW seconds after the first request the key admits again.
        assert!(limiter.check_local("rl:k", t0 + 60_001).allowed);
    }

    #[test]
    fn keys_are_independent() {
        let limiter = limiter(1, 60);
        assert!(limiter.check_local("rl:lead:a", 1000).allowed);
        assert!(!limiter.check_local("rl:lead:a", 1001).allowed);
        assert!(limiter.check_local("rl:lead:b", 1002).allowed);
        assert!(limiter.check_local("rl:contact:a", 1003).allowed);
    }

    #[tokio::test]
    async fn unreachable_store_soft_fails_to_local() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            max_requests: 2,
            window_secs: 60,
            // Nothing listens here; every call errors immediately.
            redis_url: Some("redis://127.0.0.1:1".to_string()),
            on_store_error: StoreErrorPolicy::FallbackLocal,
        });
        assert!(limiter.check("lead", "9.9.9.9").await.allowed);
        assert!(limiter.check("lead", "9.9.9.9").await.allowed);
        assert!(!limiter.check("lead", "9.9.9.9").await.allowed);
    }

    #[tokio::test]
    async fn unreachable_store_fails_closed_when_configured() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            max_requests: 5,
            window_secs: 60,
            redis_url: Some("redis://127.0.0.1:1".to_string()),
            on_store_error: StoreErrorPolicy::FailClosed,
        });
        let decision = limiter.check("lead", "9.9.9.9").await;
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert!(decision.retry_after() <= 60);
    }

    #[test]
    fn stale_keys_are_swept_from_local_map() {
        let limiter = limiter(5, 60);
        let t0 = 1_000_000;
        limiter.check_local("rl:lead:old", t0);
        assert!(limiter.local.contains_key("rl:lead:old"));

        // Well past the old key's window, drive enough traffic on a live
        // key to trigger a sweep.
        let later = t0 + 120_000;
        for i in 0..SWEEP_EVERY {
            limiter.check_local("rl:lead:new", later + i);
        }
        assert!(!limiter.local.contains_key("rl:lead:old"));
        assert!(limiter.local.contains_key("rl:lead:new"));
    }

    #[test]
    fn retry_after_clamps_at_zero() {
        let decision = RateLimitDecision {
            allowed: false,
            limit: 5,
            remaining: 0,
            reset: 0,
        };
        assert_eq!(decision.retry_after(), 0);
    }
}

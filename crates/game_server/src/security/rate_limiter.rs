//! Per-IP packet rate limiting using a token bucket.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Token bucket rate limiter. Each IP may spend `capacity` packets per
/// `window`, refilled continuously.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<IpAddr, TokenBucket>>,
    capacity: f64,
    window: Duration,
    blocked_count: AtomicU64,
}

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            capacity: f64::from(capacity),
            window,
            blocked_count: AtomicU64::new(0),
        }
    }

    /// Spends one token for `ip`. Returns `false` when the bucket is empty.
    pub async fn check_rate_limit(&self, ip: IpAddr) -> bool {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        let capacity = self.capacity;

        let bucket = buckets.entry(ip).or_insert(TokenBucket {
            tokens: capacity,
            last_refill: now,
        });

        let window = self.window.as_secs_f64();
        if window > 0.0 {
            let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
            bucket.tokens = (bucket.tokens + elapsed * capacity / window).min(capacity);
        }
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            self.blocked_count.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    pub fn get_blocked_count(&self) -> u64 {
        self.blocked_count.load(Ordering::Relaxed)
    }

    /// Drops buckets that have been full for a whole window.
    pub async fn cleanup_old_entries(&self) {
        let mut buckets = self.buckets.lock().await;
        let cutoff = self.window;
        buckets.retain(|_, bucket| bucket.last_refill.elapsed() < cutoff);
    }

    pub async fn tracked(&self) -> usize {
        self.buckets.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_rate_limiter_allows_within_limit() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let ip = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));

        for _ in 0..5 {
            assert!(limiter.check_rate_limit(ip).await);
        }

        assert!(!limiter.check_rate_limit(ip).await);
        assert_eq!(limiter.get_blocked_count(), 1);
    }

    #[tokio::test]
    async fn test_rate_limiter_refill() {
        let limiter = RateLimiter::new(2, Duration::from_millis(100));
        let ip = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));

        assert!(limiter.check_rate_limit(ip).await);
        assert!(limiter.check_rate_limit(ip).await);
        assert!(!limiter.check_rate_limit(ip).await);

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(limiter.check_rate_limit(ip).await);
    }

    #[tokio::test]
    async fn test_buckets_are_per_ip() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let first = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let second = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

        assert!(limiter.check_rate_limit(first).await);
        assert!(!limiter.check_rate_limit(first).await);
        assert!(limiter.check_rate_limit(second).await);
        assert_eq!(limiter.tracked().await, 2);
    }
}

//! Connection admission and packet limits.

use crate::config::SecurityConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

pub mod rate_limiter;

/// Central security manager for the game server
#[derive(Debug)]
pub struct SecurityManager {
    config: SecurityConfig,
    rate_limiter: rate_limiter::RateLimiter,
    connection_tracker: RwLock<HashMap<IpAddr, ConnectionInfo>>,
}

#[derive(Debug, Clone)]
struct ConnectionInfo {
    count: u32,
    last_seen: Instant,
}

impl SecurityManager {
    pub fn new(config: SecurityConfig) -> Self {
        let rate_limiter = rate_limiter::RateLimiter::new(
            config.max_requests_per_minute,
            Duration::from_secs(60),
        );

        Self {
            config,
            rate_limiter,
            connection_tracker: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    /// Admits or refuses a new connection from `ip`. An admitted connection
    /// must be paired with [`on_disconnect`](Self::on_disconnect).
    pub async fn validate_connection(&self, ip: IpAddr) -> Result<(), SecurityError> {
        if self.config.banned_ips.contains(&ip) {
            return Err(SecurityError::BannedIp(ip));
        }

        if self.config.enable_ddos_protection {
            let mut tracker = self.connection_tracker.write().await;
            let info = tracker.entry(ip).or_insert(ConnectionInfo {
                count: 0,
                last_seen: Instant::now(),
            });

            if info.count >= self.config.max_connections_per_ip {
                return Err(SecurityError::TooManyConnections(ip));
            }

            info.count += 1;
            info.last_seen = Instant::now();
        }

        Ok(())
    }

    /// Checks one inbound frame of `len` bytes.
    pub async fn validate_message(&self, ip: IpAddr, len: usize) -> Result<(), SecurityError> {
        if len > self.config.max_message_size {
            return Err(SecurityError::MessageTooLarge(len));
        }

        if self.config.enable_rate_limiting && !self.rate_limiter.check_rate_limit(ip).await {
            return Err(SecurityError::RateLimitExceeded(ip));
        }

        Ok(())
    }

    pub async fn on_disconnect(&self, ip: IpAddr) {
        if self.config.enable_ddos_protection {
            let mut tracker = self.connection_tracker.write().await;
            if let Some(info) = tracker.get_mut(&ip) {
                info.count = info.count.saturating_sub(1);
                if info.count == 0 {
                    tracker.remove(&ip);
                }
            }
        }
    }

    /// Forgets rate limit buckets and connection counts nobody refreshed
    /// recently.
    pub async fn cleanup_stale_connections(&self) {
        self.rate_limiter.cleanup_old_entries().await;
        if !self.config.enable_ddos_protection {
            return;
        }

        let mut tracker = self.connection_tracker.write().await;
        let cutoff = Duration::from_secs(300);
        tracker.retain(|_, info| info.count > 0 || info.last_seen.elapsed() < cutoff);
    }

    pub async fn get_stats(&self) -> SecurityStats {
        let connection_count = if self.config.enable_ddos_protection {
            self.connection_tracker.read().await.len()
        } else {
            0
        };

        SecurityStats {
            tracked_ips: connection_count,
            rate_limited_requests: self.rate_limiter.get_blocked_count(),
            banned_ips: self.config.banned_ips.len(),
        }
    }
}

/// Security-related statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityStats {
    pub tracked_ips: usize,
    pub rate_limited_requests: u64,
    pub banned_ips: usize,
}

/// Security-related errors
#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("IP address {0} is banned")]
    BannedIp(IpAddr),

    #[error("Too many connections from IP {0}")]
    TooManyConnections(IpAddr),

    #[error("Message too large: {0} bytes")]
    MessageTooLarge(usize),

    #[error("Rate limit exceeded for IP {0}")]
    RateLimitExceeded(IpAddr),
}

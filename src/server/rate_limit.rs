//! Per-client-IP sliding-window rate limiting.
//!
//! Each IP may make `max_requests` requests per `window`. Timestamps older
//! than the window are pruned on access; idle IPs are swept every
//! `cleanup_interval` requests, and the number of tracked IPs is capped so a
//! flood of spoofed addresses cannot grow the table without bound.

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::config::RateLimitSettings;
use crate::error::{FixitError, Result};

const CLEANUP_INTERVAL: u64 = 100;
const MAX_TRACKED_IPS: usize = 10_000;

#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_requests: usize,
    max_tracked_ips: usize,
    hits: RwLock<HashMap<IpAddr, Vec<Instant>>>,
    request_count: AtomicU64,
}

impl RateLimiter {
    #[must_use]
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            window: settings.window,
            max_requests: settings.max_requests,
            max_tracked_ips: MAX_TRACKED_IPS,
            hits: RwLock::new(HashMap::new()),
            request_count: AtomicU64::new(0),
        }
    }

    /// Record a request from `ip` if it is within budget.
    ///
    /// # Errors
    ///
    /// [`FixitError::RateLimited`] once the IP has used its window, or when
    /// the table is full and `ip` is new.
    pub fn check(&self, ip: IpAddr) -> Result<()> {
        let now = Instant::now();
        let cutoff = now.checked_sub(self.window).unwrap_or(now);

        let count = self.request_count.fetch_add(1, Ordering::Relaxed);
        if count > 0 && count % CLEANUP_INTERVAL == 0 {
            self.cleanup();
        }

        let mut hits = self
            .hits
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if !hits.contains_key(&ip) && hits.len() >= self.max_tracked_ips {
            hits.retain(|_, stamps| {
                stamps.retain(|&t| t > cutoff);
                !stamps.is_empty()
            });
            if hits.len() >= self.max_tracked_ips {
                tracing::warn!(%ip, tracked = hits.len(), "rate limiter full, rejecting new client");
                return Err(FixitError::RateLimited);
            }
        }

        let stamps = hits.entry(ip).or_default();
        stamps.retain(|&t| t > cutoff);
        if stamps.len() >= self.max_requests {
            tracing::warn!(%ip, requests = stamps.len(), max = self.max_requests, "rate limit exceeded");
            return Err(FixitError::RateLimited);
        }
        stamps.push(now);
        Ok(())
    }

    /// Drop IPs with no requests inside the window.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let cutoff = now.checked_sub(self.window).unwrap_or(now);
        let mut hits = self
            .hits
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        hits.retain(|_, stamps| {
            stamps.retain(|&t| t > cutoff);
            !stamps.is_empty()
        });
    }

    #[cfg(test)]
    fn tracked_ips(&self) -> usize {
        self.hits
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

/// Middleware: reject over-budget clients with 429.
///
/// Requests without connection info (in-process tests) count as loopback.
pub async fn limit(
    State(limiter): State<Arc<RateLimiter>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> std::result::Result<Response, FixitError> {
    let ip = connect_info.map_or(IpAddr::V4(Ipv4Addr::LOCALHOST), |ConnectInfo(addr)| {
        addr.ip()
    });
    limiter.check(ip)?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: usize, window: Duration) -> RateLimiter {
        RateLimiter::new(RateLimitSettings {
            window,
            max_requests,
        })
    }

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_allows_up_to_max_then_rejects() {
        let limiter = limiter(3, Duration::from_secs(60));
        for _ in 0..3 {
            limiter.check(ip(1)).unwrap();
        }
        assert!(matches!(
            limiter.check(ip(1)).unwrap_err(),
            FixitError::RateLimited
        ));
        // Budgets are per IP.
        limiter.check(ip(2)).unwrap();
    }

    #[test]
    fn test_window_slides() {
        let limiter = limiter(1, Duration::from_millis(50));
        limiter.check(ip(1)).unwrap();
        assert!(limiter.check(ip(1)).is_err());
        std::thread::sleep(Duration::from_millis(80));
        limiter.check(ip(1)).unwrap();
    }

    #[test]
    fn test_cleanup_drops_idle_ips() {
        let limiter = limiter(5, Duration::from_millis(20));
        limiter.check(ip(1)).unwrap();
        limiter.check(ip(2)).unwrap();
        assert_eq!(limiter.tracked_ips(), 2);
        std::thread::sleep(Duration::from_millis(40));
        limiter.cleanup();
        assert_eq!(limiter.tracked_ips(), 0);
    }

    #[test]
    fn test_tracked_ip_cap() {
        let mut limiter = limiter(5, Duration::from_secs(60));
        limiter.max_tracked_ips = 2;
        limiter.check(ip(1)).unwrap();
        limiter.check(ip(2)).unwrap();
        assert!(limiter.check(ip(3)).is_err());
        // Known IPs keep working.
        limiter.check(ip(1)).unwrap();
    }
}

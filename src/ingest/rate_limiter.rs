//! Fixed-window per-IP rate limiter
//!
//! The window opens at the first request from an IP and resets once the
//! configured duration has elapsed since that first request. A burst
//! straddling the window boundary can admit up to twice the limit; that
//! imprecision is accepted.
//!
//! State is process-local and unbounded in key cardinality; with multiple
//! server instances each enforces its own limit. The limiter is an
//! injected service (not a module-level singleton) so a shared-store
//! implementation can replace it behind the same seam.

use dashmap::DashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;

struct Window {
    started: Instant,
    count: u32,
}

pub struct RateLimiter {
    windows: DashMap<IpAddr, Window>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            window: Duration::from_secs(config.window_secs),
            max_requests: config.max_requests,
        }
    }

    /// Count one request from `ip`; false means over the limit and the
    /// request should be rejected.
    pub fn check(&self, ip: IpAddr) -> bool {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> bool {
        let mut entry = self.windows.entry(ip).or_insert_with(|| Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            return false;
        }

        entry.count += 1;
        true
    }

    /// Number of IPs currently tracked.
    pub fn tracked_ips(&self) -> usize {
        self.windows.len()
    }
}

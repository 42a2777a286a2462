//! Per-client sliding-window rate limiter.
//!
//! Best-effort abuse mitigation for one process: state lives in memory, is
//! lost on restart, and is owned by whoever handles requests (the server
//! wraps it in a mutex). The caller supplies the clock so decisions are
//! reproducible in tests.
//!
//! Memory is bounded two ways:
//! - a sweep, at most once per window, drops clients idle longer than `idle_ttl`
//! - past `max_clients`, the least recently active client is evicted

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_requests: usize,
    pub idle_ttl_secs: u64,
    pub max_clients: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            max_requests: 10,
            idle_ttl_secs: 600,
            max_clients: 10_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: usize },
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

#[derive(Debug, Default)]
struct ClientWindow {
    hits: VecDeque<Instant>,
    last_seen: Option<Instant>,
}

#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_requests: usize,
    idle_ttl: Duration,
    max_clients: usize,
    clients: HashMap<String, ClientWindow>,
    last_sweep: Option<Instant>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            window: Duration::from_secs(config.window_secs),
            max_requests: config.max_requests,
            idle_ttl: Duration::from_secs(config.idle_ttl_secs),
            max_clients: config.max_clients.max(1),
            clients: HashMap::new(),
            last_sweep: None,
        }
    }

    /// Record a request from `client` at `now`, unless it is over the limit.
    /// Rejected requests are not recorded.
    pub fn check_at(&mut self, client: &str, now: Instant) -> RateDecision {
        self.maybe_sweep(now);

        if !self.clients.contains_key(client) && self.clients.len() >= self.max_clients {
            self.evict_least_recent();
        }

        let window = self.window;
        let entry = self.clients.entry(client.to_string()).or_default();
        while let Some(oldest) = entry.hits.front() {
            if now.saturating_duration_since(*oldest) >= window {
                entry.hits.pop_front();
            } else {
                break;
            }
        }
        entry.last_seen = Some(now);

        if entry.hits.len() >= self.max_requests {
            let retry_after = entry
                .hits
                .front()
                .map(|oldest| window.saturating_sub(now.saturating_duration_since(*oldest)))
                .unwrap_or(window);
            return RateDecision::Limited { retry_after };
        }

        entry.hits.push_back(now);
        RateDecision::Allowed {
            remaining: self.max_requests - entry.hits.len(),
        }
    }

    pub fn check(&mut self, client: &str) -> RateDecision {
        self.check_at(client, Instant::now())
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    fn maybe_sweep(&mut self, now: Instant) {
        let due = self
            .last_sweep
            .map(|t| now.saturating_duration_since(t) >= self.window)
            .unwrap_or(true);
        if !due {
            return;
        }
        self.last_sweep = Some(now);
        let ttl = self.idle_ttl;
        self.clients.retain(|_, c| {
            c.last_seen
                .map(|seen| now.saturating_duration_since(seen) < ttl)
                .unwrap_or(false)
        });
    }

    fn evict_least_recent(&mut self) {
        let oldest = self
            .clients
            .iter()
            .min_by_key(|(_, c)| c.last_seen)
            .map(|(k, _)| k.clone());
        if let Some(k) = oldest {
            self.clients.remove(&k);
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eleventh_request_in_window_is_limited() {
        let mut rl = RateLimiter::default();
        let t0 = Instant::now();
        for i in 0..10 {
            let d = rl.check_at("1.2.3.4", t0 + Duration::from_secs(i));
            assert!(d.is_allowed(), "request {i} should pass");
        }
        let d = rl.check_at("1.2.3.4", t0 + Duration::from_secs(30));
        assert!(matches!(d, RateDecision::Limited { .. }));
    }

    #[test]
    fn test_request_after_window_is_allowed() {
        let mut rl = RateLimiter::default();
        let t0 = Instant::now();
        for _ in 0..10 {
            assert!(rl.check_at("1.2.3.4", t0).is_allowed());
        }
        assert!(!rl.check_at("1.2.3.4", t0).is_allowed());
        assert!(rl.check_at("1.2.3.4", t0 + Duration::from_secs(61)).is_allowed());
    }

    #[test]
    fn test_clients_are_independent() {
        let mut rl = RateLimiter::default();
        let t0 = Instant::now();
        for _ in 0..10 {
            rl.check_at("a", t0);
        }
        assert!(!rl.check_at("a", t0).is_allowed());
        assert!(rl.check_at("b", t0).is_allowed());
    }

    #[test]
    fn test_remaining_and_retry_after() {
        let mut rl = RateLimiter::new(RateLimitConfig {
            max_requests: 2,
            ..RateLimitConfig::default()
        });
        let t0 = Instant::now();
        assert_eq!(rl.check_at("a", t0), RateDecision::Allowed { remaining: 1 });
        assert_eq!(rl.check_at("a", t0), RateDecision::Allowed { remaining: 0 });
        assert_eq!(
            rl.check_at("a", t0 + Duration::from_secs(20)),
            RateDecision::Limited {
                retry_after: Duration::from_secs(40)
            }
        );
    }

    #[test]
    fn test_rejections_are_not_recorded() {
        let mut rl = RateLimiter::new(RateLimitConfig {
            max_requests: 1,
            ..RateLimitConfig::default()
        });
        let t0 = Instant::now();
        assert!(rl.check_at("a", t0).is_allowed());
        for s in 1..60 {
            assert!(!rl.check_at("a", t0 + Duration::from_secs(s)).is_allowed());
        }
        // Only the first hit counts, so the window reopens at t0 + 60.
        assert!(rl.check_at("a", t0 + Duration::from_secs(60)).is_allowed());
    }

    #[test]
    fn test_idle_clients_are_swept() {
        let mut rl = RateLimiter::default();
        let t0 = Instant::now();
        rl.check_at("a", t0);
        rl.check_at("b", t0);
        assert_eq!(rl.tracked_clients(), 2);
        rl.check_at("c", t0 + Duration::from_secs(601));
        assert_eq!(rl.tracked_clients(), 1);
    }

    #[test]
    fn test_client_table_is_bounded() {
        let mut rl = RateLimiter::new(RateLimitConfig {
            max_clients: 3,
            ..RateLimitConfig::default()
        });
        let t0 = Instant::now();
        for (i, ip) in ["a", "b", "c", "d"].iter().enumerate() {
            rl.check_at(ip, t0 + Duration::from_millis(i as u64));
        }
        assert_eq!(rl.tracked_clients(), 3);
        // "a" was least recently active, so it starts fresh.
        for _ in 0..10 {
            assert!(rl.check_at("a", t0 + Duration::from_millis(10)).is_allowed());
        }
    }
}

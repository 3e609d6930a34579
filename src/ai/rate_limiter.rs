// src/ai/rate_limiter.rs
//! Per-user fixed-window counter for the AI endpoints. In-process only.

use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Seconds until the window resets.
    pub reset_after: u64,
}

#[derive(Debug)]
struct Window {
    count: u32,
    resets_at: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    windows: DashMap<i64, Window>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window, windows: DashMap::new() }
    }

    pub fn check(&self, user_id: i64) -> RateDecision {
        self.check_at(user_id, Instant::now())
    }

    pub fn check_at(&self, user_id: i64, now: Instant) -> RateDecision {
        // stale windows go before the entry guard is taken; retain locks every shard
        if self.windows.len() > 10_000 {
            self.windows.retain(|_, w| w.resets_at > now);
        }

        let mut entry = self
            .windows
            .entry(user_id)
            .or_insert_with(|| Window { count: 0, resets_at: now + self.window });
        if now >= entry.resets_at {
            entry.count = 0;
            entry.resets_at = now + self.window;
        }

        let allowed = entry.count < self.limit;
        if allowed {
            entry.count += 1;
        }
        let reset_after = entry.resets_at.saturating_duration_since(now).as_secs_f64().ceil() as u64;

        RateDecision {
            allowed,
            limit: self.limit,
            remaining: self.limit.saturating_sub(entry.count),
            reset_after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_limit_until_window_resets() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let t0 = Instant::now();

        let first = limiter.check_at(1, t0);
        assert!(first.allowed);
        assert_eq!(first.remaining, 1);
        assert!(limiter.check_at(1, t0).allowed);

        let blocked = limiter.check_at(1, t0 + Duration::from_secs(10));
        assert!(!blocked.allowed);
        assert_eq!(blocked.remaining, 0);
        assert_eq!(blocked.reset_after, 50);

        // other users have their own window
        assert!(limiter.check_at(2, t0).allowed);

        assert!(limiter.check_at(1, t0 + Duration::from_secs(61)).allowed);
    }

    #[test]
    fn concurrent_callers_share_one_window() {
        let limiter = std::sync::Arc::new(RateLimiter::new(50, Duration::from_secs(60)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || (0..10).filter(|_| limiter.check(7).allowed).count())
            })
            .collect();
        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 50);
    }
}

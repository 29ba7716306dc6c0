//! Admission control: reject oversized or over-quota requests before any
//! PDF work starts.
//!
//! Both checks are cheap and run in request middleware. The size check looks
//! only at the declared `Content-Length`, so an oversized upload is refused
//! without reading its body.

use crate::config::RateLimit;
use crate::error::ConvertError;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Instant;
use tracing::debug;

/// Reject a declared body length above `max_bytes`.
///
/// A missing length passes here; the body limit on the route catches
/// undeclared bodies as they stream in.
pub fn check_content_length(declared: Option<u64>, max_bytes: u64) -> Result<(), ConvertError> {
    match declared {
        Some(len) if len > max_bytes => Err(ConvertError::PayloadTooLarge {
            limit_bytes: max_bytes,
        }),
        _ => Ok(()),
    }
}

/// Keyed rolling-window rate limiter.
///
/// Each key may be admitted at most `limit.requests` times within any
/// `limit.window`. Rejected requests are not recorded, so a client that keeps
/// retrying does not extend its own lockout, and one key's usage never
/// affects another's.
#[derive(Debug)]
pub struct RateLimiter {
    limit: RateLimit,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            hits: Mutex::new(HashMap::new()),
        }
    }

    pub fn limit(&self) -> RateLimit {
        self.limit
    }

    /// Admit or reject a request from `key` now.
    pub fn check(&self, key: &str) -> Result<(), ConvertError> {
        self.check_at(key, Instant::now())
    }

    /// Admit or reject a request from `key` at `now`.
    pub fn check_at(&self, key: &str, now: Instant) -> Result<(), ConvertError> {
        let window = self.limit.window;
        let mut hits = self.hits.lock();

        // Drop keys whose whole history has aged out.
        hits.retain(|_, stamps| {
            stamps
                .back()
                .is_some_and(|last| now.saturating_duration_since(*last) < window)
        });

        let stamps = hits.entry(key.to_string()).or_default();
        while stamps
            .front()
            .is_some_and(|first| now.saturating_duration_since(*first) >= window)
        {
            stamps.pop_front();
        }

        if stamps.len() >= self.limit.requests as usize {
            debug!("Rate limit hit for {}", key);
            return Err(ConvertError::RateLimited {
                limit: self.limit.to_string(),
            });
        }
        stamps.push_back(now);
        Ok(())
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.hits.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn limiter(requests: u32, secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimit::new(requests, Duration::from_secs(secs)))
    }

    #[test]
    fn test_content_length_boundary() {
        let max = 10 * 1024 * 1024;
        assert!(check_content_length(Some(max), max).is_ok());
        assert!(check_content_length(None, max).is_ok());
        let err = check_content_length(Some(max + 1), max).unwrap_err();
        assert_eq!(err.to_string(), "File too large. Maximum allowed size is 10MB.");
    }

    #[test]
    fn test_allows_up_to_limit_then_rejects() {
        let rl = limiter(2, 60);
        let t0 = Instant::now();
        assert!(rl.check_at("a", t0).is_ok());
        assert!(rl.check_at("a", t0 + Duration::from_secs(1)).is_ok());
        let err = rl.check_at("a", t0 + Duration::from_secs(2)).unwrap_err();
        assert_eq!(err.to_string(), "Rate limit exceeded: 2 per 1 minute");
    }

    #[test]
    fn test_window_rolls() {
        let rl = limiter(2, 60);
        let t0 = Instant::now();
        rl.check_at("a", t0).unwrap();
        rl.check_at("a", t0 + Duration::from_secs(30)).unwrap();
        assert!(rl.check_at("a", t0 + Duration::from_secs(59)).is_err());
        // first hit has aged out
        assert!(rl.check_at("a", t0 + Duration::from_secs(60)).is_ok());
        assert!(rl.check_at("a", t0 + Duration::from_secs(61)).is_err());
    }

    #[test]
    fn test_rejections_are_not_recorded() {
        let rl = limiter(1, 10);
        let t0 = Instant::now();
        rl.check_at("a", t0).unwrap();
        for s in 1..10 {
            assert!(rl.check_at("a", t0 + Duration::from_secs(s)).is_err());
        }
        assert!(rl.check_at("a", t0 + Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn test_limit_reports_configured_quota() {
        let rl = limiter(3, 3_600);
        assert_eq!(rl.limit(), RateLimit::new(3, Duration::from_secs(3_600)));
        assert_eq!(rl.limit().to_string(), "3 per 1 hour");
    }

    #[test]
    fn test_clients_are_independent() {
        let rl = limiter(1, 60);
        let t0 = Instant::now();
        rl.check_at("a", t0).unwrap();
        assert!(rl.check_at("a", t0).is_err());
        assert!(rl.check_at("b", t0).is_ok());
    }

    #[test]
    fn test_idle_keys_pruned() {
        let rl = limiter(5, 1);
        let t0 = Instant::now();
        rl.check_at("a", t0).unwrap();
        rl.check_at("b", t0).unwrap();
        assert_eq!(rl.tracked_keys(), 2);
        rl.check_at("c", t0 + Duration::from_secs(5)).unwrap();
        assert_eq!(rl.tracked_keys(), 1);
    }
}

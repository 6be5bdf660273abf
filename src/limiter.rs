// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window rate limiter for contact-form submissions.
//!
//! Tracks admission timestamps per client identifier in process memory.
//! The store is per-process only: two instances do not share a window, and
//! everything is lost on restart. That is an accepted limitation of this
//! service, not something the limiter tries to paper over.

use crate::config::RateLimitConfig;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Admissions left in the current window (0 when rejected)
    pub remaining: u32,
    /// For an admitted request, `now + window`; for a rejected one, the
    /// instant the oldest still-counted admission ages out of the window,
    /// i.e. the earliest time a new submission can succeed.
    pub reset_at_ms: i64,
}

impl RateLimitDecision {
    pub fn reset_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.reset_at_ms).unwrap_or_else(Utc::now)
    }
}

/// Thread-safe sliding-window rate limiter.
pub struct RateLimiter {
    config: RateLimitConfig,
    /// Admission timestamps (epoch ms) per client identifier. Per-key
    /// vectors are pruned lazily on each check; keys themselves are kept
    /// for the life of the process.
    entries: RwLock<HashMap<String, Vec<i64>>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Admit or reject a submission from `client_id` at the current time.
    ///
    /// An admission is booked immediately; a downstream failure does not
    /// refund the slot, so a failing delivery cannot be retried past the
    /// window bound.
    pub async fn check(&self, client_id: &str) -> RateLimitDecision {
        self.check_at(client_id, Utc::now().timestamp_millis()).await
    }

    /// Admission check against an explicit clock, so tests can drive the
    /// window deterministically.
    pub async fn check_at(&self, client_id: &str, now_ms: i64) -> RateLimitDecision {
        let window = self.config.window_ms as i64;
        let max = self.config.max_per_window;

        // Read-then-write under one guard: no await point between the
        // prune and the append, so the count cannot interleave.
        let mut entries = self.entries.write().await;
        let stamps = entries.entry(client_id.to_string()).or_default();
        stamps.retain(|&t| now_ms - t < window);

        if stamps.len() as u32 >= max {
            let oldest = stamps.iter().copied().min().unwrap_or(now_ms);
            let reset_at_ms = oldest + window;
            debug!(client_id, reset_at_ms, "submission rejected by rate limit");
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at_ms,
            };
        }

        stamps.push(now_ms);
        let remaining = max.saturating_sub(stamps.len() as u32);
        debug!(client_id, remaining, "submission admitted");
        RateLimitDecision {
            allowed: true,
            remaining,
            reset_at_ms: now_ms + window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR_MS: i64 = 3_600_000;

    fn limiter() -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_per_window: 5,
            window_ms: HOUR_MS as u64,
        })
    }

    #[tokio::test]
    async fn test_five_admitted_then_rejected() {
        let limiter = limiter();

        for i in 0..5 {
            let decision = limiter.check_at("1.2.3.4", i * 1000).await;
            assert!(decision.allowed, "admission {} should succeed", i + 1);
        }

        let decision = limiter.check_at("1.2.3.4", 5000).await;
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[tokio::test]
    async fn test_remaining_counts_down() {
        let limiter = limiter();

        let first = limiter.check_at("1.2.3.4", 0).await;
        assert_eq!(first.remaining, 4);

        let fifth = {
            for i in 1..4 {
                limiter.check_at("1.2.3.4", i * 1000).await;
            }
            limiter.check_at("1.2.3.4", 4000).await
        };
        assert_eq!(fifth.remaining, 0);
        assert!(fifth.allowed);
    }

    #[tokio::test]
    async fn test_rejection_reset_is_oldest_plus_window() {
        let limiter = limiter();

        for i in 0..5 {
            limiter.check_at("1.2.3.4", 100 + i * 1000).await;
        }

        let decision = limiter.check_at("1.2.3.4", 10_000).await;
        assert!(!decision.allowed);
        assert_eq!(decision.reset_at_ms, 100 + HOUR_MS);
    }

    #[tokio::test]
    async fn test_admission_reset_is_now_plus_window() {
        let limiter = limiter();
        let decision = limiter.check_at("1.2.3.4", 42).await;
        assert!(decision.allowed);
        assert_eq!(decision.reset_at_ms, 42 + HOUR_MS);
    }

    #[tokio::test]
    async fn test_window_slides_open_at_reset_time() {
        let limiter = limiter();

        for i in 0..5 {
            limiter.check_at("1.2.3.4", i * 1000).await;
        }
        let rejected = limiter.check_at("1.2.3.4", 5000).await;
        assert!(!rejected.allowed);

        // At exactly reset time the oldest admission falls outside the
        // window and one slot opens.
        let decision = limiter.check_at("1.2.3.4", rejected.reset_at_ms).await;
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn test_clients_limited_independently() {
        let limiter = limiter();

        for i in 0..5 {
            limiter.check_at("1.2.3.4", i * 1000).await;
        }
        assert!(!limiter.check_at("1.2.3.4", 5000).await.allowed);
        assert!(limiter.check_at("5.6.7.8", 5000).await.allowed);
    }

    #[tokio::test]
    async fn test_unknown_sentinel_is_one_shared_bucket() {
        let limiter = limiter();

        for i in 0..5 {
            assert!(limiter.check_at("unknown", i * 1000).await.allowed);
        }
        assert!(!limiter.check_at("unknown", 5000).await.allowed);
    }
}

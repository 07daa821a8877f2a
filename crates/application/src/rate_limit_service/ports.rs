use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use sanctum_core::AppResult;

/// Repository port for rate limit counters.
#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    /// Records an attempt for the given key at `now`.
    ///
    /// Resets the counter when the stored window has expired. Returns the
    /// updated attempt count within the active window. The read-modify-write
    /// must be atomic per key.
    async fn record_attempt(
        &self,
        key: &str,
        window: TimeDelta,
        now: DateTime<Utc>,
    ) -> AppResult<AttemptInfo>;

    /// Removes entries whose window started before the given cutoff.
    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64>;
}

/// Information about the current rate limit window for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptInfo {
    /// Number of attempts in the current window (including this one).
    pub attempt_count: u32,
    /// When the current window started.
    pub window_started_at: DateTime<Utc>,
}

impl AttemptInfo {
    /// Opens a fresh window at `now`.
    #[must_use]
    pub fn first(now: DateTime<Utc>) -> Self {
        Self {
            attempt_count: 1,
            window_started_at: now,
        }
    }

    /// Applies one attempt at `now` to an optional previous entry.
    ///
    /// A window is stale only once strictly more than `window` has elapsed
    /// since it started.
    #[must_use]
    pub fn next(previous: Option<&Self>, window: TimeDelta, now: DateTime<Utc>) -> Self {
        match previous {
            Some(entry) if now - entry.window_started_at <= window => Self {
                attempt_count: entry.attempt_count.saturating_add(1),
                window_started_at: entry.window_started_at,
            },
            _ => Self::first(now),
        }
    }
}

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::warn;

use sanctum_core::{AppError, AppResult};

use super::config::RateLimitRule;
use super::ports::RateLimitRepository;

/// Outcome of one rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the attempt fits in the current window.
    pub allowed: bool,
    /// Attempts recorded in the current window, including this one.
    pub attempt_count: u32,
    /// Start of the current window.
    pub window_started_at: DateTime<Utc>,
    /// Time left until the window resets, for denied attempts.
    pub retry_after: Option<TimeDelta>,
}

impl RateLimitDecision {
    /// Whole seconds a client should wait before retrying.
    ///
    /// Rounded up past the boundary because a window only resets once it has
    /// strictly elapsed.
    #[must_use]
    pub fn retry_after_seconds(&self) -> Option<u64> {
        self.retry_after
            .map(|delay| u64::try_from(delay.num_seconds()).unwrap_or(0).saturating_add(1))
    }
}

/// Fixed-window limiter bound to one rule.
#[derive(Clone)]
pub struct FixedWindowRateLimiter {
    repository: Arc<dyn RateLimitRepository>,
    rule: RateLimitRule,
    window: TimeDelta,
}

impl FixedWindowRateLimiter {
    /// Creates a limiter, validating the rule's window.
    pub fn new(repository: Arc<dyn RateLimitRepository>, rule: RateLimitRule) -> AppResult<Self> {
        let window = rule.window()?;
        Ok(Self {
            repository,
            rule,
            window,
        })
    }

    /// Returns the configured rule.
    #[must_use]
    pub fn rule(&self) -> &RateLimitRule {
        &self.rule
    }

    /// Records an attempt for `key` at `now` and decides it.
    pub async fn check_at(&self, key: &str, now: DateTime<Utc>) -> AppResult<RateLimitDecision> {
        let info = self
            .repository
            .record_attempt(&self.rule.key_for(key), self.window, now)
            .await?;

        let allowed = info.attempt_count <= self.rule.max_attempts;
        let retry_after = (!allowed).then(|| {
            (info.window_started_at + self.window - now).max(TimeDelta::zero())
        });

        Ok(RateLimitDecision {
            allowed,
            attempt_count: info.attempt_count,
            window_started_at: info.window_started_at,
            retry_after,
        })
    }

    /// Records an attempt for `key` now and decides it.
    pub async fn check(&self, key: &str) -> AppResult<RateLimitDecision> {
        self.check_at(key, Utc::now()).await
    }

    /// Returns whether `key` may proceed.
    ///
    /// Store failures allow the attempt; the limiter is best-effort.
    pub async fn allow(&self, key: &str) -> bool {
        self.check_or_allow(key).await.allowed
    }

    /// Records an attempt and fails with `AppError::RateLimited` when denied.
    pub async fn require(&self, key: &str) -> AppResult<RateLimitDecision> {
        let decision = self.check_or_allow(key).await;
        if !decision.allowed {
            return Err(AppError::RateLimited(format!(
                "too many requests, retry in {} seconds",
                decision.retry_after_seconds().unwrap_or(1)
            )));
        }

        Ok(decision)
    }

    /// Removes entries older than twice the window as of `now`.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let cutoff = now - self.window * 2;
        self.repository.cleanup_expired(cutoff).await
    }

    /// Removes entries older than twice the window.
    pub async fn sweep(&self) -> AppResult<u64> {
        self.sweep_at(Utc::now()).await
    }

    async fn check_or_allow(&self, key: &str) -> RateLimitDecision {
        let now = Utc::now();
        match self.check_at(key, now).await {
            Ok(decision) => decision,
            Err(error) => {
                warn!(
                    category = %self.rule.category,
                    error = %error,
                    "rate limit store failed, allowing attempt"
                );
                RateLimitDecision {
                    allowed: true,
                    attempt_count: 0,
                    window_started_at: now,
                    retry_after: None,
                }
            }
        }
    }
}

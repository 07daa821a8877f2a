use chrono::TimeDelta;
use sanctum_core::{AppError, AppResult};

/// Configuration for a rate limit rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRule {
    /// The operation category (e.g., "assist").
    pub category: String,
    /// Maximum number of attempts allowed in the window.
    pub max_attempts: u32,
    /// Window duration in milliseconds.
    pub window_ms: i64,
}

impl RateLimitRule {
    /// Creates a new rate limit rule.
    #[must_use]
    pub fn new(category: impl Into<String>, max_attempts: u32, window_ms: i64) -> Self {
        Self {
            category: category.into(),
            max_attempts,
            window_ms,
        }
    }

    /// Returns the validated window length.
    pub fn window(&self) -> AppResult<TimeDelta> {
        if self.window_ms <= 0 {
            return Err(AppError::Validation(format!(
                "rate limit window for '{}' must be greater than zero",
                self.category
            )));
        }

        TimeDelta::try_milliseconds(self.window_ms).ok_or_else(|| {
            AppError::Validation(format!(
                "rate limit window for '{}' is out of range",
                self.category
            ))
        })
    }

    /// Builds the storage key for one caller identity.
    #[must_use]
    pub fn key_for(&self, identity: &str) -> String {
        format!("{}:{identity}", self.category)
    }
}

//! Process-local rate limit counters.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use sanctum_application::{AttemptInfo, RateLimitRepository};
use sanctum_core::AppResult;
use tokio::sync::Mutex;

/// In-memory implementation of the rate limit repository port.
///
/// Counters live for the lifetime of the process and are not shared between
/// replicas.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitRepository {
    entries: Mutex<HashMap<String, AttemptInfo>>,
}

impl InMemoryRateLimitRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored window for a fully qualified key.
    pub async fn entry(&self, key: &str) -> Option<AttemptInfo> {
        self.entries.lock().await.get(key).copied()
    }

    /// Returns the number of tracked keys.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns whether no keys are tracked.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl RateLimitRepository for InMemoryRateLimitRepository {
    async fn record_attempt(
        &self,
        key: &str,
        window: TimeDelta,
        now: DateTime<Utc>,
    ) -> AppResult<AttemptInfo> {
        let mut entries = self.entries.lock().await;
        let info = AttemptInfo::next(entries.get(key), window, now);
        entries.insert(key.to_owned(), info);

        Ok(info)
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut entries = self.entries.lock().await;
        let tracked = entries.len();
        entries.retain(|_, info| info.window_started_at >= before);

        Ok(u64::try_from(tracked - entries.len()).unwrap_or(u64::MAX))
    }
}

use std::time::Duration;

use sanctum_application::FixedWindowRateLimiter;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Periodically evicts rate limit windows older than twice the window length.
pub fn spawn_sweeper(limiter: FixedWindowRateLimiter, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        info!(
            category = %limiter.rule().category,
            interval_seconds = interval.as_secs(),
            "rate limit sweeper started"
        );

        loop {
            ticker.tick().await;
            match limiter.sweep().await {
                Ok(0) => debug!(category = %limiter.rule().category, "rate limit sweep found nothing"),
                Ok(removed) => info!(
                    category = %limiter.rule().category,
                    removed,
                    "rate limit sweep removed stale windows"
                ),
                Err(error) => warn!(
                    category = %limiter.rule().category,
                    error = %error,
                    "rate limit sweep failed"
                ),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{TimeDelta, Utc};
    use sanctum_application::{FixedWindowRateLimiter, RateLimitRule};
    use sanctum_infrastructure::InMemoryRateLimitRepository;

    use super::spawn_sweeper;

    #[tokio::test]
    async fn sweeper_evicts_stale_windows() {
        let repository = Arc::new(InMemoryRateLimitRepository::new());
        let Ok(limiter) =
            FixedWindowRateLimiter::new(repository.clone(), RateLimitRule::new("assist", 3, 60_000))
        else {
            panic!("limiter must build");
        };

        let _ = limiter
            .check_at("stale", Utc::now() - TimeDelta::hours(1))
            .await;
        let _ = limiter.check_at("fresh", Utc::now()).await;

        let handle = spawn_sweeper(limiter, Duration::from_millis(10));
        for _ in 0..50 {
            if repository.entry("assist:stale").await.is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        assert!(repository.entry("assist:stale").await.is_none());
        assert!(repository.entry("assist:fresh").await.is_some());
    }
}

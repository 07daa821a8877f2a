//! Redis-backed rate limit repository.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use redis::Script;
use redis::aio::ConnectionManager;
use sanctum_application::{AttemptInfo, RateLimitRepository};
use sanctum_core::{AppError, AppResult};

const RECORD_ATTEMPT_SCRIPT: &str = r#"
local key = KEYS[1]
local window_ms = tonumber(ARGV[1])
local now_ms = tonumber(ARGV[2])

local count = redis.call('INCR', key)
local ttl = redis.call('PTTL', key)

if ttl < 0 then
  redis.call('PEXPIRE', key, window_ms)
  ttl = window_ms
end

return {count, now_ms - (window_ms - ttl)}
"#;

/// Redis implementation of the rate limit repository port.
///
/// Keys expire on their own once the window elapses, so sweeping is a no-op.
#[derive(Clone)]
pub struct RedisRateLimitRepository {
    connection: ConnectionManager,
    key_prefix: String,
}

impl RedisRateLimitRepository {
    /// Creates a repository over a managed Redis connection.
    #[must_use]
    pub fn new(connection: ConnectionManager, key_prefix: impl Into<String>) -> Self {
        Self {
            connection,
            key_prefix: key_prefix.into(),
        }
    }

    /// Connects to Redis at `redis_url`.
    pub async fn connect(redis_url: &str, key_prefix: impl Into<String>) -> AppResult<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|error| AppError::Validation(format!("invalid REDIS_URL: {error}")))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))?;

        Ok(Self::new(connection, key_prefix))
    }

    fn key_for(&self, key: &str) -> String {
        format!("{}:{key}", self.key_prefix)
    }
}

#[async_trait]
impl RateLimitRepository for RedisRateLimitRepository {
    async fn record_attempt(
        &self,
        key: &str,
        window: TimeDelta,
        now: DateTime<Utc>,
    ) -> AppResult<AttemptInfo> {
        let window_ms = window.num_milliseconds();
        if window_ms <= 0 {
            return Err(AppError::Validation(
                "rate limit window must be greater than zero".to_owned(),
            ));
        }

        let mut connection = self.connection.clone();
        let (attempt_count, window_started_ms): (i64, i64) = Script::new(RECORD_ATTEMPT_SCRIPT)
            .key(self.key_for(key))
            .arg(window_ms)
            .arg(now.timestamp_millis())
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to record redis rate limit attempt: {error}"))
            })?;

        let attempt_count = u32::try_from(attempt_count)
            .map_err(|error| AppError::Internal(format!("invalid redis attempt count: {error}")))?;
        let window_started_at = Utc
            .timestamp_millis_opt(window_started_ms)
            .single()
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "invalid redis window start timestamp: {window_started_ms}"
                ))
            })?;

        Ok(AttemptInfo {
            attempt_count,
            window_started_at,
        })
    }

    async fn cleanup_expired(&self, _before: DateTime<Utc>) -> AppResult<u64> {
        Ok(0)
    }
}

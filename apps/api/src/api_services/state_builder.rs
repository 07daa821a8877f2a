use std::sync::Arc;
use std::time::Duration;

use sanctum_application::{FixedWindowRateLimiter, RateLimitRule};
use sanctum_core::{AppError, AppResult};
use sanctum_infrastructure::HttpAssistantClient;

use super::repositories::{build_rate_limit_repository, build_role_stores};
use crate::api_config::ApiConfig;
use crate::state::AppState;

pub struct ApiServices {
    pub state: AppState,
    pub assist_limiter: FixedWindowRateLimiter,
}

pub async fn build_api_services(config: &ApiConfig) -> AppResult<ApiServices> {
    let role_stores = build_role_stores(&config.role_store).await?;

    let assist_limiter = FixedWindowRateLimiter::new(
        build_rate_limit_repository(&config.rate_limit_store).await?,
        RateLimitRule::new(
            "assist",
            config.assist_rate_limit_max,
            config.assist_rate_limit_window_ms,
        ),
    )?;

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;
    let assistant_client = Arc::new(HttpAssistantClient::new(
        http_client,
        &config.assistant.base_url,
        config.assistant.api_key.clone(),
        config.assistant.model.clone(),
    ));

    let state = AppState::new(
        role_stores.roles,
        role_stores.assignments,
        &config.owner_emails,
        assist_limiter.clone(),
        assistant_client,
        config.trusted_proxies.clone(),
    );

    Ok(ApiServices {
        state,
        assist_limiter,
    })
}

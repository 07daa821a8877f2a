use std::sync::Arc;

use sanctum_application::{RateLimitRepository, RoleAssignmentRepository, RoleRepository};
use sanctum_core::{AppError, AppResult};
use sanctum_infrastructure::{
    InMemoryRateLimitRepository, InMemoryRoleRepository, PostgresRoleRepository,
    RedisRateLimitRepository, RoleSeed,
};
use tracing::{info, warn};

use super::connect_and_migrate;
use crate::api_config::{RateLimitStoreConfig, RoleStoreConfig};

pub(super) struct RoleStores {
    pub roles: Arc<dyn RoleRepository>,
    pub assignments: Arc<dyn RoleAssignmentRepository>,
}

pub(super) async fn build_role_stores(config: &RoleStoreConfig) -> AppResult<RoleStores> {
    match config {
        RoleStoreConfig::Postgres { database_url } => {
            let pool = connect_and_migrate(database_url).await?;
            let repository = Arc::new(PostgresRoleRepository::new(pool));
            repository.ensure_owner_role().await?;
            info!("using postgres role store");

            Ok(RoleStores {
                roles: repository.clone(),
                assignments: repository,
            })
        }
        RoleStoreConfig::InMemory { seed_file } => {
            let repository = match seed_file {
                Some(path) => InMemoryRoleRepository::from_seed(load_role_seed(path)?)?,
                None => {
                    warn!("no DATABASE_URL or ROLE_SEED_FILE configured, role store starts empty");
                    InMemoryRoleRepository::new()
                }
            };
            let repository = Arc::new(repository);
            repository.ensure_owner_role().await?;

            Ok(RoleStores {
                roles: repository.clone(),
                assignments: repository,
            })
        }
    }
}

pub(super) async fn build_rate_limit_repository(
    config: &RateLimitStoreConfig,
) -> AppResult<Arc<dyn RateLimitRepository>> {
    match config {
        RateLimitStoreConfig::InMemory => Ok(Arc::new(InMemoryRateLimitRepository::new())),
        RateLimitStoreConfig::Redis { redis_url } => {
            let repository =
                RedisRateLimitRepository::connect(redis_url, "sanctum:rate_limit").await?;
            info!("using redis rate limit store");
            Ok(Arc::new(repository))
        }
    }
}

fn load_role_seed(path: &str) -> AppResult<RoleSeed> {
    let raw = std::fs::read_to_string(path).map_err(|error| {
        AppError::Validation(format!("failed to read ROLE_SEED_FILE '{path}': {error}"))
    })?;

    RoleSeed::from_json(&raw)
}

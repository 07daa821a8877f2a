//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_assistant_client;
mod in_memory_rate_limit_repository;
mod in_memory_role_repository;
mod postgres_role_repository;
mod redis_rate_limit_repository;

pub use http_assistant_client::HttpAssistantClient;
pub use in_memory_rate_limit_repository::InMemoryRateLimitRepository;
pub use in_memory_role_repository::{AssignmentSeed, InMemoryRoleRepository, RoleSeed};
pub use postgres_role_repository::PostgresRoleRepository;
pub use redis_rate_limit_repository::RedisRateLimitRepository;

use sqlx::migrate::Migrator;

/// Embedded schema migrations for the role tables.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

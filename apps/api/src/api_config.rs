use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use ipnet::IpNet;
use sanctum_core::{AppError, AppResult};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Debug, Clone)]
pub enum RoleStoreConfig {
    Postgres { database_url: String },
    InMemory { seed_file: Option<String> },
}

#[derive(Debug, Clone)]
pub enum RateLimitStoreConfig {
    InMemory,
    Redis { redis_url: String },
}

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub api_host: String,
    pub api_port: u16,
    pub frontend_url: String,
    pub role_store: RoleStoreConfig,
    pub rate_limit_store: RateLimitStoreConfig,
    pub owner_emails: Vec<String>,
    pub assist_rate_limit_max: u32,
    pub assist_rate_limit_window_ms: i64,
    pub rate_limit_sweep_interval: Duration,
    pub trusted_proxies: Vec<IpNet>,
    pub assistant: AssistantConfig,
}

impl ApiConfig {
    pub fn load() -> AppResult<Self> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = parse_env("API_PORT", 3001_u16)?;

        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());
        Url::parse(&frontend_url)
            .map_err(|error| AppError::Validation(format!("invalid FRONTEND_URL: {error}")))?;

        let role_store = match optional_env("DATABASE_URL") {
            Some(database_url) => RoleStoreConfig::Postgres { database_url },
            None => RoleStoreConfig::InMemory {
                seed_file: optional_env("ROLE_SEED_FILE"),
            },
        };
        if migrate_only && matches!(role_store, RoleStoreConfig::InMemory { .. }) {
            return Err(AppError::Validation(
                "DATABASE_URL is required to run migrations".to_owned(),
            ));
        }

        let rate_limit_store = match optional_env("REDIS_URL") {
            Some(redis_url) => RateLimitStoreConfig::Redis { redis_url },
            None => RateLimitStoreConfig::InMemory,
        };

        let owner_emails = optional_env("OWNER_EMAILS")
            .map(|value| parse_owner_emails(&value))
            .unwrap_or_default();

        let assist_rate_limit_max = parse_env("ASSIST_RATE_LIMIT_MAX", 10_u32)?;
        let assist_rate_limit_window_ms = parse_env("ASSIST_RATE_LIMIT_WINDOW_MS", 60_000_i64)?;
        if assist_rate_limit_window_ms <= 0 {
            return Err(AppError::Validation(
                "ASSIST_RATE_LIMIT_WINDOW_MS must be greater than zero".to_owned(),
            ));
        }

        let sweep_interval_seconds = parse_env("RATE_LIMIT_SWEEP_INTERVAL_SECONDS", 300_u64)?;
        if sweep_interval_seconds == 0 {
            return Err(AppError::Validation(
                "RATE_LIMIT_SWEEP_INTERVAL_SECONDS must be greater than zero".to_owned(),
            ));
        }

        let trusted_proxies = optional_env("TRUSTED_PROXY_CIDRS")
            .map(|value| parse_trusted_proxies(&value))
            .transpose()?
            .unwrap_or_default();

        let assistant_base_url = env::var("ASSISTANT_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_owned());
        Url::parse(&assistant_base_url).map_err(|error| {
            AppError::Validation(format!("invalid ASSISTANT_API_BASE_URL: {error}"))
        })?;

        Ok(Self {
            migrate_only,
            api_host,
            api_port,
            frontend_url,
            role_store,
            rate_limit_store,
            owner_emails,
            assist_rate_limit_max,
            assist_rate_limit_window_ms,
            rate_limit_sweep_interval: Duration::from_secs(sweep_interval_seconds),
            trusted_proxies,
            assistant: AssistantConfig {
                base_url: assistant_base_url,
                api_key: optional_env("ASSISTANT_API_KEY"),
                model: env::var("ASSISTANT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_owned()),
            },
        })
    }

    pub fn socket_address(&self) -> AppResult<SocketAddr> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_env<T>(name: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(name) {
        Some(value) => value
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name} '{value}': {error}"))),
        None => Ok(default),
    }
}

fn parse_owner_emails(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty())
        .collect()
}

fn parse_trusted_proxies(raw: &str) -> AppResult<Vec<IpNet>> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            value
                .parse::<IpNet>()
                .or_else(|_| value.parse::<IpAddr>().map(IpNet::from))
                .map_err(|error| {
                    AppError::Validation(format!("invalid TRUSTED_PROXY_CIDRS entry '{value}': {error}"))
                })
        })
        .collect()
}

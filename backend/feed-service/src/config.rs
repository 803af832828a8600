//! Configuration management for Feed Service
//!
//! This module handles loading and managing configuration from environment
//! variables. All feed tuning knobs (page size, cache TTL, invalidation
//! sweep bound, recency ceiling) are operator-adjustable without a rebuild.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Cache (Redis) configuration
    pub cache: CacheConfig,
    /// Feed ranking configuration
    pub feed: FeedConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
}

/// Cache (Redis) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis URL
    pub url: String,
}

/// Feed ranking configuration.
///
/// The cached ordering may lag engagement by up to `cache_ttl_secs`; that
/// staleness window is an accepted tradeoff, not a bug.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Items per feed page
    pub per_page: u32,
    /// Feed page cache TTL in seconds
    pub cache_ttl_secs: u64,
    /// Number of leading pages swept by the invalidation hook
    pub invalidate_pages: u32,
    /// Recency boost ceiling in points, which is also the age in hours at
    /// which the boost decays to zero
    pub recency_ceiling_hours: i64,
    /// Timeout applied to store/repository queries, in milliseconds
    pub query_timeout_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            per_page: 20,
            cache_ttl_secs: 300,
            invalidate_pages: 10,
            recency_ceiling_hours: 100,
            query_timeout_ms: 5000,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        Ok(Config {
            app: AppConfig {
                env: app_env.clone(),
                host: std::env::var("FEED_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_parse("FEED_SERVICE_PORT", 8084),
            },
            cors: {
                let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                    Ok(value) => value,
                    Err(_) if app_env.eq_ignore_ascii_case("production") => {
                        return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                    }
                    Err(_) => "http://localhost:3000".to_string(),
                };

                if app_env.eq_ignore_ascii_case("production") && allowed_origins.trim() == "*" {
                    return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
                }

                CorsConfig { allowed_origins }
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .map_err(|_| "DATABASE_URL must be set".to_string())?,
                max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10),
            },
            cache: CacheConfig {
                url: std::env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            },
            feed: FeedConfig {
                per_page: env_parse("FEED_PER_PAGE", 20),
                cache_ttl_secs: env_parse("FEED_CACHE_TTL_SECS", 300),
                invalidate_pages: env_parse("FEED_INVALIDATE_PAGES", 10),
                recency_ceiling_hours: env_parse("FEED_RECENCY_CEILING", 100),
                query_timeout_ms: env_parse("FEED_QUERY_TIMEOUT_MS", 5000),
            },
        })
    }
}

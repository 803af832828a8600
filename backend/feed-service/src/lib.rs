/// Feed Service Library
///
/// Serves the ranked, cached content feed for the Savora video platform.
/// Ranking combines engagement counters with a recency boost; computed pages
/// are cached viewer-agnostically in Redis and invalidated by the engagement
/// endpoints that shift the ranking.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers
/// - `services`: score calculator and feed assembler
/// - `cache`: feed page cache (Redis, fail-open)
/// - `db`: repositories over PostgreSQL
/// - `models`: data structures and response DTOs
/// - `middleware`: viewer identity extraction
/// - `error`: error types and handling
/// - `config`: configuration management
/// - `metrics`: observability collectors
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

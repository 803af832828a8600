//! Redis-backed cache for computed feed pages.
//!
//! Cache keys are derived from the page number alone; the cached payload is
//! viewer-agnostic so one entry serves every viewer. Keys follow the pattern
//! `feed:v1:page:{n}` → serialized [`FeedPage`].
//!
//! The cache is fail-open: a read error is reported to the caller as a miss
//! and a write error is logged and dropped. The feed must keep serving from
//! recomputation when Redis is unavailable.
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::error::{AppError, Result};
use crate::metrics::FEED_CACHE_EVENTS;
use crate::models::FeedPage;

/// Storage seam for computed feed pages.
///
/// Injected into the feed service so tests can substitute an in-memory
/// implementation with a controllable clock and TTL.
#[async_trait]
pub trait FeedPageStore: Send + Sync {
    /// Look up a cached page. Backend errors surface as a miss.
    async fn get_page(&self, page: u32) -> Option<FeedPage>;

    /// Store a page, replacing any existing entry atomically.
    async fn put_page(&self, page: &FeedPage) -> Result<()>;

    /// Drop cached pages `1..=upto`.
    async fn invalidate_pages(&self, upto: u32) -> Result<()>;
}

/// Feed page cache over Redis.
#[derive(Clone)]
pub struct RedisFeedCache {
    redis: ConnectionManager,
    ttl: Duration,
}

impl RedisFeedCache {
    pub fn new(redis: ConnectionManager, ttl_secs: u64) -> Self {
        Self {
            redis,
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    fn page_key(page: u32) -> String {
        format!("feed:v1:page:{}", page)
    }
}

#[async_trait]
impl FeedPageStore for RedisFeedCache {
    async fn get_page(&self, page: u32) -> Option<FeedPage> {
        let key = Self::page_key(page);
        let mut conn = self.redis.clone();

        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(data)) => match serde_json::from_str::<FeedPage>(&data) {
                Ok(cached) => {
                    debug!("Feed cache HIT for page {}", page);
                    Some(cached)
                }
                Err(e) => {
                    // Undecodable entries are as good as absent; the next
                    // put_page overwrites them.
                    error!("Failed to deserialize cached feed page {}: {}", page, e);
                    FEED_CACHE_EVENTS.with_label_values(&["error"]).inc();
                    None
                }
            },
            Ok(None) => {
                debug!("Feed cache MISS for page {}", page);
                None
            }
            Err(e) => {
                warn!("Redis read error for feed page {}: {}", page, e);
                FEED_CACHE_EVENTS.with_label_values(&["error"]).inc();
                None
            }
        }
    }

    async fn put_page(&self, page: &FeedPage) -> Result<()> {
        let key = Self::page_key(page.page);

        let data = serde_json::to_string(page).map_err(|e| {
            error!("Failed to serialize feed page for cache: {}", e);
            AppError::Internal(format!("Cache serialization error: {}", e))
        })?;

        // Jitter the TTL so pages populated together do not expire together.
        let jitter = (rand::random::<u32>() % 10) as f64 / 100.0;
        let jitter_secs = (self.ttl.as_secs_f64() * jitter).round() as u64;
        let final_ttl = self.ttl + Duration::from_secs(jitter_secs);

        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(&key, data, final_ttl.as_secs())
            .await
            .map_err(|e| {
                warn!("Failed to write feed cache for page {}: {}", page.page, e);
                AppError::CacheError(e.to_string())
            })?;

        debug!(
            "Feed cache WRITE for page {} ({} videos) with TTL {:?}",
            page.page,
            page.video_ids.len(),
            final_ttl
        );

        Ok(())
    }

    async fn invalidate_pages(&self, upto: u32) -> Result<()> {
        if upto == 0 {
            return Ok(());
        }

        let keys: Vec<String> = (1..=upto).map(Self::page_key).collect();
        let mut conn = self.redis.clone();
        conn.del::<_, ()>(keys)
            .await
            .map_err(|e| AppError::CacheError(e.to_string()))?;

        debug!("Feed cache INVALIDATE for pages 1..={}", upto);

        Ok(())
    }
}

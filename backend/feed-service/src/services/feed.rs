//! Feed assembler: serves ranked pages from cache, recomputes on miss, and
//! overlays viewer-specific flags without touching the shared cache entry.
//!
//! Concurrency model: each request runs independently. Cache entries are
//! opaque values replaced atomically on `put`, so no locking is needed; the
//! worst case on a popular expired key is a few concurrent recomputations
//! (accepted, see DESIGN.md).
use chrono::Utc;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::cache::FeedPageStore;
use crate::config::FeedConfig;
use crate::db::FeedItemSource;
use crate::error::{AppError, Result};
use crate::metrics::{
    FEED_CACHE_EVENTS, FEED_CACHE_WRITE_TOTAL, FEED_INVALIDATION_TOTAL,
    FEED_OVERLAY_DEGRADED_TOTAL, FEED_REQUEST_DURATION_SECONDS, FEED_REQUEST_TOTAL,
};
use crate::models::{FeedItem, FeedItemOwner, FeedPage, FeedResponse, FeedVideoRow};
use crate::services::scoring;

/// Per-viewer relation sets used to overlay flags onto a page.
#[derive(Debug, Clone, Default)]
pub struct ViewerFlags {
    pub liked: HashSet<i64>,
    pub bookmarked: HashSet<i64>,
    pub following: HashSet<i64>,
}

/// Ranked-feed orchestrator.
pub struct FeedService {
    source: Arc<dyn FeedItemSource>,
    cache: Arc<dyn FeedPageStore>,
    per_page: u32,
    recency_ceiling_hours: i64,
    invalidate_pages: u32,
    query_timeout: Duration,
}

impl FeedService {
    pub fn new(
        source: Arc<dyn FeedItemSource>,
        cache: Arc<dyn FeedPageStore>,
        config: &FeedConfig,
    ) -> Self {
        Self {
            source,
            cache,
            per_page: config.per_page.max(1),
            recency_ceiling_hours: config.recency_ceiling_hours.max(0),
            invalidate_pages: config.invalidate_pages,
            query_timeout: Duration::from_millis(config.query_timeout_ms.max(1)),
        }
    }

    /// Serve one ranked feed page with viewer flags overlaid.
    ///
    /// `page` is validated before any I/O. A page beyond the last one yields
    /// an empty `data` array with correct pagination metadata.
    pub async fn get_page(&self, page: i64, viewer_id: Option<i64>) -> Result<FeedResponse> {
        if page < 1 {
            return Err(AppError::ValidationError(
                "page must be a positive integer".to_string(),
            ));
        }
        let page = u32::try_from(page)
            .map_err(|_| AppError::ValidationError("page number out of range".to_string()))?;

        let start = Instant::now();

        let (feed_page, source) = match self.cache.get_page(page).await {
            Some(cached) => {
                FEED_CACHE_EVENTS.with_label_values(&["hit"]).inc();
                (cached, "cache")
            }
            None => {
                FEED_CACHE_EVENTS.with_label_values(&["miss"]).inc();
                let computed = self.compute_page(page).await?;

                // Best effort: a cache that cannot be written must not fail
                // the request that just did the work.
                match self.cache.put_page(&computed).await {
                    Ok(()) => FEED_CACHE_WRITE_TOTAL.with_label_values(&["success"]).inc(),
                    Err(e) => {
                        warn!("Feed cache write failed for page {}: {}", page, e);
                        FEED_CACHE_WRITE_TOTAL.with_label_values(&["error"]).inc();
                    }
                }

                (computed, "recompute")
            }
        };

        let rows = self
            .with_timeout(self.source.page_rows(&feed_page.video_ids))
            .await?;

        let flags = match viewer_id {
            Some(viewer) if !rows.is_empty() => self.viewer_flags(viewer, &rows).await,
            _ => ViewerFlags::default(),
        };

        let response = FeedResponse {
            data: apply_overlay(rows, viewer_id, &flags),
            current_page: page,
            per_page: self.per_page,
            total: feed_page.total,
            last_page: scoring::last_page(feed_page.total, self.per_page),
        };

        FEED_REQUEST_TOTAL.with_label_values(&[source]).inc();
        FEED_REQUEST_DURATION_SECONDS
            .with_label_values(&[source])
            .observe(start.elapsed().as_secs_f64());

        debug!(
            "Feed page {} served from {} ({} items, total {})",
            page,
            source,
            response.data.len(),
            response.total
        );

        Ok(response)
    }

    /// Recompute one page from the item and engagement stores.
    ///
    /// Any store failure here aborts the request: a partially-built or
    /// wrongly-scored page must never be cached.
    async fn compute_page(&self, page: u32) -> Result<FeedPage> {
        let candidates = self
            .with_timeout(self.source.published_candidates())
            .await?;

        let now = Utc::now();
        let ranked = scoring::rank(candidates, now, self.recency_ceiling_hours)?;
        let all_ids: Vec<i64> = ranked.iter().map(|s| s.id).collect();
        let total = all_ids.len() as i64;

        Ok(FeedPage {
            page,
            per_page: self.per_page,
            video_ids: scoring::page_window(&all_ids, page, self.per_page),
            total,
            computed_at: now,
        })
    }

    /// Resolve the viewer's relation sets for a page in at most three
    /// batched queries. Failures and timeouts degrade to default (all-false)
    /// flags; flag freshness is lower priority than feed availability, so a
    /// hung lookup must not hold the whole feed request.
    async fn viewer_flags(&self, viewer_id: i64, rows: &[FeedVideoRow]) -> ViewerFlags {
        let video_ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let owner_ids: Vec<i64> = rows
            .iter()
            .map(|r| r.user_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let (liked, bookmarked, following) = tokio::join!(
            tokio::time::timeout(
                self.query_timeout,
                self.source.liked_video_ids(viewer_id, &video_ids),
            ),
            tokio::time::timeout(
                self.query_timeout,
                self.source.bookmarked_video_ids(viewer_id, &video_ids),
            ),
            tokio::time::timeout(
                self.query_timeout,
                self.source.followed_owner_ids(viewer_id, &owner_ids),
            ),
        );

        let mut flags = ViewerFlags::default();
        match flatten_lookup(liked) {
            Ok(ids) => flags.liked = ids.into_iter().collect(),
            Err(reason) => {
                warn!(
                    "Liked-ids lookup degraded for viewer {}: {}",
                    viewer_id, reason
                );
                FEED_OVERLAY_DEGRADED_TOTAL.inc();
            }
        }
        match flatten_lookup(bookmarked) {
            Ok(ids) => flags.bookmarked = ids.into_iter().collect(),
            Err(reason) => {
                warn!(
                    "Bookmarked-ids lookup degraded for viewer {}: {}",
                    viewer_id, reason
                );
                FEED_OVERLAY_DEGRADED_TOTAL.inc();
            }
        }
        match flatten_lookup(following) {
            Ok(ids) => flags.following = ids.into_iter().collect(),
            Err(reason) => {
                warn!(
                    "Follow lookup degraded for viewer {}: {}",
                    viewer_id, reason
                );
                FEED_OVERLAY_DEGRADED_TOTAL.inc();
            }
        }

        flags
    }

    /// Invalidation hook. Called synchronously, after commit, by every
    /// operation that changes eligibility or ranking-relevant counters.
    ///
    /// Sweeps pages 1..=bound instead of tracking item-to-page membership;
    /// readers beyond the bound see stale rankings until their TTL lapses.
    pub async fn invalidate(&self) {
        FEED_INVALIDATION_TOTAL.inc();
        if let Err(e) = self.cache.invalidate_pages(self.invalidate_pages).await {
            // Fail open: the remaining staleness window is bounded by the TTL.
            warn!("Feed cache invalidation sweep failed: {}", e);
        }
    }

    /// Recency feed restricted to owners the viewer follows. Personal and
    /// cheap, therefore uncached.
    pub async fn following_page(&self, page: i64, viewer_id: i64) -> Result<FeedResponse> {
        if page < 1 {
            return Err(AppError::ValidationError(
                "page must be a positive integer".to_string(),
            ));
        }
        let page = u32::try_from(page)
            .map_err(|_| AppError::ValidationError("page number out of range".to_string()))?;

        let offset = (page as i64 - 1) * self.per_page as i64;
        let (rows, total) = tokio::try_join!(
            self.with_timeout(self.source.following_rows(
                viewer_id,
                self.per_page as i64,
                offset,
            )),
            self.with_timeout(self.source.count_following(viewer_id)),
        )?;

        let flags = if rows.is_empty() {
            ViewerFlags::default()
        } else {
            self.viewer_flags(viewer_id, &rows).await
        };

        Ok(FeedResponse {
            data: apply_overlay(rows, Some(viewer_id), &flags),
            current_page: page,
            per_page: self.per_page,
            total,
            last_page: scoring::last_page(total, self.per_page),
        })
    }

    async fn with_timeout<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => Err(AppError::DatabaseError(format!(
                "query exceeded {}ms timeout",
                self.query_timeout.as_millis()
            ))),
        }
    }
}

/// Collapse a timed-out or failed overlay lookup into one degrade reason.
fn flatten_lookup(
    result: std::result::Result<std::result::Result<Vec<i64>, sqlx::Error>, tokio::time::error::Elapsed>,
) -> std::result::Result<Vec<i64>, String> {
    match result {
        Ok(Ok(ids)) => Ok(ids),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("lookup timed out".to_string()),
    }
}

/// Merge viewer flags onto resolved display rows.
///
/// Pure: the shared rows are never mutated in the cache, and a viewer is
/// never marked as following their own videos.
pub fn apply_overlay(
    rows: Vec<FeedVideoRow>,
    viewer_id: Option<i64>,
    flags: &ViewerFlags,
) -> Vec<FeedItem> {
    rows.into_iter()
        .map(|row| {
            let is_own = viewer_id == Some(row.user_id);
            FeedItem {
                id: row.id,
                user_id: row.user_id,
                owner: FeedItemOwner {
                    id: row.user_id,
                    name: row.owner_name,
                    avatar_url: row.owner_avatar_url,
                },
                video_url: row.video_url,
                thumbnail_url: row.thumbnail_url,
                caption: row.caption,
                created_at: row.created_at,
                likes_count: row.likes_count,
                comments_count: row.comments_count,
                views_count: row.views_count,
                is_liked: flags.liked.contains(&row.id),
                is_bookmarked: flags.bookmarked.contains(&row.id),
                is_following: !is_own && flags.following.contains(&row.user_id),
            }
        })
        .collect()
}

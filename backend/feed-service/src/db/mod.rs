/// Database access layer
///
/// Repository functions over `sqlx::PgPool`:
/// - `video_repo`: video rows, feed candidates, ordered page resolution
/// - `engagement_repo`: like/comment/view mutations
/// - `viewer_repo`: batched viewer-flag lookups (liked/bookmarked/following)
///
/// The feed read path goes through the `FeedItemSource` trait so tests can
/// drive the assembler against an in-memory source; `PgFeedSource` is the
/// production implementation delegating to the repository functions.
pub mod engagement_repo;
pub mod video_repo;
pub mod viewer_repo;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::{FeedCandidate, FeedVideoRow};

/// Read seam for everything the feed assembler pulls from the item and
/// engagement stores.
#[async_trait]
pub trait FeedItemSource: Send + Sync {
    /// Every feed-eligible video with current engagement counters.
    async fn published_candidates(&self) -> Result<Vec<FeedCandidate>, sqlx::Error>;

    /// Display rows for a page of ids, in the order of `ids`.
    async fn page_rows(&self, ids: &[i64]) -> Result<Vec<FeedVideoRow>, sqlx::Error>;

    /// Ids among `video_ids` the viewer has liked.
    async fn liked_video_ids(
        &self,
        viewer_id: i64,
        video_ids: &[i64],
    ) -> Result<Vec<i64>, sqlx::Error>;

    /// Ids among `video_ids` the viewer has bookmarked.
    async fn bookmarked_video_ids(
        &self,
        viewer_id: i64,
        video_ids: &[i64],
    ) -> Result<Vec<i64>, sqlx::Error>;

    /// Owner ids among `owner_ids` the viewer follows.
    async fn followed_owner_ids(
        &self,
        viewer_id: i64,
        owner_ids: &[i64],
    ) -> Result<Vec<i64>, sqlx::Error>;

    /// Recency-ordered published videos from followed owners.
    async fn following_rows(
        &self,
        viewer_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FeedVideoRow>, sqlx::Error>;

    /// Count of published videos from followed owners.
    async fn count_following(&self, viewer_id: i64) -> Result<i64, sqlx::Error>;
}

/// Production `FeedItemSource` over PostgreSQL.
pub struct PgFeedSource {
    pool: PgPool,
}

impl PgFeedSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedItemSource for PgFeedSource {
    async fn published_candidates(&self) -> Result<Vec<FeedCandidate>, sqlx::Error> {
        video_repo::published_candidates(&self.pool).await
    }

    async fn page_rows(&self, ids: &[i64]) -> Result<Vec<FeedVideoRow>, sqlx::Error> {
        video_repo::find_page_rows(&self.pool, ids).await
    }

    async fn liked_video_ids(
        &self,
        viewer_id: i64,
        video_ids: &[i64],
    ) -> Result<Vec<i64>, sqlx::Error> {
        viewer_repo::liked_video_ids(&self.pool, viewer_id, video_ids).await
    }

    async fn bookmarked_video_ids(
        &self,
        viewer_id: i64,
        video_ids: &[i64],
    ) -> Result<Vec<i64>, sqlx::Error> {
        viewer_repo::bookmarked_video_ids(&self.pool, viewer_id, video_ids).await
    }

    async fn followed_owner_ids(
        &self,
        viewer_id: i64,
        owner_ids: &[i64],
    ) -> Result<Vec<i64>, sqlx::Error> {
        viewer_repo::followed_owner_ids(&self.pool, viewer_id, owner_ids).await
    }

    async fn following_rows(
        &self,
        viewer_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FeedVideoRow>, sqlx::Error> {
        video_repo::following_rows(&self.pool, viewer_id, limit, offset).await
    }

    async fn count_following(&self, viewer_id: i64) -> Result<i64, sqlx::Error> {
        video_repo::count_following(&self.pool, viewer_id).await
    }
}

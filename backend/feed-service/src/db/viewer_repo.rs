//! Batched viewer-relation lookups for the overlay step.
//!
//! Each function answers one question for a whole page of items in a single
//! query. The overlay must never loop one-query-per-item; three round trips
//! is the ceiling for a page regardless of its size.
use sqlx::{PgPool, Row};

/// Ids among `video_ids` the viewer has liked.
pub async fn liked_video_ids(
    pool: &PgPool,
    viewer_id: i64,
    video_ids: &[i64],
) -> Result<Vec<i64>, sqlx::Error> {
    if video_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query(
        r#"
        SELECT video_id
        FROM likes
        WHERE user_id = $1 AND video_id = ANY($2)
        "#,
    )
    .bind(viewer_id)
    .bind(video_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|r| r.get::<i64, _>("video_id")).collect())
}

/// Ids among `video_ids` the viewer has bookmarked.
pub async fn bookmarked_video_ids(
    pool: &PgPool,
    viewer_id: i64,
    video_ids: &[i64],
) -> Result<Vec<i64>, sqlx::Error> {
    if video_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query(
        r#"
        SELECT video_id
        FROM bookmarks
        WHERE user_id = $1 AND video_id = ANY($2)
        "#,
    )
    .bind(viewer_id)
    .bind(video_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|r| r.get::<i64, _>("video_id")).collect())
}

/// Owner ids among `owner_ids` the viewer follows.
pub async fn followed_owner_ids(
    pool: &PgPool,
    viewer_id: i64,
    owner_ids: &[i64],
) -> Result<Vec<i64>, sqlx::Error> {
    if owner_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query(
        r#"
        SELECT following_id
        FROM follows
        WHERE follower_id = $1 AND following_id = ANY($2)
        "#,
    )
    .bind(viewer_id)
    .bind(owner_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| r.get::<i64, _>("following_id"))
        .collect())
}

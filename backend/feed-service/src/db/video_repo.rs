use crate::models::{FeedCandidate, FeedVideoRow, Video};
use sqlx::{PgPool, Row};

/// Fetch every feed-eligible video with its current engagement counters.
///
/// Counters are derived at read time from the engagement tables, never
/// stored on the video row; the recency term is computed by the caller from
/// `created_at` and an injected clock.
pub async fn published_candidates(pool: &PgPool) -> Result<Vec<FeedCandidate>, sqlx::Error> {
    let candidates = sqlx::query_as::<_, FeedCandidate>(
        r#"
        SELECT
            v.id,
            v.created_at,
            (SELECT COUNT(*) FROM likes l WHERE l.video_id = v.id) AS likes,
            (SELECT COUNT(*) FROM comments c WHERE c.video_id = v.id) AS comments,
            (SELECT COUNT(*) FROM views w WHERE w.video_id = v.id) AS views
        FROM videos v
        WHERE v.status = 'published'
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(candidates)
}

/// Resolve full display rows for a page of video ids, preserving the ranked
/// order of `ids`. Counters are read fresh so displayed counts track current
/// state even when the cached ordering is stale.
pub async fn find_page_rows(pool: &PgPool, ids: &[i64]) -> Result<Vec<FeedVideoRow>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, FeedVideoRow>(
        r#"
        SELECT
            v.id,
            v.user_id,
            u.name AS owner_name,
            u.avatar_url AS owner_avatar_url,
            v.video_url,
            v.thumbnail_url,
            v.caption,
            v.created_at,
            (SELECT COUNT(*) FROM likes l WHERE l.video_id = v.id) AS likes_count,
            (SELECT COUNT(*) FROM comments c WHERE c.video_id = v.id) AS comments_count,
            (SELECT COUNT(*) FROM views w WHERE w.video_id = v.id) AS views_count
        FROM videos v
        JOIN users u ON u.id = v.user_id
        WHERE v.id = ANY($1)
        ORDER BY array_position($1, v.id)
        "#,
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Find a video by id.
pub async fn find_video(pool: &PgPool, video_id: i64) -> Result<Option<Video>, sqlx::Error> {
    let video = sqlx::query_as::<_, Video>(
        r#"
        SELECT id, user_id, video_url, thumbnail_url, caption, status, created_at
        FROM videos
        WHERE id = $1
        "#,
    )
    .bind(video_id)
    .fetch_optional(pool)
    .await?;

    Ok(video)
}

/// Create a new video row.
pub async fn create_video(
    pool: &PgPool,
    user_id: i64,
    video_url: &str,
    thumbnail_url: &str,
    caption: Option<&str>,
    status: &str,
) -> Result<Video, sqlx::Error> {
    let video = sqlx::query_as::<_, Video>(
        r#"
        INSERT INTO videos (user_id, video_url, thumbnail_url, caption, status)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, user_id, video_url, thumbnail_url, caption, status, created_at
        "#,
    )
    .bind(user_id)
    .bind(video_url)
    .bind(thumbnail_url)
    .bind(caption)
    .bind(status)
    .fetch_one(pool)
    .await?;

    Ok(video)
}

/// Delete a video. Engagement rows cascade via foreign keys.
/// Returns true if a row was deleted.
pub async fn delete_video(pool: &PgPool, video_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM videos WHERE id = $1")
        .bind(video_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Update a video's moderation status. Returns the updated row if it exists.
pub async fn update_status(
    pool: &PgPool,
    video_id: i64,
    status: &str,
) -> Result<Option<Video>, sqlx::Error> {
    let video = sqlx::query_as::<_, Video>(
        r#"
        UPDATE videos
        SET status = $2
        WHERE id = $1
        RETURNING id, user_id, video_url, thumbnail_url, caption, status, created_at
        "#,
    )
    .bind(video_id)
    .bind(status)
    .fetch_optional(pool)
    .await?;

    Ok(video)
}

/// Recency-ordered published videos from owners the viewer follows.
pub async fn following_rows(
    pool: &PgPool,
    viewer_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<FeedVideoRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, FeedVideoRow>(
        r#"
        SELECT
            v.id,
            v.user_id,
            u.name AS owner_name,
            u.avatar_url AS owner_avatar_url,
            v.video_url,
            v.thumbnail_url,
            v.caption,
            v.created_at,
            (SELECT COUNT(*) FROM likes l WHERE l.video_id = v.id) AS likes_count,
            (SELECT COUNT(*) FROM comments c WHERE c.video_id = v.id) AS comments_count,
            (SELECT COUNT(*) FROM views w WHERE w.video_id = v.id) AS views_count
        FROM videos v
        JOIN users u ON u.id = v.user_id
        JOIN follows f ON f.following_id = v.user_id
        WHERE f.follower_id = $1 AND v.status = 'published'
        ORDER BY v.created_at DESC, v.id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(viewer_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Count published videos from owners the viewer follows.
pub async fn count_following(pool: &PgPool, viewer_id: i64) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS count
        FROM videos v
        JOIN follows f ON f.following_id = v.user_id
        WHERE f.follower_id = $1 AND v.status = 'published'
        "#,
    )
    .bind(viewer_id)
    .fetch_one(pool)
    .await?;

    Ok(row.get::<i64, _>("count"))
}

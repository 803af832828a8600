use crate::models::Comment;
use sqlx::PgPool;

/// Record a like. Idempotent: returns true only when a new row was inserted.
pub async fn create_like(pool: &PgPool, video_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO likes (video_id, user_id)
        VALUES ($1, $2)
        ON CONFLICT (video_id, user_id) DO NOTHING
        "#,
    )
    .bind(video_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Remove a like. Returns true if a row was deleted.
pub async fn delete_like(pool: &PgPool, video_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM likes
        WHERE video_id = $1 AND user_id = $2
        "#,
    )
    .bind(video_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Create a new comment on a video.
pub async fn create_comment(
    pool: &PgPool,
    video_id: i64,
    user_id: i64,
    content: &str,
) -> Result<Comment, sqlx::Error> {
    let comment = sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (video_id, user_id, content)
        VALUES ($1, $2, $3)
        RETURNING id, video_id, user_id, content, created_at
        "#,
    )
    .bind(video_id)
    .bind(user_id)
    .bind(content)
    .fetch_one(pool)
    .await?;

    Ok(comment)
}

/// Delete a comment the user owns. Returns true if a row was deleted.
pub async fn delete_comment(
    pool: &PgPool,
    comment_id: i64,
    video_id: i64,
    user_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM comments
        WHERE id = $1 AND video_id = $2 AND user_id = $3
        "#,
    )
    .bind(comment_id)
    .bind(video_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// List comments for a video, newest first.
pub async fn list_comments(
    pool: &PgPool,
    video_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<Comment>, sqlx::Error> {
    let comments = sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, video_id, user_id, content, created_at
        FROM comments
        WHERE video_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(video_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(comments)
}

/// Record a view. Anonymous viewers are allowed.
pub async fn record_view(
    pool: &PgPool,
    video_id: i64,
    user_id: Option<i64>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO views (video_id, user_id)
        VALUES ($1, $2)
        "#,
    )
    .bind(video_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

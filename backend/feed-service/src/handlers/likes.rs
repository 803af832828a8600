/// Like handlers. Likes carry the highest ranking weight, so both like and
/// unlike sweep the feed cache after their own write commits.
use actix_web::{web, HttpResponse};
use sqlx::PgPool;

use crate::db::{engagement_repo, video_repo};
use crate::error::{AppError, Result};
use crate::handlers::FeedHandlerState;
use crate::middleware::RequiredViewer;

/// `POST /videos/{id}/like`
pub async fn like_video(
    pool: web::Data<PgPool>,
    state: web::Data<FeedHandlerState>,
    viewer: RequiredViewer,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let video_id = path.into_inner();

    video_repo::find_video(&pool, video_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;

    let inserted = engagement_repo::create_like(&pool, video_id, viewer.0).await?;
    if inserted {
        state.feed.invalidate().await;
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "liked": true })))
}

/// `DELETE /videos/{id}/like`
pub async fn unlike_video(
    pool: web::Data<PgPool>,
    state: web::Data<FeedHandlerState>,
    viewer: RequiredViewer,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let video_id = path.into_inner();

    let deleted = engagement_repo::delete_like(&pool, video_id, viewer.0).await?;
    if deleted {
        state.feed.invalidate().await;
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "liked": false })))
}

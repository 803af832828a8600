/// Video handlers - create, delete, and view recording.
///
/// Media files are uploaded out of band; requests carry already-hosted URLs.
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

use crate::db::{engagement_repo, video_repo};
use crate::error::{AppError, Result};
use crate::handlers::FeedHandlerState;
use crate::middleware::{RequiredViewer, Viewer};
use crate::models::VideoStatus;

const MAX_CAPTION_LEN: usize = 2200;

#[derive(Debug, Deserialize)]
pub struct CreateVideoRequest {
    pub video_url: String,
    pub thumbnail_url: String,
    pub caption: Option<String>,
}

/// Create a new video. Published immediately; moderation can reject later.
pub async fn create_video(
    pool: web::Data<PgPool>,
    state: web::Data<FeedHandlerState>,
    viewer: RequiredViewer,
    req: web::Json<CreateVideoRequest>,
) -> Result<HttpResponse> {
    if req.video_url.trim().is_empty() || req.thumbnail_url.trim().is_empty() {
        return Err(AppError::ValidationError(
            "video_url and thumbnail_url are required".to_string(),
        ));
    }
    if let Some(caption) = &req.caption {
        if caption.chars().count() > MAX_CAPTION_LEN {
            return Err(AppError::ValidationError(format!(
                "caption exceeds {} characters",
                MAX_CAPTION_LEN
            )));
        }
    }

    let video = video_repo::create_video(
        &pool,
        viewer.0,
        req.video_url.trim(),
        req.thumbnail_url.trim(),
        req.caption.as_deref(),
        VideoStatus::Published.as_str(),
    )
    .await?;

    // A new eligible item shifts the ranking: sweep cached pages after commit.
    state.feed.invalidate().await;

    Ok(HttpResponse::Created().json(video))
}

/// Delete a video. Only the owner may delete; engagement rows cascade.
pub async fn delete_video(
    pool: web::Data<PgPool>,
    state: web::Data<FeedHandlerState>,
    viewer: RequiredViewer,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let video_id = path.into_inner();

    let video = video_repo::find_video(&pool, video_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;

    if video.user_id != viewer.0 {
        return Err(AppError::Forbidden(
            "Only the owner can delete this video".to_string(),
        ));
    }

    video_repo::delete_video(&pool, video_id).await?;
    state.feed.invalidate().await;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "deleted": true })))
}

/// Record a view. Anonymous viewers allowed. Views feed the score but do
/// not trigger invalidation; they are far too frequent to sweep the cache
/// on every one, and the TTL bounds the resulting staleness.
pub async fn record_view(
    pool: web::Data<PgPool>,
    viewer: Viewer,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let video_id = path.into_inner();

    video_repo::find_video(&pool, video_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;

    engagement_repo::record_view(&pool, video_id, viewer.0).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "recorded": true })))
}

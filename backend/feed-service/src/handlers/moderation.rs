/// Moderation handlers.
///
/// The review workflow itself lives in the admin surface; this endpoint is
/// the commit point that flips feed eligibility, so it must sweep the cache.
/// The gateway restricts it to moderator roles.
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;

use crate::db::video_repo;
use crate::error::{AppError, Result};
use crate::handlers::FeedHandlerState;
use crate::middleware::RequiredViewer;
use crate::models::VideoStatus;

#[derive(Debug, Deserialize)]
pub struct ModerationRequest {
    pub action: String,
}

/// `PATCH /moderation/videos/{id}` with `{ "action": "approve" | "reject" }`
pub async fn moderate_video(
    pool: web::Data<PgPool>,
    state: web::Data<FeedHandlerState>,
    moderator: RequiredViewer,
    path: web::Path<i64>,
    req: web::Json<ModerationRequest>,
) -> Result<HttpResponse> {
    let video_id = path.into_inner();

    let status = match req.action.as_str() {
        "approve" => VideoStatus::Published,
        "reject" => VideoStatus::Rejected,
        other => {
            return Err(AppError::ValidationError(format!(
                "unknown moderation action: {}",
                other
            )))
        }
    };

    let video = video_repo::update_status(&pool, video_id, status.as_str())
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;

    info!(
        "Video {} {} by moderator {}",
        video_id, status, moderator.0
    );

    state.feed.invalidate().await;

    Ok(HttpResponse::Ok().json(video))
}

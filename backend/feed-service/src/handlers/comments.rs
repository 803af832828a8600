/// Comment handlers.
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

use crate::db::{engagement_repo, video_repo};
use crate::error::{AppError, Result};
use crate::handlers::FeedHandlerState;
use crate::middleware::RequiredViewer;

const MAX_COMMENT_LEN: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ListCommentsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

/// `POST /videos/{id}/comments`
pub async fn create_comment(
    pool: web::Data<PgPool>,
    state: web::Data<FeedHandlerState>,
    viewer: RequiredViewer,
    path: web::Path<i64>,
    req: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse> {
    let video_id = path.into_inner();
    let content = req.content.trim();

    if content.is_empty() {
        return Err(AppError::ValidationError(
            "comment content must not be empty".to_string(),
        ));
    }
    if content.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::ValidationError(format!(
            "comment exceeds {} characters",
            MAX_COMMENT_LEN
        )));
    }

    video_repo::find_video(&pool, video_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;

    let comment = engagement_repo::create_comment(&pool, video_id, viewer.0, content).await?;
    state.feed.invalidate().await;

    Ok(HttpResponse::Created().json(comment))
}

/// `DELETE /videos/{id}/comments/{comment_id}`
pub async fn delete_comment(
    pool: web::Data<PgPool>,
    state: web::Data<FeedHandlerState>,
    viewer: RequiredViewer,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    let (video_id, comment_id) = path.into_inner();

    let deleted = engagement_repo::delete_comment(&pool, comment_id, video_id, viewer.0).await?;
    if !deleted {
        return Err(AppError::NotFound("Comment not found".to_string()));
    }

    state.feed.invalidate().await;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "deleted": true })))
}

/// `GET /videos/{id}/comments`
pub async fn list_comments(
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    query: web::Query<ListCommentsQuery>,
) -> Result<HttpResponse> {
    let video_id = path.into_inner();
    let limit = query.limit.clamp(1, 100);
    let offset = query.offset.max(0);

    let comments = engagement_repo::list_comments(&pool, video_id, limit, offset).await?;

    Ok(HttpResponse::Ok().json(comments))
}

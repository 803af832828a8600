use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::middleware::{RequiredViewer, Viewer};
use crate::services::FeedService;

#[derive(Debug, Deserialize)]
pub struct FeedQueryParams {
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

pub struct FeedHandlerState {
    pub feed: Arc<FeedService>,
}

/// `GET /feed?page=N` - the ranked, cached feed.
pub async fn get_feed(
    query: web::Query<FeedQueryParams>,
    viewer: Viewer,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    debug!("Feed request: page={} viewer={:?}", query.page, viewer.0);

    let response = state.feed.get_page(query.page, viewer.0).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// `GET /feed/following?page=N` - recency feed of followed owners.
pub async fn get_following_feed(
    query: web::Query<FeedQueryParams>,
    viewer: RequiredViewer,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    debug!(
        "Following feed request: page={} viewer={}",
        query.page, viewer.0
    );

    let response = state.feed.following_page(query.page, viewer.0).await?;
    Ok(HttpResponse::Ok().json(response))
}

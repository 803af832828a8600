/// Data models for feed-service
///
/// - `Video`: a feed-eligible content unit and its moderation status
/// - `FeedPage`: the immutable, viewer-agnostic cached unit
/// - `FeedItem` / `FeedResponse`: the HTTP response shape
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Moderation status of a video. Only `Published` videos are feed-eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Pending,
    Published,
    Rejected,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Published => "published",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for VideoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "published" => Ok(Self::Published),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown video status: {}", other)),
        }
    }
}

impl std::fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A video row as stored, without derived counters.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Video {
    pub id: i64,
    pub user_id: i64,
    pub video_url: String,
    pub thumbnail_url: String,
    pub caption: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// A comment on a video.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub video_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Ranking candidate: identifier, age source, and current engagement
/// counters read from the engagement store at score time.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedCandidate {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub likes: i64,
    pub comments: i64,
    pub views: i64,
}

/// The cached unit: one computed, ordered page of video identifiers.
///
/// A `FeedPage` is immutable once cached. Stale pages are evicted and
/// recomputed, never patched in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage {
    pub page: u32,
    pub per_page: u32,
    pub video_ids: Vec<i64>,
    /// Count of all feed-eligible videos at computation time
    pub total: i64,
    pub computed_at: DateTime<Utc>,
}

/// Display row for one feed item: denormalized owner fields plus counters
/// resolved fresh at read time.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedVideoRow {
    pub id: i64,
    pub user_id: i64,
    pub owner_name: String,
    pub owner_avatar_url: Option<String>,
    pub video_url: String,
    pub thumbnail_url: String,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub views_count: i64,
}

/// Owner display fields embedded in a feed item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItemOwner {
    pub id: i64,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// One item of a feed response, with viewer-specific flags overlaid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: i64,
    pub user_id: i64,
    pub owner: FeedItemOwner,
    pub video_url: String,
    pub thumbnail_url: String,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub views_count: i64,
    pub is_liked: bool,
    pub is_bookmarked: bool,
    pub is_following: bool,
}

/// Paginated feed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedResponse {
    pub data: Vec<FeedItem>,
    pub current_page: u32,
    pub per_page: u32,
    pub total: i64,
    pub last_page: u32,
}

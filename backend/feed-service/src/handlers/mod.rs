//! HTTP request handlers for feed-service.

pub mod comments;
pub mod feed;
pub mod likes;
pub mod moderation;
pub mod videos;

pub use feed::{get_feed, get_following_feed, FeedHandlerState};

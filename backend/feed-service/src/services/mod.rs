pub mod feed;
pub mod scoring;

pub use feed::{apply_overlay, FeedService, ViewerFlags};
pub use scoring::{rank, score, ScoredVideo};

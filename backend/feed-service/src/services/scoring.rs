/// Feed score calculator.
///
/// Pure functions over `(counters, created_at, now)` with an injected clock;
/// recency is computed in the application layer so ranking stays independent
/// of any store's date-arithmetic dialect and unit-testable without a
/// database.
///
/// Score = likes*3 + comments*2 + views*0.5 + recency_boost
/// recency_boost = max(0, ceiling - age_in_hours), age truncated to hours.
use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::FeedCandidate;

pub const LIKE_WEIGHT: f64 = 3.0;
pub const COMMENT_WEIGHT: f64 = 2.0;
pub const VIEW_WEIGHT: f64 = 0.5;

/// A candidate with its computed ranking score. Ephemeral: produced per
/// computation, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredVideo {
    pub id: i64,
    pub score: f64,
}

/// Recency bonus for an item of the given age.
///
/// Items younger than one hour get the full ceiling; items older than
/// `ceiling_hours` get zero. Never negative. A `created_at` in the future
/// (clock skew between writers) is clamped to the ceiling as well.
pub fn recency_boost(created_at: DateTime<Utc>, now: DateTime<Utc>, ceiling_hours: i64) -> f64 {
    // A misconfigured negative ceiling means no boost, not a panic inside
    // clamp (which requires min <= max).
    let ceiling = ceiling_hours.max(0);
    let age_hours = (now - created_at).num_hours();
    (ceiling - age_hours).clamp(0, ceiling) as f64
}

/// Ranking score for one candidate. Deterministic for fixed inputs.
pub fn score(candidate: &FeedCandidate, now: DateTime<Utc>, ceiling_hours: i64) -> Result<f64> {
    // Counters come from the engagement store as COUNT(*) results; anything
    // negative means the store handed us garbage. A wrong score silently
    // cached would corrupt every reader's view for a full TTL window, so
    // abort loudly instead of clamping.
    if candidate.likes < 0 || candidate.comments < 0 || candidate.views < 0 {
        return Err(AppError::Internal(format!(
            "malformed engagement counters for video {}: likes={} comments={} views={}",
            candidate.id, candidate.likes, candidate.comments, candidate.views
        )));
    }

    let engagement = candidate.likes as f64 * LIKE_WEIGHT
        + candidate.comments as f64 * COMMENT_WEIGHT
        + candidate.views as f64 * VIEW_WEIGHT;

    Ok(engagement + recency_boost(candidate.created_at, now, ceiling_hours))
}

/// Score and sort candidates: descending by score, ties broken by id
/// descending (newest-inserted-first). The tie break keeps pagination
/// repeatable across recomputations within a TTL window.
pub fn rank(
    candidates: Vec<FeedCandidate>,
    now: DateTime<Utc>,
    ceiling_hours: i64,
) -> Result<Vec<ScoredVideo>> {
    let mut ranked = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        ranked.push(ScoredVideo {
            id: candidate.id,
            score: score(candidate, now, ceiling_hours)?,
        });
    }

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.id.cmp(&a.id))
    });

    Ok(ranked)
}

/// Slice one page window (1-based page number) out of a ranked id list.
pub fn page_window(ids: &[i64], page: u32, per_page: u32) -> Vec<i64> {
    let start = (page.saturating_sub(1) as usize).saturating_mul(per_page as usize);
    if start >= ids.len() {
        return Vec::new();
    }
    let end = (start + per_page as usize).min(ids.len());
    ids[start..end].to_vec()
}

/// Number of pages needed to show `total` items, at least 1.
pub fn last_page(total: i64, per_page: u32) -> u32 {
    if total <= 0 || per_page == 0 {
        return 1;
    }
    ((total as u64).div_ceil(per_page as u64)).max(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const CEILING: i64 = 100;

    fn candidate(id: i64, age_hours: i64, likes: i64, comments: i64, views: i64) -> FeedCandidate {
        FeedCandidate {
            id,
            created_at: Utc::now() - Duration::hours(age_hours),
            likes,
            comments,
            views,
        }
    }

    #[test]
    fn test_old_item_scores_engagement_only() {
        // 200h old, 10 likes, 5 comments, 20 views -> 30 + 10 + 10 + 0 = 50
        let c = candidate(1, 200, 10, 5, 20);
        assert_eq!(score(&c, Utc::now(), CEILING).unwrap(), 50.0);
    }

    #[test]
    fn test_fresh_item_gets_full_ceiling() {
        // 30 minutes old with zero engagement -> recency boost alone = 100
        let now = Utc::now();
        let c = FeedCandidate {
            id: 2,
            created_at: now - Duration::minutes(30),
            likes: 0,
            comments: 0,
            views: 0,
        };
        assert_eq!(score(&c, now, CEILING).unwrap(), 100.0);
    }

    #[test]
    fn test_fresh_zero_engagement_outranks_old_popular() {
        let now = Utc::now();
        let old_popular = candidate(1, 200, 10, 5, 20);
        let fresh = FeedCandidate {
            id: 2,
            created_at: now - Duration::minutes(30),
            likes: 0,
            comments: 0,
            views: 0,
        };
        let ranked = rank(vec![old_popular, fresh], now, CEILING).unwrap();
        assert_eq!(ranked[0].id, 2);
        assert_eq!(ranked[1].id, 1);
    }

    #[test]
    fn test_recency_boost_edges() {
        let now = Utc::now();
        // under one hour: full ceiling
        assert_eq!(recency_boost(now - Duration::minutes(59), now, CEILING), 100.0);
        // exactly at the ceiling age and beyond: floor at zero, never negative
        assert_eq!(recency_boost(now - Duration::hours(100), now, CEILING), 0.0);
        assert_eq!(recency_boost(now - Duration::hours(5000), now, CEILING), 0.0);
        // truncation to whole hours: 1h30m counts as 1h
        assert_eq!(recency_boost(now - Duration::minutes(90), now, CEILING), 99.0);
        // future created_at clamps to the ceiling
        assert_eq!(recency_boost(now + Duration::hours(3), now, CEILING), 100.0);
    }

    #[test]
    fn test_negative_ceiling_yields_zero_boost() {
        let now = Utc::now();
        assert_eq!(recency_boost(now, now, -5), 0.0);
        let c = candidate(1, 0, 2, 0, 0);
        assert_eq!(score(&c, now, -5).unwrap(), 6.0);
    }

    #[test]
    fn test_score_deterministic() {
        let now = Utc::now();
        let c = candidate(7, 42, 3, 1, 9);
        let a = score(&c, now, CEILING).unwrap();
        let b = score(&c, now, CEILING).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_score_monotonic_in_age() {
        let now = Utc::now();
        let mut previous = f64::INFINITY;
        for age in [0, 1, 10, 50, 99, 100, 150, 500] {
            let c = candidate(1, age, 4, 2, 10);
            let s = score(&c, now, CEILING).unwrap();
            assert!(s <= previous, "score must not increase with age");
            assert!(s >= 0.0, "score must never be negative");
            previous = s;
        }
    }

    #[test]
    fn test_tie_break_id_descending() {
        let now = Utc::now();
        // identical counters and identical (truncated) age -> identical score
        let a = candidate(10, 300, 2, 2, 2);
        let b = candidate(25, 300, 2, 2, 2);
        let ranked = rank(vec![a.clone(), b.clone()], now, CEILING).unwrap();
        assert_eq!(ranked[0].id, 25);
        assert_eq!(ranked[1].id, 10);

        // stable across repeated computation regardless of input order
        let again = rank(vec![b, a], now, CEILING).unwrap();
        assert_eq!(again[0].id, 25);
        assert_eq!(again[1].id, 10);
    }

    #[test]
    fn test_malformed_counters_abort() {
        let mut c = candidate(3, 10, 1, 1, 1);
        c.views = -1;
        assert!(score(&c, Utc::now(), CEILING).is_err());
        assert!(rank(vec![c], Utc::now(), CEILING).is_err());
    }

    #[test]
    fn test_page_window() {
        let ids: Vec<i64> = (1..=45).rev().collect();
        assert_eq!(page_window(&ids, 1, 20).len(), 20);
        assert_eq!(page_window(&ids, 3, 20).len(), 5);
        assert!(page_window(&ids, 4, 20).is_empty());
        assert_eq!(page_window(&ids, 1, 20)[0], 45);
        assert_eq!(page_window(&ids, 2, 20)[0], 25);
    }

    #[test]
    fn test_pagination_exhaustive_and_non_overlapping() {
        let ids: Vec<i64> = (1..=103).rev().collect();
        let per_page = 20;
        let pages = last_page(ids.len() as i64, per_page);
        assert_eq!(pages, 6);

        let mut seen = Vec::new();
        for page in 1..=pages {
            seen.extend(page_window(&ids, page, per_page));
        }
        assert_eq!(seen, ids);
    }

    #[test]
    fn test_last_page() {
        assert_eq!(last_page(0, 20), 1);
        assert_eq!(last_page(20, 20), 1);
        assert_eq!(last_page(21, 20), 2);
        assert_eq!(last_page(400, 20), 20);
    }
}

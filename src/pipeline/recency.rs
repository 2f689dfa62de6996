//! Drops articles older than a section's recency horizon.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::article::Article;
use crate::TARGET_RANK;

/// Keep only articles whose age is within `horizon_hours` of `now`.
///
/// Articles with a missing or unparseable publication date are treated as
/// maximally old and excluded; a malformed timestamp must never win a
/// freshness-weighted ranking.
pub fn filter_recent(
    articles: Vec<Article>,
    horizon_hours: u32,
    now: DateTime<Utc>,
) -> Vec<Article> {
    let horizon_minutes = horizon_hours as f64 * 60.0;
    let before = articles.len();
    let kept: Vec<Article> = articles
        .into_iter()
        .filter(|article| {
            matches!(article.age_minutes(now), Some(age) if age <= horizon_minutes)
        })
        .collect();
    if kept.len() < before {
        debug!(target: TARGET_RANK, "Recency filter dropped {} of {} articles", before - kept.len(), before);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::tests::test_article;
    use chrono::Duration;

    #[test]
    fn keeps_fresh_drops_old_and_undated() {
        let now = Utc::now();
        let mut fresh = test_article("fresh");
        fresh.published_at = Some(now - Duration::minutes(1));
        let mut stale = test_article("stale");
        stale.published_at = Some(now - Duration::hours(13));
        let undated = test_article("undated");

        let kept = filter_recent(vec![fresh, stale, undated], 12, now);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "fresh");
    }

    #[test]
    fn boundary_article_is_kept() {
        let now = Utc::now();
        let mut edge = test_article("edge");
        edge.published_at = Some(now - Duration::hours(12));
        assert_eq!(filter_recent(vec![edge], 12, now).len(), 1);
    }

    #[test]
    fn future_dated_articles_are_kept() {
        let now = Utc::now();
        let mut future = test_article("future");
        future.published_at = Some(now + Duration::minutes(5));
        assert_eq!(filter_recent(vec![future], 12, now).len(), 1);
    }
}

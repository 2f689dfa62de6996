//! Weighted-sum scoring, bounded rating and tag derivation.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

use crate::article::{Article, Tag};
use crate::config::SectionConfig;
use crate::environment::get_env_var_as_f64;
use crate::TARGET_RANK;

// Deployment-tunable scoring constants, read once.
static FRESHNESS_TAU_MINUTES: Lazy<f64> =
    Lazy::new(|| get_env_var_as_f64("NEWSDESK_FRESHNESS_TAU_MINUTES", 90.0));
static VOLUME_SATURATION: Lazy<f64> =
    Lazy::new(|| get_env_var_as_f64("NEWSDESK_VOLUME_SATURATION", 1000.0));
static ENGAGEMENT_LOG_MAX: Lazy<f64> =
    Lazy::new(|| get_env_var_as_f64("NEWSDESK_ENGAGEMENT_LOG_MAX", 6.0));

const RATING_SCALE: f64 = 4.0;
const RATING_OFFSET: f64 = 1.0;
const TRENDING_THRESHOLD: f64 = 0.75;

const TRUST_MAX: f64 = 10.0;
const DEFAULT_TRUST: f64 = 2.0;

static TRUST_TABLE: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("reuters.com", 10.0),
        ("apnews.com", 10.0),
        ("bbc.co.uk", 9.0),
        ("bbc.com", 9.0),
        ("nytimes.com", 8.0),
        ("theguardian.com", 8.0),
        ("wsj.com", 8.0),
        ("bloomberg.com", 8.0),
        ("yna.co.kr", 8.0),
        ("nhk.or.jp", 8.0),
        ("aljazeera.com", 7.0),
        ("cnn.com", 6.0),
        ("techcrunch.com", 6.0),
        ("theverge.com", 6.0),
        ("youtube.com", 4.0),
        ("reddit.com", 3.0),
    ])
});

const BREAKING_KEYWORDS: [&str; 3] = ["breaking", "속보", "速報"];
const URGENT_KEYWORDS: [&str; 3] = ["urgent", "긴급", "緊急"];

/// Score, rate and tag each article for `section`, returning them sorted
/// descending by score.
///
/// Ties break by more-recent publication date, then by insertion order, so
/// ranking is deterministic for identical inputs.
pub fn rank(section: &SectionConfig, mut articles: Vec<Article>, now: DateTime<Utc>) -> Vec<Article> {
    let weights = &section.weights;
    let mut domain_seen: HashMap<String, u32> = HashMap::new();

    for article in articles.iter_mut() {
        let freshness = article
            .age_minutes(now)
            .map(|age| (-age.max(0.0) / *FRESHNESS_TAU_MINUTES).exp())
            .unwrap_or(0.0);
        let reactions = article.engagement.reactions as f64;
        let volume = (reactions / *VOLUME_SATURATION).min(1.0);
        let engagement = ((reactions + 1.0).log10() / *ENGAGEMENT_LOG_MAX).min(1.0);
        let trust = TRUST_TABLE
            .get(article.source_domain.as_str())
            .copied()
            .unwrap_or(DEFAULT_TRUST)
            / TRUST_MAX;
        let seen = domain_seen.entry(article.source_domain.clone()).or_insert(0);
        let diversity = 1.0 / (1.0 + *seen as f64);
        *seen += 1;
        let language = match section.language {
            Some(preferred) if preferred == article.language => 1.0,
            _ => 0.0,
        };

        article.score = weights.freshness * freshness
            + weights.volume * volume
            + weights.engagement * engagement
            + weights.source_trust * trust
            + weights.diversity * diversity
            + weights.language * language;
        article.rating = derive_rating(article.score);
        article.tags = derive_tags(&article.title, article.score);
        article.section = section.name.clone();
    }

    // Stable sort keeps insertion order for full ties.
    articles.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.published_at.cmp(&a.published_at))
    });

    debug!(target: TARGET_RANK, "Ranked {} articles for section {}", articles.len(), section.name);
    articles
}

/// Compress a raw score onto the user-facing [1.0, 5.0] scale, one decimal.
fn derive_rating(score: f64) -> f64 {
    ((score * RATING_SCALE + RATING_OFFSET).clamp(1.0, 5.0) * 10.0).round() / 10.0
}

/// Closed tag rule set: keyword presence per supported language, plus a score
/// threshold for trending. At most two tags per article.
fn derive_tags(title: &str, score: f64) -> Vec<Tag> {
    let lower = title.to_lowercase();
    let mut tags = Vec::new();
    if BREAKING_KEYWORDS.iter().any(|k| lower.contains(k)) {
        tags.push(Tag::Breaking);
    }
    if URGENT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        tags.push(Tag::Urgent);
    }
    if score >= TRENDING_THRESHOLD {
        tags.push(Tag::Trending);
    }
    tags.truncate(2);
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::tests::test_article;
    use crate::article::{Engagement, Language};
    use chrono::Duration;

    fn section() -> SectionConfig {
        SectionConfig {
            name: "world".to_string(),
            ..SectionConfig::default()
        }
    }

    #[test]
    fn ranking_is_deterministic() {
        let now = Utc::now();
        let mut articles = Vec::new();
        for i in 0..5 {
            let mut a = test_article(&format!("a{}", i));
            a.published_at = Some(now - Duration::minutes(i * 17));
            a.engagement = Engagement {
                reactions: (i * 120) as u64,
                followers: 0,
            };
            articles.push(a);
        }
        let first = rank(&section(), articles.clone(), now);
        let second = rank(&section(), articles, now);
        let order = |r: &[Article]| r.iter().map(|a| a.id.clone()).collect::<Vec<_>>();
        assert_eq!(order(&first), order(&second));
    }

    #[test]
    fn rating_stays_within_bounds() {
        let now = Utc::now();
        let mut hot = test_article("hot");
        hot.published_at = Some(now);
        hot.engagement = Engagement {
            reactions: 1_000_000,
            followers: 0,
        };
        hot.source_domain = "reuters.com".to_string();
        let cold = test_article("cold");

        for article in rank(&section(), vec![hot, cold], now) {
            assert!(article.rating >= 1.0 && article.rating <= 5.0);
            // one decimal place
            let tenths = article.rating * 10.0;
            assert!((tenths - tenths.round()).abs() < 1e-9);
        }
    }

    #[test]
    fn fresher_article_outranks_older_one() {
        let now = Utc::now();
        let mut fresh = test_article("fresh");
        fresh.published_at = Some(now - Duration::minutes(5));
        let mut old = test_article("old");
        old.published_at = Some(now - Duration::hours(10));

        let ranked = rank(&section(), vec![old, fresh], now);
        assert_eq!(ranked[0].id, "fresh");
    }

    #[test]
    fn score_ties_break_by_publication_date() {
        // Same domain and engagement; give the later-inserted article a newer
        // date but force identical scores by zeroing every date-sensitive weight.
        let mut cfg = section();
        cfg.weights.freshness = 0.0;
        cfg.weights.diversity = 0.0;
        let now = Utc::now();
        let mut older = test_article("older");
        older.published_at = Some(now - Duration::hours(2));
        let mut newer = test_article("newer");
        newer.published_at = Some(now - Duration::hours(1));

        let ranked = rank(&cfg, vec![older, newer], now);
        assert_eq!(ranked[0].id, "newer");
    }

    #[test]
    fn breaking_keywords_tag_in_each_language() {
        for title in ["BREAKING: something", "속보 - 테스트", "【速報】テスト"] {
            let mut a = test_article("a");
            a.title = title.to_string();
            let ranked = rank(&section(), vec![a], Utc::now());
            assert!(ranked[0].tags.contains(&Tag::Breaking), "title: {}", title);
        }
    }

    #[test]
    fn tags_are_capped_at_two() {
        let mut cfg = section();
        cfg.weights.freshness = 3.0; // push score over the trending threshold
        let now = Utc::now();
        let mut a = test_article("a");
        a.title = "Breaking urgent situation".to_string();
        a.published_at = Some(now);
        let ranked = rank(&cfg, vec![a], now);
        assert_eq!(ranked[0].tags, vec![Tag::Breaking, Tag::Urgent]);
    }

    #[test]
    fn language_component_rewards_preferred_language() {
        let mut cfg = section();
        cfg.language = Some(Language::Ko);
        cfg.weights = crate::config::RankWeights {
            freshness: 0.0,
            volume: 0.0,
            engagement: 0.0,
            source_trust: 0.0,
            diversity: 0.0,
            language: 1.0,
        };
        let mut korean = test_article("ko");
        korean.language = Language::Ko;
        korean.source_domain = "a.com".to_string();
        let mut english = test_article("en");
        english.source_domain = "b.com".to_string();

        let ranked = rank(&cfg, vec![english, korean], Utc::now());
        assert_eq!(ranked[0].id, "ko");
        assert!(ranked[0].score > ranked[1].score);
    }
}

//! Maps provider-native items into the canonical [`Article`] shape.
//!
//! Each provider is a closed variant of [`RawItem`]; adding a provider means
//! adding a variant here, never touching the orchestrator.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::article::{content_id, detect_language, source_domain, Article, Engagement};

/// Item shape returned by the news-API provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsApiItem {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "urlToImage")]
    pub url_to_image: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
    pub source: Option<NewsApiSourceRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsApiSourceRef {
    pub name: Option<String>,
}

/// Post shape returned by the social provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SocialPost {
    pub title: Option<String>,
    pub url: Option<String>,
    pub permalink: Option<String>,
    #[serde(default)]
    pub ups: u64,
    #[serde(default)]
    pub subreddit_subscribers: u64,
    pub created_utc: Option<f64>,
    pub subreddit: Option<String>,
    pub thumbnail: Option<String>,
}

/// Trending video shape assembled from the video provider's API response.
#[derive(Debug, Clone, Default)]
pub struct VideoItem {
    pub video_id: String,
    pub title: String,
    pub channel_title: String,
    pub published_at: Option<String>,
    pub thumbnail: Option<String>,
    pub view_count: u64,
    pub like_count: u64,
}

/// Entry extracted from an RSS/Atom/JSON feed.
#[derive(Debug, Clone, Default)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub published: Option<String>,
    pub feed_title: Option<String>,
}

/// Provider-native item, opaque to the pipeline except through [`normalize`].
#[derive(Debug, Clone)]
pub enum RawItem {
    NewsApi(NewsApiItem),
    Social(SocialPost),
    Video(VideoItem),
    Rss(FeedEntry),
}

/// Parse a provider timestamp in any of the formats seen in the wild.
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(date_str) {
        return Some(date.with_timezone(&Utc));
    }

    if let Ok(date) = DateTime::parse_from_rfc2822(date_str) {
        return Some(date.with_timezone(&Utc));
    }

    for format in &[
        "%Y-%m-%dT%H:%M:%S%z",
        "%Y-%m-%d %H:%M:%S %z",
        "%d/%m/%Y %H:%M:%S %z",
    ] {
        if let Ok(date) = DateTime::parse_from_str(date_str, format) {
            return Some(date.with_timezone(&Utc));
        }
    }

    None
}

/// Normalize one raw item into a section-scoped [`Article`].
///
/// Returns `None` when the item has no usable title; everything else is
/// filled best-effort.
pub fn normalize(raw: RawItem, section: &str) -> Option<Article> {
    match raw {
        RawItem::NewsApi(item) => {
            let title = non_empty(item.title)?;
            let url = item.url.unwrap_or_default();
            let source = item
                .source
                .and_then(|s| s.name)
                .unwrap_or_else(|| "NewsAPI".to_string());
            let published_at = item.published_at.as_deref().and_then(parse_date);
            Some(build_article(
                title,
                item.description.unwrap_or_default(),
                url,
                item.url_to_image,
                source,
                published_at,
                Engagement::default(),
                section,
            ))
        }
        RawItem::Social(post) => {
            let title = non_empty(post.title)?;
            let url = post.url.filter(|u| !u.trim().is_empty()).or_else(|| {
                post.permalink
                    .map(|p| format!("https://www.reddit.com{}", p))
            })?;
            let source = post
                .subreddit
                .map(|s| format!("r/{}", s))
                .unwrap_or_else(|| "social".to_string());
            let published_at = post
                .created_utc
                .and_then(|ts| DateTime::from_timestamp(ts as i64, 0));
            let engagement = Engagement {
                reactions: post.ups,
                followers: post.subreddit_subscribers,
            };
            Some(build_article(
                title,
                String::new(),
                url,
                post.thumbnail.filter(|t| t.starts_with("http")),
                source,
                published_at,
                engagement,
                section,
            ))
        }
        RawItem::Video(item) => {
            if item.title.trim().is_empty() || item.video_id.trim().is_empty() {
                return None;
            }
            let url = format!("https://www.youtube.com/watch?v={}", item.video_id);
            let published_at = item.published_at.as_deref().and_then(parse_date);
            let engagement = Engagement {
                reactions: item.like_count,
                followers: item.view_count,
            };
            Some(build_article(
                item.title,
                String::new(),
                url,
                item.thumbnail,
                item.channel_title,
                published_at,
                engagement,
                section,
            ))
        }
        RawItem::Rss(entry) => {
            let title = non_empty(entry.title)?;
            let url = entry.url.unwrap_or_default();
            let source = entry
                .feed_title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| source_domain(&url));
            let published_at = entry.published.as_deref().and_then(parse_date);
            Some(build_article(
                title,
                entry.description.unwrap_or_default(),
                url,
                None,
                source,
                published_at,
                Engagement::default(),
                section,
            ))
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[allow(clippy::too_many_arguments)]
fn build_article(
    title: String,
    description: String,
    url: String,
    image: Option<String>,
    source: String,
    published_at: Option<DateTime<Utc>>,
    engagement: Engagement,
    section: &str,
) -> Article {
    let id = content_id(&source, Some(&url), &title);
    let language = detect_language(&title);
    Article {
        id,
        source_domain: source_domain(&url),
        title,
        description,
        url,
        image,
        source,
        published_at,
        language,
        engagement,
        localized_title: None,
        summary: None,
        score: 0.0,
        rating: 0.0,
        tags: Vec::new(),
        section: section.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::Language;

    #[test]
    fn parse_date_handles_common_formats() {
        assert!(parse_date("2026-08-26T10:00:00Z").is_some());
        assert!(parse_date("Wed, 26 Aug 2026 10:00:00 GMT").is_some());
        assert!(parse_date("2026-08-26T10:00:00+0900").is_some());
        assert!(parse_date("yesterday-ish").is_none());
    }

    #[test]
    fn news_item_normalizes_with_domain_and_id() {
        let item = NewsApiItem {
            title: Some("Markets rally".to_string()),
            description: Some("Stocks up".to_string()),
            url: Some("https://www.reuters.com/markets/1".to_string()),
            published_at: Some("2026-08-26T08:00:00Z".to_string()),
            source: Some(NewsApiSourceRef {
                name: Some("Reuters".to_string()),
            }),
            ..Default::default()
        };
        let article = normalize(RawItem::NewsApi(item), "business").unwrap();
        assert_eq!(article.source_domain, "reuters.com");
        assert_eq!(article.section, "business");
        assert_eq!(article.language, Language::En);
        assert!(article.published_at.is_some());
        assert_eq!(article.id.len(), 32);
    }

    #[test]
    fn same_source_and_url_yield_same_id_regardless_of_field_order() {
        let a = NewsApiItem {
            title: Some("A headline".to_string()),
            url: Some("https://a.com/1".to_string()),
            ..Default::default()
        };
        let b = NewsApiItem {
            url: Some("https://a.com/1".to_string()),
            description: Some("extra field filled".to_string()),
            title: Some("a HEADLINE".to_string()),
            ..Default::default()
        };
        let first = normalize(RawItem::NewsApi(a), "world").unwrap();
        let second = normalize(RawItem::NewsApi(b), "world").unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn untitled_items_are_dropped() {
        let entry = FeedEntry {
            url: Some("https://example.com/x".to_string()),
            ..Default::default()
        };
        assert!(normalize(RawItem::Rss(entry), "world").is_none());
    }

    #[test]
    fn social_post_builds_permalink_url_and_engagement() {
        let post = SocialPost {
            title: Some("속보: 테스트".to_string()),
            permalink: Some("/r/news/comments/abc".to_string()),
            ups: 420,
            subreddit: Some("news".to_string()),
            created_utc: Some(1_700_000_000.0),
            ..Default::default()
        };
        let article = normalize(RawItem::Social(post), "viral").unwrap();
        assert_eq!(article.url, "https://www.reddit.com/r/news/comments/abc");
        assert_eq!(article.source, "r/news");
        assert_eq!(article.engagement.reactions, 420);
        assert_eq!(article.language, Language::Ko);
    }

    #[test]
    fn video_item_builds_watch_url() {
        let item = VideoItem {
            video_id: "abc123".to_string(),
            title: "速報テスト".to_string(),
            channel_title: "NewsChannel".to_string(),
            view_count: 10_000,
            like_count: 900,
            ..Default::default()
        };
        let article = normalize(RawItem::Video(item), "video").unwrap();
        assert_eq!(article.url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(article.source_domain, "youtube.com");
        assert_eq!(article.language, Language::Ja);
        assert_eq!(article.engagement.followers, 10_000);
    }
}

//! Static section configuration, loaded once at startup and immutable afterwards.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;

use crate::article::Language;
use crate::sources::rss::is_valid_url;

/// Provider identities a section can draw from, besides RSS feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    NewsApi,
    Social,
    Video,
}

/// Per-section ranking weight vector. Weights must be non-negative and need
/// not sum to 1.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankWeights {
    #[serde(default = "default_w_freshness")]
    pub freshness: f64,
    #[serde(default = "default_w_volume")]
    pub volume: f64,
    #[serde(default = "default_w_engagement")]
    pub engagement: f64,
    #[serde(default = "default_w_source_trust")]
    pub source_trust: f64,
    #[serde(default = "default_w_diversity")]
    pub diversity: f64,
    #[serde(default = "default_w_language")]
    pub language: f64,
}

fn default_w_freshness() -> f64 {
    0.35
}
fn default_w_volume() -> f64 {
    0.15
}
fn default_w_engagement() -> f64 {
    0.15
}
fn default_w_source_trust() -> f64 {
    0.2
}
fn default_w_diversity() -> f64 {
    0.1
}
fn default_w_language() -> f64 {
    0.05
}

impl Default for RankWeights {
    fn default() -> Self {
        RankWeights {
            freshness: default_w_freshness(),
            volume: default_w_volume(),
            engagement: default_w_engagement(),
            source_trust: default_w_source_trust(),
            diversity: default_w_diversity(),
            language: default_w_language(),
        }
    }
}

impl RankWeights {
    pub fn validate(&self) -> Result<()> {
        let components = [
            ("freshness", self.freshness),
            ("volume", self.volume),
            ("engagement", self.engagement),
            ("sourceTrust", self.source_trust),
            ("diversity", self.diversity),
            ("language", self.language),
        ];
        for (name, value) in components {
            if value < 0.0 || !value.is_finite() {
                bail!("weight {} must be a non-negative number, got {}", name, value);
            }
        }
        Ok(())
    }
}

/// A topic section: its sources, ranking weights, cache TTLs and phase deadlines.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionConfig {
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub providers: Vec<ProviderKind>,
    #[serde(default)]
    pub rss_feeds: Vec<String>,
    /// Search query for the news provider; defaults to the section name.
    #[serde(default)]
    pub query: Option<String>,
    /// Community/topic identifier for the social provider.
    #[serde(default)]
    pub social_topic: Option<String>,
    /// Category id for the video provider's trending endpoint.
    #[serde(default)]
    pub video_category: Option<String>,
    /// Preferred language used by the language ranking component.
    #[serde(default)]
    pub language: Option<Language>,
    #[serde(default)]
    pub weights: RankWeights,
    #[serde(default = "default_fast_ttl")]
    pub fast_ttl_seconds: u64,
    #[serde(default = "default_full_ttl")]
    pub full_ttl_seconds: u64,
    #[serde(default = "default_recency_horizon")]
    pub recency_horizon_hours: u32,
    #[serde(default = "default_phase1_deadline")]
    pub phase1_deadline_ms: u64,
    #[serde(default = "default_phase2_deadline")]
    pub phase2_deadline_ms: u64,
    #[serde(default = "default_first_batch")]
    pub first_batch_size: usize,
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,
}

fn default_fast_ttl() -> u64 {
    300
}
fn default_full_ttl() -> u64 {
    1800
}
fn default_recency_horizon() -> u32 {
    24
}
fn default_phase1_deadline() -> u64 {
    600
}
fn default_phase2_deadline() -> u64 {
    8000
}
fn default_first_batch() -> usize {
    20
}
fn default_max_articles() -> usize {
    50
}

impl Default for SectionConfig {
    fn default() -> Self {
        SectionConfig {
            name: String::new(),
            providers: Vec::new(),
            rss_feeds: Vec::new(),
            query: None,
            social_topic: None,
            video_category: None,
            language: None,
            weights: RankWeights::default(),
            fast_ttl_seconds: default_fast_ttl(),
            full_ttl_seconds: default_full_ttl(),
            recency_horizon_hours: default_recency_horizon(),
            phase1_deadline_ms: default_phase1_deadline(),
            phase2_deadline_ms: default_phase2_deadline(),
            first_batch_size: default_first_batch(),
            max_articles: default_max_articles(),
        }
    }
}

/// Full application configuration: one entry per section, keyed by section name.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub sections: HashMap<String, SectionConfig>,
}

impl AppConfig {
    /// Load and validate the section configuration from a JSON file.
    pub fn load(path: &str) -> Result<AppConfig> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path))?;
        let mut config: AppConfig = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse config file: {}", path))?;
        for (name, section) in config.sections.iter_mut() {
            section.name = name.clone();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sections.is_empty() {
            bail!("no sections configured");
        }
        for (name, section) in &self.sections {
            section
                .weights
                .validate()
                .with_context(|| format!("invalid weights for section '{}'", name))?;
            if section.providers.is_empty() && section.rss_feeds.is_empty() {
                bail!("section '{}' has no providers and no RSS feeds", name);
            }
            for feed in &section.rss_feeds {
                if !is_valid_url(feed) {
                    bail!("section '{}' has invalid RSS feed URL: {}", name, feed);
                }
            }
            if section.first_batch_size == 0 || section.max_articles == 0 {
                bail!("section '{}' must allow at least one article", name);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> AppConfig {
        let mut config: AppConfig = serde_json::from_str(json).unwrap();
        for (name, section) in config.sections.iter_mut() {
            section.name = name.clone();
        }
        config
    }

    #[test]
    fn parses_minimal_section_with_defaults() {
        let config = parse(
            r#"{"sections":{"world":{"rssFeeds":["https://example.com/feed.xml"]}}}"#,
        );
        config.validate().unwrap();
        let world = &config.sections["world"];
        assert_eq!(world.name, "world");
        assert_eq!(world.fast_ttl_seconds, 300);
        assert_eq!(world.recency_horizon_hours, 24);
        assert_eq!(world.phase1_deadline_ms, 600);
        assert!(world.weights.freshness > 0.0);
    }

    #[test]
    fn rejects_negative_weight() {
        let config = parse(
            r#"{"sections":{"world":{"rssFeeds":["https://example.com/f"],"weights":{"freshness":-1.0}}}}"#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_section_without_sources() {
        let config = parse(r#"{"sections":{"world":{}}}"#);
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_provider_kinds() {
        let config = parse(
            r#"{"sections":{"viral":{"providers":["news_api","social","video"],"socialTopic":"popular","videoCategory":"25"}}}"#,
        );
        let viral = &config.sections["viral"];
        assert_eq!(
            viral.providers,
            vec![ProviderKind::NewsApi, ProviderKind::Social, ProviderKind::Video]
        );
    }
}

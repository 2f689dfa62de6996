//! Per-provider fetch clients behind a single closed capability.
//!
//! Every source honors the same contract: `fetch(section)` returns raw items
//! or an empty list on any failure, and never signals an error upward.

pub mod newsapi;
pub mod rss;
pub mod social;
pub mod video;

use std::sync::Arc;
use tokio::time::Duration;

use crate::config::{ProviderKind, SectionConfig};
use crate::normalize::RawItem;

/// Per-request timeout for JSON API providers; RSS carries its own.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub enum Source {
    NewsApi(newsapi::NewsApiSource),
    Social(social::SocialSource),
    Video(video::VideoSource),
    Rss(rss::RssSource),
    #[cfg(test)]
    Mock(MockSource),
}

impl Source {
    pub fn name(&self) -> &'static str {
        match self {
            Source::NewsApi(_) => "news_api",
            Source::Social(_) => "social",
            Source::Video(_) => "video",
            Source::Rss(_) => "rss",
            #[cfg(test)]
            Source::Mock(_) => "mock",
        }
    }

    pub async fn fetch(&self, section: &SectionConfig) -> Vec<RawItem> {
        match self {
            Source::NewsApi(source) => source.fetch(section).await,
            Source::Social(source) => source.fetch(section).await,
            Source::Video(source) => source.fetch(section).await,
            Source::Rss(source) => source.fetch(section).await,
            #[cfg(test)]
            Source::Mock(source) => source.fetch().await,
        }
    }
}

/// Build the configured sources for one section.
pub fn build_sources(section: &SectionConfig) -> Vec<Arc<Source>> {
    let mut sources = Vec::new();
    for provider in &section.providers {
        let source = match provider {
            ProviderKind::NewsApi => Source::NewsApi(newsapi::NewsApiSource::from_env()),
            ProviderKind::Social => Source::Social(social::SocialSource::from_env()),
            ProviderKind::Video => Source::Video(video::VideoSource::from_env()),
        };
        sources.push(Arc::new(source));
    }
    if !section.rss_feeds.is_empty() {
        sources.push(Arc::new(Source::Rss(rss::RssSource::new())));
    }
    sources
}

/// Scripted source for orchestrator tests: waits, then returns fixed items.
#[cfg(test)]
pub struct MockSource {
    pub delay: Duration,
    pub items: Vec<RawItem>,
}

#[cfg(test)]
impl MockSource {
    pub async fn fetch(&self) -> Vec<RawItem> {
        tokio::time::sleep(self.delay).await;
        self.items.clone()
    }
}

//! Two-phase fetch orchestration over all configured sources for a section.
//!
//! Fast mode answers within the phase-1 deadline using whichever sources have
//! completed, then detaches a phase-2 refinement that re-fetches under a
//! looser deadline, merges, enriches, re-ranks and overwrites the cache entry.
//! Full mode runs a single complete pass with no aggregate deadline.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::article::Article;
use crate::cache::{cache_key, CacheEntry, StalenessCache};
use crate::config::{AppConfig, SectionConfig};
use crate::enrich::Enricher;
use crate::normalize::{normalize, RawItem};
use crate::pipeline::{dedupe, filter_recent, rank};
use crate::sources::{build_sources, Source};
use crate::TARGET_WEB_REQUEST;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Fast,
    Full,
}

impl FetchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchMode::Fast => "fast",
            FetchMode::Full => "full",
        }
    }
}

/// What a caller gets back: ranked articles plus whether they are a partial
/// phase-1 answer.
#[derive(Debug, Clone, Serialize)]
pub struct SectionResult {
    pub articles: Vec<Article>,
    pub partial: bool,
    pub timestamp: DateTime<Utc>,
}

pub struct FetchOrchestrator {
    config: Arc<AppConfig>,
    cache: Arc<StalenessCache>,
    enricher: Enricher,
    sources: HashMap<String, Arc<Vec<Arc<Source>>>>,
}

impl FetchOrchestrator {
    pub fn new(config: Arc<AppConfig>, cache: Arc<StalenessCache>, enricher: Enricher) -> Arc<Self> {
        let sources = config
            .sections
            .iter()
            .map(|(name, section)| (name.clone(), Arc::new(build_sources(section))))
            .collect();
        Arc::new(FetchOrchestrator {
            config,
            cache,
            enricher,
            sources,
        })
    }

    /// Construct with an explicit source set per section instead of the
    /// configured providers.
    pub fn with_sources(
        config: Arc<AppConfig>,
        cache: Arc<StalenessCache>,
        enricher: Enricher,
        sources: HashMap<String, Arc<Vec<Arc<Source>>>>,
    ) -> Arc<Self> {
        Arc::new(FetchOrchestrator {
            config,
            cache,
            enricher,
            sources,
        })
    }

    /// Resolve a section request, serving from cache when an unexpired entry
    /// exists. Unknown section names are the only error path; everything else
    /// fails open to a (possibly empty) result.
    pub async fn get_section(self: &Arc<Self>, section: &str, mode: FetchMode) -> Result<SectionResult> {
        let cfg = self
            .config
            .sections
            .get(section)
            .ok_or_else(|| anyhow!("unknown section: {}", section))?;
        let key = cache_key(section, mode.as_str());

        if let Some(entry) = self.cache.get(&key).await {
            debug!(target: TARGET_WEB_REQUEST, "Cache hit for {} (partial={})", key, entry.partial);
            return Ok(SectionResult {
                articles: entry.payload,
                partial: entry.partial,
                timestamp: entry.written_at,
            });
        }

        match mode {
            FetchMode::Fast => self.fast_pass(cfg, key).await,
            FetchMode::Full => self.full_pass(cfg, key).await,
        }
    }

    /// Phase 1: race all sources against the tight deadline, answer with
    /// whatever completed, then detach the refinement pass.
    async fn fast_pass(self: &Arc<Self>, cfg: &SectionConfig, key: String) -> Result<SectionResult> {
        let now = Utc::now();
        let raw = self
            .collect_with_deadline(cfg, Duration::from_millis(cfg.phase1_deadline_ms))
            .await;
        let mut ranked = rank(cfg, assemble(cfg, raw, now), now);
        ranked.truncate(cfg.first_batch_size);

        self.cache
            .set(
                &key,
                CacheEntry {
                    payload: ranked.clone(),
                    written_at: now,
                    partial: true,
                },
                cfg.fast_ttl_seconds,
            )
            .await;
        info!(
            target: TARGET_WEB_REQUEST,
            "Phase 1 answered section {} with {} articles", cfg.name, ranked.len()
        );

        // Background refinement; its only side effect is a later cache write.
        let orchestrator = Arc::clone(self);
        let refine_cfg = cfg.clone();
        let seed = ranked.clone();
        tokio::spawn(async move {
            if let Err(err) = orchestrator.refine(refine_cfg, key, seed).await {
                warn!(target: TARGET_WEB_REQUEST, "Background refinement failed: {:#}", err);
            }
        });

        Ok(SectionResult {
            articles: ranked,
            partial: true,
            timestamp: now,
        })
    }

    /// Phase 2: re-fetch under the looser deadline, merge with the phase-1
    /// ranked set, enrich, re-rank and overwrite the same cache key as
    /// complete.
    async fn refine(&self, cfg: SectionConfig, key: String, seed: Vec<Article>) -> Result<()> {
        let now = Utc::now();
        let raw = self
            .collect_with_deadline(&cfg, Duration::from_millis(cfg.phase2_deadline_ms))
            .await;
        let fresh = assemble(&cfg, raw, now);
        // Seed first: dedup keeps the already-served phase-1 instances.
        let merged = dedupe(seed.into_iter().chain(fresh).collect());
        let enriched = self.enricher.enrich_all(merged).await;
        let mut ranked = rank(&cfg, enriched, now);
        ranked.truncate(cfg.max_articles);

        let total = ranked.len();
        self.cache
            .set(
                &key,
                CacheEntry {
                    payload: ranked,
                    written_at: Utc::now(),
                    partial: false,
                },
                cfg.full_ttl_seconds,
            )
            .await;
        info!(
            target: TARGET_WEB_REQUEST,
            "Phase 2 refreshed section {} with {} articles", cfg.name, total
        );
        Ok(())
    }

    /// Full mode: one complete pass across all sources. Each source call is
    /// still independently failure-isolated, but there is no aggregate
    /// deadline cutting the join short.
    async fn full_pass(&self, cfg: &SectionConfig, key: String) -> Result<SectionResult> {
        let now = Utc::now();
        let raw = self.collect_all(cfg).await;
        let articles = assemble(cfg, raw, now);
        let enriched = self.enricher.enrich_all(articles).await;
        let mut ranked = rank(cfg, enriched, now);
        ranked.truncate(cfg.max_articles);

        self.cache
            .set(
                &key,
                CacheEntry {
                    payload: ranked.clone(),
                    written_at: now,
                    partial: false,
                },
                cfg.full_ttl_seconds,
            )
            .await;
        Ok(SectionResult {
            articles: ranked,
            partial: false,
            timestamp: now,
        })
    }

    /// Spawn one task per source and collect results until either all have
    /// reported or the deadline fires. Tasks still running at the deadline are
    /// abandoned; their late results land in a closed channel and are dropped.
    async fn collect_with_deadline(&self, cfg: &SectionConfig, deadline: Duration) -> Vec<RawItem> {
        let Some(sources) = self.sources.get(&cfg.name) else {
            return Vec::new();
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        for source in sources.iter() {
            let tx = tx.clone();
            let source = Arc::clone(source);
            let cfg = cfg.clone();
            tokio::spawn(async move {
                let items = source.fetch(&cfg).await;
                let _ = tx.send((source.name(), items));
            });
        }
        drop(tx);

        let timer = sleep(deadline);
        tokio::pin!(timer);

        let mut collected = Vec::new();
        loop {
            tokio::select! {
                msg = rx.recv() => match msg {
                    Some((name, items)) => {
                        debug!(target: TARGET_WEB_REQUEST, "Source {} returned {} items for {}", name, items.len(), cfg.name);
                        collected.extend(items);
                    }
                    None => break,
                },
                _ = &mut timer => {
                    debug!(
                        target: TARGET_WEB_REQUEST,
                        "Deadline of {:?} reached for {}, using completed sources", deadline, cfg.name
                    );
                    break;
                }
            }
        }
        collected
    }

    async fn collect_all(&self, cfg: &SectionConfig) -> Vec<RawItem> {
        let Some(sources) = self.sources.get(&cfg.name) else {
            return Vec::new();
        };
        let fetches = sources.iter().map(|source| {
            let source = Arc::clone(source);
            let cfg = cfg.clone();
            async move { source.fetch(&cfg).await }
        });
        join_all(fetches).await.into_iter().flatten().collect()
    }
}

/// Normalize, horizon-filter and dedupe a raw batch.
fn assemble(cfg: &SectionConfig, raw: Vec<RawItem>, now: DateTime<Utc>) -> Vec<Article> {
    let articles: Vec<Article> = raw
        .into_iter()
        .filter_map(|item| normalize(item, &cfg.name))
        .collect();
    let articles = filter_recent(articles, cfg.recency_horizon_hours, now);
    dedupe(articles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SectionConfig;
    use crate::normalize::FeedEntry;
    use crate::sources::MockSource;

    fn feed_item(title: &str, url: &str) -> RawItem {
        RawItem::Rss(FeedEntry {
            title: Some(title.to_string()),
            url: Some(url.to_string()),
            published: Some(Utc::now().to_rfc3339()),
            feed_title: Some("Test Feed".to_string()),
            ..Default::default()
        })
    }

    fn mock(delay_ms: u64, items: Vec<RawItem>) -> Arc<Source> {
        Arc::new(Source::Mock(MockSource {
            delay: Duration::from_millis(delay_ms),
            items,
        }))
    }

    fn orchestrator_with(
        section: &str,
        phase1_ms: u64,
        sources: Vec<Arc<Source>>,
    ) -> Arc<FetchOrchestrator> {
        let cfg = SectionConfig {
            name: section.to_string(),
            phase1_deadline_ms: phase1_ms,
            phase2_deadline_ms: 3000,
            ..SectionConfig::default()
        };
        let config = Arc::new(AppConfig {
            sections: HashMap::from([(section.to_string(), cfg)]),
        });
        let source_map = HashMap::from([(section.to_string(), Arc::new(sources))]);
        FetchOrchestrator::with_sources(
            config,
            Arc::new(StalenessCache::in_memory()),
            Enricher::Disabled,
            source_map,
        )
    }

    #[tokio::test]
    async fn fast_mode_uses_completed_sources_and_refines_in_background() {
        let fast = mock(10, vec![feed_item("Fast story", "http://a.com/fast")]);
        let slow = mock(1500, vec![feed_item("Slow story", "http://b.com/slow")]);
        let orchestrator = orchestrator_with("world", 400, vec![fast, slow]);

        let started = std::time::Instant::now();
        let result = orchestrator
            .get_section("world", FetchMode::Fast)
            .await
            .unwrap();
        assert!(started.elapsed() < std::time::Duration::from_millis(1200));
        assert!(result.partial);
        assert_eq!(result.articles.len(), 1);
        assert_eq!(result.articles[0].title, "Fast story");

        // Phase 2 eventually overwrites the same key as complete and merged.
        let key = cache_key("world", "fast");
        let mut refined = None;
        for _ in 0..40 {
            sleep(Duration::from_millis(100)).await;
            if let Some(entry) = orchestrator.cache.get(&key).await {
                if !entry.partial {
                    refined = Some(entry);
                    break;
                }
            }
        }
        let refined = refined.expect("phase 2 never completed");
        assert_eq!(refined.payload.len(), 2);
    }

    #[tokio::test]
    async fn all_sources_failing_still_succeeds_with_empty_list() {
        let orchestrator = orchestrator_with("world", 200, vec![mock(10, Vec::new())]);
        let result = orchestrator
            .get_section("world", FetchMode::Fast)
            .await
            .unwrap();
        assert!(result.articles.is_empty());
        assert!(result.partial);
    }

    #[tokio::test]
    async fn syndicated_story_collapses_to_one_article() {
        let a = mock(10, vec![feed_item("X", "http://a.com/1")]);
        let b = mock(20, vec![feed_item("x", "HTTP://A.com/1")]);
        let orchestrator = orchestrator_with("world", 500, vec![a, b]);
        let result = orchestrator
            .get_section("world", FetchMode::Fast)
            .await
            .unwrap();
        assert_eq!(result.articles.len(), 1);
    }

    #[tokio::test]
    async fn full_mode_waits_for_every_source() {
        let fast = mock(10, vec![feed_item("Fast story", "http://a.com/fast")]);
        let slow = mock(700, vec![feed_item("Slow story", "http://b.com/slow")]);
        let orchestrator = orchestrator_with("world", 100, vec![fast, slow]);
        let result = orchestrator
            .get_section("world", FetchMode::Full)
            .await
            .unwrap();
        assert!(!result.partial);
        assert_eq!(result.articles.len(), 2);
    }

    #[tokio::test]
    async fn full_mode_result_is_served_from_cache() {
        let source = mock(10, vec![feed_item("Story", "http://a.com/1")]);
        let orchestrator = orchestrator_with("world", 200, vec![source]);
        let first = orchestrator
            .get_section("world", FetchMode::Full)
            .await
            .unwrap();
        let second = orchestrator
            .get_section("world", FetchMode::Full)
            .await
            .unwrap();
        assert_eq!(first.timestamp, second.timestamp);
    }

    #[tokio::test]
    async fn unknown_section_is_an_error() {
        let orchestrator = orchestrator_with("world", 200, Vec::new());
        assert!(orchestrator
            .get_section("nonexistent", FetchMode::Fast)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn undated_items_are_filtered_out() {
        let undated = RawItem::Rss(FeedEntry {
            title: Some("No date".to_string()),
            url: Some("http://a.com/undated".to_string()),
            ..Default::default()
        });
        let orchestrator = orchestrator_with("world", 200, vec![mock(10, vec![undated])]);
        let result = orchestrator
            .get_section("world", FetchMode::Fast)
            .await
            .unwrap();
        assert!(result.articles.is_empty());
    }
}

//! Canonical article model shared by every stage of the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// Best-effort detected language of an article, via script-range matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ko,
    Ja,
    #[default]
    En,
}

/// Closed tag vocabulary applied during ranking. An article carries at most two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    Breaking,
    Urgent,
    Trending,
}

/// Reaction and follower counts reported by a provider; both default to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    #[serde(default)]
    pub reactions: u64,
    #[serde(default)]
    pub followers: u64,
}

/// The canonical unit flowing through filter, dedup, rank and cache.
///
/// An `Article` is section-scoped: the same content ranked for two sections is
/// two records sharing one `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub source: String,
    pub source_domain: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub engagement: Engagement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localized_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub section: String,
}

impl Article {
    /// Age in minutes relative to `now`. `None` when the provider supplied no
    /// parseable publication date; callers treat that as maximally old.
    pub fn age_minutes(&self, now: DateTime<Utc>) -> Option<f64> {
        self.published_at
            .map(|published| (now - published).num_seconds() as f64 / 60.0)
    }
}

/// Deterministic content-identity hash.
///
/// When a URL is present the id derives from the normalized URL and its host,
/// so the same story syndicated by two providers collapses to one id. Without
/// a URL the id falls back to `(source, title)`.
pub fn content_id(source: &str, url: Option<&str>, title: &str) -> String {
    let mut hasher = Sha256::new();
    match url {
        Some(u) if !u.trim().is_empty() => {
            let normalized = u.trim().to_lowercase();
            hasher.update(source_domain(&normalized).as_bytes());
            hasher.update(b"|");
            hasher.update(normalized.as_bytes());
        }
        _ => {
            hasher.update(source.trim().to_lowercase().as_bytes());
            hasher.update(b"|");
            hasher.update(title.trim().to_lowercase().as_bytes());
        }
    }
    let digest = hasher.finalize();
    digest
        .iter()
        .take(16)
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Lowercased URL host with any leading `www.` stripped; empty string when the
/// URL does not parse.
pub fn source_domain(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed
            .host_str()
            .map(|host| {
                let host = host.to_lowercase();
                host.strip_prefix("www.").unwrap_or(&host).to_string()
            })
            .unwrap_or_default(),
        Err(_) => String::new(),
    }
}

/// Detect Korean (Hangul) or Japanese (kana) text by script range; everything
/// else defaults to English.
pub fn detect_language(text: &str) -> Language {
    for c in text.chars() {
        match c {
            '\u{AC00}'..='\u{D7AF}' | '\u{1100}'..='\u{11FF}' => return Language::Ko,
            '\u{3040}'..='\u{309F}' | '\u{30A0}'..='\u{30FF}' => return Language::Ja,
            _ => {}
        }
    }
    Language::En
}

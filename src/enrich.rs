//! Optional LLM enrichment: localized title and short summary.
//!
//! The pipeline must function with enrichment absent or failing; every error
//! path here returns the original article unchanged.

use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use ollama_rs::Ollama;
use serde::Deserialize;
use std::env;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

use crate::article::{Article, Language};
use crate::TARGET_LLM_REQUEST;

const MAX_RETRIES: usize = 2;
const LLM_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct EnrichmentPayload {
    localized_title: Option<String>,
    summary: Option<String>,
}

#[derive(Clone)]
pub enum Enricher {
    Disabled,
    Ollama(OllamaEnricher),
}

impl Enricher {
    /// Enable the Ollama-backed enricher when `OLLAMA_HOST` is set.
    pub fn from_env() -> Self {
        match env::var("OLLAMA_HOST") {
            Ok(host) => {
                let port = env::var("OLLAMA_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(11434);
                let model = env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
                Enricher::Ollama(OllamaEnricher {
                    client: Ollama::new(host, port),
                    model,
                    temperature: 0.0,
                })
            }
            Err(_) => Enricher::Disabled,
        }
    }

    pub async fn enrich(&self, article: Article) -> Article {
        match self {
            Enricher::Disabled => article,
            Enricher::Ollama(enricher) => enricher.enrich(article).await,
        }
    }

    pub async fn enrich_all(&self, articles: Vec<Article>) -> Vec<Article> {
        if matches!(self, Enricher::Disabled) {
            return articles;
        }
        let mut enriched = Vec::with_capacity(articles.len());
        for article in articles {
            enriched.push(self.enrich(article).await);
        }
        enriched
    }
}

#[derive(Clone)]
pub struct OllamaEnricher {
    client: Ollama,
    model: String,
    temperature: f32,
}

impl OllamaEnricher {
    async fn enrich(&self, mut article: Article) -> Article {
        let target = match article.language {
            Language::Ko => "Korean",
            Language::Ja => "Japanese",
            Language::En => "English",
        };
        let prompt = format!(
            "Given this news headline and description, reply with JSON only: \
             {{\"localized_title\": \"the headline translated into {}\", \
             \"summary\": \"a two-sentence factual summary\"}}\n\n\
             Headline: {}\nDescription: {}",
            target, article.title, article.description
        );

        let mut backoff = 2;
        for retry_count in 0..MAX_RETRIES {
            let mut request = GenerationRequest::new(self.model.clone(), prompt.clone());
            request.options = Some(GenerationOptions::default().temperature(self.temperature));

            match timeout(LLM_TIMEOUT, self.client.generate(request)).await {
                Ok(Ok(response)) => {
                    if let Some(payload) = parse_payload(&response.response) {
                        if payload.localized_title.is_some() || payload.summary.is_some() {
                            article.localized_title = payload.localized_title;
                            article.summary = payload.summary;
                            return article;
                        }
                    }
                    debug!(target: TARGET_LLM_REQUEST, "Unusable enrichment response for {}", article.id);
                    return article;
                }
                Ok(Err(err)) => {
                    warn!(target: TARGET_LLM_REQUEST, "Enrichment request failed for {}: {}", article.id, err);
                }
                Err(_) => {
                    warn!(target: TARGET_LLM_REQUEST, "Enrichment request timed out for {}", article.id);
                }
            }

            if retry_count < MAX_RETRIES - 1 {
                sleep(Duration::from_secs(backoff)).await;
                backoff *= 2;
            }
        }

        article
    }
}

/// Parse the model's reply, tolerating markdown code fences around the JSON.
fn parse_payload(response: &str) -> Option<EnrichmentPayload> {
    let trimmed = response.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end_matches("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(body.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::tests::test_article;

    #[test]
    fn parses_fenced_json_payload() {
        let payload =
            parse_payload("```json\n{\"localized_title\": \"제목\", \"summary\": \"s\"}\n```")
                .unwrap();
        assert_eq!(payload.localized_title.as_deref(), Some("제목"));
    }

    #[test]
    fn garbage_payload_is_none() {
        assert!(parse_payload("Sorry, I can't do that").is_none());
    }

    #[tokio::test]
    async fn disabled_enricher_passes_articles_through() {
        let article = test_article("a");
        let enriched = Enricher::Disabled.enrich(article.clone()).await;
        assert!(enriched.localized_title.is_none());
        assert_eq!(enriched.id, article.id);
    }
}

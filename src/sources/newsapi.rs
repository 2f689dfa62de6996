//! News-API provider: keyword search across wire and newspaper sources.

use serde::Deserialize;
use std::env;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::FETCH_TIMEOUT;
use crate::config::SectionConfig;
use crate::normalize::{NewsApiItem, RawItem};
use crate::TARGET_WEB_REQUEST;

const ENDPOINT: &str = "https://newsapi.org/v2/everything";

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    #[serde(default)]
    articles: Vec<NewsApiItem>,
}

pub struct NewsApiSource {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl NewsApiSource {
    pub fn from_env() -> Self {
        NewsApiSource {
            client: reqwest::Client::new(),
            api_key: env::var("NEWS_API_KEY").ok(),
        }
    }

    pub async fn fetch(&self, section: &SectionConfig) -> Vec<RawItem> {
        let Some(api_key) = &self.api_key else {
            debug!(target: TARGET_WEB_REQUEST, "NEWS_API_KEY not set, news provider disabled");
            return Vec::new();
        };
        let query = section
            .query
            .clone()
            .unwrap_or_else(|| section.name.clone());

        let request = self
            .client
            .get(ENDPOINT)
            .query(&[
                ("q", query.as_str()),
                ("sortBy", "publishedAt"),
                ("pageSize", "50"),
            ])
            .header("X-Api-Key", api_key)
            .send();

        let response = match timeout(FETCH_TIMEOUT, request).await {
            Ok(Ok(resp)) if resp.status().is_success() => resp,
            Ok(Ok(resp)) => {
                warn!(target: TARGET_WEB_REQUEST, "News API returned {} for section {}", resp.status(), section.name);
                return Vec::new();
            }
            Ok(Err(err)) => {
                warn!(target: TARGET_WEB_REQUEST, "News API request failed for section {}: {}", section.name, err);
                return Vec::new();
            }
            Err(_) => {
                warn!(target: TARGET_WEB_REQUEST, "News API request timed out for section {}", section.name);
                return Vec::new();
            }
        };

        match response.json::<NewsApiResponse>().await {
            Ok(parsed) => parsed.articles.into_iter().map(RawItem::NewsApi).collect(),
            Err(err) => {
                warn!(target: TARGET_WEB_REQUEST, "Failed to parse News API response for section {}: {}", section.name, err);
                Vec::new()
            }
        }
    }
}

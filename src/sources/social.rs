//! Social provider: hot posts for a section's community topic.

use serde::Deserialize;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::FETCH_TIMEOUT;
use crate::config::SectionConfig;
use crate::normalize::{RawItem, SocialPost};
use crate::TARGET_WEB_REQUEST;

const USER_AGENT: &str = "newsdesk/0.3 (section aggregator)";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: SocialPost,
}

pub struct SocialSource {
    client: reqwest::Client,
}

impl SocialSource {
    pub fn from_env() -> Self {
        SocialSource {
            client: reqwest::Client::new(),
        }
    }

    pub async fn fetch(&self, section: &SectionConfig) -> Vec<RawItem> {
        let Some(topic) = &section.social_topic else {
            debug!(target: TARGET_WEB_REQUEST, "Section {} has no social topic, social provider skipped", section.name);
            return Vec::new();
        };
        let url = format!("https://www.reddit.com/r/{}/hot.json?limit=50", topic);

        let request = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send();

        let response = match timeout(FETCH_TIMEOUT, request).await {
            Ok(Ok(resp)) if resp.status().is_success() => resp,
            Ok(Ok(resp)) => {
                warn!(target: TARGET_WEB_REQUEST, "Social API returned {} for r/{}", resp.status(), topic);
                return Vec::new();
            }
            Ok(Err(err)) => {
                warn!(target: TARGET_WEB_REQUEST, "Social API request failed for r/{}: {}", topic, err);
                return Vec::new();
            }
            Err(_) => {
                warn!(target: TARGET_WEB_REQUEST, "Social API request timed out for r/{}", topic);
                return Vec::new();
            }
        };

        match response.json::<Listing>().await {
            Ok(listing) => listing
                .data
                .children
                .into_iter()
                .map(|child| RawItem::Social(child.data))
                .collect(),
            Err(err) => {
                warn!(target: TARGET_WEB_REQUEST, "Failed to parse social listing for r/{}: {}", topic, err);
                Vec::new()
            }
        }
    }
}

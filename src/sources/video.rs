//! Video provider: trending videos for a section's category.

use serde::Deserialize;
use std::env;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::FETCH_TIMEOUT;
use crate::config::SectionConfig;
use crate::normalize::{RawItem, VideoItem};
use crate::TARGET_WEB_REQUEST;

const ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/videos";

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoResource>,
}

#[derive(Debug, Deserialize)]
struct VideoResource {
    id: String,
    snippet: Option<Snippet>,
    statistics: Option<Statistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    channel_title: Option<String>,
    published_at: Option<String>,
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
}

pub struct VideoSource {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl VideoSource {
    pub fn from_env() -> Self {
        VideoSource {
            client: reqwest::Client::new(),
            api_key: env::var("VIDEO_API_KEY").ok(),
        }
    }

    pub async fn fetch(&self, section: &SectionConfig) -> Vec<RawItem> {
        let Some(api_key) = &self.api_key else {
            debug!(target: TARGET_WEB_REQUEST, "VIDEO_API_KEY not set, video provider disabled");
            return Vec::new();
        };
        let Some(category) = &section.video_category else {
            debug!(target: TARGET_WEB_REQUEST, "Section {} has no video category, video provider skipped", section.name);
            return Vec::new();
        };
        let region = env::var("NEWSDESK_VIDEO_REGION").unwrap_or_else(|_| "US".to_string());

        let request = self
            .client
            .get(ENDPOINT)
            .query(&[
                ("part", "snippet,statistics"),
                ("chart", "mostPopular"),
                ("videoCategoryId", category.as_str()),
                ("regionCode", region.as_str()),
                ("maxResults", "25"),
                ("key", api_key.as_str()),
            ])
            .send();

        let response = match timeout(FETCH_TIMEOUT, request).await {
            Ok(Ok(resp)) if resp.status().is_success() => resp,
            Ok(Ok(resp)) => {
                warn!(target: TARGET_WEB_REQUEST, "Video API returned {} for section {}", resp.status(), section.name);
                return Vec::new();
            }
            Ok(Err(err)) => {
                warn!(target: TARGET_WEB_REQUEST, "Video API request failed for section {}: {}", section.name, err);
                return Vec::new();
            }
            Err(_) => {
                warn!(target: TARGET_WEB_REQUEST, "Video API request timed out for section {}", section.name);
                return Vec::new();
            }
        };

        match response.json::<VideoListResponse>().await {
            Ok(parsed) => parsed
                .items
                .into_iter()
                .filter_map(to_video_item)
                .map(RawItem::Video)
                .collect(),
            Err(err) => {
                warn!(target: TARGET_WEB_REQUEST, "Failed to parse video response for section {}: {}", section.name, err);
                Vec::new()
            }
        }
    }
}

fn to_video_item(resource: VideoResource) -> Option<VideoItem> {
    let snippet = resource.snippet?;
    let statistics = resource.statistics.unwrap_or(Statistics {
        view_count: None,
        like_count: None,
    });
    Some(VideoItem {
        video_id: resource.id,
        title: snippet.title,
        channel_title: snippet.channel_title.unwrap_or_default(),
        published_at: snippet.published_at,
        thumbnail: snippet.thumbnails.and_then(|t| t.high).map(|t| t.url),
        view_count: parse_count(statistics.view_count),
        like_count: parse_count(statistics.like_count),
    })
}

fn parse_count(value: Option<String>) -> u64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_api_resource_to_video_item() {
        let body = r#"{"items":[{"id":"abc","snippet":{"title":"T","channelTitle":"C",
            "publishedAt":"2026-08-26T08:00:00Z"},"statistics":{"viewCount":"123","likeCount":"7"}}]}"#;
        let parsed: VideoListResponse = serde_json::from_str(body).unwrap();
        let item = to_video_item(parsed.items.into_iter().next().unwrap()).unwrap();
        assert_eq!(item.video_id, "abc");
        assert_eq!(item.view_count, 123);
        assert_eq!(item.like_count, 7);
    }

    #[test]
    fn missing_statistics_default_to_zero() {
        let body = r#"{"items":[{"id":"abc","snippet":{"title":"T"}}]}"#;
        let parsed: VideoListResponse = serde_json::from_str(body).unwrap();
        let item = to_video_item(parsed.items.into_iter().next().unwrap()).unwrap();
        assert_eq!(item.view_count, 0);
    }
}

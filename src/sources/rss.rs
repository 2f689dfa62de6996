//! RSS/Atom/JSON feed fetching and parsing.
//!
//! Feed endpoints are the least well-behaved providers: wrong content types,
//! double compression, broken XML entities, bot-hostile frontends. This module
//! absorbs all of that and, per the source contract, never errors upward.

use anyhow::Result;
use feed_rs::parser;
use reqwest::{cookie::Jar, header};
use serde::Deserialize;
use std::io::{Cursor, Read};
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::SectionConfig;
use crate::environment::get_env_var_as_vec;
use crate::normalize::{FeedEntry, RawItem};
use crate::TARGET_WEB_REQUEST;

pub const REQUEST_TIMEOUT: tokio::time::Duration = tokio::time::Duration::from_secs(10);

/// Helper function to validate a URL
pub fn is_valid_url(url: &str) -> bool {
    if let Ok(parsed) = url::Url::parse(url) {
        parsed.scheme() == "http" || parsed.scheme() == "https"
    } else {
        false
    }
}

/// JSON Feed structure for parsing
#[derive(Debug, Deserialize)]
struct JsonFeed {
    title: Option<String>,
    #[serde(default)]
    items: Vec<JsonFeedItem>,
}

#[derive(Debug, Deserialize)]
struct JsonFeedItem {
    id: Option<String>,
    url: Option<String>,
    title: Option<String>,
    content_text: Option<String>,
    date_published: Option<String>,
}

pub struct RssSource;

impl RssSource {
    pub fn new() -> Self {
        RssSource
    }

    /// Fetch every feed configured for the section (plus any from
    /// `NEWSDESK_EXTRA_FEEDS`) concurrently; failed feeds contribute nothing.
    pub async fn fetch(&self, section: &SectionConfig) -> Vec<RawItem> {
        let mut urls = section.rss_feeds.clone();
        urls.extend(get_env_var_as_vec("NEWSDESK_EXTRA_FEEDS", ';'));

        let fetches = urls.iter().map(|url| fetch_one_feed(url.as_str()));
        futures::future::join_all(fetches)
            .await
            .into_iter()
            .flatten()
            .collect()
    }
}

impl Default for RssSource {
    fn default() -> Self {
        Self::new()
    }
}

async fn fetch_one_feed(url: &str) -> Vec<RawItem> {
    if !is_valid_url(url) {
        debug!(target: TARGET_WEB_REQUEST, "Skipping invalid feed URL: {}", url);
        return Vec::new();
    }

    let response = match fetch_with_fallback(url).await {
        Ok(resp) => resp,
        Err(err) => {
            warn!(target: TARGET_WEB_REQUEST, "Request to {} failed: {}", url, err);
            return Vec::new();
        }
    };

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .map(|s| s.to_lowercase());
    let content_encoding = response
        .headers()
        .get(header::CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.to_lowercase());

    let bytes = match response.bytes().await {
        Ok(b) => b,
        Err(err) => {
            warn!(target: TARGET_WEB_REQUEST, "Failed to read response bytes from {}: {}", url, err);
            return Vec::new();
        }
    };

    let decompressed = decompress_body(&bytes, content_encoding.as_deref(), url);
    let text = decode_text(&decompressed, content_type.as_deref());

    let entries = parse_feed(&text, content_type.as_deref(), url);
    debug!(target: TARGET_WEB_REQUEST, "Feed {} yielded {} entries", url, entries.len());
    entries.into_iter().map(RawItem::Rss).collect()
}

/// Create a client with either standard or browser emulation settings
fn create_http_client() -> Result<reqwest::Client> {
    let cookie_store = Jar::default();
    reqwest::Client::builder()
        .cookie_store(true)
        .cookie_provider(Arc::new(cookie_store))
        .gzip(true)
        .redirect(reqwest::redirect::Policy::default())
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))
}

/// Attempt to fetch a URL with fallback to browser emulation if the standard
/// request fails; some feed hosts reject anything that does not look like a
/// browser.
async fn fetch_with_fallback(url: &str) -> Result<reqwest::Response> {
    let client = create_http_client()?;

    debug!(target: TARGET_WEB_REQUEST, "Attempting standard request to {}", url);
    let standard_result = timeout(
        REQUEST_TIMEOUT,
        client
            .get(url)
            .header(header::USER_AGENT, "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .header(header::ACCEPT, "application/feed+json, application/json, application/rss+xml, application/atom+xml, application/xml, text/xml, */*;q=0.9")
            .header(header::ACCEPT_ENCODING, "gzip, deflate, br")
            .send(),
    )
    .await;

    if let Ok(Ok(resp)) = standard_result {
        if resp.status().is_success() {
            return Ok(resp);
        }
    }

    debug!(target: TARGET_WEB_REQUEST, "Standard request to {} failed, trying browser emulation", url);
    match timeout(
        REQUEST_TIMEOUT,
        client
            .get(url)
            .header(header::USER_AGENT, "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:138.0) Gecko/20100101 Firefox/138.0")
            .header(header::ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .header(header::ACCEPT_ENCODING, "gzip, deflate, br, zstd")
            .header("DNT", "1")
            .header("Upgrade-Insecure-Requests", "1")
            .send(),
    )
    .await
    {
        Ok(Ok(resp)) if resp.status().is_success() => Ok(resp),
        Ok(Ok(resp)) => Err(anyhow::anyhow!("HTTP error after fallback: {}", resp.status())),
        Ok(Err(err)) => Err(anyhow::anyhow!("Request failed after fallback: {}", err)),
        Err(_) => Err(anyhow::anyhow!(
            "Request timed out after {} seconds",
            REQUEST_TIMEOUT.as_secs()
        )),
    }
}

/// Try the decompression methods in order of likelihood; fall back to the
/// original bytes when nothing applies.
fn decompress_body(bytes: &[u8], content_encoding: Option<&str>, url: &str) -> Vec<u8> {
    if content_encoding == Some("br") {
        let mut decoded = Vec::new();
        let mut reader = brotli::Decompressor::new(bytes, 4096);
        if reader.read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
            debug!(target: TARGET_WEB_REQUEST, "Decompressed brotli content from {}", url);
            return decoded;
        }
    }

    let mut decoder = flate2::read::GzDecoder::new(bytes);
    let mut decoded = Vec::new();
    if decoder.read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
        debug!(target: TARGET_WEB_REQUEST, "Decompressed gzip content from {}", url);
        return decoded;
    }

    let mut decoder = flate2::read::ZlibDecoder::new(bytes);
    let mut decoded = Vec::new();
    if decoder.read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
        debug!(target: TARGET_WEB_REQUEST, "Decompressed zlib content from {}", url);
        return decoded;
    }

    let mut decoder = flate2::read::DeflateDecoder::new(bytes);
    let mut decoded = Vec::new();
    if decoder.read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
        debug!(target: TARGET_WEB_REQUEST, "Decompressed deflate content from {}", url);
        return decoded;
    }

    bytes.to_vec()
}

/// Decode feed bytes to text, honoring a charset from the content type and
/// falling back through common legacy encodings.
fn decode_text(bytes: &[u8], content_type: Option<&str>) -> String {
    if let Ok(text) = String::from_utf8(bytes.to_vec()) {
        return text;
    }

    if let Some(ct) = content_type {
        if let Some(charset) = ct
            .split(';')
            .find(|part| part.trim().starts_with("charset="))
            .and_then(|charset| charset.split('=').nth(1))
        {
            if let Some(encoding) = encoding_rs::Encoding::for_label(charset.trim().as_bytes()) {
                let (decoded, _, _) = encoding.decode(bytes);
                return decoded.into_owned();
            }
        }
    }

    let (decoded, _, had_errors) = encoding_rs::WINDOWS_1252.decode(bytes);
    if !had_errors {
        return decoded.into_owned();
    }
    let (decoded, _, had_errors) = encoding_rs::SHIFT_JIS.decode(bytes);
    if !had_errors {
        return decoded.into_owned();
    }
    String::from_utf8_lossy(bytes).into_owned()
}

/// Clean up malformed XML before a reparse attempt.
fn cleanup_xml(xml: &str) -> String {
    let mut cleaned = xml.trim().to_string();

    if cleaned.starts_with('\u{FEFF}') {
        cleaned = cleaned.trim_start_matches('\u{FEFF}').to_string();
    }

    // Drop junk before the document start.
    if let Some(xml_start) = cleaned.find("<?xml") {
        cleaned = cleaned[xml_start..].to_string();
    } else if let Some(rss_start) = cleaned.find("<rss") {
        cleaned = cleaned[rss_start..].to_string();
    } else if let Some(feed_start) = cleaned.find("<feed") {
        cleaned = cleaned[feed_start..].to_string();
    }

    // Replace common problematic entities.
    cleaned = cleaned
        .replace("&nbsp;", "&#160;")
        .replace("&ndash;", "&#8211;")
        .replace("&mdash;", "&#8212;")
        .replace("&rsquo;", "&#8217;")
        .replace("&lsquo;", "&#8216;")
        .replace("&rdquo;", "&#8221;")
        .replace("&ldquo;", "&#8220;")
        .replace("&amp;amp;", "&amp;")
        .replace("&apos;", "&#39;");

    // Strip characters that are not legal in XML.
    cleaned
        .chars()
        .filter(|&c| {
            matches!(c,
                '\u{0009}' | '\u{000A}' | '\u{000D}' |
                '\u{0020}'..='\u{D7FF}' |
                '\u{E000}'..='\u{FFFD}' |
                '\u{10000}'..='\u{10FFFF}'
            )
        })
        .collect()
}

/// Parse a feed body into entries, trying JSON Feed, then XML, then XML after
/// cleanup.
fn parse_feed(text: &str, content_type: Option<&str>, url: &str) -> Vec<FeedEntry> {
    if content_type.is_some_and(|ct| ct.contains("json")) || text.trim_start().starts_with('{') {
        match serde_json::from_str::<JsonFeed>(text) {
            Ok(feed) => {
                let feed_title = feed.title;
                return feed
                    .items
                    .into_iter()
                    .map(|item| FeedEntry {
                        title: item.title,
                        url: item.url.or(item.id),
                        description: item.content_text,
                        published: item.date_published,
                        feed_title: feed_title.clone(),
                    })
                    .collect();
            }
            Err(err) => {
                debug!(target: TARGET_WEB_REQUEST, "JSON feed parse failed for {}: {}", url, err);
            }
        }
    }

    match parser::parse(Cursor::new(text)) {
        Ok(feed) => extract_entries(feed),
        Err(first_err) => {
            let cleaned = cleanup_xml(text);
            if cleaned.contains("<rss") || cleaned.contains("<feed") {
                match parser::parse(Cursor::new(&cleaned)) {
                    Ok(feed) => extract_entries(feed),
                    Err(second_err) => {
                        warn!(
                            target: TARGET_WEB_REQUEST,
                            "Failed to parse feed from {} even after cleanup. First error: {}. Second error: {}",
                            url, first_err, second_err
                        );
                        Vec::new()
                    }
                }
            } else {
                warn!(target: TARGET_WEB_REQUEST, "Content from {} doesn't appear to be RSS or Atom", url);
                Vec::new()
            }
        }
    }
}

fn extract_entries(feed: feed_rs::model::Feed) -> Vec<FeedEntry> {
    let feed_title = feed.title.map(|t| t.content);
    feed.entries
        .into_iter()
        .map(|entry| FeedEntry {
            title: entry.title.map(|t| t.content),
            url: entry.links.first().map(|link| link.href.clone()),
            description: entry.summary.map(|s| s.content),
            published: entry
                .published
                .or(entry.updated)
                .map(|d| d.to_rfc3339()),
            feed_title: feed_title.clone(),
        })
        .collect()
}

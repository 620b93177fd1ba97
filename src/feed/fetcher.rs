use std::time::Duration;

use feed_rs::model::Entry;
use feed_rs::parser;
use futures::stream::{self, StreamExt};
use reqwest::Client;

use crate::config::FeedSource;
use crate::error::{AppError, Result};
use crate::models::{PublishedAt, RawArticle};

const MAX_CONCURRENT_FETCHES: usize = 5;

pub struct FeedFetcher {
    client: Client,
    proxies: Vec<String>,
}

impl FeedFetcher {
    /// `proxies` are URL prefixes; the percent-encoded feed URL is appended.
    pub fn new(proxies: Vec<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("weekly-digest/1.0")
            .build()?;

        Ok(Self { client, proxies })
    }

    /// Direct URL first, then each proxy in configured order.
    pub fn endpoints(&self, url: &str) -> Vec<String> {
        let encoded = urlencoding::encode(url);
        std::iter::once(url.to_string())
            .chain(self.proxies.iter().map(|proxy| format!("{}{}", proxy, encoded)))
            .collect()
    }

    /// Fetch one source, stopping at the first endpoint that yields a feed.
    pub async fn fetch_source(&self, source: &FeedSource) -> Result<Vec<RawArticle>> {
        let mut last_error = None;

        for endpoint in self.endpoints(&source.url) {
            match self.fetch_bytes(&endpoint).await {
                Ok(bytes) => match parser::parse(&bytes[..]) {
                    Ok(feed) => {
                        return Ok(feed
                            .entries
                            .into_iter()
                            .map(|entry| article_from_entry(entry, source))
                            .collect());
                    }
                    Err(e) => {
                        tracing::debug!("Unparsable feed from {}: {}", endpoint, e);
                        last_error = Some(AppError::from(e));
                    }
                },
                Err(e) => {
                    tracing::debug!("Failed to fetch {}: {}", endpoint, e);
                    last_error = Some(e);
                }
            }
        }

        Err(anyhow::anyhow!(
            "All endpoints failed for {}: {}",
            source.url,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )
        .into())
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("HTTP {}", response.status()).into());
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Fetch all sources concurrently; failed sources are logged and skipped.
    pub async fn refresh_all(&self, sources: &[FeedSource]) -> Vec<RawArticle> {
        let results: Vec<Vec<RawArticle>> = stream::iter(sources)
            .map(|source| async move {
                match self.fetch_source(source).await {
                    Ok(articles) => {
                        tracing::debug!("Fetched {} articles from {}", articles.len(), source.name);
                        Some(articles)
                    }
                    Err(e) => {
                        tracing::warn!("Failed to fetch {}: {}", source.url, e);
                        None
                    }
                }
            })
            .buffer_unordered(MAX_CONCURRENT_FETCHES)
            .filter_map(|r| async { r })
            .collect()
            .await;

        results.into_iter().flatten().collect()
    }
}

pub fn article_from_entry(entry: Entry, source: &FeedSource) -> RawArticle {
    // Prefer the summary for the description, fall back to the body
    let description = entry
        .summary
        .as_ref()
        .map(|s| s.content.as_str())
        .or_else(|| entry.content.as_ref().and_then(|c| c.body.as_deref()))
        .and_then(|html| html2text::from_read(html.as_bytes(), 120).ok())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());

    let image_url = entry
        .media
        .iter()
        .flat_map(|m| m.content.iter())
        .find_map(|c| c.url.as_ref().map(|u| u.to_string()))
        .or_else(|| {
            entry
                .media
                .iter()
                .flat_map(|m| m.thumbnails.iter())
                .map(|t| t.image.uri.clone())
                .next()
        });

    RawArticle {
        title: entry
            .title
            .map(|t| t.content)
            .unwrap_or_default(),
        link: entry
            .links
            .first()
            .map(|l| resolve_link(&l.href, &source.url))
            .unwrap_or_default(),
        guid: Some(entry.id).filter(|id| !id.is_empty()),
        published_at: entry.published.or(entry.updated).map(PublishedAt::from),
        description,
        content: entry.content.and_then(|c| c.body),
        categories: entry
            .categories
            .into_iter()
            .map(|c| c.label.unwrap_or(c.term))
            .collect(),
        source_name: Some(source.name.clone()).filter(|s| !s.is_empty()),
        image_url,
    }
}

/// Resolve a potentially relative entry link against the feed URL
fn resolve_link(href: &str, feed_url: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }

    if let Ok(base) = url::Url::parse(feed_url) {
        if let Ok(resolved) = base.join(href) {
            return resolved.to_string();
        }
    }

    href.to_string()
}

//! Reddit fetcher (`/r/{name}/hot.json`).
//!
//! Each item's `author` is the subreddit it came from, which is also how the
//! engine groups results back into per-subreddit lists.

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{send_checked, unescape, FeedItem, Source, SourceFetcher};
use crate::error::FetchError;

const API_BASE: &str = "https://www.reddit.com";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    /// Decoded one by one so a single odd post does not sink the listing.
    children: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    subreddit: String,
    title: String,
    permalink: String,
    #[serde(default)]
    stickied: bool,
}

pub struct RedditSource {
    client: reqwest::Client,
    base_url: String,
}

impl RedditSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, API_BASE)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Decode a listing into items, hottest first, stickied posts dropped.
    pub(crate) fn parse_listing(body: &str, limit: usize) -> Result<Vec<FeedItem>, FetchError> {
        let listing: Listing =
            serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

        let items = listing
            .data
            .children
            .into_iter()
            .filter_map(|child| match serde_json::from_value::<Child>(child) {
                Ok(child) => Some(child.data),
                Err(e) => {
                    debug!(error = %e, "skipping undecodable post");
                    None
                }
            })
            .filter(|post| !post.stickied)
            .map(|post| {
                let url = format!("{API_BASE}{}", post.permalink);
                FeedItem::new(Source::Reddit, post.id, post.subreddit, unescape(&post.title), url)
            })
            .take(limit)
            .collect();

        Ok(items)
    }

    async fn fetch_subreddit(&self, name: &str, limit: usize) -> Result<Vec<FeedItem>, FetchError> {
        let url = format!("{}/r/{name}/hot.json", self.base_url);
        let request = self
            .client
            .get(&url)
            .query(&[("limit", limit.to_string()), ("raw_json", "1".to_string())]);
        let body = send_checked(request).await?.text().await?;
        Self::parse_listing(&body, limit)
    }
}

#[async_trait]
impl SourceFetcher for RedditSource {
    fn source(&self) -> Source {
        Source::Reddit
    }

    async fn fetch(&self, identities: &[String], limit: usize) -> Result<Vec<FeedItem>, FetchError> {
        if identities.is_empty() {
            debug!("no subreddit set");
            return Ok(Vec::new());
        }

        let results = join_all(
            identities
                .iter()
                .map(|name| self.fetch_subreddit(name, limit)),
        )
        .await;

        let mut items = Vec::new();
        let mut last_error = None;
        let mut succeeded = 0;
        for (name, result) in identities.iter().zip(results) {
            match result {
                Ok(posts) => {
                    succeeded += 1;
                    items.extend(posts);
                }
                Err(e) => {
                    warn!(subreddit = %name, error = %e, "subreddit fetch failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if succeeded == 0 => Err(e),
            _ => Ok(items),
        }
    }
}

//! Hacker News fetcher (Firebase API).
//!
//! One request for the top story ids, then one request per story.  Stories
//! that fail to load or decode (deleted, dead, missing title) are skipped.

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use tracing::debug;

use super::{send_checked, unescape, FeedItem, Source, SourceFetcher};
use crate::error::FetchError;

const API_BASE: &str = "https://hacker-news.firebaseio.com/v0";
const AUTHOR: &str = "hn";

#[derive(Debug, Deserialize)]
pub(crate) struct Story {
    id: u64,
    title: String,
}

impl Story {
    fn into_item(self) -> FeedItem {
        let id = self.id.to_string();
        let url = format!("https://news.ycombinator.com/item?id={id}");
        FeedItem::new(Source::HackerNews, id, AUTHOR, unescape(&self.title), url)
    }
}

pub struct HackerNewsSource {
    client: reqwest::Client,
    base_url: String,
}

impl HackerNewsSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, API_BASE)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Decode one `item/{id}.json` payload.
    pub(crate) fn parse_story(body: &str) -> Result<FeedItem, FetchError> {
        serde_json::from_str::<Story>(body)
            .map(Story::into_item)
            .map_err(|e| FetchError::Decode(e.to_string()))
    }

    async fn fetch_story(&self, id: u64) -> Option<FeedItem> {
        let url = format!("{}/item/{id}.json", self.base_url);
        let body = match send_checked(self.client.get(&url)).await {
            Ok(response) => response.text().await.ok()?,
            Err(e) => {
                debug!(story = id, error = %e, "skipping story");
                return None;
            }
        };
        match Self::parse_story(&body) {
            Ok(item) => Some(item),
            Err(e) => {
                debug!(story = id, error = %e, "skipping undecodable story");
                None
            }
        }
    }
}

#[async_trait]
impl SourceFetcher for HackerNewsSource {
    fn source(&self) -> Source {
        Source::HackerNews
    }

    async fn fetch(&self, _identities: &[String], limit: usize) -> Result<Vec<FeedItem>, FetchError> {
        let url = format!("{}/topstories.json", self.base_url);
        let request = self.client.get(&url).query(&[
            ("orderBy", "\"$priority\"".to_string()),
            ("limitToFirst", limit.to_string()),
        ]);
        let mut ids: Vec<u64> = send_checked(request).await?.json().await?;
        ids.truncate(limit);

        let stories = join_all(ids.into_iter().map(|id| self.fetch_story(id))).await;
        Ok(stories.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_story_builds_item() {
        let body = r#"{"by":"pg","id":8863,"score":104,"title":"My YC app: Dropbox &amp; more","type":"story","url":"http://www.getdropbox.com/u/2/screencast.html"}"#;
        let item = HackerNewsSource::parse_story(body).unwrap();

        assert_eq!(item.id, "8863");
        assert_eq!(item.author, "hn");
        assert_eq!(item.title, "My YC app: Dropbox & more");
        assert_eq!(item.url, "https://news.ycombinator.com/item?id=8863");
        assert_eq!(item.source, Source::HackerNews);
    }

    #[test]
    fn parse_story_without_title_is_decode_error() {
        let body = r#"{"id":1,"deleted":true,"type":"story"}"#;
        let err = HackerNewsSource::parse_story(body).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn parse_story_rejects_garbage() {
        assert!(HackerNewsSource::parse_story("null").is_err());
        assert!(HackerNewsSource::parse_story("<html>").is_err());
    }
}

//! Social feed fetcher.
//!
//! Polls per-user RSS feeds as exposed by Mastodon-compatible instances
//! (`{instance}/@{user}.rss`) and keeps only posts inside a short recency
//! window, so the ticker shows what people said just now rather than their
//! whole timeline.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use scraper::{ElementRef, Html};
use tracing::{debug, warn};

use super::{send_checked, unescape, FeedItem, Source, SourceFetcher};
use crate::error::FetchError;

pub struct SocialFeedSource {
    client: reqwest::Client,
    /// Instance base URL, without trailing slash.
    instance: String,
    /// How far back a post may be and still be shown.
    window: Duration,
    /// Optional bearer token for instances that require one.
    token: Option<String>,
}

impl SocialFeedSource {
    pub fn new(client: reqwest::Client, instance: impl Into<String>, window: Duration) -> Self {
        let instance: String = instance.into();
        Self {
            client,
            instance: instance.trim_end_matches('/').to_string(),
            window,
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// Parse an already-fetched [`rss::Channel`] into [`FeedItem`]s for `user`.
    ///
    /// Entries published before `since` are dropped; undated entries are
    /// kept.  Entries with neither guid nor link have no identity and are
    /// skipped.
    pub fn parse_channel(
        channel: &rss::Channel,
        user: &str,
        instance: &str,
        since: DateTime<Utc>,
    ) -> Vec<FeedItem> {
        channel
            .items()
            .iter()
            .filter_map(|item| {
                let id = item
                    .guid()
                    .map(|g| g.value().to_string())
                    .or_else(|| item.link().map(String::from))?;

                let published = item
                    .pub_date()
                    .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
                    .map(|dt| dt.with_timezone(&Utc));
                if published.is_some_and(|p| p < since) {
                    return None;
                }

                // Mastodon posts usually have no <title>; the text is the HTML description.
                let text = match (item.title(), item.description()) {
                    (Some(title), _) => unescape(title),
                    (None, Some(description)) => html_to_text(description),
                    (None, None) => String::new(),
                };
                let title = text.trim().to_string();
                let url = item
                    .link()
                    .map(String::from)
                    .unwrap_or_else(|| format!("{instance}/@{user}"));

                Some(FeedItem::new(Source::SocialFeed, id, user, title, url))
            })
            .collect()
    }

    async fn fetch_user(&self, user: &str, since: DateTime<Utc>) -> Result<Vec<FeedItem>, FetchError> {
        let url = format!("{}/@{user}.rss", self.instance);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let body = send_checked(request).await?.bytes().await?;
        let channel =
            rss::Channel::read_from(body.as_ref()).map_err(|e| FetchError::Decode(e.to_string()))?;
        Ok(Self::parse_channel(&channel, user, &self.instance, since))
    }
}

/// Readable text of an HTML fragment, with `<br>` and `<p>` as line breaks.
fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut text = String::new();
    collect_text(fragment.root_element(), &mut text);
    text
}

fn collect_text(element: ElementRef, text: &mut String) {
    for node in element.children() {
        if let Some(child) = ElementRef::wrap(node) {
            match child.value().name() {
                "br" => push_break(text),
                "p" => {
                    collect_text(child, text);
                    push_break(text);
                }
                _ => collect_text(child, text),
            }
        } else if let Some(fragment) = node.value().as_text() {
            text.push_str(fragment);
        }
    }
}

fn push_break(text: &mut String) {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
}

#[async_trait]
impl SourceFetcher for SocialFeedSource {
    fn source(&self) -> Source {
        Source::SocialFeed
    }

    async fn fetch(&self, identities: &[String], limit: usize) -> Result<Vec<FeedItem>, FetchError> {
        if identities.is_empty() {
            debug!("no social feed user set");
            return Ok(Vec::new());
        }

        let since = Utc::now() - self.window;
        let results = join_all(identities.iter().map(|user| self.fetch_user(user, since))).await;

        let mut items = Vec::new();
        let mut last_error = None;
        let mut succeeded = 0;
        for (user, result) in identities.iter().zip(results) {
            match result {
                Ok(posts) => {
                    succeeded += 1;
                    items.extend(posts);
                }
                Err(e) => {
                    warn!(user = %user, error = %e, "social feed fetch failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if succeeded == 0 => Err(e),
            _ => {
                items.truncate(limit);
                Ok(items)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

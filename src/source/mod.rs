//! Source fetchers and the common [`FeedItem`] type.
//!
//! This module defines the [`SourceFetcher`] trait and the closed [`Source`]
//! enum.  Concrete fetchers live in sub-modules, one per provider:
//! [`hacker_news`], [`reddit`] and [`social`].
//!
//! ## For contributors
//!
//! Fetchers are thin: they do HTTP, decode, and map to `FeedItem`.  They
//! hold no state between calls and never touch history or buffers; the
//! engine owns all of that.  Keep decoding in a pure `parse_*` function so
//! tests can exercise it without the network.

mod feed_item;
mod hacker_news;
mod reddit;
mod social;

pub use feed_item::{FeedItem, Source};
pub use hacker_news::HackerNewsSource;
pub use reddit::RedditSource;
pub use social::SocialFeedSource;

#[cfg(test)]
pub(crate) use feed_item::tests::make_item;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;

/// Upper bound on items returned per request.
pub const MAX_ITEMS_TO_FETCH: usize = 22;

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Trait that every source fetcher implements.
///
/// The engine calls [`fetch()`](SourceFetcher::fetch) from a spawned task,
/// so implementations must be `Send + Sync`.
///
/// Results must be capped at `limit`.  Individual malformed items are
/// skipped; only a total failure is reported as an error.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    fn source(&self) -> Source;

    /// Fetch the latest items for `identities` (user names, subreddits;
    /// ignored by sources that have none), newest first.
    async fn fetch(&self, identities: &[String], limit: usize) -> Result<Vec<FeedItem>, FetchError>;
}

/// One fetcher per source, shared with spawned fetch tasks.
#[derive(Clone)]
pub struct Fetchers {
    pub hacker_news: Arc<dyn SourceFetcher>,
    pub reddit: Arc<dyn SourceFetcher>,
    pub social_feed: Arc<dyn SourceFetcher>,
}

impl Fetchers {
    pub fn get(&self, source: Source) -> Arc<dyn SourceFetcher> {
        match source {
            Source::HackerNews => Arc::clone(&self.hacker_news),
            Source::Reddit => Arc::clone(&self.reddit),
            Source::SocialFeed => Arc::clone(&self.social_feed),
        }
    }
}

/// Build the HTTP client shared by every fetcher.
pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Send a request and turn non-success statuses into a [`FetchError`].
pub(crate) async fn send_checked(
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, FetchError> {
    let response = request.send().await?.error_for_status()?;
    Ok(response)
}

/// Decode the handful of HTML entities providers leave in titles.
pub(crate) fn unescape(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_common_entities() {
        assert_eq!(
            unescape("Tom &amp; Jerry &lt;3 &quot;cheese&quot; &apos;n&apos; &gt;"),
            "Tom & Jerry <3 \"cheese\" 'n' >"
        );
    }

    #[test]
    fn unescape_leaves_plain_text_alone() {
        assert_eq!(unescape("Plain title"), "Plain title");
    }
}

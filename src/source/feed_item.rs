//! The core data type shared across all feed sources.
//!
//! `FeedItem` represents a single headline from any [`Source`].  Every
//! fetcher converts its native payload into `FeedItem`s so the history,
//! interleaving and rotation logic can stay source-agnostic.
//!
//! ## Identity
//!
//! Two items are the same item when `(id, author, title, source)` match.
//! The URL is deliberately left out: Reddit and social feeds occasionally
//! rewrite links for the same post, and we do not want those to reappear.

use std::fmt;
use std::hash::{Hash, Hasher};

/// The fixed set of content providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    HackerNews,
    Reddit,
    SocialFeed,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::HackerNews, Source::Reddit, Source::SocialFeed];

    /// Render the per-source `author: title` template.
    pub fn template(self, author: &str, title: &str) -> String {
        match self {
            Source::SocialFeed => format!("@{author}: {title}").replace('\n', " "),
            Source::HackerNews => format!("{author}: {title}"),
            Source::Reddit => format!("r/{author}: {title}"),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Source::HackerNews => "hacker news",
            Source::Reddit => "reddit",
            Source::SocialFeed => "social feed",
        };
        f.write_str(name)
    }
}

/// A single headline, normalised from any source.  Immutable once built.
#[derive(Debug, Clone)]
pub struct FeedItem {
    /// Provider-side identifier (HN story id, Reddit post id, RSS guid).
    pub id: String,

    /// Who the item is attributed to: `"hn"`, a subreddit, or a user handle.
    pub author: String,

    /// Human-readable headline.
    pub title: String,

    /// Where `open` should navigate to.  Not part of identity.
    pub url: String,

    pub source: Source,
}

impl FeedItem {
    pub fn new(
        source: Source,
        id: impl Into<String>,
        author: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            title: title.into(),
            url: url.into(),
            source,
        }
    }

    /// The uncropped display text, e.g. `"r/rust: Announcing Rust 1.80"`.
    pub fn author_and_title(&self) -> String {
        self.source.template(&self.author, &self.title)
    }
}

// ---------------------------------------------------------------------------
// Identity (url excluded)
// ---------------------------------------------------------------------------

impl PartialEq for FeedItem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.author == other.author
            && self.title == other.title
            && self.source == other.source
    }
}

impl Eq for FeedItem {}

impl Hash for FeedItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.author.hash(state);
        self.title.hash(state);
        self.source.hash(state);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Source buffers and the merge into one display queue.
//!
//! ## Buffer orientation
//!
//! Fetchers return items newest-first.  The Hacker News and Reddit buffers
//! are stored *oldest-first*, so popping from the end yields the newest
//! item without re-sorting.  Everything in here relies on that: every
//! "take next" is a `pop()`.  The social feed buffer is kept in fetch order
//! and copied whole.

use std::collections::HashMap;

use crate::history::HistoryLedger;
use crate::source::{FeedItem, Source};

/// Fetched-but-not-yet-queued items, one holding area per source.
#[derive(Debug, Default, Clone)]
pub struct SourceBuffers {
    /// Oldest-first.
    pub hacker_news: Vec<FeedItem>,
    /// Combined across subreddits, oldest-first.
    pub reddit: Vec<FeedItem>,
    /// Per configured subreddit name, oldest-first.
    pub reddit_by_subreddit: HashMap<String, Vec<FeedItem>>,
    /// Fetch order.
    pub social_feed: Vec<FeedItem>,
}

impl SourceBuffers {
    pub fn clear(&mut self, source: Source) {
        match source {
            Source::HackerNews => self.hacker_news.clear(),
            Source::Reddit => {
                self.reddit.clear();
                self.reddit_by_subreddit.clear();
            }
            Source::SocialFeed => self.social_feed.clear(),
        }
    }

    pub fn clear_all(&mut self) {
        for source in Source::ALL {
            self.clear(source);
        }
    }

    /// Store a fresh Hacker News result (newest-first) as oldest-first.
    pub fn store_hacker_news(&mut self, mut fetched: Vec<FeedItem>, history: &HistoryLedger) {
        history.retain_unseen(&mut fetched);
        fetched.reverse();
        self.hacker_news = fetched;
    }

    /// Store a fresh social feed result as-is, minus anything already shown.
    pub fn store_social_feed(&mut self, mut fetched: Vec<FeedItem>, history: &HistoryLedger) {
        history.retain_unseen(&mut fetched);
        self.social_feed = fetched;
    }

    /// Split a Reddit result per subreddit, then rebuild the combined buffer.
    ///
    /// Items are matched to `subreddits` by case-insensitive name; anything
    /// from a subreddit that is not configured is dropped.
    pub fn store_reddit(
        &mut self,
        fetched: Vec<FeedItem>,
        subreddits: &[String],
        history: &HistoryLedger,
        limit: usize,
    ) {
        let mut by_subreddit: HashMap<String, Vec<FeedItem>> = HashMap::new();
        for item in fetched {
            if history.contains(&item) {
                continue;
            }
            if let Some(name) = subreddits
                .iter()
                .find(|name| name.eq_ignore_ascii_case(&item.author))
            {
                by_subreddit.entry(name.clone()).or_default().push(item);
            }
        }
        for posts in by_subreddit.values_mut() {
            posts.reverse();
        }

        self.reddit = combine_reddit(&by_subreddit, subreddits, history, limit);
        self.reddit_by_subreddit = by_subreddit;
    }
}

/// Draw one item per subreddit in configured order, repeatedly, until every
/// list is exhausted.  Each list is read from its end (newest first).
pub fn round_robin(
    by_subreddit: &HashMap<String, Vec<FeedItem>>,
    subreddits: &[String],
) -> Vec<FeedItem> {
    let mut lists: Vec<Vec<FeedItem>> = subreddits
        .iter()
        .filter_map(|name| by_subreddit.get(name).cloned())
        .collect();

    let mut drawn = Vec::with_capacity(lists.iter().map(Vec::len).sum());
    while lists.iter().any(|list| !list.is_empty()) {
        for list in &mut lists {
            if let Some(item) = list.pop() {
                drawn.push(item);
            }
        }
    }
    drawn
}

/// Build the combined Reddit buffer: round-robin draw, drop already-shown
/// items, keep the first `limit` drawn, then flip to oldest-first.
pub fn combine_reddit(
    by_subreddit: &HashMap<String, Vec<FeedItem>>,
    subreddits: &[String],
    history: &HistoryLedger,
    limit: usize,
) -> Vec<FeedItem> {
    let mut combined = round_robin(by_subreddit, subreddits);
    history.retain_unseen(&mut combined);
    combined.truncate(limit);
    combined.reverse();
    combined
}

/// Merge the buffers into a display queue.
///
/// All social feed items first, in buffer order.  Then, until both are
/// drained: one Hacker News item, followed by up to `subreddit_count`
/// Reddit items.  Buffers are read, not consumed, so the result depends
/// only on the inputs.
pub fn interleave(buffers: &SourceBuffers, subreddit_count: usize) -> Vec<FeedItem> {
    let mut hacker_news = buffers.hacker_news.clone();
    let mut reddit = buffers.reddit.clone();
    // With no subreddits configured a stale Reddit buffer must still drain.
    let reddit_per_round = subreddit_count.max(1);

    let mut queue =
        Vec::with_capacity(buffers.social_feed.len() + hacker_news.len() + reddit.len());
    queue.extend(buffers.social_feed.iter().cloned());

    while !hacker_news.is_empty() || !reddit.is_empty() {
        if let Some(item) = hacker_news.pop() {
            queue.push(item);
        }
        for _ in 0..reddit_per_round {
            match reddit.pop() {
                Some(item) => queue.push(item),
                None => break,
            }
        }
    }
    queue
}

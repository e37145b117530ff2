//! Bounded, insertion-ordered record of recently shown items.
//!
//! The ledger is the dedup authority: anything recorded here is never
//! promoted again and is filtered out of every fetch.  It is only trimmed
//! on its own timer, so it may hold more than [`MAX_HISTORY_ITEMS`] between
//! trims.  Trimmed items are gone for good and may come back in a later
//! fetch.

use std::collections::HashSet;

use crate::source::FeedItem;

/// Size the ledger is cut back to on every trim.
pub const MAX_HISTORY_ITEMS: usize = 4;

#[derive(Debug, Default)]
pub struct HistoryLedger {
    /// Insertion order, oldest first.
    order: Vec<FeedItem>,
    /// Fast membership lookup mirroring `order`.
    seen: HashSet<FeedItem>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, item: &FeedItem) -> bool {
        self.seen.contains(item)
    }

    /// Append `item` unless it is already present.
    pub fn record(&mut self, item: &FeedItem) {
        if self.seen.insert(item.clone()) {
            self.order.push(item.clone());
        }
    }

    /// Keep only the most recent [`MAX_HISTORY_ITEMS`] entries.
    pub fn trim(&mut self) {
        self.trim_to(MAX_HISTORY_ITEMS);
    }

    fn trim_to(&mut self, max: usize) {
        if self.order.len() <= max {
            return;
        }
        let dropped = self.order.len() - max;
        for item in self.order.drain(..dropped) {
            self.seen.remove(&item);
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The last `n` items, newest first.
    pub fn recent(&self, n: usize) -> Vec<FeedItem> {
        self.order.iter().rev().take(n).cloned().collect()
    }

    /// Drop every item of `items` that is already recorded.
    pub fn retain_unseen(&self, items: &mut Vec<FeedItem>) {
        items.retain(|item| !self.contains(item));
    }
}

//! The currently displayed item and the queue it is drawn from.
//!
//! [`RotationController::advance`] is the single step of the rotation state
//! machine.  It never waits and never fetches: it reports what should happen
//! next and the engine acts on it.  Time is passed in so the gate can be
//! tested without a clock.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use crate::history::HistoryLedger;
use crate::source::FeedItem;

/// Scheduler jitter allowance on the minimum interval between promotions.
pub const GATE_SLACK: Duration = Duration::from_secs(1);

/// Outcome of one [`RotationController::advance`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The item is now current.
    Promoted(FeedItem),
    /// Popped but already shown; dropped.
    AlreadyShown(FeedItem),
    /// Popped too soon after the last promotion; dropped, not re-queued.
    Throttled(FeedItem),
    /// Queue is empty and the gate is open: run a full fetch cycle.
    Refill,
    /// Queue is empty and the gate is closed.
    Idle,
}

#[derive(Debug, Default)]
pub struct RotationController {
    current: Option<FeedItem>,
    last_promotion: Option<Instant>,
    queue: VecDeque<FeedItem>,
}

impl RotationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&FeedItem> {
        self.current.as_ref()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Replace the display queue wholesale.
    pub fn replace_queue(&mut self, queue: Vec<FeedItem>) {
        self.queue = queue.into();
    }

    /// At least `interval - 1s` since the last promotion, or none yet.
    pub fn gate_open(&self, interval: Duration, now: Instant) -> bool {
        match self.last_promotion {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= interval.saturating_sub(GATE_SLACK),
        }
    }

    /// Forget the last promotion time so the next step is not throttled.
    pub fn reset_gate(&mut self) {
        self.last_promotion = None;
    }

    /// Count `now` as a rotation step without promoting anything.
    pub fn stamp(&mut self, now: Instant) {
        self.last_promotion = Some(now);
    }

    /// Push the current item into history.  It stays displayed.
    pub fn flush_current(&self, history: &mut HistoryLedger) {
        if let Some(current) = &self.current {
            history.record(current);
        }
    }

    pub fn advance(&mut self, history: &mut HistoryLedger, interval: Duration, now: Instant) -> Step {
        self.flush_current(history);

        let Some(next) = self.queue.pop_front() else {
            return if self.gate_open(interval, now) {
                Step::Refill
            } else {
                Step::Idle
            };
        };

        if history.contains(&next) {
            return Step::AlreadyShown(next);
        }
        if !self.gate_open(interval, now) {
            return Step::Throttled(next);
        }

        self.current = Some(next.clone());
        self.last_promotion = Some(now);
        Step::Promoted(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{make_item, Source};

    const INTERVAL: Duration = Duration::from_secs(120);

    fn queue_of(ids: &[&str]) -> Vec<FeedItem> {
        ids.iter().map(|id| make_item(Source::HackerNews, id)).collect()
    }

    #[test]
    fn first_advance_promotes_front() {
        let mut rotation = RotationController::new();
        let mut history = HistoryLedger::new();
        rotation.replace_queue(queue_of(&["a", "b"]));

        let step = rotation.advance(&mut history, INTERVAL, Instant::now());
        assert_eq!(step, Step::Promoted(make_item(Source::HackerNews, "a")));
        assert_eq!(rotation.current().unwrap().id, "a");
        assert_eq!(rotation.queue_len(), 1);
        assert!(history.is_empty());
    }

    #[test]
    fn next_advance_records_previous_current() {
        let mut rotation = RotationController::new();
        let mut history = HistoryLedger::new();
        rotation.replace_queue(queue_of(&["a", "b"]));
        let t0 = Instant::now();

        rotation.advance(&mut history, INTERVAL, t0);
        let step = rotation.advance(&mut history, INTERVAL, t0 + INTERVAL);

        assert!(matches!(step, Step::Promoted(ref item) if item.id == "b"));
        assert!(history.contains(&make_item(Source::HackerNews, "a")));
    }

    #[test]
    fn promotions_closer_than_interval_minus_slack_are_throttled() {
        let mut rotation = RotationController::new();
        let mut history = HistoryLedger::new();
        rotation.replace_queue(queue_of(&["a", "b", "c"]));
        let t0 = Instant::now();

        assert!(matches!(rotation.advance(&mut history, INTERVAL, t0), Step::Promoted(_)));

        let too_soon = t0 + INTERVAL - GATE_SLACK - Duration::from_millis(1);
        let step = rotation.advance(&mut history, INTERVAL, too_soon);
        assert!(matches!(step, Step::Throttled(ref item) if item.id == "b"));
        assert_eq!(rotation.current().unwrap().id, "a");
        assert_eq!(rotation.queue_len(), 1, "throttled item is not re-queued");

        let just_enough = t0 + INTERVAL - GATE_SLACK;
        assert!(matches!(
            rotation.advance(&mut history, INTERVAL, just_enough),
            Step::Promoted(ref item) if item.id == "c"
        ));
    }

    #[test]
    fn already_shown_items_are_never_promoted() {
        let mut rotation = RotationController::new();
        let mut history = HistoryLedger::new();
        history.record(&make_item(Source::HackerNews, "a"));
        rotation.replace_queue(queue_of(&["a"]));

        let step = rotation.advance(&mut history, INTERVAL, Instant::now());
        assert!(matches!(step, Step::AlreadyShown(_)));
        assert!(rotation.current().is_none());
    }

    #[test]
    fn empty_queue_requests_refill_only_when_gate_open() {
        let mut rotation = RotationController::new();
        let mut history = HistoryLedger::new();
        let t0 = Instant::now();

        assert_eq!(rotation.advance(&mut history, INTERVAL, t0), Step::Refill);

        rotation.stamp(t0);
        assert_eq!(rotation.advance(&mut history, INTERVAL, t0 + Duration::from_secs(5)), Step::Idle);
        assert_eq!(rotation.advance(&mut history, INTERVAL, t0 + INTERVAL), Step::Refill);
    }

    #[test]
    fn reset_gate_unblocks_immediately() {
        let mut rotation = RotationController::new();
        let mut history = HistoryLedger::new();
        rotation.replace_queue(queue_of(&["a", "b"]));
        let t0 = Instant::now();

        rotation.advance(&mut history, INTERVAL, t0);
        rotation.reset_gate();
        assert!(matches!(
            rotation.advance(&mut history, INTERVAL, t0 + Duration::from_secs(1)),
            Step::Promoted(_)
        ));
    }

    #[test]
    fn one_second_interval_has_no_minimum() {
        let rotation = RotationController {
            last_promotion: Some(Instant::now()),
            ..Default::default()
        };
        assert!(rotation.gate_open(Duration::from_secs(1), Instant::now()));
    }
}

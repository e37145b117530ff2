//! The aggregation and rotation engine.
//!
//! ## Architecture overview
//!
//! ```text
//!  timers ─┐                      ┌──────────────┐   watch    ┌─────────┐
//!  (fetch, │   select! loop       │   Engine     │ ─────────► │  app.rs │
//!  trim,   ├────────────────────► │ history      │ Display-   │ (ticker)│
//!  rotate) │                      │ buffers      │ State      └─────────┘
//!          │  PollMsg (channel)   │ rotation     │                 │
//!  poll.rs ┼────────────────────► │ config       │ ◄───────────────┘
//!  (tasks) │                      └──────────────┘   Command (channel)
//! ```
//!
//! Every mutation of history, buffers, queue and current item happens on
//! the one task running [`Engine::run`].  Fetches run elsewhere and come
//! back as messages; commands from the presentation layer do the same.
//!
//! Source fetch timers are completion-anchored: a source is re-armed one
//! period after its last result was applied, not on a fixed wall-clock
//! grid, so a slow fetch pushes the next one back instead of stacking up.
//! The history trim timer, by contrast, ticks on a fixed period.

use std::collections::HashSet;
use std::future;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{ConfigStore, EngineConfig};
use crate::error::EngineError;
use crate::history::{HistoryLedger, MAX_HISTORY_ITEMS};
use crate::interleave::{interleave, SourceBuffers};
use crate::label::display_label;
use crate::poll::{self, FetchJob, FetchResult, PollMsg};
use crate::rotation::{RotationController, Step};
use crate::source::{FeedItem, Fetchers, Source, MAX_ITEMS_TO_FETCH};

/// What the presentation layer sees.  Read-only snapshot, republished after
/// every step of the control loop that changed it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayState {
    /// Cropped label of the current item, if any.
    pub label: Option<String>,
    pub current_url: Option<String>,
    /// Recently shown items, newest first.
    pub recent: Vec<FeedItem>,
    pub silenced: bool,
    /// Items waiting in the display queue.
    pub queued: usize,
    pub max_label_chars: usize,
}

enum Command {
    ApplyConfig {
        config: EngineConfig,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    ToggleSilence,
    Shutdown,
}

/// Cloneable command surface for the engine.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<Command>,
    display: watch::Receiver<DisplayState>,
}

impl EngineHandle {
    /// Validate, persist and apply a new configuration, then run a full
    /// fetch cycle.  Returns once the config has been accepted or rejected.
    pub async fn apply_config(&self, config: EngineConfig) -> Result<(), EngineError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::ApplyConfig { config, reply })
            .map_err(|_| EngineError::Closed)?;
        rx.await.map_err(|_| EngineError::Closed)?
    }

    pub fn toggle_silence(&self) -> Result<(), EngineError> {
        self.commands
            .send(Command::ToggleSilence)
            .map_err(|_| EngineError::Closed)
    }

    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }

    /// URL of the item currently on display.  Navigation is up to the caller.
    pub fn open_current_item_url(&self) -> Option<String> {
        self.display.borrow().current_url.clone()
    }

    pub fn display(&self) -> DisplayState {
        self.display.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.display.clone()
    }
}

/// Per-source fetch deadlines plus the rotation deadline.  `None` means
/// not armed (in flight, or rotation not started yet).
#[derive(Debug, Default)]
struct Timers {
    hacker_news: Option<Instant>,
    reddit: Option<Instant>,
    social_feed: Option<Instant>,
    rotation: Option<Instant>,
}

impl Timers {
    fn slot(&mut self, source: Source) -> &mut Option<Instant> {
        match source {
            Source::HackerNews => &mut self.hacker_news,
            Source::Reddit => &mut self.reddit,
            Source::SocialFeed => &mut self.social_feed,
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

pub struct Engine {
    config: EngineConfig,
    fetchers: Fetchers,
    store: Box<dyn ConfigStore>,
    history: HistoryLedger,
    buffers: SourceBuffers,
    rotation: RotationController,
    silenced: bool,
    timers: Timers,
    in_flight: HashSet<Source>,
    cycle_in_flight: bool,
    /// A full cycle was requested while one was in flight.
    cycle_pending: bool,
    commands: mpsc::UnboundedReceiver<Command>,
    poll_tx: mpsc::UnboundedSender<PollMsg>,
    poll_rx: mpsc::UnboundedReceiver<PollMsg>,
    display: watch::Sender<DisplayState>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        fetchers: Fetchers,
        store: Box<dyn ConfigStore>,
    ) -> (Self, EngineHandle) {
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (poll_tx, poll_rx) = mpsc::unbounded_channel();
        let (display, display_rx) = watch::channel(DisplayState {
            max_label_chars: config.label_chars(),
            ..Default::default()
        });

        let engine = Self {
            config,
            fetchers,
            store,
            history: HistoryLedger::new(),
            buffers: SourceBuffers::default(),
            rotation: RotationController::new(),
            silenced: false,
            timers: Timers::default(),
            in_flight: HashSet::new(),
            cycle_in_flight: false,
            cycle_pending: false,
            commands,
            poll_tx,
            poll_rx,
            display,
        };
        let handle = EngineHandle {
            commands: command_tx,
            display: display_rx,
        };
        (engine, handle)
    }

    /// Run the control loop until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        info!("engine started");
        let start = Instant::now();
        for source in Source::ALL {
            *self.timers.slot(source) = Some(start + self.config.schedule.fetch_period(source));
        }
        let trim_period = self.config.schedule.history_trim_period();
        let mut trim = time::interval_at(start + trim_period, trim_period);
        trim.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.start_cycle();

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(msg) = self.poll_rx.recv() => self.handle_poll(msg),
                _ = wait_until(self.timers.hacker_news) => self.on_fetch_timer(Source::HackerNews),
                _ = wait_until(self.timers.reddit) => self.on_fetch_timer(Source::Reddit),
                _ = wait_until(self.timers.social_feed) => self.on_fetch_timer(Source::SocialFeed),
                _ = wait_until(self.timers.rotation) => self.on_rotation_timer(),
                _ = trim.tick() => {
                    self.history.trim();
                    debug!(len = self.history.len(), "history trimmed");
                }
            }
            self.publish();
        }
        info!("engine stopped");
    }

    // -- commands ------------------------------------------------------------

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::ApplyConfig { config, reply } => {
                let result = self.apply_config(config);
                let applied = result.is_ok();
                let _ = reply.send(result);
                if applied {
                    self.request_cycle();
                }
            }
            Command::ToggleSilence => self.toggle_silence(),
            Command::Shutdown => {}
        }
    }

    fn apply_config(&mut self, config: EngineConfig) -> Result<(), EngineError> {
        config.validate()?;
        self.store.save(&config)?;
        info!(
            sources = ?config.sources,
            subreddits = config.identities.reddit.len(),
            social_users = config.identities.social_feed.len(),
            rotation_secs = config.rotation_interval_secs,
            "config applied"
        );
        // A changed rotation interval takes effect on the next re-arm.
        self.config = config;
        self.rotation.reset_gate();
        Ok(())
    }

    fn toggle_silence(&mut self) {
        self.silenced = !self.silenced;
        self.rotation.flush_current(&mut self.history);
        self.rotation.reset_gate();
        if self.silenced {
            self.buffers.clear_all();
        }
        self.arm_rotation_if_idle(Instant::now());
        info!(silenced = self.silenced, "silence toggled");
    }

    // -- timers --------------------------------------------------------------

    fn on_fetch_timer(&mut self, source: Source) {
        let period = self.config.schedule.fetch_period(source);
        *self.timers.slot(source) = None;

        if self.silenced || !self.config.is_selected(source) {
            debug!(%source, silenced = self.silenced, "fetch skipped");
            self.buffers.clear(source);
            self.rebuild_queue();
            *self.timers.slot(source) = Some(Instant::now() + period);
            return;
        }
        if !self.in_flight.insert(source) {
            debug!(%source, "fetch already in flight");
            return;
        }
        poll::spawn_fetch(self.job(source), self.poll_tx.clone());
    }

    fn on_rotation_timer(&mut self) {
        if self.silenced {
            self.timers.rotation = Some(Instant::now() + self.config.rotation_interval());
            return;
        }
        self.advance(true);
    }

    // -- fetch results -------------------------------------------------------

    fn handle_poll(&mut self, msg: PollMsg) {
        match msg {
            PollMsg::Fetched { source, result } => {
                self.in_flight.remove(&source);
                let period = self.config.schedule.fetch_period(source);
                *self.timers.slot(source) = Some(Instant::now() + period);

                self.apply_result(source, result);
                self.rebuild_queue();
                if self.silenced {
                    self.arm_rotation_if_idle(Instant::now());
                } else {
                    self.advance(true);
                }
            }
            PollMsg::FetchedAll(results) => {
                self.cycle_in_flight = false;
                let now = Instant::now();

                let mut fetched: Vec<Source> = Vec::with_capacity(results.len());
                for (source, result) in results {
                    self.in_flight.remove(&source);
                    fetched.push(source);
                    *self.timers.slot(source) = Some(now + self.config.schedule.fetch_period(source));
                    self.apply_result(source, result);
                }
                for source in Source::ALL {
                    if !fetched.contains(&source) {
                        self.buffers.clear(source);
                    }
                }

                self.rebuild_queue();
                if self.silenced {
                    self.arm_rotation_if_idle(now);
                } else {
                    // A cycle that came back empty waits for the next
                    // rotation tick instead of immediately fetching again.
                    self.advance(false);
                    self.rotation.stamp(Instant::now());
                }

                if self.cycle_pending {
                    self.cycle_pending = false;
                    self.rotation.reset_gate();
                    self.start_cycle();
                }
            }
        }
    }

    /// Store a fetch result into its buffer, or clear the buffer if the
    /// source failed, was deselected, or the engine is silenced.
    fn apply_result(&mut self, source: Source, result: FetchResult) {
        if self.silenced || !self.config.is_selected(source) {
            debug!(%source, "discarding result for inactive source");
            self.buffers.clear(source);
            return;
        }
        let items = match result {
            Ok(items) => items,
            Err(e) => {
                warn!(%source, error = %e, "fetch failed");
                self.buffers.clear(source);
                return;
            }
        };
        debug!(%source, count = items.len(), "fetched");
        match source {
            Source::HackerNews => self.buffers.store_hacker_news(items, &self.history),
            Source::SocialFeed => self.buffers.store_social_feed(items, &self.history),
            Source::Reddit => self.buffers.store_reddit(
                items,
                &self.config.identities.reddit,
                &self.history,
                MAX_ITEMS_TO_FETCH,
            ),
        }
    }

    /// Rebuild the display queue from the buffers, which it consumes.
    fn rebuild_queue(&mut self) {
        let queue = interleave(&self.buffers, self.config.identities.reddit.len());
        self.buffers.clear_all();
        debug!(len = queue.len(), "display queue rebuilt");
        self.rotation.replace_queue(queue);
    }

    // -- rotation ------------------------------------------------------------

    fn advance(&mut self, allow_refill: bool) {
        let interval = self.config.rotation_interval();
        let now = Instant::now();
        match self.rotation.advance(&mut self.history, interval, now) {
            Step::Promoted(item) => info!(source = %item.source, id = %item.id, "promoted"),
            Step::AlreadyShown(item) => debug!(id = %item.id, "skipped already shown item"),
            Step::Throttled(item) => debug!(id = %item.id, "dropped item inside minimum interval"),
            Step::Refill if allow_refill => self.start_cycle(),
            Step::Refill | Step::Idle => {}
        }
        self.timers.rotation = Some(now + interval);
    }

    /// Keep the rotation trigger alive on paths that skip `advance`.
    fn arm_rotation_if_idle(&mut self, now: Instant) {
        if self.timers.rotation.is_none() {
            self.timers.rotation = Some(now + self.config.rotation_interval());
        }
    }

    /// Start a full cycle, or run one as soon as the in-flight cycle lands.
    fn request_cycle(&mut self) {
        if self.cycle_in_flight {
            debug!("fetch cycle queued behind the one in flight");
            self.cycle_pending = true;
        } else {
            self.start_cycle();
        }
    }

    /// Fan out to every active source and rebuild once all have answered.
    fn start_cycle(&mut self) {
        if self.cycle_in_flight {
            debug!("fetch cycle already in flight");
            return;
        }
        let mut jobs: Vec<FetchJob> = Vec::new();
        if !self.silenced {
            for source in Source::ALL {
                if !self.config.is_selected(source) {
                    continue;
                }
                // Sources with their own fetch in flight sit this cycle out.
                if self.in_flight.insert(source) {
                    jobs.push(self.job(source));
                }
            }
        }
        debug!(sources = jobs.len(), "starting fetch cycle");
        self.cycle_in_flight = true;
        poll::spawn_fetch_all(jobs, self.poll_tx.clone());
    }

    fn job(&self, source: Source) -> FetchJob {
        FetchJob {
            fetcher: self.fetchers.get(source),
            identities: self.config.identities_for(source).to_vec(),
        }
    }

    // -- presentation --------------------------------------------------------

    fn publish(&self) {
        let max_chars = self.config.label_chars();
        let current = self.rotation.current();
        let next = DisplayState {
            label: current.map(|item| display_label(item, max_chars)),
            current_url: current.map(|item| item.url.clone()),
            recent: self.history.recent(MAX_HISTORY_ITEMS),
            silenced: self.silenced,
            queued: self.rotation.queue_len(),
            max_label_chars: max_chars,
        };
        self.display.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            *state = next;
            true
        });
    }
}

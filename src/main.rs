//! barbell: a terminal ticker that rotates one headline at a time from
//! Hacker News, Reddit and social feeds.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────┐  PollMsg   ┌───────────┐  DisplayState  ┌──────────┐  draw()  ┌─────────┐
//! │  poll.rs │ ─────────► │ engine.rs │ ─────────────► │  app.rs  │ ───────► │  ui.rs  │
//! │ (tasks)  │  (channel) │  (loop)   │    (watch)     │ (state)  │          │(render) │
//! └──────────┘            └───────────┘                └──────────┘          └─────────┘
//!                               ▲                           ▲
//!                               │ EngineHandle              │ handle_key_event()
//!                               └─────────── main ◄── ┌──────────┐
//!                                            (Action) │ input.rs │
//!                                                     └──────────┘
//! ```
//!
//! * **`source/`**: the `SourceFetcher` trait and the three fetchers.
//! * **`history`**, **`interleave`**, **`rotation`**, **`label`**: the
//!   pieces the engine steps through on every event.
//! * **`engine`**: owns all feed state and runs the control loop on tokio.
//! * **`app`** / **`ui`** / **`input`**: the terminal front end.
//! * **`main`**: wires everything together: parse args, set up logging and
//!   the terminal, and run the event loop.

mod app;
mod config;
mod engine;
mod error;
mod history;
mod input;
mod interleave;
mod label;
mod poll;
mod rotation;
mod source;
mod ui;

use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use app::App;
use config::{parse_identities, ConfigStore, EngineConfig, TomlConfigStore};
use engine::{Engine, EngineHandle};
use input::Action;
use source::{Fetchers, HackerNewsSource, RedditSource, SocialFeedSource};

#[derive(Parser, Debug)]
#[command(name = "barbell", version, about)]
struct Cli {
    /// Config file (default: platform config dir, barbell/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log scheduling decisions
    #[arg(long)]
    debug: bool,

    /// Seconds between headlines, this run only
    #[arg(long, value_name = "SECS")]
    rotation_interval: Option<u64>,

    /// Maximum label width in characters, this run only
    #[arg(long, value_name = "N")]
    max_chars: Option<usize>,

    /// Comma-separated subreddits, replacing the configured list
    #[arg(long, value_name = "LIST")]
    subreddits: Option<String>,

    /// Comma-separated social feed users, replacing the configured list
    #[arg(long, value_name = "LIST")]
    social_users: Option<String>,

    /// Bearer token for the social feed instance
    #[arg(long, env = "BARBELL_SOCIAL_TOKEN", hide_env_values = true)]
    social_token: Option<String>,
}

// ---------------------------------------------------------------------------
// RAII terminal guard
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
///
/// Constructing this struct enters raw mode + alternate screen.  When the
/// value is dropped (normally or during stack unwinding) it restores the
/// terminal.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Install a panic hook that restores the terminal before printing the
/// panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Log to a daily file; the terminal belongs to the UI.  The returned guard
/// flushes the writer and must live until exit.
fn init_logging(debug: bool) -> Result<WorkerGuard> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("barbell")
        .join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "barbell.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_filter = if debug { "barbell=debug" } else { "barbell=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(non_blocking),
        )
        .init();

    info!(dir = %log_dir.display(), "logging initialized");
    Ok(guard)
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Hand a URL to the platform opener.  Failures are logged, never fatal.
fn open_url(url: &str) {
    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        Command::new("xdg-open")
    };
    let spawned = command
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    if let Err(e) = spawned {
        warn!(%url, error = %e, "could not open url");
    }
}

fn perform(
    action: Action,
    app: &mut App,
    handle: &EngineHandle,
    store: &TomlConfigStore,
    rt: &tokio::runtime::Runtime,
) {
    match action {
        Action::ToggleSilence => {
            if let Err(e) = handle.toggle_silence() {
                app.status = format!("Error: {e}");
            }
        }
        Action::OpenCurrent => match handle.open_current_item_url() {
            Some(url) => open_url(&url),
            None => app.status = "Nothing to open".into(),
        },
        Action::Open(url) => open_url(&url),
        Action::ReloadConfig => {
            app.status = match reload(handle, store, rt) {
                Ok(()) => format!("Reloaded {}", store.path().display()),
                Err(e) => format!("Error: {e}"),
            };
        }
    }
}

fn reload(handle: &EngineHandle, store: &TomlConfigStore, rt: &tokio::runtime::Runtime) -> Result<()> {
    let config = store.load()?;
    rt.block_on(handle.apply_config(config))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.debug)?;
    install_panic_hook();

    // -- configuration -------------------------------------------------------
    let path = cli.config.clone().unwrap_or_else(TomlConfigStore::default_path);
    let store = TomlConfigStore::new(&path);
    let mut config: EngineConfig = store
        .load()
        .with_context(|| format!("loading config from {}", path.display()))?;
    if let Some(secs) = cli.rotation_interval {
        config.rotation_interval_secs = secs;
    }
    if let Some(n) = cli.max_chars {
        config.max_label_chars = n;
    }
    if let Some(raw) = &cli.subreddits {
        config.identities.reddit = parse_identities(raw);
    }
    if let Some(raw) = &cli.social_users {
        config.identities.social_feed = parse_identities(raw);
    }
    config.validate()?;
    info!(path = %path.display(), ?config, "config loaded");

    // -- fetchers ------------------------------------------------------------
    let client = source::http_client()?;
    let window = chrono::Duration::from_std(Duration::from_secs(config.social.window_secs))
        .context("social feed window out of range")?;
    let fetchers = Fetchers {
        hacker_news: Arc::new(HackerNewsSource::new(client.clone())),
        reddit: Arc::new(RedditSource::new(client.clone())),
        social_feed: Arc::new(
            SocialFeedSource::new(client, config.social.instance.clone(), window)
                .with_token(cli.social_token.clone()),
        ),
    };

    // -- engine --------------------------------------------------------------
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    let (engine, handle) = Engine::new(config, fetchers, Box::new(TomlConfigStore::new(&path)));
    let engine_task = rt.spawn(engine.run());

    // -- terminal setup (RAII: Drop restores on exit or panic) ---------------
    let mut guard = TerminalGuard::new()?;
    let mut app = App::new();

    let mut display_rx = handle.subscribe();
    app.update(handle.display());

    // -- main event loop -----------------------------------------------------
    // Runs at ~10 fps (100 ms tick).  Each iteration:
    //   1. Take the engine snapshot if it changed.
    //   2. Render the UI.
    //   3. Poll for keyboard input (non-blocking, up to tick_rate).
    let tick_rate = Duration::from_millis(100);

    loop {
        // 1. Snapshot
        if display_rx.has_changed().unwrap_or(false) {
            app.update(display_rx.borrow_and_update().clone());
        }

        // 2. Render
        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        // 3. Handle input
        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if let Some(action) = input::handle_key_event(&mut app, key) {
                    perform(action, &mut app, &handle, &store, &rt);
                }
            }
        }

        if app.quit {
            break;
        }
    }

    handle.shutdown();
    if let Err(e) = rt.block_on(engine_task) {
        warn!(error = %e, "engine task ended abnormally");
    }
    info!("bye");

    // `guard` is dropped here, restoring the terminal.
    Ok(())
}

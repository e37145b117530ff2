use ratatui::widgets::ListState;

use crate::engine::DisplayState;

/// Shown until the first item is on display.
const FETCHING: &str = "Fetching…";

/// Terminal-side state.  The engine owns everything that matters; this only
/// holds the latest snapshot and what the user is pointing at.
pub struct App {
    /// Latest snapshot published by the engine.
    pub display: DisplayState,
    /// Selection in the recently-shown list.
    pub list_state: ListState,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Last action or error message.
    pub status: String,
}

impl App {
    pub fn new() -> Self {
        Self {
            display: DisplayState::default(),
            list_state: ListState::default(),
            quit: false,
            status: FETCHING.into(),
        }
    }

    /// Take a fresh engine snapshot, keeping the selection in range.
    pub fn update(&mut self, display: DisplayState) {
        if display.label.is_some() && self.status == FETCHING {
            self.status.clear();
        }
        self.display = display;
        let len = self.display.recent.len();
        match self.list_state.selected() {
            Some(_) if len == 0 => self.list_state.select(None),
            Some(i) if i >= len => self.list_state.select(Some(len - 1)),
            _ => {}
        }
    }

    /// URL of the highlighted recently-shown item.
    pub fn selected_url(&self) -> Option<&str> {
        let i = self.list_state.selected()?;
        self.display.recent.get(i).map(|item| item.url.as_str())
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_next(&mut self) {
        let len = self.display.recent.len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(len - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        if self.display.recent.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_first(&mut self) {
        if !self.display.recent.is_empty() {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        if !self.display.recent.is_empty() {
            self.list_state.select(Some(self.display.recent.len() - 1));
        }
    }
}

//! Keyboard input handling.
//!
//! Maps terminal key events to [`App`] mutations.  Keys that need the engine
//! or the outside world come back as an [`Action`] for the event loop in
//! `main` to carry out.
//!
//! ## For contributors
//!
//! To add a new keybinding:
//!
//! 1. Add a method on [`App`] or a variant on [`Action`].
//! 2. Add a `KeyCode` match arm in [`handle_key_event`].
//! 3. Update the help text in `ui::draw_status_bar`.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::app::App;

/// Work the event loop performs on behalf of a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ToggleSilence,
    /// Open the item currently on display.
    OpenCurrent,
    /// Open a URL picked from the recently-shown list.
    Open(String),
    /// Re-read the config file and apply it.
    ReloadConfig,
}

/// Process a single key event, updating app state accordingly.
///
/// Only reacts to key-press events (ignoring release / repeat) so that each
/// physical keypress triggers exactly one action.
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit = true,
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        KeyCode::Char('s') => return Some(Action::ToggleSilence),
        KeyCode::Char('o') => return Some(Action::OpenCurrent),
        KeyCode::Char('r') => return Some(Action::ReloadConfig),
        KeyCode::Enter => return app.selected_url().map(|url| Action::Open(url.to_string())),
        _ => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DisplayState;
    use crate::source::{FeedItem, Source};
    use crossterm::event::{KeyEventState, KeyModifiers};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_with_history() -> App {
        let mut app = App::new();
        app.update(DisplayState {
            recent: vec![
                FeedItem::new(Source::Reddit, "a", "rust", "first", "https://r/a"),
                FeedItem::new(Source::Reddit, "b", "rust", "second", "https://r/b"),
            ],
            ..Default::default()
        });
        app
    }

    #[test]
    fn q_and_esc_quit() {
        for code in [KeyCode::Char('q'), KeyCode::Esc] {
            let mut app = App::new();
            assert_eq!(handle_key_event(&mut app, press(code)), None);
            assert!(app.quit);
        }
    }

    #[test]
    fn engine_keys_return_actions() {
        let mut app = App::new();
        assert_eq!(
            handle_key_event(&mut app, press(KeyCode::Char('s'))),
            Some(Action::ToggleSilence)
        );
        assert_eq!(
            handle_key_event(&mut app, press(KeyCode::Char('o'))),
            Some(Action::OpenCurrent)
        );
        assert_eq!(
            handle_key_event(&mut app, press(KeyCode::Char('r'))),
            Some(Action::ReloadConfig)
        );
        assert!(!app.quit);
    }

    #[test]
    fn enter_opens_selected_history_item() {
        let mut app = app_with_history();
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Enter)), None);

        handle_key_event(&mut app, press(KeyCode::Char('G')));
        assert_eq!(
            handle_key_event(&mut app, press(KeyCode::Enter)),
            Some(Action::Open("https://r/b".into()))
        );
    }

    #[test]
    fn navigation_keys_move_selection() {
        let mut app = app_with_history();
        handle_key_event(&mut app, press(KeyCode::Char('j')));
        assert_eq!(app.list_state.selected(), Some(0));
        handle_key_event(&mut app, press(KeyCode::Down));
        assert_eq!(app.list_state.selected(), Some(1));
        handle_key_event(&mut app, press(KeyCode::Char('k')));
        assert_eq!(app.list_state.selected(), Some(0));
        handle_key_event(&mut app, press(KeyCode::End));
        assert_eq!(app.list_state.selected(), Some(1));
        handle_key_event(&mut app, press(KeyCode::Home));
        assert_eq!(app.list_state.selected(), Some(0));
    }

    #[test]
    fn key_release_is_ignored() {
        let mut app = App::new();
        let release = KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(handle_key_event(&mut app, release), None);
        assert!(!app.quit);
    }
}

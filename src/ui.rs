//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).
//!
//! ## For contributors
//!
//! * The layout is a three-row split: the ticker (the one label the engine
//!   is currently showing), the recently-shown list, and a one-line status
//!   bar.
//! * Colours and styles are defined inline.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::app::App;
use crate::label::{crop, HISTORY_LABEL_CHARS};

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let [ticker_area, recent_area, status_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_ticker(app, frame, ticker_area);
    draw_recent(app, frame, recent_area);
    draw_status_bar(app, frame, status_area);
}

/// Render the current display label.
fn draw_ticker(app: &App, frame: &mut Frame, area: Rect) {
    let line = match &app.display.label {
        Some(label) => Line::from(Span::styled(
            label.as_str(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        None => Line::from(Span::styled("waiting for items", Style::default().fg(Color::DarkGray))),
    };

    let title = if app.display.silenced {
        " Barbell (silenced) "
    } else {
        " Barbell "
    };
    let ticker = Paragraph::new(line).block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(ticker, area);
}

/// Render the recently-shown list, newest first.
fn draw_recent(app: &mut App, frame: &mut Frame, area: Rect) {
    let list_items: Vec<ListItem> = app
        .display
        .recent
        .iter()
        .map(|item| {
            let line = Line::from(vec![
                Span::styled(
                    crop(&item.author_and_title(), HISTORY_LABEL_CHARS),
                    Style::default().fg(Color::White),
                ),
                Span::raw("  "),
                Span::styled(format!("[{}]", item.source), Style::default().fg(Color::Cyan)),
            ]);
            ListItem::new(line)
        })
        .collect();

    let list = List::new(list_items)
        .block(
            Block::default()
                .title(" Recently shown ")
                .borders(Borders::ALL),
        )
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

/// Render the bottom status bar.
fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let status = Paragraph::new(Line::from(vec![
        Span::styled(" ", Style::default()),
        Span::styled(&app.status, Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(
            format!("{} queued", app.display.queued),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  q: quit  o: open  s: silence  r: reload  ↑/↓ Enter: history"),
    ]));
    frame.render_widget(status, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DisplayState;
    use crate::source::{FeedItem, Source};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn render(app: &mut App) -> String {
        let backend = TestBackend::new(100, 12);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(app, f)).unwrap();
        let buf = terminal.backend().buffer().clone();
        buf.content()
            .iter()
            .map(|c| c.symbol().chars().next().unwrap_or(' '))
            .collect()
    }

    #[test]
    fn draw_does_not_panic_when_empty() {
        let mut app = App::new();
        let text = render(&mut app);
        assert!(text.contains("waiting for items"));
    }

    #[test]
    fn draw_shows_label_history_and_queue() {
        let mut app = App::new();
        app.update(DisplayState {
            label: Some("r/rust: Announcing...".into()),
            recent: vec![FeedItem::new(Source::HackerNews, "1", "hn", "Older story", "")],
            queued: 7,
            ..Default::default()
        });
        app.select_first();

        let text = render(&mut app);
        assert!(text.contains("r/rust: Announcing..."));
        assert!(text.contains("hn: Older story"));
        assert!(text.contains("[hacker news]"));
        assert!(text.contains("7 queued"));
    }

    #[test]
    fn draw_marks_silenced() {
        let mut app = App::new();
        app.update(DisplayState {
            silenced: true,
            ..Default::default()
        });
        assert!(render(&mut app).contains("(silenced)"));
    }
}

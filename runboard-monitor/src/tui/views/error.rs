//! Error screen shown for API and poll failures.

use crossterm::event::KeyCode;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::tui::command::Command;
use crate::tui::event::Event;
use crate::tui::navigation::NavigationIntent;
use crate::tui::ui::centered_rect;
use crate::tui::view::{Update, View};

pub struct ErrorView {
    error: String,
    message: String,
    recoverable: bool,
}

impl ErrorView {
    pub fn new(error: String, message: String, recoverable: bool) -> Self {
        Self {
            error,
            message,
            recoverable,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }
}

impl View for ErrorView {
    fn name(&self) -> &'static str {
        "error"
    }

    fn update(&mut self, event: &Event) -> Update {
        match event {
            // Back on a recoverable error resumes (and so retries) the
            // previous screen; a fatal error has nothing below it.
            Event::Key(key) if matches!(key.code, KeyCode::Enter | KeyCode::Esc) => {
                Update::command(Command::Navigate(NavigationIntent::Back))
            }
            _ => Update::none(),
        }
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let area = centered_rect(60, 40, area);
        frame.render_widget(Clear, area);

        let action = if self.recoverable {
            "Press Enter to go back and retry"
        } else {
            "Press Enter to return to the dashboard"
        };
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                self.error.clone(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(self.message.clone()),
            Line::from(""),
            Line::from(Span::styled(action, Style::default().fg(Color::DarkGray))),
        ];
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red))
                    .title(" Error ")
                    .title_alignment(Alignment::Center),
            );
        frame.render_widget(paragraph, area);
    }

    fn hints(&self) -> &'static str {
        "enter/esc:back  q:home  Q:quit"
    }
}

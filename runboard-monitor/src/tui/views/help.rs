//! Help screen showing keybindings

use crossterm::event::KeyCode;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::tui::command::Command;
use crate::tui::event::Event;
use crate::tui::keys::KeyAction;
use crate::tui::navigation::NavigationIntent;
use crate::tui::ui::centered_rect;
use crate::tui::view::{Update, View};

/// Per-screen keys that the registry leaves to the views.
const SCREEN_SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Dashboard:",
        &[
            ("j / k / Down / Up", "Move selection"),
            ("Enter", "Open run details"),
            ("L", "All runs"),
            ("s", "Status"),
        ],
    ),
    (
        "New run / Bulk create:",
        &[
            ("Tab / Shift+Tab", "Next / previous field"),
            ("Ctrl+T", "Toggle run / plan"),
            ("Ctrl+P", "Cycle recent repositories"),
            ("Enter / Ctrl+S", "Submit"),
            ("Esc", "Cancel"),
        ],
    ),
    (
        "Run details:",
        &[
            ("x", "Cancel polling"),
            ("y", "Copy run id"),
            ("Esc", "Back"),
        ],
    ),
    (
        "All runs:",
        &[
            ("j / k", "Move selection"),
            ("h / l / Left / Right", "Previous / next page"),
            ("Enter", "Open run details"),
        ],
    ),
];

pub struct HelpView {
    bindings: Vec<(String, KeyAction)>,
    scroll: u16,
}

impl HelpView {
    pub fn new(bindings: Vec<(String, KeyAction)>) -> Self {
        Self {
            bindings,
            scroll: 0,
        }
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let mut lines = vec![Line::from(Span::styled("Global:", bold))];
        for (key, action) in &self.bindings {
            if *action == KeyAction::Ignore {
                continue;
            }
            lines.push(Line::from(format!("  {:<22} {}", key, action.description())));
        }
        for (title, keys) in SCREEN_SECTIONS {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(*title, bold)));
            for (key, description) in keys.iter() {
                lines.push(Line::from(format!("  {:<22} {}", key, description)));
            }
        }
        lines
    }
}

impl View for HelpView {
    fn name(&self) -> &'static str {
        "help"
    }

    fn update(&mut self, event: &Event) -> Update {
        if let Event::Key(key) = event {
            match key.code {
                KeyCode::Char('j') | KeyCode::Down => {
                    let max = self.lines().len().saturating_sub(1) as u16;
                    self.scroll = (self.scroll + 1).min(max);
                }
                KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
                KeyCode::Esc | KeyCode::Enter => {
                    return Update::command(Command::Navigate(NavigationIntent::Back))
                }
                _ => {}
            }
        }
        Update::none()
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let area = centered_rect(70, 80, area);

        // Clear the area first
        frame.render_widget(Clear, area);

        let help = Paragraph::new(self.lines())
            .scroll((self.scroll, 0))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Help ")
                    .title_alignment(Alignment::Center),
            )
            .style(Style::default().fg(Color::White));

        frame.render_widget(help, area);
    }

    fn hints(&self) -> &'static str {
        "j/k:scroll  esc:close"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::keys::KeyRegistry;
    use crate::tui::test_support::render_to_string;
    use crossterm::event::{KeyEvent, KeyModifiers};

    fn help() -> HelpView {
        HelpView::new(KeyRegistry::default().bindings())
    }

    #[test]
    fn test_lists_registry_bindings() {
        let screen = render_to_string(120, 60, |frame, area| help().render(frame, area));

        assert!(screen.contains("ctrl+c"));
        assert!(screen.contains("Quit immediately"));
        assert!(screen.contains("Run details:"));
        assert!(!screen.contains("ctrl+z"), "ignored keys are not advertised");
    }

    #[test]
    fn test_scroll_is_clamped() {
        let mut view = help();
        view.update(&Event::Key(KeyEvent::new(KeyCode::Up, KeyModifiers::NONE)));
        assert_eq!(view.scroll(), 0);

        for _ in 0..500 {
            view.update(&Event::Key(KeyEvent::new(KeyCode::Char('j'), KeyModifiers::NONE)));
        }
        assert_eq!(view.scroll() as usize, view.lines().len() - 1);
    }

    #[test]
    fn test_help_fits_in_reasonable_terminal_sizes() {
        for (width, height) in [(80, 24), (120, 40), (40, 15)] {
            let screen = render_to_string(width, height, |frame, area| help().render(frame, area));
            assert!(screen.contains("Help"), "help renders at {}x{}", width, height);
        }
    }

    #[test]
    fn test_esc_closes() {
        let mut view = help();
        assert!(matches!(
            view.update(&Event::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE))),
            Update::Continue(Some(Command::Navigate(NavigationIntent::Back)))
        ));
    }
}

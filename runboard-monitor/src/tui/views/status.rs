//! Connection and cache diagnostics.

use std::sync::Arc;

use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use runboard_data::{format_duration, CacheStats};

use crate::tui::command::Command;
use crate::tui::context::AppContext;
use crate::tui::event::Event;
use crate::tui::navigation::NavigationIntent;
use crate::tui::view::{Update, View};

pub struct StatusView {
    ctx: Arc<AppContext>,
    stats: CacheStats,
    active_polls: usize,
}

impl StatusView {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        let stats = ctx.cache().stats();
        let active_polls = ctx.polls.active_count();
        Self {
            ctx,
            stats,
            active_polls,
        }
    }

    fn refresh(&mut self) {
        self.stats = self.ctx.cache().stats();
        self.active_polls = self.ctx.polls.active_count();
    }
}

fn row(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<18}", label), Style::default().fg(Color::DarkGray)),
        Span::raw(value),
    ])
}

fn heading(text: &'static str) -> Line<'static> {
    Line::from(Span::styled(
        text,
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ))
}

impl View for StatusView {
    fn name(&self) -> &'static str {
        "status"
    }

    /// Counters are sampled, not pushed; re-read them whenever shown.
    fn init(&mut self) -> Option<Command> {
        self.refresh();
        None
    }

    fn update(&mut self, event: &Event) -> Update {
        match event {
            Event::Key(key) if key.code == KeyCode::Esc => {
                Update::command(Command::Navigate(NavigationIntent::Back))
            }
            Event::Tick => {
                self.refresh();
                Update::none()
            }
            _ => Update::none(),
        }
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let session = &self.ctx.session;
        let user = match &session.identity {
            Some(identity) => match &identity.email {
                Some(email) => format!("{} <{}>", identity.username, email),
                None => identity.username.clone(),
            },
            None => "anonymous (not authenticated)".to_string(),
        };
        let connection = vec![
            heading("Session"),
            row("User", user),
            row("Endpoint", session.endpoint.clone()),
            row(
                "Bulk create",
                if self.ctx.repo.supports_bulk() { "supported" } else { "unavailable" }.to_string(),
            ),
            Line::from(""),
            heading("Polling"),
            row("Base interval", format_duration(self.ctx.poll_config.base_interval.as_secs() as i64)),
            row("Max interval", format_duration(self.ctx.poll_config.max_interval.as_secs() as i64)),
            row("Backoff factor", format!("{:.2}", self.ctx.poll_config.backoff_factor)),
            row("Timeout", format_duration(self.ctx.poll_config.timeout.as_secs() as i64)),
            row("Active polls", self.active_polls.to_string()),
        ];
        frame.render_widget(
            Paragraph::new(connection).block(Block::default().borders(Borders::ALL).title(" Status ")),
            chunks[0],
        );

        let cache = vec![
            heading("Cache"),
            row("Runs", format!("{} ({} valid)", self.stats.runs, self.stats.valid_runs)),
            row("List pages", self.stats.list_pages.to_string()),
            row("Context keys", self.stats.context_keys.to_string()),
            row(
                "Identity",
                if self.stats.has_identity { "cached" } else { "none" }.to_string(),
            ),
            row("Run TTL", format_duration(self.ctx.cache().run_ttl().as_secs() as i64)),
            Line::from(""),
            heading("Recent repositories"),
        ]
        .into_iter()
        .chain(
            self.ctx
                .cache()
                .recent_repositories()
                .into_iter()
                .map(|repo| Line::from(format!("  {}", repo))),
        )
        .collect::<Vec<_>>();
        frame.render_widget(
            Paragraph::new(cache).block(Block::default().borders(Borders::ALL).title(" Cache ")),
            chunks[1],
        );
    }

    fn hints(&self) -> &'static str {
        "esc/b:back  q:home  ?:help"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::context::testing::context;
    use crate::tui::test_support::render_to_string;
    use runboard_data::fake::make_run;
    use runboard_data::RunStatus;

    #[test]
    fn test_init_resamples_counters() {
        let t = context();
        let mut view = StatusView::new(t.ctx.clone());
        assert_eq!(view.stats.runs, 0);

        t.cache.set_run(make_run("r1", RunStatus::Done));
        view.init();

        assert_eq!(view.stats.runs, 1);
    }

    #[test]
    fn test_render_shows_session_and_cache() {
        let t = context();
        t.cache.record_repository("acme/widgets");
        let view = StatusView::new(t.ctx);

        let screen = render_to_string(120, 24, |frame, area| view.render(frame, area));

        assert!(screen.contains("anonymous"));
        assert!(screen.contains("fake://runboard"));
        assert!(screen.contains("unavailable"));
        assert!(screen.contains("acme/widgets"));
    }
}

//! Run details with live status polling.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arboard::Clipboard;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use runboard_data::{format_duration, ApiError, PollError, Run, RunLookup};
use tracing::{debug, info};

use crate::tui::command::Command;
use crate::tui::context::AppContext;
use crate::tui::event::{Event, PollMessage};
use crate::tui::navigation::NavigationIntent;
use crate::tui::view::{Update, View};
use crate::tui::widgets::{poll_gauge, status_indicator};

pub struct DetailsView {
    ctx: Arc<AppContext>,
    run_id: String,
    run: Option<Run>,
    poll_id: Option<u64>,
    polling: bool,
    poll_started: Option<Instant>,
    next_in: Option<Duration>,
    retry: Option<String>,
    notice: Option<String>,
    tick: usize,
}

impl DetailsView {
    pub fn new(ctx: Arc<AppContext>, run_id: String, snapshot: Option<Run>) -> Self {
        Self {
            ctx,
            run_id,
            run: snapshot,
            poll_id: None,
            polling: false,
            poll_started: None,
            next_in: None,
            retry: None,
            notice: None,
            tick: 0,
        }
    }

    pub fn run(&self) -> Option<&Run> {
        self.run.as_ref()
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn poll_id(&self) -> Option<u64> {
        self.poll_id
    }

    fn start_poll(&mut self) -> Command {
        let (poll_id, token) = self.ctx.polls.start(&self.run_id, &self.ctx.shutdown);
        self.poll_id = Some(poll_id);
        self.polling = true;
        self.poll_started = Some(Instant::now());
        self.retry = None;
        debug!(run_id = %self.run_id, poll_id, "starting poll");

        let ctx = self.ctx.clone();
        let run_id = self.run_id.clone();
        Command::perform(async move {
            let config = ctx.poll_config;
            let updates = ctx.events.clone();
            let retries = ctx.events.clone();
            let result = ctx
                .repo
                .poll_run(
                    &run_id,
                    config,
                    token,
                    move |run: &Run| {
                        let next_in = (!run.is_terminal()).then_some(config.base_interval);
                        let tick = Event::Poll(PollMessage::Tick {
                            poll_id,
                            run: run.clone(),
                            next_in,
                        });
                        if updates.send(tick).is_err() {
                            debug!(poll_id, "event loop gone, dropping poll update");
                        }
                    },
                    move |error: &ApiError, wait| {
                        let retrying = Event::Poll(PollMessage::Retrying {
                            poll_id,
                            error: error.to_string(),
                            next_in: wait,
                        });
                        if retries.send(retrying).is_err() {
                            debug!(poll_id, "event loop gone, dropping retry notice");
                        }
                    },
                )
                .await;
            ctx.polls.finish(&run_id, poll_id);
            Event::Poll(PollMessage::Finished { poll_id, result })
        })
    }

    fn cancel_poll(&mut self) {
        if let Some(poll_id) = self.poll_id {
            if self.ctx.polls.cancel(&self.run_id, poll_id) {
                info!(run_id = %self.run_id, poll_id, "poll cancelled by user");
            }
        }
    }

    fn copy_id(&mut self) {
        let copied = Clipboard::new().and_then(|mut clipboard| clipboard.set_text(self.run_id.clone()));
        self.notice = Some(match copied {
            Ok(()) => format!("Copied {} to clipboard", self.run_id),
            Err(e) => format!("Clipboard unavailable: {}", e),
        });
    }

    fn handle_poll(&mut self, message: &PollMessage) -> Update {
        if self.poll_id != Some(message.poll_id()) {
            return Update::none();
        }
        match message {
            PollMessage::Tick { run, next_in, .. } => {
                self.run = Some(run.clone());
                self.next_in = *next_in;
                self.retry = None;
                Update::none()
            }
            PollMessage::Retrying { error, next_in, .. } => {
                self.retry = Some(error.clone());
                self.next_in = Some(*next_in);
                Update::none()
            }
            PollMessage::Finished { result, .. } => {
                self.polling = false;
                self.next_in = None;
                match result {
                    Ok(run) => {
                        self.run = Some(run.clone());
                        Update::none()
                    }
                    Err(e) => Update::command(Command::Navigate(poll_error_intent(e))),
                }
            }
        }
    }

    fn handle_view_key(&mut self, key: &KeyEvent) -> Update {
        match key.code {
            KeyCode::Esc => return Update::command(Command::Navigate(NavigationIntent::Back)),
            KeyCode::Char('x') => self.cancel_poll(),
            KeyCode::Char('y') => self.copy_id(),
            _ => {}
        }
        Update::none()
    }

    fn status_lines(&self, run: &Run) -> Vec<Line<'static>> {
        let label = Style::default().fg(Color::DarkGray);
        let mut lines = vec![
            Line::from(vec![
                Span::styled("Status:     ", label),
                status_indicator::render(run.status),
            ]),
            Line::from(vec![
                Span::styled("Repository: ", label),
                Span::styled(run.repository.clone(), Style::default().fg(Color::Yellow)),
            ]),
            Line::from(vec![Span::styled("Title:      ", label), Span::raw(run.title.clone())]),
            Line::from(vec![
                Span::styled("Branches:   ", label),
                Span::raw(format!(
                    "{} -> {}",
                    run.source_branch.as_deref().unwrap_or("default"),
                    run.target_branch.as_deref().unwrap_or("default"),
                )),
            ]),
            Line::from(vec![
                Span::styled("Created:    ", label),
                Span::raw(run.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
            ]),
            Line::from(vec![Span::styled("Elapsed:    ", label), Span::raw(run.elapsed())]),
        ];
        if let Some(url) = &run.pr_url {
            lines.push(Line::from(vec![
                Span::styled("PR:         ", label),
                Span::styled(url.clone(), Style::default().fg(Color::Cyan)),
            ]));
        }
        if let Some(error) = &run.error {
            lines.push(Line::from(vec![
                Span::styled("Error:      ", label),
                Span::styled(error.clone(), Style::default().fg(Color::Red)),
            ]));
        }
        lines
    }

    fn poll_line(&self, width: usize) -> Line<'static> {
        if self.polling {
            let elapsed = self.poll_started.map(|s| s.elapsed()).unwrap_or_default();
            let mut spans = vec![
                Span::styled(
                    format!("{} polling ", status_indicator::spinner(self.tick)),
                    Style::default().fg(Color::Cyan),
                ),
                poll_gauge::render_styled(elapsed, self.ctx.poll_config.timeout, width, true),
            ];
            if let Some(next) = self.next_in {
                spans.push(Span::styled(
                    format!("  next in {}", format_duration(next.as_secs() as i64)),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            Line::from(spans)
        } else {
            Line::from(Span::styled("not polling", Style::default().fg(Color::DarkGray)))
        }
    }
}

/// Map a failed poll to the error screen. Timeouts and cancellations can be
/// retried from the previous screen.
fn poll_error_intent(error: &PollError<ApiError>) -> NavigationIntent {
    let (title, recoverable) = match error {
        PollError::Timeout { .. } => ("Poll timeout".to_string(), true),
        PollError::Cancelled => ("Poll cancelled".to_string(), true),
        PollError::Fetch(api) => (
            match api.status() {
                Some(status) => format!("API error {}", status),
                None => "Request failed".to_string(),
            },
            api.is_recoverable(),
        ),
    };
    NavigationIntent::ToError {
        error: title,
        message: error.to_string(),
        recoverable,
    }
}

impl View for DetailsView {
    fn name(&self) -> &'static str {
        "details"
    }

    fn init(&mut self) -> Option<Command> {
        if self.run.as_ref().is_some_and(Run::is_terminal) {
            return None;
        }

        match self.ctx.cache().lookup_run(&self.run_id) {
            RunLookup::Fresh(run) => {
                self.run = Some(run);
                self.polling = false;
                return None;
            }
            RunLookup::Stale(run) => self.run = Some(run),
            RunLookup::Missing => {}
        }

        // Resuming while our poll is still live: keep it.
        if let Some(poll_id) = self.poll_id {
            if self.ctx.polls.is_current(&self.run_id, poll_id) {
                return None;
            }
        }

        Some(self.start_poll())
    }

    fn update(&mut self, event: &Event) -> Update {
        match event {
            Event::Key(key) => self.handle_view_key(key),
            Event::Poll(message) => self.handle_poll(message),
            Event::Tick => {
                self.tick = self.tick.wrapping_add(1);
                Update::none()
            }
            _ => Update::none(),
        }
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(10), // Summary
                Constraint::Min(3),     // Prompt / result
                Constraint::Length(3),  // Poll status
            ])
            .split(area);

        let title = format!(" Run {} ", self.run_id);
        match &self.run {
            Some(run) => {
                let summary = Paragraph::new(self.status_lines(run))
                    .block(Block::default().borders(Borders::ALL).title(title));
                frame.render_widget(summary, chunks[0]);

                let mut body = vec![Line::from(Span::styled(
                    "Prompt",
                    Style::default().add_modifier(Modifier::BOLD),
                ))];
                body.extend(run.prompt.lines().map(|l| Line::from(l.to_string())));
                if let Some(result) = &run.result {
                    body.push(Line::from(""));
                    body.push(Line::from(Span::styled(
                        "Result",
                        Style::default().add_modifier(Modifier::BOLD),
                    )));
                    let pretty = serde_json::to_string_pretty(result).unwrap_or_default();
                    body.extend(pretty.lines().map(|l| Line::from(l.to_string())));
                }
                frame.render_widget(
                    Paragraph::new(body)
                        .wrap(Wrap { trim: false })
                        .block(Block::default().borders(Borders::ALL)),
                    chunks[1],
                );
            }
            None => {
                let waiting = Paragraph::new(format!(
                    "{} Fetching run...",
                    status_indicator::spinner(self.tick)
                ))
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().borders(Borders::ALL).title(title));
                frame.render_widget(waiting, chunks[0]);
            }
        }

        let gauge_width = (chunks[2].width as usize).saturating_sub(40).clamp(10, 40);
        let mut status = vec![self.poll_line(gauge_width)];
        if let Some(error) = &self.retry {
            status.push(Line::from(Span::styled(
                format!("retrying after error: {}", error),
                Style::default().fg(Color::Yellow),
            )));
        } else if let Some(notice) = &self.notice {
            status.push(Line::from(Span::styled(
                notice.clone(),
                Style::default().fg(Color::Green),
            )));
        }
        frame.render_widget(
            Paragraph::new(status).block(Block::default().borders(Borders::TOP)),
            chunks[2],
        );
    }

    fn owns_poll(&self, poll_id: u64) -> bool {
        self.poll_id == Some(poll_id)
    }

    fn hints(&self) -> &'static str {
        "x:cancel poll  y:copy id  r:refresh  esc/b:back  q:home  ?:help"
    }
}

impl Drop for DetailsView {
    fn drop(&mut self) {
        if let Some(poll_id) = self.poll_id {
            self.ctx.polls.cancel(&self.run_id, poll_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::context::testing::context;
    use crate::tui::test_support::render_to_string;
    use crossterm::event::KeyModifiers;
    use runboard_data::fake::make_run;
    use runboard_data::RunStatus;

    fn tick(poll_id: u64, run: Run) -> Event {
        Event::Poll(PollMessage::Tick {
            poll_id,
            run,
            next_in: Some(Duration::from_secs(5)),
        })
    }

    #[test]
    fn test_terminal_snapshot_needs_no_fetch() {
        let t = context();
        let mut view = DetailsView::new(
            t.ctx.clone(),
            "r1".to_string(),
            Some(make_run("r1", RunStatus::Done)),
        );

        assert!(view.init().is_none());
        assert!(!view.is_polling());
        assert_eq!(t.ctx.polls.active_count(), 0);
    }

    #[test]
    fn test_cached_terminal_run_needs_no_fetch() {
        let t = context();
        t.cache.set_run(make_run("r1", RunStatus::Failed));
        let mut view = DetailsView::new(t.ctx.clone(), "r1".to_string(), None);

        assert!(view.init().is_none());
        assert_eq!(view.run().map(|r| r.status), Some(RunStatus::Failed));
    }

    #[test]
    fn test_active_snapshot_starts_poll() {
        let t = context();
        let mut view = DetailsView::new(
            t.ctx.clone(),
            "r1".to_string(),
            Some(make_run("r1", RunStatus::Processing)),
        );

        let command = view.init();

        assert!(command.is_some_and(|c| c.is_perform()));
        assert!(view.is_polling());
        assert_eq!(t.ctx.polls.active_count(), 1);
    }

    #[test]
    fn test_resume_keeps_live_poll() {
        let t = context();
        let mut view = DetailsView::new(t.ctx.clone(), "r1".to_string(), None);
        view.init();
        let first = view.poll_id();

        assert!(view.init().is_none());
        assert_eq!(view.poll_id(), first);
    }

    #[test]
    fn test_stale_poll_messages_are_ignored() {
        let t = context();
        let mut view = DetailsView::new(t.ctx.clone(), "r1".to_string(), None);
        view.init();
        let current = view.poll_id().unwrap();

        view.update(&tick(current + 100, make_run("r1", RunStatus::Done)));
        assert!(view.run().is_none());

        view.update(&tick(current, make_run("r1", RunStatus::Processing)));
        assert_eq!(view.run().map(|r| r.status), Some(RunStatus::Processing));
    }

    #[test]
    fn test_finished_errors_map_to_error_intents() {
        let t = context();
        let mut view = DetailsView::new(t.ctx.clone(), "r1".to_string(), None);
        view.init();
        let poll_id = view.poll_id().unwrap();

        let update = view.update(&Event::Poll(PollMessage::Finished {
            poll_id,
            result: Err(PollError::Fetch(ApiError::Api {
                status: 404,
                message: "no such run".to_string(),
            })),
        }));

        match update {
            Update::Continue(Some(Command::Navigate(NavigationIntent::ToError {
                error,
                recoverable,
                ..
            }))) => {
                assert_eq!(error, "API error 404");
                assert!(!recoverable);
            }
            _ => panic!("expected error navigation"),
        }
        assert!(!view.is_polling());
    }

    #[test]
    fn test_timeout_and_cancel_are_recoverable() {
        for error in [
            PollError::Timeout {
                elapsed: Duration::from_secs(2700),
            },
            PollError::Cancelled,
        ] {
            match poll_error_intent(&error) {
                NavigationIntent::ToError { recoverable, .. } => assert!(recoverable),
                other => panic!("unexpected intent {:?}", other),
            }
        }
    }

    #[test]
    fn test_x_cancels_and_drop_releases_poll() {
        let t = context();
        let mut view = DetailsView::new(t.ctx.clone(), "r1".to_string(), None);
        view.init();
        assert_eq!(t.ctx.polls.active_count(), 1);

        view.update(&Event::Key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE)));
        assert_eq!(t.ctx.polls.active_count(), 0);

        view.init();
        assert_eq!(t.ctx.polls.active_count(), 1);
        drop(view);
        assert_eq!(t.ctx.polls.active_count(), 0);
    }

    #[test]
    fn test_render_shows_run_fields() {
        let t = context();
        let mut run = make_run("r1", RunStatus::Failed);
        run.pr_url = Some("https://example.test/pr/1".to_string());
        let view = DetailsView::new(t.ctx, "r1".to_string(), Some(run));

        let screen = render_to_string(100, 30, |frame, area| view.render(frame, area));

        assert!(screen.contains("Run r1"));
        assert!(screen.contains("failed"));
        assert!(screen.contains("https://example.test/pr/1"));
        assert!(screen.contains("not polling"));
    }
}

//! Fan one prompt out to several repositories.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use runboard_data::{ApiError, BulkRunRequest, BulkRunResult, RunType};
use tracing::info;

use super::form::{Form, TextField};
use crate::tui::command::Command;
use crate::tui::context::AppContext;
use crate::tui::event::Event;
use crate::tui::keys::is_text_input;
use crate::tui::navigation::NavigationIntent;
use crate::tui::view::{KeyOutcome, KeyOverridable, Update, View};
use crate::tui::widgets::status_indicator;

const REPOSITORIES: usize = 0;
const TITLE: usize = 1;
const PROMPT: usize = 2;
const TARGET_BRANCH: usize = 3;

pub struct BulkView {
    ctx: Arc<AppContext>,
    form: Form,
    run_type: RunType,
    submitting: bool,
    error: Option<String>,
    result: Option<BulkRunResult>,
    selected: usize,
}

/// Split a comma or whitespace separated repository list, dropping blanks and
/// duplicates while keeping order.
pub fn parse_repositories(input: &str) -> Vec<String> {
    let mut repositories: Vec<String> = Vec::new();
    for repo in input
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|r| !r.is_empty())
    {
        if !repositories.iter().any(|r| r == repo) {
            repositories.push(repo.to_string());
        }
    }
    repositories
}

impl BulkView {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        let form = Form::new(vec![
            TextField::new("Repositories", "acme/api, acme/web"),
            TextField::new("Title", "optional"),
            TextField::new("Prompt", "applied to every repository").tall(3),
            TextField::new("Target branch", "optional"),
        ]);
        Self {
            ctx,
            form,
            run_type: RunType::Run,
            submitting: false,
            error: None,
            result: None,
            selected: 0,
        }
    }

    pub fn result(&self) -> Option<&BulkRunResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn request(&self) -> BulkRunRequest {
        BulkRunRequest {
            repositories: parse_repositories(self.form.value(REPOSITORIES)),
            title: self.form.value(TITLE).trim().to_string(),
            prompt: self.form.value(PROMPT).trim().to_string(),
            target_branch: self.form.field(TARGET_BRANCH).and_then(TextField::optional),
            run_type: self.run_type,
        }
    }

    fn editing(&self) -> bool {
        self.result.is_none()
    }

    fn submit(&mut self) -> Update {
        if self.submitting {
            return Update::none();
        }
        let request = self.request();
        if let Err(e) = request.validate() {
            self.error = Some(e.to_string());
            return Update::none();
        }
        self.error = None;
        self.submitting = true;
        info!(count = request.repositories.len(), "bulk creating runs");
        let repo = self.ctx.repo.clone();
        Update::command(Command::perform(async move {
            Event::BulkCreated(repo.create_runs(&request).await)
        }))
    }

    fn handle_form_key(&mut self, key: &KeyEvent) -> Update {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return Update::command(Command::Navigate(NavigationIntent::Back)),
            KeyCode::Enter => return self.submit(),
            KeyCode::Char('s') if ctrl => return self.submit(),
            KeyCode::Char('t') if ctrl => {
                self.run_type = match self.run_type {
                    RunType::Run => RunType::Plan,
                    RunType::Plan => RunType::Run,
                }
            }
            _ => {
                self.form.handle_key(key);
            }
        }
        Update::none()
    }

    fn handle_result_key(&mut self, key: &KeyEvent) -> Update {
        let count = self.result.as_ref().map_or(0, |r| r.created.len());
        match key.code {
            KeyCode::Char('j') | KeyCode::Down if count > 0 => {
                self.selected = (self.selected + 1).min(count - 1)
            }
            KeyCode::Char('k') | KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Enter => {
                if let Some(run) = self.result.as_ref().and_then(|r| r.created.get(self.selected)) {
                    return Update::command(Command::Navigate(NavigationIntent::ToDetails {
                        run_id: run.id.clone(),
                        snapshot: Some(run.clone()),
                    }));
                }
            }
            KeyCode::Esc => return Update::command(Command::Navigate(NavigationIntent::Back)),
            _ => {}
        }
        Update::none()
    }

    fn handle_created(&mut self, result: &Result<BulkRunResult, ApiError>) -> Update {
        if !self.submitting {
            return Update::none();
        }
        self.submitting = false;
        match result {
            Ok(outcome) => {
                self.result = Some(outcome.clone());
                self.selected = 0;
                Update::none()
            }
            Err(ApiError::Validation(e)) => {
                self.error = Some(e.to_string());
                Update::none()
            }
            Err(e) => Update::command(Command::Navigate(NavigationIntent::ToError {
                error: "Bulk create failed".to_string(),
                message: e.to_string(),
                recoverable: e.is_recoverable(),
            })),
        }
    }

    fn render_result(&self, result: &BulkRunResult, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(result.failed.len() as u16 + 2)])
            .split(area);

        let items: Vec<ListItem> = result
            .created
            .iter()
            .map(|run| {
                ListItem::new(Line::from(vec![
                    status_indicator::render(run.status),
                    Span::styled(run.repository.clone(), Style::default().fg(Color::Yellow)),
                    Span::styled(format!("  {}", run.id), Style::default().fg(Color::DarkGray)),
                ]))
            })
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" Created ({}) ", result.created.len())),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        let mut state = ListState::default().with_selected(Some(self.selected));
        frame.render_stateful_widget(list, chunks[0], &mut state);

        let failures: Vec<Line> = result
            .failed
            .iter()
            .map(|f| {
                Line::from(vec![
                    Span::styled(f.repository.clone(), Style::default().fg(Color::Yellow)),
                    Span::raw(": "),
                    Span::styled(f.message.clone(), Style::default().fg(Color::Red)),
                ])
            })
            .collect();
        frame.render_widget(
            Paragraph::new(failures).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" Failed ({}) ", result.failed.len())),
            ),
            chunks[1],
        );
    }
}

impl KeyOverridable for BulkView {
    fn is_key_disabled(&self, key: &KeyEvent) -> bool {
        self.editing() && is_text_input(key)
    }

    fn handle_key(&mut self, _key: &KeyEvent) -> KeyOutcome {
        KeyOutcome::NotHandled
    }
}

impl View for BulkView {
    fn name(&self) -> &'static str {
        "bulk"
    }

    fn update(&mut self, event: &Event) -> Update {
        match event {
            Event::Key(key) if self.editing() => self.handle_form_key(key),
            Event::Key(key) => self.handle_result_key(key),
            Event::BulkCreated(result) => self.handle_created(result),
            _ => Update::none(),
        }
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        if let Some(result) = &self.result {
            self.render_result(result, frame, area);
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
            .split(area);

        let count = self.request().repositories.len();
        let kind = match self.run_type {
            RunType::Run => "run",
            RunType::Plan => "plan",
        };
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled("Type: ", Style::default().fg(Color::DarkGray)),
                Span::styled(kind, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("  {} repositories", count),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
            .block(Block::default().borders(Borders::ALL).title(" Bulk create ")),
            chunks[0],
        );

        self.form.render(frame, chunks[1]);

        let status = match (&self.error, self.submitting) {
            (Some(error), _) => Span::styled(error.clone(), Style::default().fg(Color::Red)),
            (None, true) => Span::styled("Submitting...", Style::default().fg(Color::Yellow)),
            (None, false) => Span::styled(
                "Enter or ctrl+s to submit",
                Style::default().fg(Color::DarkGray),
            ),
        };
        frame.render_widget(
            Paragraph::new(Line::from(status)).block(Block::default().borders(Borders::TOP)),
            chunks[2],
        );
    }

    fn hints(&self) -> &'static str {
        if self.editing() {
            "tab:next field  ctrl+t:type  enter:submit  esc:back"
        } else {
            "j/k:nav  enter:open run  esc/b:back  q:home"
        }
    }

    fn key_overrides(&mut self) -> Option<&mut dyn KeyOverridable> {
        Some(self)
    }
}

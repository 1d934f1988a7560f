//! New-run form.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use runboard_data::{ApiError, CreateRunRequest, RunType};
use tracing::info;

use super::details::DetailsView;
use super::form::{Form, TextField};
use crate::tui::command::Command;
use crate::tui::context::AppContext;
use crate::tui::event::Event;
use crate::tui::keys::is_text_input;
use crate::tui::navigation::NavigationIntent;
use crate::tui::view::{KeyOutcome, KeyOverridable, Update, View};

const REPOSITORY: usize = 0;
const TITLE: usize = 1;
const PROMPT: usize = 2;
const SOURCE_BRANCH: usize = 3;
const TARGET_BRANCH: usize = 4;

pub struct CreateView {
    ctx: Arc<AppContext>,
    form: Form,
    run_type: RunType,
    /// Position in the recent-repositories ring, when cycling.
    recent_index: Option<usize>,
    submitting: bool,
    error: Option<String>,
}

impl CreateView {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        let form = Form::new(vec![
            TextField::new("Repository", "owner/name (ctrl+p: recent)"),
            TextField::new("Title", "optional"),
            TextField::new("Prompt", "what should the run do?").tall(3),
            TextField::new("Source branch", "default branch"),
            TextField::new("Target branch", "optional"),
        ]);
        Self {
            ctx,
            form,
            run_type: RunType::Run,
            recent_index: None,
            submitting: false,
            error: None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn request(&self) -> CreateRunRequest {
        CreateRunRequest {
            repository: self.form.value(REPOSITORY).trim().to_string(),
            title: self.form.value(TITLE).trim().to_string(),
            prompt: self.form.value(PROMPT).trim().to_string(),
            source_branch: self.form.field(SOURCE_BRANCH).and_then(TextField::optional),
            target_branch: self.form.field(TARGET_BRANCH).and_then(TextField::optional),
            run_type: self.run_type,
        }
    }

    fn toggle_run_type(&mut self) {
        self.run_type = match self.run_type {
            RunType::Run => RunType::Plan,
            RunType::Plan => RunType::Run,
        };
    }

    fn cycle_recent(&mut self) {
        let recent = self.ctx.cache().recent_repositories();
        if recent.is_empty() {
            return;
        }
        let next = self.recent_index.map_or(0, |i| (i + 1) % recent.len());
        self.recent_index = Some(next);
        self.form.set_value(REPOSITORY, recent[next].clone());
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
        info!(repository = %request.repository, "creating run");
        let repo = self.ctx.repo.clone();
        Update::command(Command::perform(async move {
            Event::RunCreated(repo.create_run(&request).await)
        }))
    }

    fn handle_view_key(&mut self, key: &KeyEvent) -> Update {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return Update::command(Command::Navigate(NavigationIntent::Back)),
            KeyCode::Enter => return self.submit(),
            KeyCode::Char('s') if ctrl => return self.submit(),
            KeyCode::Char('t') if ctrl => self.toggle_run_type(),
            KeyCode::Char('p') if ctrl => self.cycle_recent(),
            _ => {
                self.form.handle_key(key);
            }
        }
        Update::none()
    }

    fn handle_created(&mut self, result: &Result<runboard_data::Run, ApiError>) -> Update {
        if !self.submitting {
            return Update::none();
        }
        self.submitting = false;
        match result {
            Ok(run) => {
                let details = DetailsView::new(self.ctx.clone(), run.id.clone(), None);
                Update::Replace(Box::new(details), None)
            }
            Err(ApiError::Validation(e)) => {
                self.error = Some(e.to_string());
                Update::none()
            }
            Err(e) => Update::command(Command::Navigate(NavigationIntent::ToError {
                error: "Create failed".to_string(),
                message: e.to_string(),
                recoverable: e.is_recoverable(),
            })),
        }
    }
}

impl KeyOverridable for CreateView {
    /// Typing into a field must never trigger navigation.
    fn is_key_disabled(&self, key: &KeyEvent) -> bool {
        is_text_input(key)
    }

    fn handle_key(&mut self, _key: &KeyEvent) -> KeyOutcome {
        KeyOutcome::NotHandled
    }
}

impl View for CreateView {
    fn name(&self) -> &'static str {
        "create"
    }

    fn update(&mut self, event: &Event) -> Update {
        match event {
            Event::Key(key) => self.handle_view_key(key),
            Event::RunCreated(result) => self.handle_created(result),
            _ => Update::none(),
        }
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Run type
                Constraint::Min(0),    // Fields
                Constraint::Length(3), // Status line
            ])
            .split(area);

        let kind = match self.run_type {
            RunType::Run => "run",
            RunType::Plan => "plan",
        };
        let header = Paragraph::new(Line::from(vec![
            Span::styled("Type: ", Style::default().fg(Color::DarkGray)),
            Span::styled(kind, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled("  (ctrl+t to toggle)", Style::default().fg(Color::DarkGray)),
        ]))
        .block(Block::default().borders(Borders::ALL).title(" New run "));
        frame.render_widget(header, chunks[0]);

        self.form.render(frame, chunks[1]);

        let status = if let Some(error) = &self.error {
            Span::styled(error.clone(), Style::default().fg(Color::Red))
        } else if self.submitting {
            Span::styled("Submitting...", Style::default().fg(Color::Yellow))
        } else {
            Span::styled(
                "Enter or ctrl+s to submit",
                Style::default().fg(Color::DarkGray),
            )
        };
        frame.render_widget(
            Paragraph::new(Line::from(status)).block(Block::default().borders(Borders::TOP)),
            chunks[2],
        );
    }

    fn hints(&self) -> &'static str {
        "tab:next field  ctrl+t:type  ctrl+p:recent  enter:submit  esc:back"
    }

    fn key_overrides(&mut self) -> Option<&mut dyn KeyOverridable> {
        Some(self)
    }
}

//! Paginated list of all runs.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};
use runboard_data::{Run, RunPage};

use crate::tui::command::Command;
use crate::tui::context::AppContext;
use crate::tui::event::Event;
use crate::tui::navigation::NavigationIntent;
use crate::tui::view::{Update, View};
use crate::tui::widgets::status_indicator;

pub struct ListView {
    ctx: Arc<AppContext>,
    page: usize,
    runs: Vec<Run>,
    total: usize,
    selected: usize,
    loading: bool,
}

impl ListView {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self {
            ctx,
            page: 0,
            runs: Vec::new(),
            total: 0,
            selected: 0,
            loading: false,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.ctx.page_size).max(1)
    }

    pub fn selected_run(&self) -> Option<&Run> {
        self.runs.get(self.selected)
    }

    fn offset(&self) -> usize {
        self.page * self.ctx.page_size
    }

    fn load(&mut self) -> Command {
        self.loading = true;
        let repo = self.ctx.repo.clone();
        let limit = self.ctx.page_size;
        let offset = self.offset();
        Command::perform(async move {
            Event::RunsLoaded {
                limit,
                offset,
                result: repo.list_runs(limit, offset).await,
            }
        })
    }

    fn loaded(&mut self, page: &RunPage) {
        self.loading = false;
        self.runs = page.runs.clone();
        self.total = page.total;
        self.selected = self.selected.min(self.runs.len().saturating_sub(1));
    }

    fn next_page(&mut self) -> Update {
        if self.loading || self.page + 1 >= self.page_count() {
            return Update::none();
        }
        self.page += 1;
        self.selected = 0;
        Update::command(self.load())
    }

    fn previous_page(&mut self) -> Update {
        if self.loading || self.page == 0 {
            return Update::none();
        }
        self.page -= 1;
        self.selected = 0;
        Update::command(self.load())
    }

    fn handle_view_key(&mut self, key: &KeyEvent) -> Update {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if !self.runs.is_empty() {
                    self.selected = (self.selected + 1).min(self.runs.len() - 1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Char('l') | KeyCode::Right => return self.next_page(),
            KeyCode::Char('h') | KeyCode::Left => return self.previous_page(),
            KeyCode::Enter => {
                if let Some(run) = self.selected_run() {
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
}

impl View for ListView {
    fn name(&self) -> &'static str {
        "list"
    }

    fn init(&mut self) -> Option<Command> {
        Some(self.load())
    }

    fn update(&mut self, event: &Event) -> Update {
        match event {
            Event::Key(key) => self.handle_view_key(key),
            Event::RunsLoaded {
                limit,
                offset,
                result,
            } if *limit == self.ctx.page_size && *offset == self.offset() => match result {
                Ok(page) => {
                    self.loaded(page);
                    Update::none()
                }
                Err(e) => {
                    self.loading = false;
                    Update::command(Command::Navigate(NavigationIntent::ToError {
                        error: "Could not load runs".to_string(),
                        message: e.to_string(),
                        recoverable: e.is_recoverable(),
                    }))
                }
            },
            _ => Update::none(),
        }
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let title = format!(
            " Runs - page {}/{} ({} total) ",
            self.page + 1,
            self.page_count(),
            self.total
        );
        let block = Block::default().borders(Borders::ALL).title(title);

        if self.runs.is_empty() {
            let text = if self.loading { "Loading..." } else { "No runs." };
            frame.render_widget(
                Paragraph::new(text)
                    .style(Style::default().fg(Color::DarkGray))
                    .block(block),
                area,
            );
            return;
        }

        let header = Row::new(vec!["Status", "Repository", "Title", "Elapsed", "ID"])
            .style(Style::default().add_modifier(Modifier::BOLD));
        let rows: Vec<Row> = self
            .runs
            .iter()
            .map(|run| {
                Row::new(vec![
                    Cell::from(status_indicator::render(run.status)),
                    Cell::from(Span::styled(
                        run.repository.clone(),
                        Style::default().fg(Color::Yellow),
                    )),
                    Cell::from(run.title.clone()),
                    Cell::from(run.elapsed()),
                    Cell::from(Span::styled(run.id.clone(), Style::default().fg(Color::DarkGray))),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(16),
                Constraint::Percentage(25),
                Constraint::Min(10),
                Constraint::Length(9),
                Constraint::Length(14),
            ],
        )
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        let mut state = TableState::default().with_selected(Some(self.selected));
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn hints(&self) -> &'static str {
        "j/k:nav  h/l:page  enter:open  r:refresh  esc/b:back  ?:help"
    }
}

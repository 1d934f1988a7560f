//! Home screen: who is signed in, the most recent runs and shortcuts.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use runboard_data::Run;
use serde::{Deserialize, Serialize};

use crate::tui::command::Command;
use crate::tui::context::AppContext;
use crate::tui::event::Event;
use crate::tui::navigation::NavigationIntent;
use crate::tui::view::{KeyOutcome, KeyOverridable, Update, View};
use crate::tui::widgets::status_indicator;

/// Navigation-context key the dashboard saves its selection under.
pub const DASHBOARD_STATE_KEY: &str = "dashboard_state";

pub(crate) const RECENT_LIMIT: usize = 10;

/// What survives a round trip away from the dashboard and back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardState {
    pub selected: usize,
}

pub struct DashboardView {
    ctx: Arc<AppContext>,
    runs: Vec<Run>,
    total: usize,
    selected: usize,
    loading: bool,
    error: Option<String>,
}

impl DashboardView {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self::restored(ctx, DashboardState::default())
    }

    pub fn restored(ctx: Arc<AppContext>, state: DashboardState) -> Self {
        Self {
            ctx,
            runs: Vec::new(),
            total: 0,
            selected: state.selected,
            loading: false,
            error: None,
        }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    fn save_state(&self) {
        let state = DashboardState {
            selected: self.selected,
        };
        if let Ok(value) = serde_json::to_value(state) {
            self.ctx
                .cache()
                .set_navigation_context(DASHBOARD_STATE_KEY, value);
        }
    }

    fn next(&mut self) {
        if self.runs.is_empty() {
            return;
        }
        self.selected = (self.selected + 1) % self.runs.len();
        self.save_state();
    }

    fn previous(&mut self) {
        if self.runs.is_empty() {
            return;
        }
        self.selected = if self.selected == 0 {
            self.runs.len() - 1
        } else {
            self.selected - 1
        };
        self.save_state();
    }

    fn open_selected(&self) -> Update {
        match self.runs.get(self.selected) {
            Some(run) => Update::command(Command::Navigate(NavigationIntent::ToDetails {
                run_id: run.id.clone(),
                snapshot: Some(run.clone()),
            })),
            None => Update::none(),
        }
    }

    fn handle_view_key(&mut self, key: &KeyEvent) -> Update {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.next(),
            KeyCode::Char('k') | KeyCode::Up => self.previous(),
            KeyCode::Enter => return self.open_selected(),
            KeyCode::Char('L') => return Update::command(Command::Navigate(NavigationIntent::ToList)),
            KeyCode::Char('s') => {
                return Update::command(Command::Navigate(NavigationIntent::ToStatus))
            }
            _ => {}
        }
        Update::none()
    }
}

impl KeyOverridable for DashboardView {
    fn is_key_disabled(&self, _key: &KeyEvent) -> bool {
        false
    }

    /// `q` on the home screen quits instead of navigating home.
    fn handle_key(&mut self, key: &KeyEvent) -> KeyOutcome {
        if key.code == KeyCode::Char('q') && key.modifiers == KeyModifiers::NONE {
            KeyOutcome::Handled(Update::command(Command::Quit))
        } else {
            KeyOutcome::NotHandled
        }
    }
}

impl View for DashboardView {
    fn name(&self) -> &'static str {
        "dashboard"
    }

    fn init(&mut self) -> Option<Command> {
        self.loading = true;
        let repo = self.ctx.repo.clone();
        Some(Command::perform(async move {
            Event::RunsLoaded {
                limit: RECENT_LIMIT,
                offset: 0,
                result: repo.list_runs(RECENT_LIMIT, 0).await,
            }
        }))
    }

    fn update(&mut self, event: &Event) -> Update {
        match event {
            Event::Key(key) => self.handle_view_key(key),
            Event::RunsLoaded {
                limit: RECENT_LIMIT,
                offset: 0,
                result,
            } => {
                self.loading = false;
                match result {
                    Ok(page) => {
                        self.runs = page.runs.clone();
                        self.total = page.total;
                        self.error = None;
                        if self.selected >= self.runs.len() {
                            self.selected = self.runs.len().saturating_sub(1);
                        }
                    }
                    // The dashboard stays usable offline; show the error inline.
                    Err(e) => self.error = Some(e.to_string()),
                }
                Update::none()
            }
            _ => Update::none(),
        }
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Identity
                Constraint::Min(0),    // Recent runs
                Constraint::Length(4), // Shortcuts
            ])
            .split(area);

        let session = &self.ctx.session;
        let identity = Paragraph::new(Line::from(vec![
            Span::styled("Signed in as ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                session.display_name().to_string(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled("  @ ", Style::default().fg(Color::DarkGray)),
            Span::raw(session.endpoint.clone()),
        ]))
        .block(Block::default().borders(Borders::ALL).title(" runboard "));
        frame.render_widget(identity, chunks[0]);

        let title = format!(" Recent runs ({} total) ", self.total);
        let block = Block::default().borders(Borders::ALL).title(title);

        if let Some(error) = &self.error {
            let paragraph = Paragraph::new(format!("Could not load runs: {}", error))
                .style(Style::default().fg(Color::Red))
                .block(block);
            frame.render_widget(paragraph, chunks[1]);
        } else if self.runs.is_empty() {
            let text = if self.loading {
                "Loading..."
            } else {
                "No runs yet. Press n to create one."
            };
            let paragraph = Paragraph::new(text)
                .style(Style::default().fg(Color::DarkGray))
                .block(block);
            frame.render_widget(paragraph, chunks[1]);
        } else {
            let items: Vec<ListItem> = self
                .runs
                .iter()
                .map(|run| {
                    ListItem::new(Line::from(vec![
                        status_indicator::render(run.status),
                        Span::raw("  "),
                        Span::styled(
                            run.repository.clone(),
                            Style::default().fg(Color::Yellow),
                        ),
                        Span::raw("  "),
                        Span::raw(run.title.clone()),
                        Span::styled(
                            format!("  {}", run.elapsed()),
                            Style::default().fg(Color::DarkGray),
                        ),
                    ]))
                })
                .collect();
            let list = List::new(items)
                .block(block)
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
            let mut state = ListState::default().with_selected(Some(self.selected));
            frame.render_stateful_widget(list, chunks[1], &mut state);
        }

        let shortcuts = Paragraph::new(vec![
            Line::from(" n new run    B bulk create    L all runs    s status"),
            Line::from(" Enter open   j/k move         ? help        q quit"),
        ])
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::TOP));
        frame.render_widget(shortcuts, chunks[2]);
    }

    fn hints(&self) -> &'static str {
        "j/k:nav  enter:open  n:new  L:list  r:refresh  q:quit  ?:help"
    }

    fn key_overrides(&mut self) -> Option<&mut dyn KeyOverridable> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::context::testing::context;
    use crate::tui::test_support::render_to_string;
    use runboard_data::fake::make_run;
    use runboard_data::{RunPage, RunStatus};

    fn loaded(runs: Vec<Run>) -> Event {
        let total = runs.len();
        Event::RunsLoaded {
            limit: RECENT_LIMIT,
            offset: 0,
            result: Ok(RunPage { runs, total }),
        }
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_init_requests_recent_runs() {
        let t = context();
        let mut view = DashboardView::new(t.ctx);
        assert!(view.init().is_some_and(|c| c.is_perform()));
    }

    #[test]
    fn test_selection_wraps_and_is_saved() {
        let t = context();
        let mut view = DashboardView::new(t.ctx);
        view.update(&loaded(vec![
            make_run("a", RunStatus::Done),
            make_run("b", RunStatus::Queued),
        ]));

        view.update(&key(KeyCode::Char('j')));
        assert_eq!(view.selected(), 1);
        view.update(&key(KeyCode::Char('j')));
        assert_eq!(view.selected(), 0);
        view.update(&key(KeyCode::Up));
        assert_eq!(view.selected(), 1);

        let saved = t.cache.get_navigation_context(DASHBOARD_STATE_KEY).unwrap();
        assert_eq!(
            serde_json::from_value::<DashboardState>(saved).unwrap(),
            DashboardState { selected: 1 }
        );
    }

    #[test]
    fn test_restored_selection_is_clamped_to_loaded_runs() {
        let t = context();
        let mut view = DashboardView::restored(t.ctx, DashboardState { selected: 7 });
        view.update(&loaded(vec![make_run("a", RunStatus::Done)]));
        assert_eq!(view.selected(), 0);
    }

    #[test]
    fn test_enter_opens_details_with_snapshot() {
        let t = context();
        let mut view = DashboardView::new(t.ctx);
        view.update(&loaded(vec![make_run("a", RunStatus::Done)]));

        match view.update(&key(KeyCode::Enter)) {
            Update::Continue(Some(Command::Navigate(NavigationIntent::ToDetails {
                run_id,
                snapshot,
            }))) => {
                assert_eq!(run_id, "a");
                assert!(snapshot.is_some());
            }
            _ => panic!("expected navigation to details"),
        }
    }

    #[test]
    fn test_q_quits_from_home() {
        let t = context();
        let mut view = DashboardView::new(t.ctx);
        let outcome = view.handle_key(&KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(matches!(
            outcome,
            KeyOutcome::Handled(Update::Continue(Some(Command::Quit)))
        ));
    }

    #[test]
    fn test_render_shows_identity_and_runs() {
        let t = context();
        let mut view = DashboardView::new(t.ctx);
        view.update(&loaded(vec![make_run("a", RunStatus::Failed)]));

        let screen = render_to_string(100, 20, |frame, area| view.render(frame, area));

        assert!(screen.contains("anonymous"));
        assert!(screen.contains("acme/widgets"));
        assert!(screen.contains("failed"));
    }
}

//! Navigation controller: the view stack and transitions between screens.

use std::sync::Arc;

use crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};
use runboard_data::Run;
use tracing::{debug, warn};

use super::command::Command;
use super::context::AppContext;
use super::event::Event;
use super::keys::{Dispatch, GlobalAction, KeyDispatcher};
use super::view::{Update, View};
use super::views::bulk::BulkView;
use super::views::create::CreateView;
use super::views::dashboard::{DashboardState, DashboardView, DASHBOARD_STATE_KEY};
use super::views::details::DetailsView;
use super::views::error::ErrorView;
use super::views::help::HelpView;
use super::views::list::ListView;
use super::views::status::StatusView;

/// Every transition the controller knows how to make.
#[derive(Debug, Clone)]
pub enum NavigationIntent {
    ToCreate,
    ToDetails {
        run_id: String,
        snapshot: Option<Run>,
    },
    ToDashboard,
    ToList,
    ToBulk,
    ToStatus,
    ToHelp,
    ToError {
        error: String,
        message: String,
        recoverable: bool,
    },
    Back,
}

/// Owns the active view, the stack of suspended views and the key dispatcher.
///
/// Invariant: the stack never holds the current view.
pub struct Navigator {
    current: Box<dyn View>,
    stack: Vec<Box<dyn View>>,
    dispatcher: KeyDispatcher,
    ctx: Arc<AppContext>,
    size: Option<(u16, u16)>,
}

impl Navigator {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self::with_dispatcher(ctx, KeyDispatcher::default())
    }

    pub fn with_dispatcher(ctx: Arc<AppContext>, dispatcher: KeyDispatcher) -> Self {
        Self {
            current: Box::new(DashboardView::new(ctx.clone())),
            stack: Vec::new(),
            dispatcher,
            ctx,
            size: None,
        }
    }

    /// Init command of the root view.
    pub fn start(&mut self) -> Option<Command> {
        self.current.init()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn current_name(&self) -> &'static str {
        self.current.name()
    }

    /// Names of the suspended views, bottom first.
    pub fn stack_names(&self) -> Vec<&'static str> {
        self.stack.iter().map(|v| v.name()).collect()
    }

    pub fn current_hints(&self) -> &'static str {
        self.current.hints()
    }

    pub fn size(&self) -> Option<(u16, u16)> {
        self.size
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.ctx
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        self.current.render(frame, area);
    }

    pub fn navigate(&mut self, intent: NavigationIntent) -> Option<Command> {
        debug!(from = self.current.name(), ?intent, depth = self.stack.len(), "navigate");
        match intent {
            NavigationIntent::Back => match self.stack.pop() {
                Some(previous) => {
                    self.current = previous;
                    self.current.init()
                }
                None => self.go_home(),
            },
            NavigationIntent::ToDashboard => self.go_home(),
            NavigationIntent::ToError {
                error,
                message,
                recoverable,
            } => {
                let view = Box::new(ErrorView::new(error, message, recoverable));
                if recoverable {
                    self.push(view)
                } else {
                    self.stack.clear();
                    self.current = view;
                    self.enter_current()
                }
            }
            NavigationIntent::ToBulk if !self.ctx.repo.supports_bulk() => {
                warn!("bulk creation not supported by this backend, ignoring");
                None
            }
            forward => {
                let view = self.build(forward)?;
                self.push(view)
            }
        }
    }

    pub fn handle_event(&mut self, event: Event) -> Option<Command> {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Resize { width, height } => {
                self.size = Some((width, height));
                let update = self.current.update(&event);
                self.apply(update)
            }
            Event::Poll(message) => self.route_poll(Event::Poll(message)),
            other => {
                let update = self.current.update(&other);
                self.apply(update)
            }
        }
    }

    /// Deliver a poll message to the view that started the poll, whether it
    /// is current or suspended. A suspended owner can still ask to navigate,
    /// so a failed poll always surfaces; it can never replace itself.
    fn route_poll(&mut self, event: Event) -> Option<Command> {
        let Event::Poll(message) = &event else {
            return None;
        };
        let poll_id = message.poll_id();
        if self.current.owns_poll(poll_id) {
            let update = self.current.update(&event);
            return self.apply(update);
        }
        match self.stack.iter_mut().rev().find(|v| v.owns_poll(poll_id)) {
            Some(owner) => match owner.update(&event) {
                Update::Continue(command) => command,
                Update::Replace(view, _) => {
                    warn!(owner = owner.name(), to = view.name(), "suspended view cannot replace itself");
                    None
                }
            },
            None => {
                debug!(poll_id, "no view owns poll message, dropping");
                None
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<Command> {
        match self.dispatcher.dispatch(self.current.as_mut(), &key) {
            Dispatch::Custom(update) => self.apply(update),
            Dispatch::Global(GlobalAction::Quit) | Dispatch::Quit => Some(Command::Quit),
            Dispatch::Global(GlobalAction::Help) => self.navigate(NavigationIntent::ToHelp),
            Dispatch::Navigate(intent) => self.navigate(intent),
            Dispatch::Refresh => self.current.init(),
            Dispatch::Ignore => None,
            Dispatch::Delegate => {
                let update = self.current.update(&Event::Key(key));
                self.apply(update)
            }
        }
    }

    fn apply(&mut self, update: Update) -> Option<Command> {
        match update {
            Update::Continue(command) => command,
            Update::Replace(view, command) => {
                debug!(from = self.current.name(), to = view.name(), "replace view");
                self.current = view;
                Command::batch([command, self.enter_current()])
            }
        }
    }

    fn push(&mut self, view: Box<dyn View>) -> Option<Command> {
        let previous = std::mem::replace(&mut self.current, view);
        self.stack.push(previous);
        self.enter_current()
    }

    /// Init of the new current view plus a synthetic resize when known.
    fn enter_current(&mut self) -> Option<Command> {
        let resize = self
            .size
            .map(|(width, height)| Command::Emit(Event::Resize { width, height }));
        Command::batch([self.current.init(), resize])
    }

    fn go_home(&mut self) -> Option<Command> {
        // Read the saved dashboard state before the context is wiped.
        let saved = self
            .ctx
            .cache()
            .get_navigation_context(DASHBOARD_STATE_KEY)
            .and_then(|value| serde_json::from_value::<DashboardState>(value).ok());

        self.stack.clear();
        self.ctx.cache().clear_all_navigation_context();

        let dashboard = match saved {
            Some(state) => DashboardView::restored(self.ctx.clone(), state),
            None => DashboardView::new(self.ctx.clone()),
        };
        self.current = Box::new(dashboard);
        self.enter_current()
    }

    fn build(&self, intent: NavigationIntent) -> Option<Box<dyn View>> {
        let ctx = self.ctx.clone();
        let view: Box<dyn View> = match intent {
            NavigationIntent::ToCreate => Box::new(CreateView::new(ctx)),
            NavigationIntent::ToDetails { run_id, snapshot } => {
                Box::new(DetailsView::new(ctx, run_id, snapshot))
            }
            NavigationIntent::ToList => Box::new(ListView::new(ctx)),
            NavigationIntent::ToBulk => Box::new(BulkView::new(ctx)),
            NavigationIntent::ToStatus => Box::new(StatusView::new(ctx)),
            NavigationIntent::ToHelp => {
                Box::new(HelpView::new(self.dispatcher.registry().bindings()))
            }
            NavigationIntent::Back
            | NavigationIntent::ToDashboard
            | NavigationIntent::ToError { .. } => return None,
        };
        Some(view)
    }
}

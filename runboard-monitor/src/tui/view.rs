//! The screen abstraction driven by the navigation controller.

use crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};

use super::command::Command;
use super::event::Event;

/// Result of feeding an event to a view.
pub enum Update {
    /// Stay on this view, optionally running a command.
    Continue(Option<Command>),
    /// Swap this view out for another in the same stack slot.
    Replace(Box<dyn View>, Option<Command>),
}

impl Update {
    pub fn none() -> Self {
        Self::Continue(None)
    }

    pub fn command(command: Command) -> Self {
        Self::Continue(Some(command))
    }
}

/// What a view's own key handler did with a key.
pub enum KeyOutcome {
    NotHandled,
    Handled(Update),
}

/// Optional capability: take keys before the global registry sees them.
pub trait KeyOverridable {
    /// Keys the view wants delivered straight to `update`, bypassing every
    /// global and navigation binding (text input, for example).
    fn is_key_disabled(&self, key: &KeyEvent) -> bool;

    fn handle_key(&mut self, key: &KeyEvent) -> KeyOutcome;
}

/// A screen.
pub trait View {
    /// Stable name, used for logging and tests.
    fn name(&self) -> &'static str;

    /// Called when the view becomes active, both on first entry and when it
    /// is resumed from the stack.
    fn init(&mut self) -> Option<Command> {
        None
    }

    fn update(&mut self, event: &Event) -> Update;

    fn render(&self, frame: &mut Frame, area: Rect);

    /// One-line key hints for the footer.
    fn hints(&self) -> &'static str {
        "b:back  q:home  ?:help  Q:quit"
    }

    fn key_overrides(&mut self) -> Option<&mut dyn KeyOverridable> {
        None
    }

    /// Whether messages tagged with `poll_id` belong to this view. Owned
    /// messages reach the view even while it is suspended on the stack.
    fn owns_poll(&self, _poll_id: u64) -> bool {
        false
    }
}

//! Side effects requested by views and the controller.

use std::fmt;

use runboard_data::BoxFuture;

use super::event::Event;
use super::navigation::NavigationIntent;

pub enum Command {
    Batch(Vec<Command>),
    Navigate(NavigationIntent),
    Quit,
    /// Feed an event back through the controller.
    Emit(Event),
    /// Run a future on the async runtime; its output comes back as an event.
    Perform(BoxFuture<'static, Event>),
}

impl Command {
    pub fn perform<F>(future: F) -> Self
    where
        F: std::future::Future<Output = Event> + Send + 'static,
    {
        Self::Perform(Box::pin(future))
    }

    /// Combine optional commands, dropping the empty ones.
    pub fn batch(commands: impl IntoIterator<Item = Option<Command>>) -> Option<Command> {
        let mut commands: Vec<Command> = commands.into_iter().flatten().collect();
        match commands.len() {
            0 => None,
            1 => commands.pop(),
            _ => Some(Self::Batch(commands)),
        }
    }

    /// Flatten nested batches into a list of leaf commands.
    pub fn into_leaves(self) -> Vec<Command> {
        match self {
            Self::Batch(commands) => commands.into_iter().flat_map(Self::into_leaves).collect(),
            other => vec![other],
        }
    }

    pub fn is_quit(&self) -> bool {
        matches!(self, Self::Quit)
    }

    pub fn is_perform(&self) -> bool {
        matches!(self, Self::Perform(_))
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Batch(commands) => f.debug_tuple("Batch").field(commands).finish(),
            Self::Navigate(intent) => f.debug_tuple("Navigate").field(intent).finish(),
            Self::Quit => f.write_str("Quit"),
            Self::Emit(event) => f.debug_tuple("Emit").field(event).finish(),
            Self::Perform(_) => f.write_str("Perform(..)"),
        }
    }
}

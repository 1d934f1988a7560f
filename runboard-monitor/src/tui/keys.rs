//! Key registry and the layered key dispatcher.

use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::navigation::NavigationIntent;
use super::view::{KeyOutcome, Update, View};

/// What a key means before the active view gets a say.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    NavigateBack,
    NavigateBulk,
    NavigateNew,
    NavigateRefresh,
    NavigateQuit,
    NavigateHelp,
    NavigateHome,
    ViewSpecific,
    Ignore,
    GlobalQuit,
    GlobalHelp,
}

impl KeyAction {
    pub fn description(self) -> &'static str {
        match self {
            Self::NavigateBack => "Go back",
            Self::NavigateBulk => "Bulk create",
            Self::NavigateNew => "New run",
            Self::NavigateRefresh => "Refresh current screen",
            Self::NavigateQuit => "Quit",
            Self::NavigateHelp => "Help",
            Self::NavigateHome => "Home (dashboard)",
            Self::ViewSpecific => "Screen specific",
            Self::Ignore => "Ignored",
            Self::GlobalQuit => "Quit immediately",
            Self::GlobalHelp => "Help (always available)",
        }
    }
}

/// Canonical string for a key event, e.g. `q`, `Q`, `ctrl+c`, `esc`, `f1`.
pub fn key_string(key: &KeyEvent) -> String {
    let base = match key.code {
        KeyCode::Char(' ') => "space".to_string(),
        KeyCode::Char(c) => {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                c.to_ascii_lowercase().to_string()
            } else {
                c.to_string()
            }
        }
        KeyCode::Esc => "esc".to_string(),
        KeyCode::Enter => "enter".to_string(),
        KeyCode::Tab => "tab".to_string(),
        KeyCode::BackTab => "shift+tab".to_string(),
        KeyCode::Backspace => "backspace".to_string(),
        KeyCode::Delete => "delete".to_string(),
        KeyCode::Up => "up".to_string(),
        KeyCode::Down => "down".to_string(),
        KeyCode::Left => "left".to_string(),
        KeyCode::Right => "right".to_string(),
        KeyCode::Home => "home".to_string(),
        KeyCode::End => "end".to_string(),
        KeyCode::PageUp => "pgup".to_string(),
        KeyCode::PageDown => "pgdown".to_string(),
        KeyCode::F(n) => format!("f{}", n),
        _ => return String::new(),
    };

    let mut prefix = String::new();
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        prefix.push_str("ctrl+");
    }
    if key.modifiers.contains(KeyModifiers::ALT) {
        prefix.push_str("alt+");
    }
    prefix + &base
}

/// Static mapping from key strings to actions.
#[derive(Debug, Clone)]
pub struct KeyRegistry {
    bindings: HashMap<String, KeyAction>,
}

impl Default for KeyRegistry {
    fn default() -> Self {
        use KeyAction::*;

        let defaults: &[(&str, KeyAction)] = &[
            ("q", NavigateHome),
            ("Q", GlobalQuit),
            ("ctrl+c", GlobalQuit),
            ("B", NavigateBulk),
            ("?", NavigateHelp),
            ("n", NavigateNew),
            ("r", NavigateRefresh),
            ("b", NavigateBack),
            ("backspace", NavigateBack),
            ("ctrl+q", NavigateQuit),
            ("f1", GlobalHelp),
            ("ctrl+z", Ignore),
            ("esc", ViewSpecific),
            ("h", ViewSpecific),
            ("j", ViewSpecific),
            ("k", ViewSpecific),
            ("l", ViewSpecific),
            ("up", ViewSpecific),
            ("down", ViewSpecific),
            ("left", ViewSpecific),
            ("right", ViewSpecific),
            ("enter", ViewSpecific),
            ("tab", ViewSpecific),
        ];

        Self {
            bindings: defaults
                .iter()
                .map(|(key, action)| (key.to_string(), *action))
                .collect(),
        }
    }
}

impl KeyRegistry {
    pub fn action_for(&self, key: &KeyEvent) -> KeyAction {
        self.lookup(&key_string(key))
    }

    pub fn lookup(&self, key: &str) -> KeyAction {
        self.bindings
            .get(key)
            .copied()
            .unwrap_or(KeyAction::ViewSpecific)
    }

    /// Non view-specific bindings, sorted for display.
    pub fn bindings(&self) -> Vec<(String, KeyAction)> {
        let mut bindings: Vec<(String, KeyAction)> = self
            .bindings
            .iter()
            .filter(|(_, action)| **action != KeyAction::ViewSpecific)
            .map(|(key, action)| (key.clone(), *action))
            .collect();
        bindings.sort_by(|a, b| a.1.description().cmp(b.1.description()).then(a.0.cmp(&b.0)));
        bindings
    }
}

/// Actions that fire no matter which view is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalAction {
    Quit,
    Help,
}

/// The single outcome of dispatching one key.
pub enum Dispatch {
    /// The view's own handler took the key.
    Custom(Update),
    Global(GlobalAction),
    Navigate(NavigationIntent),
    /// Re-issue the active view's init command.
    Refresh,
    Quit,
    Ignore,
    /// Hand the key to the active view's `update`.
    Delegate,
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Custom(_) => f.write_str("Custom(..)"),
            Self::Global(action) => f.debug_tuple("Global").field(action).finish(),
            Self::Navigate(intent) => f.debug_tuple("Navigate").field(intent).finish(),
            Self::Refresh => f.write_str("Refresh"),
            Self::Quit => f.write_str("Quit"),
            Self::Ignore => f.write_str("Ignore"),
            Self::Delegate => f.write_str("Delegate"),
        }
    }
}

/// Resolves keystrokes: disabled keys, then the view's handler, then the
/// registry, then the view's `update`.
#[derive(Debug, Clone, Default)]
pub struct KeyDispatcher {
    registry: KeyRegistry,
}

impl KeyDispatcher {
    pub fn new(registry: KeyRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    pub fn dispatch(&self, view: &mut dyn View, key: &KeyEvent) -> Dispatch {
        if let Some(overrides) = view.key_overrides() {
            if overrides.is_key_disabled(key) {
                return Dispatch::Delegate;
            }
            if let KeyOutcome::Handled(update) = overrides.handle_key(key) {
                return Dispatch::Custom(update);
            }
        }

        match self.registry.action_for(key) {
            KeyAction::GlobalQuit => Dispatch::Global(GlobalAction::Quit),
            KeyAction::GlobalHelp => Dispatch::Global(GlobalAction::Help),
            KeyAction::NavigateBack => Dispatch::Navigate(NavigationIntent::Back),
            KeyAction::NavigateBulk => Dispatch::Navigate(NavigationIntent::ToBulk),
            KeyAction::NavigateNew => Dispatch::Navigate(NavigationIntent::ToCreate),
            KeyAction::NavigateHelp => Dispatch::Navigate(NavigationIntent::ToHelp),
            KeyAction::NavigateHome => Dispatch::Navigate(NavigationIntent::ToDashboard),
            KeyAction::NavigateRefresh => Dispatch::Refresh,
            KeyAction::NavigateQuit => Dispatch::Quit,
            KeyAction::Ignore => Dispatch::Ignore,
            KeyAction::ViewSpecific => Dispatch::Delegate,
        }
    }
}

/// True for keys that type text: printable characters without ctrl/alt, and
/// backspace.
pub fn is_text_input(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char(_) => !key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT),
        KeyCode::Backspace => true,
        _ => false,
    }
}

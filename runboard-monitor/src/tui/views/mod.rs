//! TUI views
//!
//! Each screen implements [`View`](crate::tui::view::View); the navigator owns
//! the active one and the stack of suspended ones.

pub mod bulk;
pub mod create;
pub mod dashboard;
pub mod details;
pub mod error;
pub mod form;
pub mod help;
pub mod list;
pub mod status;

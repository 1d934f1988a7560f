//! runboard-monitor library
//!
//! This library exposes the configuration, logging and TUI modules for the
//! `runboard` binary.

pub mod config;
pub mod logging;
pub mod tui;

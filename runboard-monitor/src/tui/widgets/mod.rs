//! Small rendering helpers shared by views.

pub mod poll_gauge;
pub mod status_indicator;

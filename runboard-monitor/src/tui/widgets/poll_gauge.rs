use std::time::Duration;

use ratatui::style::{Color, Style};
use ratatui::text::Span;

/// Render a text bar of how much of the poll budget has been used
/// Example: "██░░░░░░░░" for 20% of the timeout elapsed
pub fn render(elapsed: Duration, budget: Duration, width: usize) -> String {
    if budget.is_zero() {
        return "░".repeat(width);
    }

    let ratio = (elapsed.as_secs_f64() / budget.as_secs_f64()).clamp(0.0, 1.0);
    let filled = ((ratio * width as f64).floor() as usize).min(width);
    let empty = width.saturating_sub(filled);

    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

/// Render a styled budget bar span; turns red in the last fifth of the budget
pub fn render_styled<'a>(elapsed: Duration, budget: Duration, width: usize, active: bool) -> Span<'a> {
    let text = render(elapsed, budget, width);

    let color = if !active || budget.is_zero() {
        Color::DarkGray
    } else if elapsed.as_secs_f64() >= budget.as_secs_f64() * 0.8 {
        Color::Red
    } else {
        Color::Blue
    };

    Span::styled(text, Style::default().fg(color))
}

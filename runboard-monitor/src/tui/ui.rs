//! TUI rendering

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::navigation::Navigator;

/// Render the application UI
pub fn render(frame: &mut Frame, navigator: &Navigator) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Header
            Constraint::Min(0),    // Active view
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    render_header(frame, chunks[0], navigator);
    navigator.render(frame, chunks[1]);
    render_footer(frame, chunks[2], navigator.current_hints());
}

fn render_header(frame: &mut Frame, area: Rect, navigator: &Navigator) {
    let mut trail: Vec<Span> = vec![Span::styled(
        "runboard",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    for name in navigator
        .stack_names()
        .into_iter()
        .chain(std::iter::once(navigator.current_name()))
    {
        trail.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
        trail.push(Span::raw(name));
    }
    let polls = navigator.context().polls.active_count();
    if polls > 0 {
        trail.push(Span::styled(
            format!("   {} polling", polls),
            Style::default().fg(Color::Yellow),
        ));
    }

    let header = Paragraph::new(Line::from(trail)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, area);
}

fn render_footer(frame: &mut Frame, area: Rect, hints: &str) {
    let footer = Paragraph::new(format!(" {}", hints)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, area);
}

/// Calculate a centered rectangle with given percentage dimensions
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

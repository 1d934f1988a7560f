use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;

use runboard_data::RunStatus;

/// Render a status indicator span
pub fn render(status: RunStatus) -> Span<'static> {
    let style = match status {
        RunStatus::Queued => Style::default().fg(Color::DarkGray),
        RunStatus::Initializing => Style::default().fg(Color::Yellow),
        RunStatus::Processing => Style::default().fg(Color::Green),
        RunStatus::PostProcessing => Style::default().fg(Color::Cyan),
        RunStatus::Done => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        RunStatus::Failed => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        RunStatus::Unknown => Style::default().fg(Color::Magenta),
    };
    Span::styled(format!("{:<15}", status.as_str()), style)
}

/// Braille spinner frame for an in-flight poll.
pub fn spinner(tick: usize) -> &'static str {
    const FRAMES: [&str; 8] = ["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];
    FRAMES[tick % FRAMES.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_processing() {
        let span = render(RunStatus::Processing);
        assert_eq!(span.content.trim_end(), "processing");
        assert_eq!(span.style.fg, Some(Color::Green));
    }

    #[test]
    fn test_status_queued() {
        let span = render(RunStatus::Queued);
        assert_eq!(span.content.trim_end(), "queued");
        assert_eq!(span.style.fg, Some(Color::DarkGray));
    }

    #[test]
    fn test_status_post_processing() {
        let span = render(RunStatus::PostProcessing);
        assert_eq!(span.content.trim_end(), "post_processing");
        assert_eq!(span.style.fg, Some(Color::Cyan));
    }

    #[test]
    fn test_status_failed() {
        let span = render(RunStatus::Failed);
        assert_eq!(span.content.trim_end(), "failed");
        assert_eq!(span.style.fg, Some(Color::Red));
        assert!(span.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_status_done() {
        let span = render(RunStatus::Done);
        assert_eq!(span.content.trim_end(), "done");
        assert!(span.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_status_unknown() {
        let span = render(RunStatus::Unknown);
        assert_eq!(span.content.trim_end(), "unknown");
        assert_eq!(span.style.fg, Some(Color::Magenta));
    }

    #[test]
    fn test_spinner_cycles() {
        assert_eq!(spinner(0), spinner(8));
        assert_ne!(spinner(0), spinner(1));
    }
}

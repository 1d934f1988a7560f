//! Terminal UI: the navigator, its views and the event loop around them.

pub mod app;
pub mod command;
pub mod context;
pub mod event;
pub mod keys;
pub mod navigation;
pub mod ui;
pub mod view;
pub mod views;
pub mod widgets;

use std::io::{self, Stdout};

use anyhow::Context;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

pub use app::App;
pub use context::AppContext;
pub use navigation::{NavigationIntent, Navigator};

/// Set up the terminal for TUI rendering.
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

/// Restore the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Take over the terminal, run `app` until it quits and hand the terminal
/// back, even if the loop failed.
pub fn run(app: &mut App, initial: Option<NavigationIntent>) -> anyhow::Result<()> {
    // Set up panic hook to restore terminal.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal().context("failed to initialise terminal")?;
    app.start(initial);
    let result = app.run(&mut terminal);
    restore_terminal(&mut terminal).context("failed to restore terminal")?;
    result
}

#[cfg(test)]
pub(crate) mod test_support {
    use ratatui::{backend::TestBackend, layout::Rect, Frame, Terminal};

    /// Draw into an in-memory terminal and return the screen as text, one
    /// line per row.
    pub fn render_to_string(
        width: u16,
        height: u16,
        draw: impl FnOnce(&mut Frame, Rect),
    ) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        let mut draw = Some(draw);
        terminal
            .draw(|frame| {
                let area = frame.area();
                if let Some(draw) = draw.take() {
                    draw(frame, area);
                }
            })
            .unwrap();

        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }
}

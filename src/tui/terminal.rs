//! Terminal setup and teardown

use std::io::{self, Stdout};

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::error::{AppError, Result};

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

fn terminal_error(step: &'static str) -> impl FnOnce(io::Error) -> AppError {
    move |e| AppError::Terminal(format!("{}: {}", step, e))
}

pub fn init() -> Result<Tui> {
    enable_raw_mode().map_err(terminal_error("enable raw mode"))?;
    execute!(io::stdout(), EnterAlternateScreen).map_err(terminal_error("enter alternate screen"))?;
    let mut terminal =
        Terminal::new(CrosstermBackend::new(io::stdout())).map_err(terminal_error("create terminal"))?;
    terminal.clear().map_err(terminal_error("clear screen"))?;
    Ok(terminal)
}

/// Must run on every exit path, or the user's shell is left in raw mode
pub fn restore(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode().map_err(terminal_error("disable raw mode"))?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .map_err(terminal_error("leave alternate screen"))?;
    terminal.show_cursor().map_err(terminal_error("show cursor"))
}

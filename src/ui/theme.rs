//! Terminal styles for run output and the worker monitor

use crate::status::WorkerStatus;
use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Styles keyed by what is being shown rather than by color
#[derive(Debug, Clone)]
pub struct Theme {
    pub heading: Style,
    pub label: Style,
    pub done: Style,
    pub failure: Style,
    pub caution: Style,
    pub accent: Style,
    /// Monitor rows, one per worker state
    pub idle: Style,
    pub busy: Style,
    pub skipped: Style,
}

impl Theme {
    pub fn from_env() -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some();
        Self::new(wants_color(no_color, console::Term::stdout().is_term()))
    }

    pub fn new(colored: bool) -> Self {
        let pick = |style: Style| if colored { style } else { Style::new() };
        Self {
            heading: pick(Style::new().cyan().bold()),
            label: pick(Style::new().white().dimmed()),
            done: pick(Style::new().green().bold()),
            failure: pick(Style::new().red().bold()),
            caution: pick(Style::new().yellow().bold()),
            accent: pick(Style::new().blue()),
            idle: pick(Style::new().bright_black()),
            busy: pick(Style::new().magenta()),
            skipped: pick(Style::new().green().dimmed()),
        }
    }

    /// Style for a worker's monitor row
    pub fn worker(&self, status: &WorkerStatus) -> Style {
        match status {
            WorkerStatus::Idle => self.idle.clone(),
            WorkerStatus::Processing => self.busy.clone(),
            WorkerStatus::Skipped => self.skipped.clone(),
            WorkerStatus::Error(_) => self.failure.clone(),
        }
    }
}

/// `NO_COLOR` wins over a terminal
fn wants_color(no_color: bool, is_term: bool) -> bool {
    is_term && !no_color
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::from_env)
}

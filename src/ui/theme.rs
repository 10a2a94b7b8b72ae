//! Prompt and progress theme

use cliclack::ThemeState;
use console::{Emoji, Style};

/// Green while a step runs, cyan once it is done, bright red on errors
#[derive(Debug, Clone, Default)]
pub struct TilawahTheme;

impl TilawahTheme {
    fn color(state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().green(),
            ThemeState::Error(_) => Style::new().red().bright(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().cyan(),
        }
    }
}

impl cliclack::Theme for TilawahTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Submit => Self::color(state).dim(),
            _ => Self::color(state),
        }
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        Self::color(state)
    }

    // moon phases, settling on a full moon
    fn spinner_chars(&self) -> String {
        Emoji("◐◓◑◒●", "-\\|/*").to_string()
    }
}

/// Initialize the global theme
pub fn init_theme() {
    cliclack::set_theme(TilawahTheme);
}

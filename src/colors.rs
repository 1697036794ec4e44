//! Color support with NO_COLOR and CLICOLOR handling
//!
//! - `NO_COLOR`: if set (to any value), disable colors
//! - `CLICOLOR`: if set to 0, disable colors
//! - `CLICOLOR_FORCE`: if set to non-zero, force colors even when not a TTY
use colored::control;

/// Configure colored output for the whole program; call once, early in main().
pub fn init_colors() {
    control::set_override(color_enabled(
        |key| std::env::var(key).ok(),
        std::io::IsTerminal::is_terminal(&std::io::stdout()),
    ));
}

fn color_enabled(var: impl Fn(&str) -> Option<String>, is_tty: bool) -> bool {
    // NO_COLOR takes precedence over everything (https://no-color.org/)
    if var("NO_COLOR").is_some() {
        return false;
    }
    if var("CLICOLOR_FORCE").is_some_and(|v| v != "0") {
        return true;
    }
    if var("CLICOLOR").is_some_and(|v| v == "0") {
        return false;
    }
    is_tty
}

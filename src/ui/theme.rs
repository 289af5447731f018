use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Styles for sync reports; every field is `Style::new()` when uncolored.
#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    pub info: Style,
    pub dim: Style,
    /// MAC code in change listings
    pub code: Style,
    /// Old subtype in change listings
    pub subtype: Style,
}

impl Theme {
    pub fn new(colored: bool) -> Self {
        let pick = |style: Style| if colored { style } else { Style::new() };
        Self {
            header: pick(Style::new().cyan().bold()),
            success: pick(Style::new().green().bold()),
            error: pick(Style::new().red().bold()),
            warn: pick(Style::new().yellow().bold()),
            info: pick(Style::new().magenta()),
            dim: pick(Style::new().white().dimmed()),
            code: pick(Style::new().bold()),
            subtype: pick(Style::new().bright_black()),
        }
    }

    /// Colored only when stdout is a terminal
    pub fn detect() -> Self {
        Self::new(console::Term::stdout().is_term())
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use owo_colors::OwoColorize;

    #[test]
    fn test_uncolored_theme_emits_plain_text() {
        let theme = Theme::new(false);
        assert_eq!("AB".style(theme.code).to_string(), "AB");
        assert_eq!("01:02".style(theme.subtype).to_string(), "01:02");
    }

    #[test]
    fn test_colored_theme_emits_escapes() {
        let theme = Theme::new(true);
        assert!("AB".style(theme.code).to_string().contains('\u{1b}'));
    }
}

use std::env;

use color_eyre::owo_colors::{OwoColorize, Style as Ink};
use regit_core::CommandStatus;

pub struct Style {
    enabled: bool,
}

impl Style {
    pub fn new(force_no_color: bool, is_tty: bool) -> Self {
        let env_no_color = env::var_os("NO_COLOR").is_some();
        Self {
            enabled: !(force_no_color || env_no_color) && is_tty,
        }
    }

    pub fn status(&self, status: CommandStatus, text: &str) -> String {
        let (symbol, tone) = match status {
            CommandStatus::Ok => ("✔", Tone::Green),
            CommandStatus::UserError => ("✗", Tone::Yellow),
            CommandStatus::Failure => ("✖", Tone::Red),
        };
        let line = format!("{symbol} {text}");
        self.paint(&line, tone, true)
    }

    pub fn info(&self, text: &str) -> String {
        self.paint(text, Tone::Cyan, false)
    }

    pub fn warning(&self, text: &str) -> String {
        self.paint(text, Tone::Yellow, false)
    }

    pub fn hint(&self, hint: &str) -> String {
        format!("{} {hint}", self.paint("regit ▸ Hint:", Tone::Cyan, true))
    }

    fn paint(&self, text: &str, tone: Tone, bold: bool) -> String {
        if !self.enabled {
            return text.to_string();
        }
        let ink = tone.ink();
        let ink = if bold { ink.bold() } else { ink };
        text.style(ink).to_string()
    }
}

#[derive(Clone, Copy)]
enum Tone {
    Green,
    Yellow,
    Red,
    Cyan,
}

impl Tone {
    fn ink(self) -> Ink {
        match self {
            Self::Green => Ink::new().green(),
            Self::Yellow => Ink::new().yellow(),
            Self::Red => Ink::new().red(),
            Self::Cyan => Ink::new().cyan(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_output_without_tty() {
        let style = Style::new(false, false);
        assert_eq!(style.status(CommandStatus::Ok, "done"), "✔ done");
        assert_eq!(style.status(CommandStatus::Failure, "boom"), "✖ boom");
        assert_eq!(style.hint("retry"), "regit ▸ Hint: retry");
        assert_eq!(style.warning("careful"), "careful");
    }

    #[test]
    fn tty_output_is_colored() {
        if std::env::var_os("NO_COLOR").is_some() {
            return;
        }
        let style = Style::new(false, true);
        let painted = style.status(CommandStatus::Ok, "done");
        assert!(painted.contains("\u{1b}["), "{painted:?}");
        assert!(painted.contains("✔ done"));
    }

    #[test]
    fn no_color_flag_wins_over_tty() {
        let style = Style::new(true, true);
        assert_eq!(style.info("x"), "x");
    }
}

use crate::error::{MsgExtractError, UserFriendlyError};
use console::{style, Emoji, Term};

// Emojis with text fallbacks
static CROSS: Emoji = Emoji("❌ ", "x ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");

/// Status messages around the batch: startup errors, notices, summaries.
///
/// Per-item lines go through [`crate::ui::Console`] instead, so they can be
/// escaped for terminals that cannot render them.
pub struct OutputFormatter {
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(verbose: u8, quiet: bool) -> Self {
        let term = Term::stderr();

        Self {
            use_colors: term.features().colors_supported() && !quiet,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn error(&self, message: &str) {
        self.print_message(MessageType::Error, message);
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            self.print_message(MessageType::Info, message);
        }
    }

    pub fn print_user_friendly_error(&self, error: &MsgExtractError) {
        self.error(&error.user_message());

        if let Some(suggestion) = error.suggestion() {
            if self.use_colors {
                eprintln!(
                    "{}{}",
                    INFO,
                    style(format!("Suggestion: {}", suggestion)).cyan()
                );
            } else {
                eprintln!("Suggestion: {}", suggestion);
            }
        }
    }

    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_message(&self, msg_type: MessageType, message: &str) {
        if self.use_colors {
            let (emoji, styled) = match msg_type {
                MessageType::Error => (CROSS, style(message).red().bold()),
                MessageType::Info => (INFO, style(message).cyan()),
            };
            eprintln!("{}{}", emoji, styled);
        } else {
            eprintln!("{} {}", msg_type.prefix(), message);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Error,
    Info,
}

impl MessageType {
    fn prefix(self) -> &'static str {
        match self {
            MessageType::Error => "x",
            MessageType::Info => "i",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_mode() {
        let formatter = OutputFormatter::new(2, true);
        assert_eq!(formatter.verbose_level, 0);
        assert!(!formatter.use_colors);
        assert!(!formatter.should_show_message(0));
    }

    #[test]
    fn test_should_show_message() {
        let formatter = OutputFormatter::new(1, false);
        assert!(formatter.should_show_message(0));
        assert!(formatter.should_show_message(1));
        assert!(!formatter.should_show_message(2));
    }

    #[test]
    fn test_prefixes() {
        assert_eq!(MessageType::Error.prefix(), "x");
        assert_eq!(MessageType::Info.prefix(), "i");
    }
}

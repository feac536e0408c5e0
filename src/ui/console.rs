use console::Term;
use std::fmt::{Debug, Write as _};
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("text cannot be encoded for this terminal")]
    Unencodable,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Line-oriented sink for progress, error and body output.
pub trait Console {
    fn write_line(&mut self, line: &str) -> Result<(), ConsoleError>;
}

/// Console backed by the process stdout.
pub struct TerminalConsole {
    term: Term,
    ascii_only: bool,
}

impl TerminalConsole {
    pub fn stdout() -> Self {
        Self {
            term: Term::stdout(),
            ascii_only: !locale_supports_unicode(),
        }
    }
}

impl Console for TerminalConsole {
    fn write_line(&mut self, line: &str) -> Result<(), ConsoleError> {
        if self.ascii_only && !line.is_ascii() {
            return Err(ConsoleError::Unencodable);
        }
        self.term.write_line(line)?;
        Ok(())
    }
}

/// In-memory console, mostly useful for embedding and tests.
#[derive(Debug, Default)]
pub struct BufferConsole {
    lines: Vec<String>,
    ascii_only: bool,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ascii_only() -> Self {
        Self {
            lines: Vec::new(),
            ascii_only: true,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl Console for BufferConsole {
    fn write_line(&mut self, line: &str) -> Result<(), ConsoleError> {
        if self.ascii_only && !line.is_ascii() {
            return Err(ConsoleError::Unencodable);
        }
        self.lines.push(line.to_string());
        Ok(())
    }
}

/// Writes `line`; only when the console cannot encode it, writes the text
/// produced by `fallback` instead. Console faults are never propagated.
pub fn write_or_fallback<C, F>(console: &mut C, line: &str, fallback: F)
where
    C: Console + ?Sized,
    F: FnOnce() -> String,
{
    match console.write_line(line) {
        Ok(()) => {}
        Err(ConsoleError::Unencodable) => {
            if let Err(e) = console.write_line(&fallback()) {
                tracing::warn!(error = %e, "Dropped console message after escaping it");
            }
        }
        Err(e) => tracing::warn!(error = %e, "Dropped console message"),
    }
}

/// Escaped, ASCII-only rendering of a value for terminals that cannot show it.
///
/// Uses the `Debug` representation, then replaces every non-ASCII character
/// with a fixed-width escape.
pub fn sanitize<T: Debug + ?Sized>(value: &T) -> String {
    ascii_escape(&format!("{:?}", value))
}

/// Replaces non-ASCII characters with `\xHH`, `\uHHHH` or `\UHHHHHHHH`.
pub fn ascii_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for ch in text.chars() {
        let code = ch as u32;
        // Writing into a String cannot fail.
        let _ = match code {
            _ if ch.is_ascii() => write!(escaped, "{}", ch),
            0..=0xFF => write!(escaped, "\\x{:02X}", code),
            0x100..=0xFFFF => write!(escaped, "\\u{:04X}", code),
            _ => write!(escaped, "\\U{:08X}", code),
        };
    }

    escaped
}

fn locale_supports_unicode() -> bool {
    if cfg!(windows) {
        return true;
    }

    for var in ["LC_ALL", "LC_CTYPE", "LANG"] {
        if let Ok(value) = std::env::var(var) {
            if value.is_empty() {
                continue;
            }
            let value = value.to_lowercase();
            return value.contains("utf-8") || value.contains("utf8");
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_input_matches_debug_repr() {
        let inputs = ["plain.msg", "with \"quotes\"", "tab\there", "back\\slash", ""];
        for input in inputs {
            assert_eq!(sanitize(input), format!("{:?}", input));
        }
    }

    #[test]
    fn test_escape_widths() {
        assert_eq!(ascii_escape("caf\u{e9}"), "caf\\xE9");
        assert_eq!(ascii_escape("\u{4e2d}"), "\\u4E2D");
        assert_eq!(ascii_escape("\u{1F600}"), "\\U0001F600");
        assert_eq!(ascii_escape("\u{100}"), "\\u0100");
    }

    #[test]
    fn test_sanitize_is_always_ascii() {
        let inputs = [
            "r\u{e9}sum\u{e9}.msg",
            "\u{65e5}\u{672c}\u{8a9e}",
            "mixed \u{1F4E7} mail",
            "\u{0}\u{7f}\u{80}\u{ff}",
        ];
        for input in inputs {
            assert!(sanitize(input).is_ascii(), "not ascii for {:?}", input);
        }
    }

    #[test]
    fn test_sanitize_path() {
        let path = std::path::PathBuf::from("r\u{e9}ponse.msg");
        assert_eq!(sanitize(&path), "\"r\\xE9ponse.msg\"");
    }

    #[test]
    fn test_fallback_only_on_unencodable() {
        let mut console = BufferConsole::ascii_only();
        write_or_fallback(&mut console, "plain", || "fallback".to_string());
        write_or_fallback(&mut console, "caf\u{e9}", || "escaped".to_string());

        assert_eq!(console.lines(), ["plain", "escaped"]);
    }

    #[test]
    fn test_capable_console_never_uses_fallback() {
        let mut console = BufferConsole::new();
        write_or_fallback(&mut console, "caf\u{e9}", || "escaped".to_string());

        assert_eq!(console.lines(), ["caf\u{e9}"]);
    }

    #[test]
    fn test_failed_fallback_is_dropped() {
        let mut console = BufferConsole::ascii_only();
        write_or_fallback(&mut console, "caf\u{e9}", || "still caf\u{e9}".to_string());

        assert!(console.lines().is_empty());
    }
}

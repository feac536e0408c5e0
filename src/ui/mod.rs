pub mod console;
pub mod output;

pub use console::{
    ascii_escape, sanitize, write_or_fallback, BufferConsole, Console, ConsoleError,
    TerminalConsole,
};
pub use output::OutputFormatter;

//! Extraction engine contract and the default `.msg` implementation.
//!
//! The batch driver only talks to [`ExtractionEngine`] and [`MessageHandle`].
//! Releasing a handle is dropping it, so every exit path of a loop iteration
//! frees the underlying file.

pub mod msg;
pub mod render;
pub mod rtf;
pub mod sink;

pub use msg::{Attachment, MsgEngine, MsgFile};

use crate::driver::target::OutputTarget;
use crate::error::Result;
use std::path::{Path, PathBuf};

/// Options applied while opening a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserOptions {
    /// Treat an undecodable compressed RTF body as absent instead of failing.
    pub ignore_rtf_de_errors: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyFormat {
    #[default]
    Text,
    Json,
    Html,
    Rtf,
    Pdf,
}

impl BodyFormat {
    pub fn file_name(self) -> &'static str {
        match self {
            BodyFormat::Text => "message.txt",
            BodyFormat::Json => "message.json",
            BodyFormat::Html => "message.html",
            BodyFormat::Rtf => "message.rtf",
            BodyFormat::Pdf => "message.pdf",
        }
    }
}

/// Everything a handle needs to write its outputs.
#[derive(Debug, Clone)]
pub struct SaveOptions {
    pub format: BodyFormat,
    pub prepared_html: bool,
    pub allow_fallback: bool,
    pub attachments_only: bool,
    pub charset: String,
    pub content_id: bool,
    pub custom_filename: Option<String>,
    pub use_msg_filename: bool,
    pub wk_path: Option<PathBuf>,
    pub wk_options: Vec<String>,
    pub target: OutputTarget,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            format: BodyFormat::Text,
            prepared_html: false,
            allow_fallback: false,
            attachments_only: false,
            charset: "utf-8".to_string(),
            content_id: false,
            custom_filename: None,
            use_msg_filename: false,
            wk_path: None,
            wk_options: Vec::new(),
            target: OutputTarget::default(),
        }
    }
}

pub trait ExtractionEngine {
    type Handle: MessageHandle;

    fn open(&self, path: &Path, options: &ParserOptions) -> Result<Self::Handle>;
}

pub trait MessageHandle {
    /// The plain text body, empty when the message has none.
    fn primary_text(&self) -> &str;

    /// Writes the configured outputs and returns where they were written.
    fn save(&mut self, options: &SaveOptions) -> Result<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_file_names() {
        assert_eq!(BodyFormat::Text.file_name(), "message.txt");
        assert_eq!(BodyFormat::Pdf.file_name(), "message.pdf");
    }

    #[test]
    fn test_default_save_options() {
        let options = SaveOptions::default();
        assert_eq!(options.format, BodyFormat::Text);
        assert_eq!(options.charset, "utf-8");
        assert!(!options.target.is_archive());
    }
}

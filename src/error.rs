use std::error::Error as StdError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MsgExtractError {
    #[error("IO operation failed")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Cannot create output directory {path}")]
    OutputDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a valid MSG container: {path}")]
    InvalidContainer {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Requested data not found in message: {what}")]
    MissingData { what: String },

    #[error("Failed to decompress RTF body: {message}")]
    RtfDecode { message: String },

    #[error("Conversion failed: {message}")]
    Conversion { message: String },

    #[error("Archive operation failed")]
    Archive(#[from] zip::result::ZipError),

    #[error("Serialization failed")]
    Serialization(#[from] serde_json::Error),

    #[error("Console output failed")]
    Console(#[from] crate::ui::ConsoleError),

    #[error("Logging setup failed: {message}")]
    Logging { message: String },
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for MsgExtractError {
    fn user_message(&self) -> String {
        match self {
            MsgExtractError::Io(source) => format!("{}: {}", self, source),
            MsgExtractError::Archive(source) => format!("{}: {}", self, source),
            MsgExtractError::Serialization(source) => format!("{}: {}", self, source),
            MsgExtractError::Console(source) => format!("{}: {}", self, source),
            MsgExtractError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            MsgExtractError::OutputDirectory { path, source } => {
                format!("Cannot create output directory {}: {}", path, source)
            }
            MsgExtractError::InvalidContainer { path, source } => {
                format!("{} is not a valid MSG file: {}", path, source)
            }
            MsgExtractError::MissingData { what } => {
                format!("The message does not contain {}", what)
            }
            MsgExtractError::Conversion { message } => {
                format!("Conversion failed: {}", message)
            }
            MsgExtractError::Logging { message } => {
                format!("Could not set up logging: {}", message)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            MsgExtractError::Config { .. } => Some(
                "Check your configuration file syntax and the combination of command line flags.".to_string()
            ),
            MsgExtractError::OutputDirectory { .. } => Some(
                "Ensure you have write permission for the parent directory, or choose a different path with --out.".to_string()
            ),
            MsgExtractError::MissingData { .. } => Some(
                "Use --allow-fallback to save a simpler body format when the requested one is missing.".to_string()
            ),
            MsgExtractError::Conversion { .. } => Some(
                "Check that wkhtmltopdf is installed, or point to it with --wk-path.".to_string()
            ),
            MsgExtractError::Logging { .. } => Some(
                "Pass an existing, writable directory with --log when enabling --file-logging.".to_string()
            ),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MsgExtractError>;

/// Renders an error followed by every error in its source chain.
pub fn error_chain(error: &dyn StdError) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();

    while let Some(cause) = source {
        rendered.push_str("\n  caused by: ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }

    rendered
}

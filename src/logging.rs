use crate::config::LoggingConfig;
use crate::error::{MsgExtractError, Result};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE_NAME: &str = "msgextract.log";

/// Installs the global subscriber. Returns the log file path when file logging is on.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config, verbose)));

    let (file_layer, log_path) = match (config.file_logging, config.directory.as_ref()) {
        (true, Some(directory)) => {
            fs::create_dir_all(directory).map_err(|e| MsgExtractError::Logging {
                message: format!("cannot create log directory {}: {}", directory.display(), e),
            })?;

            let path = directory.join(LOG_FILE_NAME);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| MsgExtractError::Logging {
                    message: format!("cannot open log file {}: {}", path.display(), e),
                })?;

            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file));
            (Some(layer), Some(path))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .try_init()
        .map_err(|e| MsgExtractError::Logging {
            message: e.to_string(),
        })?;

    Ok(log_path)
}

fn default_directive(config: &LoggingConfig, verbose: bool) -> String {
    if verbose {
        "trace".to_string()
    } else {
        config.level.to_lowercase()
    }
}

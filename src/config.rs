use crate::engine::{ParserOptions, SaveOptions};
use crate::error::{MsgExtractError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub parser: ParserConfig,
    pub render: RenderConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub charset: String,
    pub allow_fallback: bool,
    pub content_id: bool,
    pub use_msg_filename: bool,
    pub recursive: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ParserConfig {
    pub ignore_rtf_de_errors: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    pub wk_path: Option<PathBuf>,
    pub wk_options: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: Option<PathBuf>,
    pub file_logging: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            charset: "utf-8".to_string(),
            allow_fallback: false,
            content_id: false,
            use_msg_filename: false,
            recursive: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            directory: None,
            file_logging: false,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(MsgExtractError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| MsgExtractError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| MsgExtractError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["msgextract.toml", ".msgextract.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref charset) = cli_args.charset {
            self.output.charset = charset.clone();
        }

        if cli_args.allow_fallback {
            self.output.allow_fallback = true;
        }

        if cli_args.content_id {
            self.output.content_id = true;
        }

        if cli_args.use_msg_filename {
            self.output.use_msg_filename = true;
        }

        if cli_args.recursive {
            self.output.recursive = true;
        }

        if cli_args.ignore_rtf_de_errors {
            self.parser.ignore_rtf_de_errors = true;
        }

        if let Some(ref wk_path) = cli_args.wk_path {
            self.render.wk_path = Some(wk_path.clone());
        }

        if !cli_args.wk_options.is_empty() {
            self.render.wk_options = cli_args.wk_options.clone();
        }

        if let Some(ref log_dir) = cli_args.log_directory {
            self.logging.directory = Some(log_dir.clone());
        }

        if cli_args.file_logging {
            self.logging.file_logging = true;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.output.charset.trim().is_empty() {
            return Err(MsgExtractError::Config {
                message: "Output charset must not be empty".to_string(),
            });
        }

        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(MsgExtractError::Config {
                message: format!(
                    "Unknown log level '{}' (expected one of: {})",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }

        if self.logging.file_logging && self.logging.directory.is_none() {
            return Err(MsgExtractError::Config {
                message: "File logging requires a log directory".to_string(),
            });
        }

        Ok(())
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub charset: Option<String>,
    pub allow_fallback: bool,
    pub content_id: bool,
    pub use_msg_filename: bool,
    pub recursive: bool,
    pub ignore_rtf_de_errors: bool,
    pub wk_path: Option<PathBuf>,
    pub wk_options: Vec<String>,
    pub log_directory: Option<PathBuf>,
    pub file_logging: bool,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_charset(mut self, charset: Option<String>) -> Self {
        self.charset = charset;
        self
    }

    pub fn with_allow_fallback(mut self, allow: bool) -> Self {
        self.allow_fallback = allow;
        self
    }

    pub fn with_content_id(mut self, content_id: bool) -> Self {
        self.content_id = content_id;
        self
    }

    pub fn with_use_msg_filename(mut self, use_filename: bool) -> Self {
        self.use_msg_filename = use_filename;
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_ignore_rtf_de_errors(mut self, ignore: bool) -> Self {
        self.ignore_rtf_de_errors = ignore;
        self
    }

    pub fn with_wk_path(mut self, wk_path: Option<PathBuf>) -> Self {
        self.wk_path = wk_path;
        self
    }

    pub fn with_wk_options(mut self, wk_options: Vec<String>) -> Self {
        self.wk_options = wk_options;
        self
    }

    pub fn with_log_directory(mut self, log_directory: Option<PathBuf>) -> Self {
        self.log_directory = log_directory;
        self
    }

    pub fn with_file_logging(mut self, file_logging: bool) -> Self {
        self.file_logging = file_logging;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtractionMode {
    #[default]
    Save,
    PrintBody,
}

/// Options for one batch, fixed before the first item is processed.
#[derive(Debug, Clone, Default)]
pub struct RunConfiguration {
    pub mode: ExtractionMode,
    pub progress: bool,
    pub parser: ParserOptions,
    pub save: SaveOptions,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.output.charset, "utf-8");
        assert_eq!(config.logging.level, "warn");
        assert!(!config.parser.ignore_rtf_de_errors);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.file_logging = true;
        assert!(config.validate().is_err());

        config.logging.directory = Some(PathBuf::from("logs"));
        assert!(config.validate().is_ok());

        config.output.charset = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let mut config = Config::default();
        config.render.wk_options = vec!["--quiet".to_string()];
        let temp_file = NamedTempFile::new().unwrap();

        std::fs::write(temp_file.path(), toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded_config.render.wk_options, vec!["--quiet"]);
        assert_eq!(loaded_config.output.charset, config.output.charset);
    }

    #[test]
    fn test_partial_config_file() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "[parser]\nignore_rtf_de_errors = true\n").unwrap();

        let config = Config::load_from_file(temp_file.path()).unwrap();
        assert!(config.parser.ignore_rtf_de_errors);
        assert_eq!(config.output.charset, "utf-8");
    }

    #[test]
    fn test_missing_config_file() {
        let result = Config::load_from_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(MsgExtractError::Config { .. })));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();

        let overrides = CliOverrides::new()
            .with_charset(Some("windows-1252".to_string()))
            .with_allow_fallback(true)
            .with_wk_options(vec!["--quiet".to_string()]);

        config.merge_with_cli_args(&overrides);

        assert_eq!(config.output.charset, "windows-1252");
        assert!(config.output.allow_fallback);
        assert_eq!(config.render.wk_options, vec!["--quiet"]);
        assert!(!config.output.content_id);
    }

    #[test]
    fn test_unset_flags_keep_file_values() {
        let mut config = Config::default();
        config.output.content_id = true;

        config.merge_with_cli_args(&CliOverrides::new());
        assert!(config.output.content_id);
    }

    #[test]
    fn test_sample_config_generation() {
        let sample = Config::create_sample_config();
        assert!(sample.contains("[output]"));
        assert!(sample.contains("[parser]"));
        assert!(sample.contains("[render]"));
        assert!(sample.contains("[logging]"));
    }
}

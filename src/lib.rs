pub mod cli;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod logging;
pub mod scanner;
pub mod ui;
pub mod validation;

// Public API re-exports
pub use cli::Cli;
pub use config::{CliOverrides, Config, ExtractionMode, RunConfiguration};
pub use error::{MsgExtractError, Result, UserFriendlyError};

// Core functionality re-exports
pub use driver::{BatchDriver, DestinationRequest, ItemOutcome, OutputTarget};
pub use engine::{
    BodyFormat, ExtractionEngine, MessageHandle, MsgEngine, MsgFile, ParserOptions, SaveOptions,
};
pub use scanner::InputScanner;
pub use ui::{sanitize, BufferConsole, Console, ConsoleError, OutputFormatter, TerminalConsole};
pub use validation::{
    AcknowledgmentGate, MsgValidator, StdinGate, ValidationReporter, ValidationResult,
    ValidationStatus, Validator,
};

use std::path::{Path, PathBuf};

/// One configured invocation: the inputs, the fixed run options and the
/// working directory captured at startup.
pub struct MsgExtract {
    run: RunConfiguration,
    items: Vec<PathBuf>,
    initial_dir: PathBuf,
    output_formatter: OutputFormatter,
}

impl MsgExtract {
    /// Resolves the output target and expands directory inputs.
    ///
    /// Fails if `--out-name` is given for more than one message after
    /// directory expansion, or if the output directory cannot be created.
    pub fn from_cli(cli: &Cli, config: Config, initial_dir: &Path) -> Result<Self> {
        let items = InputScanner::new(config.output.recursive).expand(&cli.inputs);
        if cli.out_name.is_some() && items.len() > 1 {
            return Err(MsgExtractError::Config {
                message: "--out-name can only be used with a single input file".to_string(),
            });
        }

        let run = cli.run_configuration(&config, initial_dir)?;

        Ok(Self {
            run,
            items,
            initial_dir: initial_dir.to_path_buf(),
            output_formatter: OutputFormatter::new(cli.verbosity_level(), cli.quiet),
        })
    }

    /// Runs the extraction loop with the default engine.
    pub fn extract(&self, console: &mut dyn Console) {
        self.extract_with(&MsgEngine, console);
    }

    pub fn extract_with<E: ExtractionEngine>(&self, engine: &E, console: &mut dyn Console) {
        self.output_formatter
            .info(&format!("Processing {} file(s)", self.items.len()));
        BatchDriver::new(engine, &self.run, console).run(&self.items);
    }

    /// Validates every input and writes the report into the initial directory.
    pub fn validate(
        &self,
        console: &mut dyn Console,
        gate: &mut dyn AcknowledgmentGate,
    ) -> Result<PathBuf> {
        ValidationReporter::new(&MsgValidator, gate, &self.initial_dir).run(&self.items, console)
    }

    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    pub fn items(&self) -> &[PathBuf] {
        &self.items
    }

    pub fn initial_dir(&self) -> &Path {
        &self.initial_dir
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }
}

/// Get version information
pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

use crate::config::{CliOverrides, Config, ExtractionMode, RunConfiguration};
use crate::driver::target::{DestinationRequest, OutputTarget};
use crate::engine::{BodyFormat, ParserOptions, SaveOptions};
use crate::error::Result;
use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "msgextract")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract bodies and attachments from Outlook .msg files")]
#[command(
    long_about = "msgextract opens each Outlook .msg file given on the command line and saves \
                  its body and attachments to a folder or zip archive. A file that cannot be \
                  processed is reported and the remaining files are still extracted."
)]
#[command(after_help = "EXAMPLES:\n  \
    msgextract message.msg\n  \
    msgextract inbox/*.msg --out extracted --progress\n  \
    msgextract message.msg --html --prepared-html --allow-fallback\n  \
    msgextract inbox --recursive --zip --out inbox.zip\n  \
    msgextract *.msg --validate")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// .msg files or directories containing them
    #[arg(value_name = "MSG", required_unless_present = "generate_config")]
    pub inputs: Vec<PathBuf>,

    /// Output directory, or archive file with --zip
    #[arg(short, long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Write output into a zip archive
    #[arg(long)]
    pub zip: bool,

    /// Print each message body to stdout instead of saving
    #[arg(long, conflicts_with = "validate")]
    pub dump_stdout: bool,

    /// Print a line for each file as it is processed
    #[arg(long)]
    pub progress: bool,

    /// Check file structure and write a timestamped report instead of extracting
    #[arg(long)]
    pub validate: bool,

    /// Save the body as JSON
    #[arg(long, group = "body_format")]
    pub json: bool,

    /// Save the HTML body
    #[arg(long, group = "body_format")]
    pub html: bool,

    /// Save the RTF body
    #[arg(long, group = "body_format")]
    pub rtf: bool,

    /// Render the HTML body to PDF with wkhtmltopdf
    #[arg(long, group = "body_format")]
    pub pdf: bool,

    /// Insert the message headers into the saved HTML
    #[arg(long)]
    pub prepared_html: bool,

    /// Fall back to a simpler body format when the requested one is missing
    #[arg(long)]
    pub allow_fallback: bool,

    /// Save only the attachments
    #[arg(long)]
    pub attachments_only: bool,

    /// Charset declared in generated HTML
    #[arg(long, value_name = "NAME")]
    pub charset: Option<String>,

    /// Name attachments by content id when they have one
    #[arg(long)]
    pub cid: bool,

    /// Name of the output folder (single input only)
    #[arg(long, value_name = "NAME", conflicts_with = "use_filename")]
    pub out_name: Option<String>,

    /// Name the output folder after the .msg file instead of the subject
    #[arg(long)]
    pub use_filename: bool,

    /// Path to the wkhtmltopdf executable
    #[arg(long, value_name = "PATH")]
    pub wk_path: Option<PathBuf>,

    /// Extra option passed to wkhtmltopdf (repeatable)
    #[arg(long, value_name = "OPT", allow_hyphen_values = true)]
    pub wk_options: Vec<String>,

    /// Treat an undecodable compressed RTF body as missing
    #[arg(long)]
    pub ignore_rtf_de_errors: bool,

    /// Descend into subdirectories of directory arguments
    #[arg(short, long)]
    pub recursive: bool,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Directory for the log file
    #[arg(long = "log", value_name = "DIR")]
    pub log_directory: Option<PathBuf>,

    /// Also write logs to <log dir>/msgextract.log
    #[arg(long)]
    pub file_logging: bool,

    /// Most verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_charset(self.charset.clone())
            .with_allow_fallback(self.allow_fallback)
            .with_content_id(self.cid)
            .with_use_msg_filename(self.use_filename)
            .with_recursive(self.recursive)
            .with_ignore_rtf_de_errors(self.ignore_rtf_de_errors)
            .with_wk_path(self.wk_path.clone())
            .with_wk_options(self.wk_options.clone())
            .with_log_directory(self.log_directory.clone())
            .with_file_logging(self.file_logging)
    }

    pub fn body_format(&self) -> BodyFormat {
        if self.json {
            BodyFormat::Json
        } else if self.html {
            BodyFormat::Html
        } else if self.rtf {
            BodyFormat::Rtf
        } else if self.pdf {
            BodyFormat::Pdf
        } else {
            BodyFormat::Text
        }
    }

    pub fn extraction_mode(&self) -> ExtractionMode {
        if self.dump_stdout {
            ExtractionMode::PrintBody
        } else {
            ExtractionMode::Save
        }
    }

    pub fn destination_request(&self) -> DestinationRequest {
        DestinationRequest::new(self.out.clone(), self.zip)
    }

    /// Builds the options for the whole batch, creating the output directory if needed.
    pub fn run_configuration(&self, config: &Config, initial_dir: &Path) -> Result<RunConfiguration> {
        let target = OutputTarget::resolve(&self.destination_request(), initial_dir)?;

        Ok(RunConfiguration {
            mode: self.extraction_mode(),
            progress: self.progress,
            parser: ParserOptions {
                ignore_rtf_de_errors: config.parser.ignore_rtf_de_errors,
            },
            save: SaveOptions {
                format: self.body_format(),
                prepared_html: self.prepared_html,
                allow_fallback: config.output.allow_fallback,
                attachments_only: self.attachments_only,
                charset: config.output.charset.clone(),
                content_id: config.output.content_id,
                custom_filename: self.out_name.clone(),
                use_msg_filename: config.output.use_msg_filename,
                wk_path: config.render.wk_path.clone(),
                wk_options: config.render.wk_options.clone(),
                target,
            },
        })
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose > 0 && !self.quiet
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

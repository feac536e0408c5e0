use clap::Parser;
use msgextract::{
    logging, Cli, MsgExtract, MsgExtractError, OutputFormatter, StdinGate, TerminalConsole,
    UserFriendlyError,
};
use std::env;
use std::path::PathBuf;
use std::process;

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    // Captured before any item is processed; later changes to the process
    // working directory do not move the outputs.
    let initial_dir = match env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            print_startup_error(&cli, &MsgExtractError::Io(e));
            return 1;
        }
    };

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            print_startup_error(&cli, &e);
            return 1;
        }
    };

    // Bodies go to stdout in dump mode, nothing else may.
    if !cli.dump_stdout {
        if let Err(e) = logging::init_logging(&config.logging, cli.is_verbose()) {
            print_startup_error(&cli, &e);
            return 1;
        }
    }

    let app = match MsgExtract::from_cli(&cli, config, &initial_dir) {
        Ok(app) => app,
        Err(e) => {
            print_startup_error(&cli, &e);
            return 1;
        }
    };

    let mut console = TerminalConsole::stdout();

    if cli.validate {
        return match app.validate(&mut console, &mut StdinGate) {
            Ok(_) => 0,
            Err(e) => {
                app.output_formatter().print_user_friendly_error(&e);
                1
            }
        };
    }

    app.extract(&mut console);
    0
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("msgextract.toml"));

    match MsgExtract::generate_sample_config(&config_path) {
        Ok(()) => {
            println!(
                "Generated sample configuration file: {}",
                config_path.display()
            );
            println!("\nTo use this configuration:");
            println!("  msgextract <MSG>... --config {}", config_path.display());
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn print_startup_error(cli: &Cli, error: &MsgExtractError) {
    let formatter = OutputFormatter::new(cli.verbosity_level(), cli.quiet);
    formatter.print_user_friendly_error(error);
}

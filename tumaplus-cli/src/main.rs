use std::process;

use clap::CommandFactory;
use tumaplus_cli::cli::{self, Cli, Commands};
use tumaplus_cli::error::handle_cli_result;
use tumaplus_cli::exit_codes::{EXIT_FETCH_ERROR, EXIT_SUCCESS};
use tumaplus_cli::{completions, interactive, options, report, validate};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    // Fast path for help - avoid loading configuration
    if cli.command.is_none() {
        if let Err(e) = Cli::command().print_help() {
            eprintln!("Failed to print help: {}", e);
        }
        process::exit(EXIT_SUCCESS);
    }

    use tracing::Level;

    let log_level = if cli.quiet {
        Level::ERROR
    } else if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::TRACE
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(log_level)
        .init();

    if !Cli::should_use_color() {
        colored::control::set_override(false);
    }

    let config = cli.config();

    let exit_code = match cli.command {
        Some(Commands::Report { filters, format }) => {
            tracing::debug!("Running report command");
            handle_cli_result(report::run_report_command(config, filters, format).await)
        }
        Some(Commands::Options { filters, format }) => {
            tracing::debug!("Running options command");
            handle_cli_result(options::run_options_command(config, filters, format).await)
        }
        Some(Commands::Validate { format }) => {
            tracing::debug!("Running validate command");
            run_validate(config, cli.quiet, format).await
        }
        Some(Commands::Interactive) => {
            tracing::debug!("Starting interactive mode");
            handle_cli_result(interactive::run_interactive_command(config).await)
        }
        Some(Commands::Completion { shell }) => {
            tracing::debug!("Generating completion for {:?}", shell);
            run_completions(shell)
        }
        None => {
            // This case is handled early above
            unreachable!()
        }
    };

    process::exit(exit_code);
}

fn run_completions(shell: clap_complete::Shell) -> i32 {
    match completions::print_completion(shell) {
        Ok(_) => EXIT_SUCCESS,
        Err(e) => {
            tracing::error!("Completion error: {}", e);
            EXIT_FETCH_ERROR
        }
    }
}

/// Runs the validate command: configuration, catalog, dataset fetch and
/// schema checks, in that order.
///
/// # Returns
///
/// Exit code:
/// - 0: Success (warnings allowed)
/// - 1: The dataset could not be fetched
/// - 2: Configuration or catalog errors found
async fn run_validate(config: tumaplus::Config, quiet: bool, format: cli::ValidateFormat) -> i32 {
    match validate::run_validate_command(config, quiet, format).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            tracing::error!("Validate error: {}", e);
            e.exit_code
        }
    }
}

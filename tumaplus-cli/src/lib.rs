//! TUMA PLUS CLI Library
//!
//! Command-line interface definitions, exit codes and the command
//! implementations behind the `tumaplus` binary.

/// Command-line interface definitions and argument parsing
pub mod cli;
/// Shell completion generation
pub mod completions;
/// CLI error type and exit code mapping
pub mod error;
/// Exit codes used by the CLI application
pub mod exit_codes;
/// Menu-driven filter selection
pub mod interactive;
/// Filter option listing
pub mod options;
/// Report rendering
pub mod report;
/// Configuration, catalog and schema checks
pub mod validate;

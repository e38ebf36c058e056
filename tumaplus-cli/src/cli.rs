use clap::{Args, Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use std::io;
use std::path::PathBuf;
use tumaplus::{Config, Dimension, Period, Selection};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidateFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "tumaplus")]
#[command(version)]
#[command(about = "Indicator dashboard for the TUMA PLUS consortium")]
#[command(long_about = "
tumaplus loads the TUMA PLUS reporting spreadsheet, filters it by
organisation, geography and reporting month, and prints the indicator
sections each partner organisation is responsible for.

Example usage:
  tumaplus report -o PARDE                 # Participation cursus for PARDE
  tumaplus report -o CARE -p Sud-Kivu      # CARE sections for one province
  tumaplus options -p Nord-Kivu            # Zones and areas offered for a province
  tumaplus interactive                     # Pick filters from menus
  tumaplus completion bash > ~/.bashrc.d/tumaplus  # Generate bash completions
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// URL or path of the indicator spreadsheet (overrides configuration)
    #[arg(long, global = true)]
    pub source: Option<String>,

    /// Worksheet to read from the workbook
    #[arg(long, global = true)]
    pub sheet: Option<String>,

    /// Section catalog replacing the builtin one
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Filter flags shared by the report and options commands
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct FilterArgs {
    /// Organisation to include (repeatable)
    #[arg(short = 'o', long = "organisation", value_name = "NAME")]
    pub organisations: Vec<String>,

    /// Province to include (repeatable)
    #[arg(short = 'p', long = "province", value_name = "NAME")]
    pub provinces: Vec<String>,

    /// Health zone to include (repeatable)
    #[arg(short = 'z', long = "zone", value_name = "NAME")]
    pub zones: Vec<String>,

    /// Health area to include (repeatable)
    #[arg(short = 'a', long = "area", value_name = "NAME")]
    pub areas: Vec<String>,

    /// Reporting month to include, as YYYY-MM (repeatable)
    #[arg(long = "period", value_name = "YYYY-MM")]
    pub periods: Vec<Period>,
}

impl FilterArgs {
    /// The selection these flags describe
    pub fn selection(&self) -> Selection {
        Selection::new()
            .with(Dimension::Organisation, self.organisations.iter().cloned())
            .with(Dimension::Province, self.provinces.iter().cloned())
            .with(Dimension::HealthZone, self.zones.iter().cloned())
            .with(Dimension::HealthArea, self.areas.iter().cloned())
            .with_periods(self.periods.iter().copied())
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the indicator sections for a selection
    #[command(long_about = "
Loads the dataset once, applies the filter flags and prints every section
unlocked by the organisation selection: its metric panels and the monthly
series behind its charts.

Without --organisation no section is shown, only the record counts.

Output formats:
  table  - Formatted tables (default)
  json   - JSON view model for scripting
  yaml   - YAML view model for scripting

Examples:
  tumaplus report -o PARDE
  tumaplus report -o CARE -o ADJ --period 2024-03 --format json
")]
    Report {
        #[command(flatten)]
        filters: FilterArgs,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// List the values each filter offers for a selection
    #[command(long_about = "
Prints the organisation, province, zone, area and period choices derived
from the dataset. Zone choices are scoped by --province and area choices
by --zone (or --province when no zone is chosen).

Examples:
  tumaplus options
  tumaplus options -p Sud-Kivu --format json
")]
    Options {
        #[command(flatten)]
        filters: FilterArgs,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Check configuration, catalog and dataset schema
    #[command(long_about = "
Validates the configuration, parses the section catalog, loads the dataset
and checks that every column the catalog references exists.

Exit codes:
  0 - Everything is consistent
  1 - The dataset could not be fetched
  2 - Configuration or catalog error

Example:
  tumaplus validate --source ./export.xlsx
")]
    Validate {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: ValidateFormat,
    },
    /// Choose filters from menus and browse the report
    Interactive,
    /// Generate shell completion scripts
    #[command(long_about = "
Generates shell completion scripts for various shells. Supports:
- bash
- zsh
- fish
- powershell

Examples:
  tumaplus completion bash > ~/.local/share/bash-completion/completions/tumaplus
  tumaplus completion zsh > ~/.zfunc/_tumaplus
  tumaplus completion fish > ~/.config/fish/completions/tumaplus.fish
")]
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn try_parse_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(args)
    }

    /// Layered configuration with the global flags applied on top
    pub fn config(&self) -> Config {
        let mut config = Config::new();
        if let Some(source) = &self.source {
            config.data_source = source.clone();
        }
        if let Some(sheet) = &self.sheet {
            config.sheet_name = Some(sheet.clone());
        }
        if let Some(catalog) = &self.catalog {
            config.catalog_path = Some(catalog.clone());
        }
        config
    }

    pub fn is_tty() -> bool {
        io::stdout().is_terminal()
    }

    pub fn should_use_color() -> bool {
        Self::is_tty() && std::env::var("NO_COLOR").is_err()
    }
}

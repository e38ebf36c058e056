use crate::cli::{FilterArgs, OutputFormat};
use crate::error::{CliError, CliResult, IntoCliResult};
use crate::exit_codes::EXIT_FETCH_ERROR;
use is_terminal::IsTerminal;
use std::io;
use tabled::{
    settings::{object::Rows, Color, Modify, Style},
    Table, Tabled,
};
use tumaplus::{Config, Dashboard, Dimension, FilterOptions};

#[derive(Tabled)]
struct OptionRow {
    #[tabled(rename = "Filtre")]
    filter: String,
    #[tabled(rename = "Choix")]
    count: usize,
    #[tabled(rename = "Valeurs")]
    values: String,
}

pub async fn run_options_command(
    config: Config,
    filters: FilterArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let mut dashboard = Dashboard::from_config(&config)?;
    let view = dashboard.render(&filters.selection()).await?;

    if let Some(error) = &view.load_error {
        return Err(CliError::new(error.clone(), EXIT_FETCH_ERROR));
    }

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&view.options).cli_general_error()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&view.options).cli_general_error()?;
            print!("{}", yaml);
        }
        OutputFormat::Table => display_table(&view.options),
    }

    Ok(())
}

fn option_rows(options: &FilterOptions) -> Vec<OptionRow> {
    Dimension::ALL
        .into_iter()
        .map(|dimension| {
            let values = options.get(dimension);
            OptionRow {
                filter: dimension.label().to_string(),
                count: values.len(),
                values: values.join(", "),
            }
        })
        .collect()
}

fn display_table(options: &FilterOptions) {
    let mut table = Table::new(option_rows(options));
    table.with(Style::modern());

    if io::stderr().is_terminal() {
        table.with(Modify::new(Rows::first()).with(Color::FG_BRIGHT_CYAN));
    }

    println!("{table}");
}

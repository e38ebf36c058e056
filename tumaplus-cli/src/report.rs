use crate::cli::{FilterArgs, OutputFormat};
use crate::error::{CliError, CliResult, IntoCliResult};
use crate::exit_codes::EXIT_FETCH_ERROR;
use colored::*;
use std::fmt::Write;
use tabled::{
    settings::{object::Rows, Alignment, Color, Modify, Style},
    Table, Tabled,
};
use tumaplus::{ChartData, ChartView, Config, Dashboard, Dimension, Selection, ViewModel};

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Indicateur")]
    label: String,
    #[tabled(rename = "Valeur")]
    value: String,
}

#[derive(Tabled)]
struct SeriesRow {
    #[tabled(rename = "Période")]
    period: String,
    #[tabled(rename = "Série")]
    series: String,
    #[tabled(rename = "Valeur")]
    value: String,
}

pub async fn run_report_command(
    config: Config,
    filters: FilterArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let mut dashboard = Dashboard::from_config(&config)?;
    let selection = filters.selection();
    let view = dashboard.render(&selection).await?;

    // A one-shot report has no previous snapshot to fall back on
    if let Some(error) = &view.load_error {
        return Err(CliError::new(error.clone(), EXIT_FETCH_ERROR));
    }

    warn_about_unknown_values(&view);
    print_view(&view, format)
}

pub(crate) fn print_view(view: &ViewModel, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(view).cli_general_error()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(view).cli_general_error()?;
            print!("{}", yaml);
        }
        OutputFormat::Table => {
            print!("{}", render_text(view, crate::cli::Cli::should_use_color()));
        }
    }
    Ok(())
}

/// Values passed on the command line that the dataset does not offer
fn warn_about_unknown_values(view: &ViewModel) {
    for dimension in Dimension::ALL {
        let offered = view.options.get(dimension);
        for value in view.selection.get(dimension) {
            if !offered.iter().any(|o| o == value) {
                tracing::warn!("No record has {} '{}'", dimension, value);
            }
        }
    }
}

fn describe_selection(selection: &Selection) -> String {
    let parts: Vec<String> = Dimension::ALL
        .into_iter()
        .filter(|dimension| selection.is_active(*dimension))
        .map(|dimension| {
            let values: Vec<&str> = selection.get(dimension).iter().map(String::as_str).collect();
            format!("{}={}", dimension, values.join(","))
        })
        .collect();

    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join(" ")
    }
}

fn styled_table<T: Tabled>(rows: Vec<T>, color: bool) -> Table {
    let mut table = Table::new(rows);
    table.with(Style::modern());
    if color {
        table.with(Modify::new(Rows::first()).with(Color::FG_BRIGHT_CYAN));
    }
    table.with(Modify::new(Rows::new(1..)).with(Alignment::left()));
    table
}

fn series_rows(chart: &ChartView) -> Vec<SeriesRow> {
    match &chart.data {
        ChartData::Wide(series) => series
            .points
            .iter()
            .flat_map(|point| {
                series
                    .columns
                    .iter()
                    .zip(&point.values)
                    .map(move |(label, value)| SeriesRow {
                        period: point.period.to_string(),
                        series: label.clone(),
                        value: value.to_string(),
                    })
            })
            .collect(),
        ChartData::Categorized(series) => series
            .points
            .iter()
            .map(|point| SeriesRow {
                period: point.period.to_string(),
                series: point.category.clone(),
                value: point.value.to_string(),
            })
            .collect(),
    }
}

/// Text rendering of a view: one block per section
pub(crate) fn render_text(view: &ViewModel, color: bool) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} {} of {} records (filters: {})",
        "TUMA PLUS".bold(),
        view.filtered_count,
        view.record_count,
        describe_selection(&view.selection)
    );
    if let Some(error) = &view.load_error {
        let _ = writeln!(out, "{} {}", "Warning:".yellow(), error);
    }

    if view.sections.is_empty() {
        let _ = writeln!(
            out,
            "\nNo section to show. Select at least one organisation with --organisation."
        );
        return out;
    }

    for section in &view.sections {
        let _ = writeln!(out, "\n{}", section.title.green().bold());

        for panel in &section.panels {
            if let Some(title) = &panel.title {
                let _ = writeln!(out, "{}", title.bold());
            }
            let rows: Vec<MetricRow> = panel
                .metrics
                .iter()
                .map(|metric| MetricRow {
                    label: metric.label.clone(),
                    value: metric.display.clone(),
                })
                .collect();
            let _ = writeln!(out, "{}", styled_table(rows, color));
        }

        for chart in &section.charts {
            let rows = series_rows(chart);
            let _ = writeln!(out, "{}", chart.title.cyan());
            if rows.is_empty() {
                let _ = writeln!(out, "  (no dated records)");
            } else {
                let _ = writeln!(out, "{}", styled_table(rows, color));
            }
        }
    }

    out
}

//! Menu-driven browsing of the dashboard
//!
//! Each filter edit triggers a fresh render cycle over the memoized
//! snapshot. Choices the cascade no longer offers are dropped from the
//! selection before the next menu is shown.

use crate::cli::OutputFormat;
use crate::error::{CliError, CliResult, IntoCliResult};
use crate::exit_codes::{EXIT_CONFIG_ERROR, EXIT_FETCH_ERROR};
use crate::report::print_view;
use colored::*;
use dialoguer::{theme::ColorfulTheme, MultiSelect, Select};
use is_terminal::IsTerminal;
use std::fmt;
use std::io;
use tumaplus::{Config, Dashboard, Dimension, Selection, ViewModel};

/// Upper bound on prune/render rounds; each round can only shrink the selection
const MAX_SETTLE_ROUNDS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    Filter(Dimension),
    ShowReport,
    ClearFilters,
    Refresh,
    Quit,
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuItem::Filter(dimension) => write!(f, "Filtrer: {}", dimension.label()),
            MenuItem::ShowReport => f.write_str("Afficher le rapport"),
            MenuItem::ClearFilters => f.write_str("Effacer les filtres"),
            MenuItem::Refresh => f.write_str("Actualiser les données"),
            MenuItem::Quit => f.write_str("Quitter"),
        }
    }
}

fn menu_items() -> Vec<MenuItem> {
    Dimension::ALL
        .into_iter()
        .map(MenuItem::Filter)
        .chain([
            MenuItem::ShowReport,
            MenuItem::ClearFilters,
            MenuItem::Refresh,
            MenuItem::Quit,
        ])
        .collect()
}

/// Replace one dimension of the selection with the picked option indices
fn apply_choice(
    selection: &mut Selection,
    dimension: Dimension,
    offered: &[String],
    picked: &[usize],
) {
    let values: Vec<String> = picked
        .iter()
        .filter_map(|&index| offered.get(index).cloned())
        .collect();
    selection.set(dimension, values);
}

fn prompt_summary(view: &ViewModel) -> String {
    let active: Vec<String> = Dimension::ALL
        .into_iter()
        .filter(|dimension| view.selection.is_active(*dimension))
        .map(|dimension| format!("{} ({})", dimension, view.selection.get(dimension).len()))
        .collect();
    let filters = if active.is_empty() {
        "aucun filtre".to_string()
    } else {
        active.join(", ")
    };
    format!(
        "{} / {} enregistrements, {} section(s) - {}",
        view.filtered_count,
        view.record_count,
        view.sections.len(),
        filters
    )
}

/// Render, then drop choices the cascade no longer offers until the
/// selection is stable.
async fn settle(dashboard: &mut Dashboard, selection: &mut Selection) -> CliResult<ViewModel> {
    let mut view = dashboard.render(selection).await?;
    for _ in 0..MAX_SETTLE_ROUNDS {
        if !selection.prune(&view.options) {
            break;
        }
        tracing::debug!("Dropped filter values no longer offered");
        view = dashboard.render(selection).await?;
    }
    Ok(view)
}

/// Reload the snapshot and render again. A failed reload leaves the
/// previous snapshot in place and only warns.
async fn refresh(dashboard: &mut Dashboard, selection: &mut Selection) -> CliResult<ViewModel> {
    if let Err(e) = dashboard.refresh().await {
        tracing::warn!("Refresh failed: {}", e);
        eprintln!("{} {}", "Warning:".yellow(), e);
    }
    settle(dashboard, selection).await
}

pub async fn run_interactive_command(config: Config) -> CliResult<()> {
    if !io::stdin().is_terminal() {
        return Err(CliError::new(
            "interactive mode needs a terminal; use `tumaplus report` in scripts",
            EXIT_CONFIG_ERROR,
        ));
    }

    let mut dashboard = Dashboard::from_config(&config)?;
    let theme = ColorfulTheme::default();
    let items = menu_items();
    let mut selection = Selection::new();

    let mut view = settle(&mut dashboard, &mut selection).await?;
    if view.record_count == 0 {
        if let Some(error) = &view.load_error {
            return Err(CliError::new(error.clone(), EXIT_FETCH_ERROR));
        }
    }

    loop {
        if let Some(error) = &view.load_error {
            eprintln!("{} {}", "Warning:".yellow(), error);
        }

        let choice = Select::with_theme(&theme)
            .with_prompt(prompt_summary(&view))
            .items(&items)
            .default(0)
            .interact()
            .cli_general_error()?;

        match items[choice] {
            MenuItem::Filter(dimension) => {
                let offered = view.options.get(dimension).to_vec();
                if offered.is_empty() {
                    println!("Aucune valeur disponible pour {}", dimension.label());
                    continue;
                }
                let chosen = view.selection.get(dimension);
                let defaults: Vec<bool> =
                    offered.iter().map(|value| chosen.contains(value)).collect();

                let picked = MultiSelect::with_theme(&theme)
                    .with_prompt(dimension.label())
                    .items(&offered)
                    .defaults(&defaults)
                    .interact()
                    .cli_general_error()?;

                apply_choice(&mut selection, dimension, &offered, &picked);
                view = settle(&mut dashboard, &mut selection).await?;
            }
            MenuItem::ShowReport => print_view(&view, OutputFormat::Table)?,
            MenuItem::ClearFilters => {
                selection = Selection::new();
                view = settle(&mut dashboard, &mut selection).await?;
            }
            MenuItem::Refresh => {
                view = refresh(&mut dashboard, &mut selection).await?;
            }
            MenuItem::Quit => break,
        }
    }

    Ok(())
}

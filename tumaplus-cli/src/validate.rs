use colored::*;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::cli::ValidateFormat;
use crate::error::{CliResult, IntoCliResult};
use crate::exit_codes::{EXIT_CONFIG_ERROR, EXIT_FETCH_ERROR, EXIT_SUCCESS};
use tumaplus::filter::organisation_options;
use tumaplus::loader::source_from_config;
use tumaplus::{Config, DataSource, Dataset, Dimension, SectionCatalog, TumaPlusError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub level: ValidationLevel,
    /// Which step raised the issue: configuration, catalog, dataset or schema
    pub check: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip)]
    pub exit_code: i32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    pub source: String,
    pub sections: usize,
    pub records: usize,
    pub errors: usize,
    pub warnings: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    fn error(&mut self, check: &'static str, error: &TumaPlusError, suggestion: Option<&str>) {
        let exit_code = if error.is_config() {
            EXIT_CONFIG_ERROR
        } else {
            EXIT_FETCH_ERROR
        };
        self.errors += 1;
        self.issues.push(ValidationIssue {
            level: ValidationLevel::Error,
            check,
            message: error.to_string(),
            suggestion: suggestion.map(str::to_string),
            exit_code,
        });
    }

    fn warning(&mut self, check: &'static str, message: String) {
        self.warnings += 1;
        self.issues.push(ValidationIssue {
            level: ValidationLevel::Warning,
            check,
            message,
            suggestion: None,
            exit_code: EXIT_SUCCESS,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// Configuration errors outrank fetch errors; warnings never fail
    pub fn exit_code(&self) -> i32 {
        self.issues
            .iter()
            .map(|issue| issue.exit_code)
            .max()
            .unwrap_or(EXIT_SUCCESS)
    }
}

/// Run every check in order, stopping at the first step whose failure
/// makes the later ones meaningless.
pub async fn validate(config: &Config) -> ValidationResult {
    let mut result = ValidationResult {
        source: config.data_source.clone(),
        ..ValidationResult::default()
    };

    if let Err(e) = config.validate() {
        result.error(
            "configuration",
            &e.into(),
            Some("Check tumaplus.yaml, TUMAPLUS_* variables and the command line flags"),
        );
        return result;
    }

    let catalog = match SectionCatalog::load(config.catalog_path.as_deref()) {
        Ok(catalog) => catalog,
        Err(e) => {
            result.error("catalog", &e, None);
            return result;
        }
    };
    result.sections = catalog.sections.len();

    let source = match source_from_config(config) {
        Ok(source) => source,
        Err(e) => {
            result.error("dataset", &e, None);
            return result;
        }
    };

    tracing::info!("Fetching dataset from {}", source.describe());
    let dataset = match source.fetch().await {
        Ok(dataset) => dataset,
        Err(e) => {
            result.error(
                "dataset",
                &e,
                Some("Check the network connection or point --source at a local export"),
            );
            return result;
        }
    };
    result.records = dataset.len();

    check_schema(&catalog, &dataset, &mut result);
    check_contents(&catalog, &dataset, &mut result);
    result
}

/// Every section is checked so that all missing columns are reported at once
fn check_schema(catalog: &SectionCatalog, dataset: &Dataset, result: &mut ValidationResult) {
    let schema = dataset.schema();

    for error in catalog.schema_errors(schema) {
        let error: TumaPlusError = error.into();
        result.error("schema", &error, None);
    }

    for dimension in Dimension::ALL {
        if let Some(column) = dimension.column() {
            if !schema.contains(column) {
                result.warning(
                    "schema",
                    format!(
                        "Filter column '{}' is missing; the {} filter will match nothing",
                        column, dimension
                    ),
                );
            }
        }
    }
}

fn check_contents(catalog: &SectionCatalog, dataset: &Dataset, result: &mut ValidationResult) {
    let undated = dataset
        .records()
        .iter()
        .filter(|record| record.period().is_none())
        .count();
    if undated > 0 {
        result.warning(
            "dataset",
            format!(
                "{} record(s) have no usable timestamp and are left out of every chart",
                undated
            ),
        );
    }

    let present = organisation_options(dataset);
    let gated: BTreeSet<&str> = catalog
        .sections
        .iter()
        .flat_map(|section| section.organisations.iter().map(String::as_str))
        .collect();
    for organisation in gated {
        if !present.contains(organisation) {
            result.warning(
                "dataset",
                format!("No record belongs to organisation '{}'", organisation),
            );
        }
    }
}

fn print_text_results(result: &ValidationResult, quiet: bool) {
    for issue in &result.issues {
        if quiet && issue.level != ValidationLevel::Error {
            continue;
        }

        let level_str = match issue.level {
            ValidationLevel::Error => "ERROR".red(),
            ValidationLevel::Warning => "WARN".yellow(),
        };
        println!("  {} [{}] {}", level_str, issue.check, issue.message);

        if !quiet {
            if let Some(suggestion) = &issue.suggestion {
                println!("    {}", suggestion.dimmed());
            }
        }
    }

    if !quiet {
        println!("\n{}", "Summary:".bold());
        println!("  Source: {}", result.source);
        println!("  Sections: {}", result.sections);
        println!("  Records: {}", result.records);
        if result.errors > 0 {
            println!("  Errors: {}", result.errors.to_string().red());
        }
        if result.warnings > 0 {
            println!("  Warnings: {}", result.warnings.to_string().yellow());
        }

        if result.has_errors() {
            println!("\n{} Validation failed with errors.", "✗".red());
        } else {
            println!("\n{} Validation passed!", "✓".green());
        }
    }
}

pub async fn run_validate_command(
    config: Config,
    quiet: bool,
    format: ValidateFormat,
) -> CliResult<i32> {
    let result = validate(&config).await;

    match format {
        ValidateFormat::Text => print_text_results(&result, quiet),
        ValidateFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result).cli_general_error()?);
        }
    }

    Ok(result.exit_code())
}

//! Time series builders
//!
//! All series are bucketed by [`Period`]: rows are grouped by the calendar
//! month of their submission time and each column is summed per month.
//! Rows whose time cannot be parsed are excluded.

use crate::dataset::FilteredView;
use crate::error::ConfigError;
use crate::period::Period;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A wide table of per-period values, one column per series
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    /// Display label of every column, in order
    pub columns: Vec<String>,
    /// One point per period, oldest first
    pub points: Vec<SeriesPoint>,
}

/// Values of every column for one period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// Reporting month
    pub period: Period,
    /// Value per column, aligned with [`TimeSeries::columns`]
    pub values: Vec<f64>,
}

impl TimeSeries {
    /// Whether the series has no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total of one column across every point
    pub fn column_total(&self, column: usize) -> f64 {
        self.points
            .iter()
            .filter_map(|point| point.values.get(column))
            .sum()
    }
}

/// A derived series column: the per-period sum of its source columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesColumn {
    /// Display label
    pub label: String,
    /// Source columns added together
    pub sources: Vec<String>,
}

impl SeriesColumn {
    /// A column fed by a single source
    pub fn single(label: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            sources: vec![source.into()],
        }
    }
}

/// Column name to display label mapping for categorized series
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelTable {
    labels: HashMap<String, String>,
}

impl LabelTable {
    /// Build a table from `(column, label)` pairs
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            labels: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Label for a column
    pub fn resolve(&self, column: &str) -> Option<&str> {
        self.labels.get(column).map(String::as_str)
    }

    /// Columns among `columns` that have no label
    pub fn missing<'a, S: AsRef<str>>(&self, columns: &'a [S]) -> Vec<&'a str> {
        columns
            .iter()
            .map(|column| column.as_ref())
            .filter(|column: &&str| !self.labels.contains_key(*column))
            .collect()
    }

    /// Number of labelled columns
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// One observation of a categorized series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorizedPoint {
    /// Reporting month
    pub period: Period,
    /// Display label of the source column
    pub category: String,
    /// Sum of the column for the period
    pub value: f64,
}

/// Long-form series: one point per (period, column)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategorizedSeries {
    /// Category labels, in column order
    pub categories: Vec<String>,
    /// Points ordered by period, then by column order
    pub points: Vec<CategorizedPoint>,
}

/// Sum every source column per period.
///
/// Returns a map of period to one sum per entry in `columns`, each entry
/// being the total over its list of source columns.
fn bucket_by_period(view: &FilteredView<'_>, columns: &[Vec<&str>]) -> BTreeMap<Period, Vec<f64>> {
    let dataset = view.dataset();
    let positions: Vec<Vec<usize>> = columns
        .iter()
        .map(|sources| {
            sources
                .iter()
                .filter_map(|source| dataset.schema().index_of(source))
                .collect()
        })
        .collect();

    let mut buckets: BTreeMap<Period, Vec<f64>> = BTreeMap::new();
    for record in view.records() {
        let Some(period) = record.period() else {
            continue;
        };
        let sums = buckets
            .entry(period)
            .or_insert_with(|| vec![0.0; columns.len()]);
        for (sum, sources) in sums.iter_mut().zip(&positions) {
            *sum += sources
                .iter()
                .filter_map(|&idx| record.cell(idx).as_number())
                .sum::<f64>();
        }
    }
    buckets
}

fn into_series(labels: Vec<String>, buckets: BTreeMap<Period, Vec<f64>>) -> TimeSeries {
    TimeSeries {
        columns: labels,
        points: buckets
            .into_iter()
            .map(|(period, values)| SeriesPoint { period, values })
            .collect(),
    }
}

/// Per-period sums of the given columns, labelled by column name
pub fn build_series<S: AsRef<str>>(view: &FilteredView<'_>, columns: &[S]) -> TimeSeries {
    let sources: Vec<Vec<&str>> = columns.iter().map(|c| vec![c.as_ref()]).collect();
    let buckets = bucket_by_period(view, &sources);
    into_series(
        columns.iter().map(|c| c.as_ref().to_string()).collect(),
        buckets,
    )
}

/// Per-period sums of derived columns, each the total of its sources
pub fn build_grouped_series(view: &FilteredView<'_>, columns: &[SeriesColumn]) -> TimeSeries {
    let sources: Vec<Vec<&str>> = columns
        .iter()
        .map(|column| column.sources.iter().map(String::as_str).collect())
        .collect();
    let buckets = bucket_by_period(view, &sources);
    into_series(columns.iter().map(|c| c.label.clone()).collect(), buckets)
}

/// Long-form series with the category label resolved through `labels`.
///
/// Every column must have a label; a gap is a configuration error.
pub fn build_categorized_series<S: AsRef<str>>(
    view: &FilteredView<'_>,
    columns: &[S],
    labels: &LabelTable,
) -> Result<CategorizedSeries, ConfigError> {
    let missing = labels.missing(columns);
    if !missing.is_empty() {
        return Err(ConfigError::MissingLabels {
            columns: missing.into_iter().map(str::to_string).collect(),
        });
    }

    let categories: Vec<String> = columns
        .iter()
        .filter_map(|column| labels.resolve(column.as_ref()))
        .map(str::to_string)
        .collect();

    let wide = build_series(view, columns);
    let points = wide
        .points
        .into_iter()
        .flat_map(|point| {
            let period = point.period;
            categories
                .iter()
                .zip(point.values)
                .map(move |(category, value)| CategorizedPoint {
                    period,
                    category: category.clone(),
                    value,
                })
                .collect::<Vec<_>>()
        })
        .collect();

    Ok(CategorizedSeries { categories, points })
}

/// Total of a column over the rows a series would include
pub fn dated_total(view: &FilteredView<'_>, column: &str) -> f64 {
    let Some(idx) = view.dataset().schema().index_of(column) else {
        return 0.0;
    };
    view.records()
        .filter(|record| record.period().is_some())
        .filter_map(|record| record.cell(idx).as_number())
        .sum()
}

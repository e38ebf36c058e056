//! Aggregation and metric engine
//!
//! Every metric is recomputed from the current filtered view on each render
//! cycle by scanning the retained rows. Missing or non-numeric cells count
//! as zero and never fail a computation.

use crate::dataset::{Cell, FilteredView};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a metric is computed from the filtered rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Measure {
    /// Rows whose cell in `column` is not missing
    CountPresent {
        /// Column to inspect
        column: String,
    },
    /// Rows whose cell in `column` equals a numeric code
    CountEquals {
        /// Column to inspect
        column: String,
        /// Code to match
        value: f64,
    },
    /// Sum of one numeric column
    Sum {
        /// Column to add up
        column: String,
    },
    /// Sum across several numeric columns
    CompositeSum {
        /// Columns to add up
        columns: Vec<String>,
    },
    /// `numerator / denominator * 100`, zero when the denominator is not positive
    Ratio {
        /// Columns summed into the numerator
        numerator: Vec<String>,
        /// Columns summed into the denominator
        denominator: Vec<String>,
    },
}

impl Measure {
    /// Every source column the measure reads
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Measure::CountPresent { column }
            | Measure::CountEquals { column, .. }
            | Measure::Sum { column } => vec![column.as_str()],
            Measure::CompositeSum { columns } => columns.iter().map(String::as_str).collect(),
            Measure::Ratio {
                numerator,
                denominator,
            } => numerator
                .iter()
                .chain(denominator.iter())
                .map(String::as_str)
                .collect(),
        }
    }

    /// Evaluate the measure over a filtered view
    pub fn evaluate(&self, view: &FilteredView<'_>) -> MetricValue {
        match self {
            Measure::CountPresent { column } => {
                MetricValue::integer(count_where(view, column, |cell| !cell.is_missing()) as f64)
            }
            Measure::CountEquals { column, value } => MetricValue::integer(
                count_where(view, column, |cell| cell.as_number() == Some(*value)) as f64,
            ),
            Measure::Sum { column } => MetricValue::integer(sum_column(view, column)),
            Measure::CompositeSum { columns } => MetricValue::integer(sum_columns(view, columns)),
            Measure::Ratio {
                numerator,
                denominator,
            } => MetricValue::Percent(ratio(
                sum_columns(view, numerator),
                sum_columns(view, denominator),
            )),
        }
    }
}

/// Sum of a numeric column with missing cells read as zero
pub fn sum_column(view: &FilteredView<'_>, column: &str) -> f64 {
    view.cells(column).filter_map(Cell::as_number).sum()
}

/// Sum across several numeric columns with missing cells read as zero
pub fn sum_columns<S: AsRef<str>>(view: &FilteredView<'_>, columns: &[S]) -> f64 {
    columns
        .iter()
        .map(|column| sum_column(view, column.as_ref()))
        .sum()
}

fn count_where<F>(view: &FilteredView<'_>, column: &str, predicate: F) -> usize
where
    F: Fn(&Cell) -> bool,
{
    view.cells(column).filter(|cell| predicate(cell)).count()
}

/// Percentage of `numerator` over `denominator`; zero when the denominator
/// is not positive
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator * 100.0
    } else {
        0.0
    }
}

/// A computed metric value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
    /// Whole number: counts and sums, truncated toward zero
    Integer(i64),
    /// Percentage, kept unrounded; rounded to zero decimals for display
    Percent(f64),
}

impl MetricValue {
    /// Truncate a summed value for display
    pub fn integer(value: f64) -> Self {
        MetricValue::Integer(value.trunc() as i64)
    }

    /// Value as a float, for charts and cross-checks
    pub fn as_f64(&self) -> f64 {
        match self {
            MetricValue::Integer(v) => *v as f64,
            MetricValue::Percent(v) => *v,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Integer(v) => write!(f, "{v}"),
            MetricValue::Percent(v) => write!(f, "{v:.0}%"),
        }
    }
}

/// A labelled metric definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDef {
    /// Human readable label
    pub label: String,
    /// How to compute it
    pub measure: Measure,
}

impl MetricDef {
    /// Build a metric definition
    pub fn new(label: impl Into<String>, measure: Measure) -> Self {
        Self {
            label: label.into(),
            measure,
        }
    }
}

/// A computed metric ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricView {
    /// Human readable label
    pub label: String,
    /// Computed value
    pub value: MetricValue,
    /// Display form of the value
    pub display: String,
}

/// Compute a list of metric definitions over a view, preserving order
pub fn compute_metrics(view: &FilteredView<'_>, metrics: &[MetricDef]) -> Vec<MetricView> {
    metrics
        .iter()
        .map(|metric| {
            let value = metric.measure.evaluate(view);
            MetricView {
                label: metric.label.clone(),
                display: value.to_string(),
                value,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, Schema};
    use crate::filter::{apply_filters, Dimension, Selection};

    fn dataset() -> Dataset {
        let schema = Schema::new([
            "organisation",
            "Information_groupe/Effectif_debut",
            "Information_groupe/Effectif_fin",
            "Statut_group",
            "Nom_group",
            "time",
        ]);
        let rows = [
            ["PARDE", "10", "8", "1", "Groupe A", "2024-01-15"],
            ["PARDE", "5", "5", "2", "Groupe B", "2024-02-10"],
            ["SARCAF", "0", "0", "1", "", "2024-02-20"],
            ["PARDE", "", "x", "1.0", "Groupe C", "bad"],
        ];
        Dataset::from_rows(
            schema,
            rows.iter().map(|row| row.iter().map(|v| Cell::from_raw(v)).collect()),
        )
    }

    fn sum(column: &str) -> Measure {
        Measure::Sum {
            column: column.to_string(),
        }
    }

    #[test]
    fn test_sum_treats_missing_as_zero() {
        let dataset = dataset();
        let view = dataset.view();
        assert_eq!(sum("Information_groupe/Effectif_debut").evaluate(&view), MetricValue::Integer(15));
        assert_eq!(sum("Information_groupe/Effectif_fin").evaluate(&view), MetricValue::Integer(13));
        assert_eq!(sum("not_in_schema").evaluate(&view), MetricValue::Integer(0));
    }

    #[test]
    fn test_counts() {
        let dataset = dataset();
        let view = dataset.view();
        let present = Measure::CountPresent {
            column: "Nom_group".to_string(),
        };
        assert_eq!(present.evaluate(&view), MetricValue::Integer(3));

        let couples = Measure::CountEquals {
            column: "Statut_group".to_string(),
            value: 1.0,
        };
        assert_eq!(couples.evaluate(&view), MetricValue::Integer(3));
    }

    #[test]
    fn test_completion_ratio_for_parde() {
        let dataset = dataset();
        let selection = Selection::new().with(Dimension::Organisation, ["PARDE"]);
        let view = apply_filters(&dataset, &selection);
        let completion = Measure::Ratio {
            numerator: vec!["Information_groupe/Effectif_fin".to_string()],
            denominator: vec!["Information_groupe/Effectif_debut".to_string()],
        };
        let value = completion.evaluate(&view);
        match value {
            MetricValue::Percent(p) => assert!((p - 86.666).abs() < 0.01),
            other => panic!("expected a percentage, got {other:?}"),
        }
        assert_eq!(value.to_string(), "87%");
    }

    #[test]
    fn test_empty_view_yields_zero_everywhere() {
        let dataset = dataset();
        let selection = Selection::new().with(Dimension::Organisation, ["NOBODY"]);
        let view = apply_filters(&dataset, &selection);
        assert!(view.is_empty());

        let metrics = vec![
            MetricDef::new("groups", Measure::CountPresent { column: "Nom_group".to_string() }),
            MetricDef::new("debut", sum("Information_groupe/Effectif_debut")),
            MetricDef::new(
                "rate",
                Measure::Ratio {
                    numerator: vec!["Information_groupe/Effectif_fin".to_string()],
                    denominator: vec!["Information_groupe/Effectif_debut".to_string()],
                },
            ),
        ];
        let computed = compute_metrics(&view, &metrics);
        let displays: Vec<&str> = computed.iter().map(|m| m.display.as_str()).collect();
        assert_eq!(displays, vec!["0", "0", "0%"]);
    }

    #[test]
    fn test_integer_display_truncates() {
        assert_eq!(MetricValue::integer(12.9).to_string(), "12");
        assert_eq!(MetricValue::integer(-3.7).to_string(), "-3");
        assert_eq!(ratio(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_measure_deserializes_from_yaml() {
        let yaml = "kind: composite_sum\ncolumns: [a, b]\n";
        let measure: Measure = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(measure.columns(), vec!["a", "b"]);
    }
}

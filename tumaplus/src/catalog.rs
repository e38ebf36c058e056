//! Declarative section catalog
//!
//! The dashboard is a table of sections. Each section names the
//! organisations that unlock it, its metric panels and its charts. The
//! builtin catalog ships inside the binary; a custom one can replace it
//! through configuration.

use crate::dataset::{FilteredView, Schema};
use crate::error::{ConfigError, Result};
use crate::filter::{Dimension, Selection};
use crate::metrics::{compute_metrics, MetricDef, MetricView};
use crate::series::{
    build_categorized_series, build_grouped_series, CategorizedSeries, LabelTable, SeriesColumn,
    TimeSeries,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("../builtin/sections.yaml");

/// How a series is meant to be drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// One line per column
    #[default]
    Line,
    /// Columns stacked per period
    StackedBar,
    /// Columns side by side per period
    GroupedBar,
}

/// A chart attached to a section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeriesDef {
    /// Wide table: one series per derived column
    Wide {
        /// Chart title
        title: String,
        /// Chart style
        #[serde(default)]
        chart: ChartKind,
        /// Horizontal axis title
        #[serde(default)]
        x_title: Option<String>,
        /// Vertical axis title
        #[serde(default)]
        y_title: Option<String>,
        /// Derived columns
        columns: Vec<SeriesColumn>,
    },
    /// Long form: one category per source column, labelled through the catalog label table
    Categorized {
        /// Chart title
        title: String,
        /// Chart style
        #[serde(default)]
        chart: ChartKind,
        /// Horizontal axis title
        #[serde(default)]
        x_title: Option<String>,
        /// Vertical axis title
        #[serde(default)]
        y_title: Option<String>,
        /// Source columns
        columns: Vec<String>,
    },
}

impl SeriesDef {
    /// Chart title
    pub fn title(&self) -> &str {
        match self {
            SeriesDef::Wide { title, .. } | SeriesDef::Categorized { title, .. } => title,
        }
    }

    /// Every source column the series reads
    pub fn columns(&self) -> Vec<&str> {
        match self {
            SeriesDef::Wide { columns, .. } => columns
                .iter()
                .flat_map(|column| column.sources.iter().map(String::as_str))
                .collect(),
            SeriesDef::Categorized { columns, .. } => columns.iter().map(String::as_str).collect(),
        }
    }

    /// Build the series over a filtered view
    pub fn build(&self, view: &FilteredView<'_>, labels: &LabelTable) -> Result<ChartView> {
        let chart = match self {
            SeriesDef::Wide {
                title,
                chart,
                x_title,
                y_title,
                columns,
            } => ChartView {
                title: title.clone(),
                chart: *chart,
                x_title: x_title.clone(),
                y_title: y_title.clone(),
                data: ChartData::Wide(build_grouped_series(view, columns)),
            },
            SeriesDef::Categorized {
                title,
                chart,
                x_title,
                y_title,
                columns,
            } => ChartView {
                title: title.clone(),
                chart: *chart,
                x_title: x_title.clone(),
                y_title: y_title.clone(),
                data: ChartData::Categorized(build_categorized_series(view, columns, labels)?),
            },
        };
        Ok(chart)
    }
}

/// Series data of a rendered chart
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum ChartData {
    /// Wide table
    Wide(TimeSeries),
    /// Long-form triples
    Categorized(CategorizedSeries),
}

/// A rendered chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartView {
    /// Chart title
    pub title: String,
    /// Chart style
    pub chart: ChartKind,
    /// Horizontal axis title
    pub x_title: Option<String>,
    /// Vertical axis title
    pub y_title: Option<String>,
    /// Series data
    pub data: ChartData,
}

/// A group of metrics shown together, optionally under a sub-heading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    /// Sub-heading
    #[serde(default)]
    pub title: Option<String>,
    /// Metrics in display order
    pub metrics: Vec<MetricDef>,
}

/// Computed metrics of one panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPanelView {
    /// Sub-heading
    pub title: Option<String>,
    /// Computed metrics in display order
    pub metrics: Vec<MetricView>,
}

/// One report section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Stable identifier
    pub id: String,
    /// Heading
    pub title: String,
    /// Organisations whose selection unlocks the section
    pub organisations: Vec<String>,
    /// Metric panels
    #[serde(default)]
    pub panels: Vec<Panel>,
    /// Charts
    #[serde(default)]
    pub series: Vec<SeriesDef>,
}

impl Section {
    /// A section is shown when the organisation selection contains at least
    /// one of its organisations. An empty organisation selection shows
    /// nothing.
    pub fn is_visible(&self, selection: &Selection) -> bool {
        let chosen = selection.get(Dimension::Organisation);
        self.organisations.iter().any(|org| chosen.contains(org))
    }

    /// Compute every panel over a filtered view
    pub fn metric_panels(&self, view: &FilteredView<'_>) -> Vec<MetricPanelView> {
        self.panels
            .iter()
            .map(|panel| MetricPanelView {
                title: panel.title.clone(),
                metrics: compute_metrics(view, &panel.metrics),
            })
            .collect()
    }

    /// Build every chart over a filtered view
    pub fn charts(&self, view: &FilteredView<'_>, labels: &LabelTable) -> Result<Vec<ChartView>> {
        self.series
            .iter()
            .map(|series| series.build(view, labels))
            .collect()
    }

    /// Every source column the section reads, deduplicated and sorted
    pub fn referenced_columns(&self) -> BTreeSet<&str> {
        self.panels
            .iter()
            .flat_map(|panel| panel.metrics.iter())
            .flat_map(|metric| metric.measure.columns())
            .chain(self.series.iter().flat_map(SeriesDef::columns))
            .collect()
    }
}

/// The full table of report sections plus the column label table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionCatalog {
    /// Technical column name to display label
    #[serde(default)]
    pub labels: LabelTable,
    /// Sections in display order
    pub sections: Vec<Section>,
}

impl SectionCatalog {
    /// The catalog shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_CATALOG)
    }

    /// Load a catalog from a YAML file
    pub fn from_path(path: &Path) -> Result<Self> {
        tracing::info!("Loading section catalog from {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let catalog: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        catalog.check_structure()?;
        Ok(catalog)
    }

    /// Parse a catalog from YAML text
    pub fn parse(yaml: &str) -> Result<Self> {
        let catalog: Self = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Validation {
            message: format!("invalid section catalog: {e}"),
        })?;
        catalog.check_structure()?;
        Ok(catalog)
    }

    /// Builtin catalog, or the one at `path` when given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::builtin(),
        }
    }

    /// Look up a section by id
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.id == id)
    }

    /// Checks that need no dataset: unique section ids and a label for
    /// every categorized column.
    fn check_structure(&self) -> std::result::Result<(), ConfigError> {
        let mut seen = BTreeSet::new();
        for section in &self.sections {
            if !seen.insert(section.id.as_str()) {
                return Err(ConfigError::Validation {
                    message: format!("duplicate section id '{}'", section.id),
                });
            }
        }

        let unlabelled: BTreeSet<String> = self
            .sections
            .iter()
            .flat_map(|section| section.series.iter())
            .filter_map(|series| match series {
                SeriesDef::Categorized { columns, .. } => Some(columns),
                SeriesDef::Wide { .. } => None,
            })
            .flat_map(|columns| self.labels.missing(columns))
            .map(str::to_string)
            .collect();

        if unlabelled.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingLabels {
                columns: unlabelled.into_iter().collect(),
            })
        }
    }

    /// One `UnknownColumns` error per section that reads columns the
    /// schema does not have, in catalog order
    pub fn schema_errors(&self, schema: &Schema) -> Vec<ConfigError> {
        self.sections
            .iter()
            .filter_map(|section| {
                let unknown: Vec<String> = section
                    .referenced_columns()
                    .into_iter()
                    .filter(|column| !schema.contains(column))
                    .map(str::to_string)
                    .collect();
                if unknown.is_empty() {
                    return None;
                }
                tracing::warn!(
                    "Section '{}' references {} unknown column(s)",
                    section.id,
                    unknown.len()
                );
                Some(ConfigError::UnknownColumns {
                    section: section.id.clone(),
                    columns: unknown,
                })
            })
            .collect()
    }

    /// Check that every referenced column exists in the dataset schema.
    /// Reports the first section with unknown columns.
    pub fn validate(&self, schema: &Schema) -> std::result::Result<(), ConfigError> {
        match self.schema_errors(schema).into_iter().next() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Every column any section reads
    pub fn referenced_columns(&self) -> BTreeSet<&str> {
        self.sections
            .iter()
            .flat_map(Section::referenced_columns)
            .collect()
    }

    /// Sections unlocked by a selection, in catalog order
    pub fn visible_sections<'a>(
        &'a self,
        selection: &'a Selection,
    ) -> impl Iterator<Item = &'a Section> + 'a {
        self.sections
            .iter()
            .filter(move |section| section.is_visible(selection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"
labels:
  "pf/a": "Catégorie A"
sections:
  - id: one
    title: "Un"
    organisations: [PARDE]
    panels:
      - metrics:
          - label: "Total"
            measure: { kind: sum, column: x }
  - id: two
    title: "Deux"
    organisations: [ADJ, CARE]
    series:
      - kind: categorized
        title: "PF"
        columns: [pf/a]
"#;

    #[test]
    fn test_builtin_catalog_parses() {
        let catalog = SectionCatalog::builtin().unwrap();
        let ids: Vec<&str> = catalog.sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "participation_cursus",
                "services_curatifs",
                "vbg",
                "sante_mere",
                "deces",
                "planification_familiale",
                "ccc",
                "ist"
            ]
        );
        assert_eq!(catalog.labels.len(), 12);
        assert_eq!(catalog.section("ist").unwrap().panels.len(), 4);
    }

    #[test]
    fn test_visibility_follows_organisation_selection() {
        let catalog = SectionCatalog::parse(SMALL).unwrap();
        let none = Selection::new();
        assert_eq!(catalog.visible_sections(&none).count(), 0);

        let care = Selection::new().with(Dimension::Organisation, ["CARE"]);
        let visible: Vec<&str> = catalog.visible_sections(&care).map(|s| s.id.as_str()).collect();
        assert_eq!(visible, vec!["two"]);

        let both = Selection::new().with(Dimension::Organisation, ["PARDE", "ADJ"]);
        assert_eq!(catalog.visible_sections(&both).count(), 2);
    }

    #[test]
    fn test_missing_label_rejected_at_parse() {
        let yaml = SMALL.replace("\"pf/a\": \"Catégorie A\"", "\"pf/b\": \"Autre\"");
        let err = SectionCatalog::parse(&yaml).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("pf/a"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let yaml = SMALL.replace("id: two", "id: one");
        assert!(SectionCatalog::parse(&yaml).is_err());
    }

    #[test]
    fn test_validate_against_schema() {
        let catalog = SectionCatalog::parse(SMALL).unwrap();
        assert!(catalog.validate(&Schema::new(["x", "pf/a"])).is_ok());

        match catalog.validate(&Schema::new(["x"])) {
            Err(ConfigError::UnknownColumns { section, columns }) => {
                assert_eq!(section, "two");
                assert_eq!(columns, vec!["pf/a"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_schema_errors_cover_every_section() {
        let catalog = SectionCatalog::parse(SMALL).unwrap();
        assert!(catalog.schema_errors(&Schema::new(["x", "pf/a"])).is_empty());

        let errors = catalog.schema_errors(&Schema::new(["organisation"]));
        let sections: Vec<&str> = errors
            .iter()
            .filter_map(|error| match error {
                ConfigError::UnknownColumns { section, .. } => Some(section.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(sections, vec!["one", "two"]);
    }

    #[test]
    fn test_referenced_columns_cover_metrics_and_series() {
        let catalog = SectionCatalog::builtin().unwrap();
        let cursus = catalog.section("participation_cursus").unwrap();
        let columns = cursus.referenced_columns();
        assert!(columns.contains("Nom_group"));
        assert!(columns.contains("Statut_group"));
        assert!(columns.contains("Information_groupe/Effectif_fin"));
        assert_eq!(columns.len(), 4);
    }

    #[test]
    fn test_from_path_reports_yaml_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sections.yaml");
        std::fs::write(&path, "sections: [ { id: 1 ").unwrap();
        let err = SectionCatalog::from_path(&path).unwrap_err();
        assert!(err.is_config());
    }
}

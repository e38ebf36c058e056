//! One render cycle: dataset + selection in, view model out

use crate::catalog::{ChartView, MetricPanelView, Section, SectionCatalog};
use crate::dataset::{Dataset, FilteredView};
use crate::error::Result;
use crate::filter::{apply_filters, FilterOptions, Selection};
use serde::Serialize;

/// Everything the presentation layer needs to draw one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewModel {
    /// Records in the snapshot, before filtering
    pub record_count: usize,
    /// Records retained by the selection
    pub filtered_count: usize,
    /// The selection this view was computed for
    pub selection: Selection,
    /// Option lists for every filter control
    pub options: FilterOptions,
    /// Visible sections in catalog order
    pub sections: Vec<SectionView>,
    /// Last dataset load failure, shown alongside whatever data is available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_error: Option<String>,
}

impl ViewModel {
    /// The view shown when no snapshot could be loaded at all
    pub fn unavailable(selection: &Selection, error: impl Into<String>) -> Self {
        Self {
            selection: selection.clone(),
            load_error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// A rendered section
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionView {
    /// Section identifier
    pub id: String,
    /// Heading
    pub title: String,
    /// Metric panels
    pub panels: Vec<MetricPanelView>,
    /// Charts
    pub charts: Vec<ChartView>,
}

/// Compute the full view for a selection. Pure: the dataset and catalog
/// are only read.
pub fn render_cycle(
    catalog: &SectionCatalog,
    dataset: &Dataset,
    selection: &Selection,
) -> Result<ViewModel> {
    let view = apply_filters(dataset, selection);
    let options = FilterOptions::derive(dataset, selection);

    let sections = catalog
        .visible_sections(selection)
        .map(|section| render_section(section, catalog, &view))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        "Rendered {} section(s) over {} of {} records",
        sections.len(),
        view.len(),
        dataset.len()
    );

    Ok(ViewModel {
        record_count: dataset.len(),
        filtered_count: view.len(),
        selection: selection.clone(),
        options,
        sections,
        load_error: None,
    })
}

fn render_section(
    section: &Section,
    catalog: &SectionCatalog,
    view: &FilteredView<'_>,
) -> Result<SectionView> {
    Ok(SectionView {
        id: section.id.clone(),
        title: section.title.clone(),
        panels: section.metric_panels(view),
        charts: section.charts(view, &catalog.labels)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ChartData;
    use crate::dataset::{Cell, Schema};
    use crate::filter::Dimension;

    const CATALOG: &str = r#"
sections:
  - id: cursus
    title: "Participation cursus"
    organisations: [PARDE, SARCAF]
    panels:
      - metrics:
          - label: "Effectif début cursus"
            measure: { kind: sum, column: debut }
          - label: "Taux d'achèvement"
            measure: { kind: ratio, numerator: [fin], denominator: [debut] }
    series:
      - kind: wide
        title: "Effectifs"
        columns:
          - { label: "Effectif début", sources: [debut] }
  - id: curatif
    title: "Services curatifs"
    organisations: [ADJ, CARE]
    panels:
      - metrics:
          - label: "Cas"
            measure: { kind: composite_sum, columns: [debut, fin] }
"#;

    fn dataset() -> Dataset {
        let schema = Schema::new(["organisation", "Province", "debut", "fin", "time"]);
        let rows = [
            ["PARDE", "Nord-Kivu", "10", "8", "2024-01-15"],
            ["PARDE", "Nord-Kivu", "5", "5", "2024-02-10"],
            ["SARCAF", "Sud-Kivu", "0", "0", "2024-02-20"],
        ];
        Dataset::from_rows(
            schema,
            rows.iter().map(|row| row.iter().map(|v| Cell::from_raw(v)).collect()),
        )
    }

    #[test]
    fn test_render_cycle_parde_scenario() {
        let catalog = SectionCatalog::parse(CATALOG).unwrap();
        let dataset = dataset();
        let selection = Selection::new().with(Dimension::Organisation, ["PARDE"]);

        let view = render_cycle(&catalog, &dataset, &selection).unwrap();
        assert_eq!(view.record_count, 3);
        assert_eq!(view.filtered_count, 2);
        assert_eq!(view.sections.len(), 1);

        let cursus = &view.sections[0];
        let metrics = &cursus.panels[0].metrics;
        assert_eq!(metrics[0].display, "15");
        assert_eq!(metrics[1].display, "87%");

        match &cursus.charts[0].data {
            ChartData::Wide(series) => {
                assert_eq!(series.points.len(), 2);
                assert_eq!(series.column_total(0), 15.0);
            }
            other => panic!("unexpected chart data: {other:?}"),
        }
    }

    #[test]
    fn test_empty_organisation_selection_shows_no_sections() {
        let catalog = SectionCatalog::parse(CATALOG).unwrap();
        let dataset = dataset();
        let view = render_cycle(&catalog, &dataset, &Selection::new()).unwrap();
        assert!(view.sections.is_empty());
        assert_eq!(view.filtered_count, 3);
        assert_eq!(view.options.organisation, vec!["PARDE", "SARCAF"]);
    }

    #[test]
    fn test_view_model_serializes() {
        let catalog = SectionCatalog::parse(CATALOG).unwrap();
        let dataset = dataset();
        let selection = Selection::new().with(Dimension::Organisation, ["PARDE"]);
        let view = render_cycle(&catalog, &dataset, &selection).unwrap();

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["filtered_count"], 2);
        assert_eq!(json["selection"]["organisation"][0], "PARDE");
        assert_eq!(json["sections"][0]["charts"][0]["data"]["points"][0]["period"], "2024-01");
        assert!(json.get("load_error").is_none());
    }
}

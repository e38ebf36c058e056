use std::collections::HashMap;
use std::path::Path;
use tempfile::TempDir;
use tumaplus::catalog::ChartData;
use tumaplus::{
    Dashboard, Dimension, FileSource, MetricValue, SectionCatalog, Selection, TumaPlusError,
    ViewModel,
};

const DIMENSIONS: &[&str] = &["organisation", "Province", "Zone_sante", "Aire_sante", "time"];

/// Write a CSV carrying every column the builtin catalog reads. Each row
/// lists only the cells it cares about; everything else stays blank.
fn write_builtin_csv(path: &Path, rows: &[HashMap<&str, &str>]) {
    let catalog = SectionCatalog::builtin().unwrap();
    let mut header: Vec<String> = DIMENSIONS.iter().map(|c| c.to_string()).collect();
    header.extend(catalog.referenced_columns().into_iter().map(str::to_string));

    let mut writer = csv::Writer::from_path(path).unwrap();
    writer.write_record(&header).unwrap();
    for row in rows {
        let record: Vec<&str> = header
            .iter()
            .map(|column| row.get(column.as_str()).copied().unwrap_or(""))
            .collect();
        writer.write_record(&record).unwrap();
    }
    writer.flush().unwrap();
}

fn cursus_rows() -> Vec<HashMap<&'static str, &'static str>> {
    vec![
        HashMap::from([
            ("organisation", "PARDE"),
            ("Province", "Nord-Kivu"),
            ("Zone_sante", "Goma"),
            ("Aire_sante", "Majengo"),
            ("time", "2024-01-15T09:30:00"),
            ("Nom_group", "Groupe A"),
            ("Statut_group", "1"),
            ("Information_groupe/Effectif_debut", "10"),
            ("Information_groupe/Effectif_fin", "8"),
        ]),
        HashMap::from([
            ("organisation", "PARDE"),
            ("Province", "Nord-Kivu"),
            ("Zone_sante", "Karisimbi"),
            ("Aire_sante", "Katoyi"),
            ("time", "2024-02-10"),
            ("Nom_group", "Groupe B"),
            ("Statut_group", "2"),
            ("Information_groupe/Effectif_debut", "5"),
            ("Information_groupe/Effectif_fin", "5"),
        ]),
        HashMap::from([
            ("organisation", "SARCAF"),
            ("Province", "Sud-Kivu"),
            ("Zone_sante", "Bukavu"),
            ("Aire_sante", "Nyalukemba"),
            ("time", "2024-02-20"),
            ("Information_groupe/Effectif_debut", "0"),
            ("Information_groupe/Effectif_fin", "0"),
        ]),
        HashMap::from([
            ("organisation", "CARE"),
            ("Province", "Sud-Kivu"),
            ("Zone_sante", "Ibanda"),
            ("Aire_sante", "Panzi"),
            ("time", "pas de date"),
            ("VBG/casSVS", "7"),
            ("totalcaseE/Feminin_caseE", "2"),
            ("totalcaseE/Masculin_caseE", "3"),
            ("acceptante/Nvlle_acceptante_meth/Nbre_Fosa", "4"),
        ]),
        HashMap::from([
            ("organisation", "ADJ"),
            ("Province", "Sud-Kivu"),
            ("Zone_sante", "Bukavu"),
            ("Aire_sante", "Kadutu"),
            ("time", "2024-03-05"),
            ("VBG/casSVS", "1"),
            ("totalcaseE/Feminin_caseE", "1"),
            ("acceptante/Nvlle_acceptante_meth/Nbre_Fosa", "6"),
            ("acceptante/Nvlle_acceptante_meth/Nbre_adbc", "2"),
        ]),
    ]
}

fn setup() -> (TempDir, Dashboard) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tuma.csv");
    write_builtin_csv(&path, &cursus_rows());
    let dashboard = Dashboard::new(
        Box::new(FileSource::new(&path, None)),
        SectionCatalog::builtin().unwrap(),
    );
    (dir, dashboard)
}

fn metric<'a>(view: &'a ViewModel, section: &str, label: &str) -> &'a MetricValue {
    let section = view
        .sections
        .iter()
        .find(|s| s.id == section)
        .unwrap_or_else(|| panic!("section {section} not rendered"));
    &section
        .panels
        .iter()
        .flat_map(|panel| panel.metrics.iter())
        .find(|m| m.label == label)
        .unwrap_or_else(|| panic!("metric {label} not found"))
        .value
}

#[tokio::test]
async fn test_participation_cursus_for_parde() {
    let (_dir, mut dashboard) = setup();
    let selection = Selection::new().with(Dimension::Organisation, ["PARDE"]);
    let view = dashboard.render(&selection).await.unwrap();

    assert_eq!(view.record_count, 5);
    assert_eq!(view.filtered_count, 2);
    let ids: Vec<&str> = view.sections.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["participation_cursus"]);

    assert_eq!(
        metric(&view, "participation_cursus", "Nombre de groupes"),
        &MetricValue::Integer(2)
    );
    assert_eq!(
        metric(&view, "participation_cursus", "Couple SASA"),
        &MetricValue::Integer(1)
    );
    let rate = metric(&view, "participation_cursus", "Taux d'achèvement");
    assert_eq!(rate.to_string(), "87%");
}

#[tokio::test]
async fn test_care_unlocks_every_other_section() {
    let (_dir, mut dashboard) = setup();
    let selection = Selection::new().with(Dimension::Organisation, ["CARE", "ADJ"]);
    let view = dashboard.render(&selection).await.unwrap();

    assert_eq!(view.sections.len(), 7);
    assert!(view.sections.iter().all(|s| s.id != "participation_cursus"));

    // the undated CARE row still counts toward the scalar metrics
    assert_eq!(metric(&view, "vbg", "Nouveaux cas/SVS"), &MetricValue::Integer(8));
    assert_eq!(
        metric(&view, "services_curatifs", "Cas - Moins de 15 ans"),
        &MetricValue::Integer(6)
    );

    let vbg = view.sections.iter().find(|s| s.id == "vbg").unwrap();
    match &vbg.charts[0].data {
        ChartData::Wide(series) => {
            assert_eq!(series.points.len(), 1);
            assert_eq!(series.points[0].period.to_string(), "2024-03");
            assert_eq!(series.points[0].values[0], 1.0);
        }
        other => panic!("unexpected chart data: {other:?}"),
    }
}

#[tokio::test]
async fn test_family_planning_chart_uses_labels() {
    let (_dir, mut dashboard) = setup();
    let selection = Selection::new().with(Dimension::Organisation, ["ADJ"]);
    let view = dashboard.render(&selection).await.unwrap();

    let pf = view
        .sections
        .iter()
        .find(|s| s.id == "planification_familiale")
        .unwrap();
    assert_eq!(pf.panels.len(), 2);

    match &pf.charts[0].data {
        ChartData::Categorized(series) => {
            assert_eq!(series.categories.len(), 12);
            assert_eq!(series.categories[0], "Nouvelles acceptantes - Méthodes PF aux FOSA");
            let fosa = series
                .points
                .iter()
                .find(|p| p.category == "Nouvelles acceptantes - Méthodes PF aux FOSA")
                .unwrap();
            assert_eq!(fosa.value, 6.0);
            assert_eq!(fosa.period.to_string(), "2024-03");
        }
        other => panic!("unexpected chart data: {other:?}"),
    }
}

#[tokio::test]
async fn test_cascading_options() {
    let (_dir, mut dashboard) = setup();

    let selection = Selection::new().with(Dimension::Province, ["Sud-Kivu"]);
    let view = dashboard.render(&selection).await.unwrap();
    assert_eq!(view.options.health_zone, vec!["Bukavu", "Ibanda"]);
    assert_eq!(view.options.health_area, vec!["Kadutu", "Nyalukemba", "Panzi"]);
    assert_eq!(view.options.province, vec!["Nord-Kivu", "Sud-Kivu"]);
    assert_eq!(view.options.period, vec!["2024-01", "2024-02", "2024-03"]);

    let selection = selection.with(Dimension::HealthZone, ["Bukavu"]);
    let view = dashboard.render(&selection).await.unwrap();
    assert_eq!(view.options.health_area, vec!["Kadutu", "Nyalukemba"]);

    let unknown = Selection::new().with(Dimension::Province, ["X"]);
    let view = dashboard.render(&unknown).await.unwrap();
    assert!(view.options.health_zone.is_empty());
    assert_eq!(view.filtered_count, 0);
}

#[tokio::test]
async fn test_refresh_survives_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tuma.csv");
    write_builtin_csv(&path, &cursus_rows());
    let mut dashboard = Dashboard::new(
        Box::new(FileSource::new(&path, None)),
        SectionCatalog::builtin().unwrap(),
    );
    let selection = Selection::new().with(Dimension::Organisation, ["PARDE"]);
    dashboard.render(&selection).await.unwrap();

    std::fs::remove_file(&path).unwrap();
    let kept = dashboard.refresh().await.unwrap();
    assert_eq!(kept.unwrap().len(), 5);

    let view = dashboard.render(&selection).await.unwrap();
    assert_eq!(view.filtered_count, 2);
    assert!(view.load_error.is_some());

    write_builtin_csv(&path, &cursus_rows()[..2]);
    dashboard.refresh().await.unwrap();
    let view = dashboard.render(&selection).await.unwrap();
    assert_eq!(view.record_count, 2);
    assert!(view.load_error.is_none());
}

#[tokio::test]
async fn test_dataset_missing_catalog_columns_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("partial.csv");
    std::fs::write(&path, "organisation,time\nPARDE,2024-01-01\n").unwrap();

    let mut dashboard = Dashboard::new(
        Box::new(FileSource::new(&path, None)),
        SectionCatalog::builtin().unwrap(),
    );
    let err = dashboard.snapshot().await.unwrap_err();
    assert!(err.is_config());
    assert!(matches!(err, TumaPlusError::Config(_)));
}

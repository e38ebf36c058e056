//! Filter engine
//!
//! Five dimensions restrict the dataset: organisation, province, health
//! zone, health area and reporting period. An empty selection for a
//! dimension imposes no restriction; non-empty selections combine with a
//! logical AND. Zone and area option lists cascade from the province and
//! zone selections.

use crate::dataset::{Dataset, FilteredView, Record};
use crate::period::Period;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// A filterable dimension of the reporting table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Reporting partner organisation
    Organisation,
    /// Province
    Province,
    /// Health zone, nested in a province
    HealthZone,
    /// Health area, nested in a health zone
    HealthArea,
    /// Calendar month derived from the submission time
    Period,
}

impl Dimension {
    /// Every dimension, upstream first
    pub const ALL: [Dimension; 5] = [
        Dimension::Organisation,
        Dimension::Province,
        Dimension::HealthZone,
        Dimension::HealthArea,
        Dimension::Period,
    ];

    /// Source column for the categorical dimensions; `None` for the derived period
    pub fn column(&self) -> Option<&'static str> {
        match self {
            Dimension::Organisation => Some("organisation"),
            Dimension::Province => Some("Province"),
            Dimension::HealthZone => Some("Zone_sante"),
            Dimension::HealthArea => Some("Aire_sante"),
            Dimension::Period => None,
        }
    }

    /// Label shown next to the filter control
    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Organisation => "Nom de l'organisation",
            Dimension::Province => "Province",
            Dimension::HealthZone => "Zone de santé",
            Dimension::HealthArea => "Aire de santé",
            Dimension::Period => "Période de rapportage",
        }
    }

    /// The value of this dimension for one record, if it has one
    pub fn value_of<'a>(&self, dataset: &Dataset, record: &'a Record) -> Option<Cow<'a, str>> {
        match self.column() {
            Some(column) => dataset.value(record, column).as_text(),
            None => record.period().map(|p| Cow::Owned(p.to_string())),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Organisation => "organisation",
            Dimension::Province => "province",
            Dimension::HealthZone => "health_zone",
            Dimension::HealthArea => "health_area",
            Dimension::Period => "period",
        };
        f.write_str(name)
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dimension::ALL
            .into_iter()
            .find(|d| d.to_string() == s)
            .ok_or_else(|| format!("unknown dimension '{s}'"))
    }
}

/// The user's current filter choices, one value set per dimension
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection {
    values: BTreeMap<Dimension, BTreeSet<String>>,
}

impl Selection {
    /// A selection with no restriction on any dimension
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the chosen values of one dimension
    #[must_use]
    pub fn with<I, S>(mut self, dimension: Dimension, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(dimension, values);
        self
    }

    /// Replace the chosen values of one dimension in place. Period values
    /// are normalized to `YYYY-MM` when they parse.
    pub fn set<I, S>(&mut self, dimension: Dimension, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: BTreeSet<String> = values
            .into_iter()
            .map(|value| {
                let value: String = value.into();
                match dimension {
                    Dimension::Period => value
                        .parse::<Period>()
                        .map(|period| period.to_string())
                        .unwrap_or(value),
                    _ => value,
                }
            })
            .collect();
        if values.is_empty() {
            self.values.remove(&dimension);
        } else {
            self.values.insert(dimension, values);
        }
    }

    /// Restrict the period dimension to the given months
    #[must_use]
    pub fn with_periods<I>(self, periods: I) -> Self
    where
        I: IntoIterator<Item = Period>,
    {
        self.with(Dimension::Period, periods.into_iter().map(|p| p.to_string()))
    }

    /// Chosen values for a dimension; empty means unrestricted
    pub fn get(&self, dimension: Dimension) -> &BTreeSet<String> {
        static NONE: BTreeSet<String> = BTreeSet::new();
        self.values.get(&dimension).unwrap_or(&NONE)
    }

    /// Whether a dimension restricts the dataset
    pub fn is_active(&self, dimension: Dimension) -> bool {
        !self.get(dimension).is_empty()
    }

    /// Whether no dimension restricts the dataset
    pub fn is_unrestricted(&self) -> bool {
        self.values.values().all(BTreeSet::is_empty)
    }

    /// Whether a record satisfies every active dimension
    pub fn matches(&self, dataset: &Dataset, record: &Record) -> bool {
        self.values
            .iter()
            .filter(|(_, chosen)| !chosen.is_empty())
            .all(|(dimension, chosen)| {
                dimension
                    .value_of(dataset, record)
                    .is_some_and(|value| chosen.contains(value.as_ref()))
            })
    }

    /// Drop chosen values that the given options no longer offer. Returns
    /// true when anything was removed.
    pub fn prune(&mut self, options: &FilterOptions) -> bool {
        let mut changed = false;
        for dimension in Dimension::ALL {
            let offered = options.get(dimension);
            if let Some(chosen) = self.values.get_mut(&dimension) {
                let before = chosen.len();
                chosen.retain(|value| offered.iter().any(|o| o == value));
                changed |= chosen.len() != before;
                if chosen.is_empty() {
                    self.values.remove(&dimension);
                }
            }
        }
        changed
    }
}

/// Restrict a dataset to the records matching every active dimension
pub fn apply_filters<'a>(dataset: &'a Dataset, selection: &Selection) -> FilteredView<'a> {
    if selection.is_unrestricted() {
        return dataset.view();
    }

    let rows = dataset
        .records()
        .iter()
        .enumerate()
        .filter(|(_, record)| selection.matches(dataset, record))
        .map(|(idx, _)| idx)
        .collect::<Vec<_>>();

    tracing::debug!("Filter retained {} of {} records", rows.len(), dataset.len());
    FilteredView::new(dataset, rows)
}

fn distinct_where<F>(dataset: &Dataset, dimension: Dimension, keep: F) -> BTreeSet<String>
where
    F: Fn(&Record) -> bool,
{
    dataset
        .records()
        .iter()
        .filter(|record| keep(record))
        .filter_map(|record| dimension.value_of(dataset, record))
        .map(Cow::into_owned)
        .collect()
}

fn in_selection(dataset: &Dataset, record: &Record, dimension: Dimension, chosen: &BTreeSet<String>) -> bool {
    dimension
        .value_of(dataset, record)
        .is_some_and(|value| chosen.contains(value.as_ref()))
}

/// Distinct organisations in the dataset
pub fn organisation_options(dataset: &Dataset) -> BTreeSet<String> {
    distinct_where(dataset, Dimension::Organisation, |_| true)
}

/// Distinct provinces in the dataset
pub fn province_options(dataset: &Dataset) -> BTreeSet<String> {
    distinct_where(dataset, Dimension::Province, |_| true)
}

/// Health zones offered for a province selection. An empty selection
/// offers every zone; an active one offers only zones seen in those
/// provinces, which may be none.
pub fn zone_options(dataset: &Dataset, provinces: &BTreeSet<String>) -> BTreeSet<String> {
    if provinces.is_empty() {
        return distinct_where(dataset, Dimension::HealthZone, |_| true);
    }
    distinct_where(dataset, Dimension::HealthZone, |record| {
        in_selection(dataset, record, Dimension::Province, provinces)
    })
}

/// Health areas offered for the province and zone selections. The zone
/// selection scopes areas when active, otherwise the province selection,
/// otherwise every area is offered.
pub fn area_options(
    dataset: &Dataset,
    provinces: &BTreeSet<String>,
    zones: &BTreeSet<String>,
) -> BTreeSet<String> {
    if !zones.is_empty() {
        return distinct_where(dataset, Dimension::HealthArea, |record| {
            in_selection(dataset, record, Dimension::HealthZone, zones)
        });
    }
    if !provinces.is_empty() {
        return distinct_where(dataset, Dimension::HealthArea, |record| {
            in_selection(dataset, record, Dimension::Province, provinces)
        });
    }
    distinct_where(dataset, Dimension::HealthArea, |_| true)
}

/// Reporting months present in the dataset, oldest first
pub fn period_options(dataset: &Dataset) -> BTreeSet<Period> {
    dataset.records().iter().filter_map(Record::period).collect()
}

/// Every option list the filter controls need for one render cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    /// Organisation choices
    pub organisation: Vec<String>,
    /// Province choices
    pub province: Vec<String>,
    /// Health zone choices, scoped by the province selection
    pub health_zone: Vec<String>,
    /// Health area choices, scoped by the zone or province selection
    pub health_area: Vec<String>,
    /// Reporting months, chronological
    pub period: Vec<String>,
}

impl FilterOptions {
    /// Derive the option lists for a selection
    pub fn derive(dataset: &Dataset, selection: &Selection) -> Self {
        let provinces = selection.get(Dimension::Province);
        let zones = selection.get(Dimension::HealthZone);

        Self {
            organisation: organisation_options(dataset).into_iter().collect(),
            province: province_options(dataset).into_iter().collect(),
            health_zone: zone_options(dataset, provinces).into_iter().collect(),
            health_area: area_options(dataset, provinces, zones).into_iter().collect(),
            period: period_options(dataset).iter().map(Period::to_string).collect(),
        }
    }

    /// Option list of one dimension
    pub fn get(&self, dimension: Dimension) -> &[String] {
        match dimension {
            Dimension::Organisation => &self.organisation,
            Dimension::Province => &self.province,
            Dimension::HealthZone => &self.health_zone,
            Dimension::HealthArea => &self.health_area,
            Dimension::Period => &self.period,
        }
    }
}

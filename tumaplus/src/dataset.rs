//! In-memory table model
//!
//! A [`Dataset`] is one atomic snapshot of the reporting spreadsheet. It is
//! never mutated after construction; filtering produces a borrowed
//! [`FilteredView`] of row indices instead of copying records.

use crate::period::{parse_timestamp, serial_to_datetime, Period};
use chrono::NaiveDateTime;
use std::borrow::Cow;
use std::collections::HashMap;

/// Column holding the submission timestamp
pub const TIME_COLUMN: &str = "time";

static EMPTY_CELL: Cell = Cell::Empty;

/// One spreadsheet cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    /// Blank cell
    #[default]
    Empty,
    /// Numeric cell as decoded from a workbook
    Number(f64),
    /// Anything else, kept verbatim
    Text(String),
}

impl Cell {
    /// Build a cell from raw delimited text; blank input is `Empty`
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    /// Numeric value, if the cell holds one or holds text that reads as one
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) if v.is_finite() => Some(*v),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// Categorical value; whole numbers render without a fractional part
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Cell::Empty => None,
            Cell::Number(v) if v.is_finite() => Some(Cow::Owned(format_number(*v))),
            Cell::Number(_) => None,
            Cell::Text(s) => Some(Cow::Borrowed(s.as_str())),
        }
    }

    /// Whether aggregation treats this cell as missing
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Number(v) => !v.is_finite(),
            Cell::Text(s) => s.trim().is_empty(),
        }
    }
}

/// Render a float the way a spreadsheet user expects to read a code
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Ordered column names with name lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Build a schema from header names. Blank headers become
    /// `Unnamed: <position>`; a repeated name resolves to its first column.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns
            .into_iter()
            .enumerate()
            .map(|(position, name)| {
                let name = name.into().trim().to_string();
                if name.is_empty() {
                    format!("Unnamed: {position}")
                } else {
                    name
                }
            })
            .collect();

        let mut index = HashMap::with_capacity(columns.len());
        for (position, name) in columns.iter().enumerate() {
            if index.contains_key(name) {
                tracing::warn!("Duplicate column '{}' at position {}, keeping the first", name, position);
                continue;
            }
            index.insert(name.clone(), position);
        }

        Self { columns, index }
    }

    /// Column names in source order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column
    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    /// Whether the schema has a column
    pub fn contains(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// One row of the source table
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    cells: Vec<Cell>,
    time: Option<NaiveDateTime>,
    period: Option<Period>,
}

impl Record {
    fn new(cells: Vec<Cell>, time_index: Option<usize>) -> Self {
        let time = time_index
            .and_then(|idx| cells.get(idx))
            .and_then(|cell| match cell {
                Cell::Number(serial) => serial_to_datetime(*serial),
                Cell::Text(raw) => parse_timestamp(raw),
                Cell::Empty => None,
            });
        let period = time.as_ref().map(Period::from_datetime);
        Self { cells, time, period }
    }

    /// Cell at a column position; positions past the end of a short row are empty
    pub fn cell(&self, index: usize) -> &Cell {
        self.cells.get(index).unwrap_or(&EMPTY_CELL)
    }

    /// Parsed submission timestamp
    pub fn time(&self) -> Option<&NaiveDateTime> {
        self.time.as_ref()
    }

    /// Calendar month of the submission
    pub fn period(&self) -> Option<Period> {
        self.period
    }
}

/// An immutable snapshot of the reporting table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    schema: Schema,
    records: Vec<Record>,
}

impl Dataset {
    /// Build a dataset from a header row and data rows
    pub fn from_rows<I>(schema: Schema, rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<Cell>>,
    {
        let time_index = schema.index_of(TIME_COLUMN);
        if time_index.is_none() {
            tracing::warn!("Dataset has no '{}' column; time series will be empty", TIME_COLUMN);
        }

        let records = rows
            .into_iter()
            .map(|cells| Record::new(cells, time_index))
            .collect();

        Self { schema, records }
    }

    /// Column layout
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// All records in source order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Cell of a record by column name; unknown columns read as empty
    pub fn value<'a>(&self, record: &'a Record, column: &str) -> &'a Cell {
        match self.schema.index_of(column) {
            Some(idx) => record.cell(idx),
            None => &EMPTY_CELL,
        }
    }

    /// A view over every record
    pub fn view(&self) -> FilteredView<'_> {
        FilteredView {
            dataset: self,
            rows: (0..self.records.len()).collect(),
        }
    }
}

/// A filtered subset of a dataset, held as row indices into it
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a Dataset,
    rows: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    pub(crate) fn new(dataset: &'a Dataset, rows: Vec<usize>) -> Self {
        Self { dataset, rows }
    }

    /// The dataset this view borrows from
    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// Indices of the retained rows in the source dataset
    pub fn indices(&self) -> &[usize] {
        &self.rows
    }

    /// Number of retained rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no rows were retained
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Retained records in source order
    pub fn records(&self) -> impl Iterator<Item = &'a Record> + '_ {
        let records = self.dataset.records();
        self.rows.iter().map(move |&idx| &records[idx])
    }

    /// Cells of one column across the retained rows. An unknown column
    /// yields nothing, which every aggregate reads as zero.
    pub fn cells(&self, column: &str) -> impl Iterator<Item = &'a Cell> + '_ {
        let position = self.dataset.schema().index_of(column);
        self.records()
            .filter_map(move |record| position.map(|idx| record.cell(idx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        let schema = Schema::new(["organisation", "time", "count"]);
        Dataset::from_rows(
            schema,
            vec![
                vec![Cell::from_raw("PARDE"), Cell::from_raw("2024-01-15"), Cell::from_raw("3")],
                vec![Cell::from_raw("CARE"), Cell::from_raw("n/a"), Cell::Number(2.5)],
                vec![Cell::from_raw("ADJ")],
            ],
        )
    }

    #[test]
    fn test_cell_numeric_reading() {
        assert_eq!(Cell::from_raw(" 12 ").as_number(), Some(12.0));
        assert_eq!(Cell::from_raw("1.5").as_number(), Some(1.5));
        assert_eq!(Cell::from_raw("abc").as_number(), None);
        assert_eq!(Cell::from_raw("NaN").as_number(), None);
        assert_eq!(Cell::Empty.as_number(), None);
        assert!(Cell::from_raw("   ").is_missing());
    }

    #[test]
    fn test_cell_text_reading() {
        assert_eq!(Cell::Number(1.0).as_text().as_deref(), Some("1"));
        assert_eq!(Cell::Number(1.5).as_text().as_deref(), Some("1.5"));
        assert_eq!(Cell::from_raw("01").as_text().as_deref(), Some("01"));
        assert_eq!(Cell::Empty.as_text(), None);
    }

    #[test]
    fn test_schema_blank_and_duplicate_headers() {
        let schema = Schema::new(["a", "", "a"]);
        assert_eq!(schema.columns()[1], "Unnamed: 1");
        assert_eq!(schema.index_of("a"), Some(0));
        assert_eq!(schema.len(), 3);
    }

    #[test]
    fn test_records_get_periods() {
        let dataset = sample();
        let periods: Vec<Option<String>> = dataset
            .records()
            .iter()
            .map(|r| r.period().map(|p| p.to_string()))
            .collect();
        assert_eq!(periods, vec![Some("2024-01".to_string()), None, None]);
    }

    #[test]
    fn test_short_rows_and_unknown_columns_read_empty() {
        let dataset = sample();
        let short = &dataset.records()[2];
        assert_eq!(dataset.value(short, "count"), &Cell::Empty);
        assert_eq!(dataset.value(short, "no_such_column"), &Cell::Empty);
    }

    #[test]
    fn test_view_cells() {
        let dataset = sample();
        let view = dataset.view();
        assert_eq!(view.len(), 3);
        let total: f64 = view.cells("count").filter_map(Cell::as_number).sum();
        assert_eq!(total, 5.5);
        assert_eq!(view.cells("missing").count(), 0);
    }
}

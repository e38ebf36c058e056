//! Dataset loading
//!
//! A [`DataSource`] produces a complete [`Dataset`] snapshot on each call to
//! [`DataSource::fetch`]. Workbooks are decoded with calamine and delimited
//! exports with the csv crate; the first row is always the header.

use crate::config::{Config, SourceLocation};
use crate::dataset::{Cell, Dataset, Schema};
use crate::error::{ErrorContext, Result, TumaPlusError};
use async_trait::async_trait;
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use std::io::Cursor;
use std::path::{Path, PathBuf};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const CFB_MAGIC: &[u8] = b"\xD0\xCF\x11\xE0";

/// Encoding of a dataset payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// Spreadsheet workbook (xlsx, xlsm, xls, ods)
    Workbook,
    /// Comma separated values
    Csv,
}

impl DataFormat {
    /// Guess the format from a file name or URL path
    pub fn from_name(name: &str) -> Option<Self> {
        let extension = Path::new(name.split(['?', '#']).next().unwrap_or(name))
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match extension.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(Self::Workbook),
            "csv" | "txt" => Some(Self::Csv),
            _ => None,
        }
    }

    /// Guess the format from the leading bytes of a payload
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(CFB_MAGIC) {
            Self::Workbook
        } else {
            Self::Csv
        }
    }
}

/// A place a dataset snapshot can be fetched from
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Human readable description used in logs and error messages
    fn describe(&self) -> String;

    /// Fetch and decode a full snapshot
    async fn fetch(&self) -> Result<Dataset>;
}

/// Fetches the export over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: url::Url,
    sheet: Option<String>,
    client: reqwest::Client,
}

impl HttpSource {
    /// Create a source for `url`, identifying as `user_agent`
    pub fn new(url: url::Url, sheet: Option<String>, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self { url, sheet, client })
    }
}

#[async_trait]
impl DataSource for HttpSource {
    fn describe(&self) -> String {
        self.url.to_string()
    }

    async fn fetch(&self) -> Result<Dataset> {
        tracing::info!("Fetching dataset from {}", self.url);
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?.to_vec();
        tracing::debug!("Received {} bytes from {}", bytes.len(), self.url);

        let format =
            DataFormat::from_name(self.url.path()).unwrap_or_else(|| DataFormat::sniff(&bytes));
        decode_in_background(self.describe(), bytes, format, self.sheet.clone()).await
    }
}

/// Reads the export from the local filesystem
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    sheet: Option<String>,
}

impl FileSource {
    /// Create a source for a local file
    pub fn new(path: impl Into<PathBuf>, sheet: Option<String>) -> Self {
        Self {
            path: path.into(),
            sheet,
        }
    }
}

#[async_trait]
impl DataSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Dataset> {
        tracing::info!("Reading dataset from {}", self.path.display());
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read dataset file {}", self.path.display()))?;

        let format = self
            .path
            .to_str()
            .and_then(DataFormat::from_name)
            .unwrap_or_else(|| DataFormat::sniff(&bytes));
        decode_in_background(self.describe(), bytes, format, self.sheet.clone()).await
    }
}

/// Build the data source a configuration points at
pub fn source_from_config(config: &Config) -> Result<Box<dyn DataSource>> {
    let source: Box<dyn DataSource> = match config.source_location()? {
        SourceLocation::Url(url) => Box::new(HttpSource::new(
            url,
            config.sheet_name.clone(),
            &config.user_agent,
        )?),
        SourceLocation::Path(path) => Box::new(FileSource::new(path, config.sheet_name.clone())),
    };
    Ok(source)
}

async fn decode_in_background(
    source_name: String,
    bytes: Vec<u8>,
    format: DataFormat,
    sheet: Option<String>,
) -> Result<Dataset> {
    let name = source_name.clone();
    let decoded = tokio::task::spawn_blocking(move || {
        decode(&bytes, format, sheet.as_deref()).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| TumaPlusError::fetch(&name, format!("decoder task failed: {e}")))?;

    match decoded {
        Ok(dataset) => {
            tracing::info!(
                "Loaded {} records with {} columns from {}",
                dataset.len(),
                dataset.schema().len(),
                source_name
            );
            Ok(dataset)
        }
        Err(reason) => Err(TumaPlusError::fetch(source_name, reason)),
    }
}

/// Decode a payload of a known format
pub fn decode(bytes: &[u8], format: DataFormat, sheet: Option<&str>) -> Result<Dataset> {
    match format {
        DataFormat::Workbook => parse_workbook(bytes, sheet),
        DataFormat::Csv => parse_csv(bytes),
    }
}

/// Decode a CSV export. Cells keep their text so codes such as `"01"`
/// survive; numeric reading happens at aggregation time.
pub fn parse_csv(bytes: &[u8]) -> Result<Dataset> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(TumaPlusError::Other("missing header row".to_string()));
    }
    let schema = Schema::new(headers.iter());

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::from_raw).collect());
    }

    Ok(Dataset::from_rows(schema, rows))
}

/// Decode a spreadsheet workbook, reading `sheet` or the first worksheet
pub fn parse_workbook(bytes: &[u8], sheet: Option<&str>) -> Result<Dataset> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let range = match sheet {
        Some(name) => workbook.worksheet_range(name)?,
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| TumaPlusError::Other("workbook has no worksheets".to_string()))??,
    };

    dataset_from_range(&range)
}

fn dataset_from_range(range: &Range<Data>) -> Result<Dataset> {
    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| TumaPlusError::Other("missing header row".to_string()))?;

    let schema = Schema::new(header.iter().map(|value| {
        cell_from_data(value)
            .as_text()
            .map(|text| text.into_owned())
            .unwrap_or_default()
    }));

    let records = rows
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect::<Vec<Vec<Cell>>>();

    Ok(Dataset::from_rows(schema, records))
}

fn cell_from_data(value: &Data) -> Cell {
    match value {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::from_raw(s),
        Data::Float(v) => Cell::Number(*v),
        Data::Int(v) => Cell::Number(*v as f64),
        Data::Bool(v) => Cell::Text(v.to_string()),
        Data::DateTime(v) => Cell::Number(v.as_f64()),
    }
}

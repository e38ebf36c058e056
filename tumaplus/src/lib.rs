//! # TUMA PLUS
//!
//! Filtering and aggregation core of the TUMA PLUS consortium indicator
//! dashboard.
//!
//! ## Features
//!
//! - **Dataset loading**: fetch the reporting spreadsheet over HTTP or from disk (xlsx, ods, csv)
//! - **Cascading filters**: organisation, province, health zone, health area and reporting month
//! - **Metrics**: counts, sums, composite sums and ratios per report section
//! - **Time series**: monthly wide and long-form series for charts
//! - **Declarative sections**: a YAML catalog gates each section by organisation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tumaplus::{Config, Dashboard, Dimension, Selection};
//!
//! # async fn run() -> tumaplus::Result<()> {
//! let config = Config::new();
//! let mut dashboard = Dashboard::from_config(&config)?;
//!
//! let selection = Selection::new().with(Dimension::Organisation, ["PARDE"]);
//! let view = dashboard.render(&selection).await?;
//!
//! for section in &view.sections {
//!     println!("{}", section.title);
//!     for panel in &section.panels {
//!         for metric in &panel.metrics {
//!             println!("  {}: {}", metric.label, metric.display);
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

/// Error types and context helpers
pub mod error;

/// Environment variable helpers
pub mod env_loader;

/// Layered configuration
pub mod config;

/// Reporting periods and timestamp parsing
pub mod period;

/// In-memory table model
pub mod dataset;

/// Data sources and payload decoding
pub mod loader;

/// Snapshot memo
pub mod cache;

/// Filter engine and cascading options
pub mod filter;

/// Metric engine
pub mod metrics;

/// Time series builders
pub mod series;

/// Declarative section catalog
pub mod catalog;

/// Render cycle and view model
pub mod view;

/// Stateful dashboard wrapper
pub mod dashboard;

pub use cache::{CacheStats, DatasetCache};
pub use catalog::{ChartData, ChartKind, ChartView, MetricPanelView, Section, SectionCatalog, SeriesDef};
pub use config::{Config, SourceLocation, YamlConfig};
pub use dashboard::Dashboard;
pub use dataset::{Cell, Dataset, FilteredView, Record, Schema};
pub use error::{ConfigError, ErrorContext, Result, TumaPlusError};
pub use filter::{apply_filters, Dimension, FilterOptions, Selection};
pub use loader::{DataFormat, DataSource, FileSource, HttpSource};
pub use metrics::{compute_metrics, Measure, MetricDef, MetricValue, MetricView};
pub use period::Period;
pub use series::{build_categorized_series, build_grouped_series, build_series, LabelTable, TimeSeries};
pub use view::{render_cycle, SectionView, ViewModel};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        apply_filters, render_cycle, Config, ConfigError, Dashboard, DataSource, Dataset,
        Dimension, FilterOptions, Result, SectionCatalog, Selection, TumaPlusError, ViewModel,
    };
}

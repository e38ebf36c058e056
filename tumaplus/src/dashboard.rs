//! Dashboard state: the data source, its memoized snapshot and the catalog
//!
//! The only state that survives between render cycles is the memoized
//! dataset and the last load error. Selections are owned by the caller and
//! passed in on every cycle.

use crate::cache::{CacheStats, DatasetCache};
use crate::catalog::SectionCatalog;
use crate::config::Config;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::filter::Selection;
use crate::loader::{source_from_config, DataSource};
use crate::view::{render_cycle, ViewModel};
use std::sync::Arc;

/// Loaded dashboard
pub struct Dashboard {
    source: Box<dyn DataSource>,
    catalog: SectionCatalog,
    cache: DatasetCache,
    last_error: Option<String>,
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("source", &self.source.describe())
            .field("sections", &self.catalog.sections.len())
            .field("cache", &self.cache)
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl Dashboard {
    /// Create a dashboard over a source and a parsed catalog
    pub fn new(source: Box<dyn DataSource>, catalog: SectionCatalog) -> Self {
        Self {
            source,
            catalog,
            cache: DatasetCache::new(),
            last_error: None,
        }
    }

    /// Build a dashboard from configuration: source location and catalog
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let source = source_from_config(config)?;
        let catalog = SectionCatalog::load(config.catalog_path.as_deref())?;
        Ok(Self::new(source, catalog))
    }

    /// The section catalog
    pub fn catalog(&self) -> &SectionCatalog {
        &self.catalog
    }

    /// Description of the data source
    pub fn source_name(&self) -> String {
        self.source.describe()
    }

    /// Message of the last failed load, cleared by the next successful one
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Snapshot cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Fetch a fresh snapshot and check the catalog against its schema.
    /// Does not touch the cache.
    async fn load(&self) -> Result<Arc<Dataset>> {
        let dataset = self.source.fetch().await?;
        self.catalog.validate(dataset.schema())?;
        Ok(Arc::new(dataset))
    }

    /// The memoized snapshot, loading it on first use.
    ///
    /// A fetch failure is recorded and yields `Ok(None)`; configuration
    /// defects found against the loaded schema are returned as errors.
    pub async fn snapshot(&mut self) -> Result<Option<Arc<Dataset>>> {
        if let Some(dataset) = self.cache.get() {
            return Ok(Some(dataset));
        }

        match self.load().await {
            Ok(dataset) => {
                self.cache.put(Arc::clone(&dataset));
                self.last_error = None;
                Ok(Some(dataset))
            }
            Err(e) if e.is_config() => Err(e),
            Err(e) => {
                tracing::warn!("Failed to load dataset from {}: {}", self.source.describe(), e);
                self.last_error = Some(e.to_string());
                Ok(None)
            }
        }
    }

    /// Drop the memoized snapshot and reload it, waiting for the load to
    /// finish. When a snapshot was already loaded, any failure (fetch or a
    /// schema the catalog no longer matches) keeps it in place and is
    /// recorded as the last error. Without a previous snapshot, schema
    /// defects are returned as errors like on first load.
    pub async fn refresh(&mut self) -> Result<Option<Arc<Dataset>>> {
        tracing::info!("Refreshing dataset from {}", self.source.describe());
        let previous = self.cache.invalidate();

        match self.load().await {
            Ok(dataset) => {
                self.cache.put(Arc::clone(&dataset));
                self.last_error = None;
                Ok(Some(dataset))
            }
            Err(e) if e.is_config() && previous.is_none() => Err(e),
            Err(e) => {
                tracing::warn!(
                    "Refresh from {} failed, keeping previous snapshot: {}",
                    self.source.describe(),
                    e
                );
                self.last_error = Some(e.to_string());
                if let Some(dataset) = &previous {
                    self.cache.put(Arc::clone(dataset));
                }
                Ok(previous)
            }
        }
    }

    /// One render cycle over the current snapshot
    pub async fn render(&mut self, selection: &Selection) -> Result<ViewModel> {
        let Some(dataset) = self.snapshot().await? else {
            let message = self
                .last_error
                .clone()
                .unwrap_or_else(|| "dataset unavailable".to_string());
            return Ok(ViewModel::unavailable(selection, message));
        };

        let mut view = render_cycle(&self.catalog, &dataset, selection)?;
        view.load_error = self.last_error.clone();
        Ok(view)
    }
}

// Process-wide dataset, loaded at most once.

use crate::dataset::Dataset;
use crate::error::DashboardResult;
use once_cell::sync::OnceCell;
use std::path::Path;
use tracing::debug;

/// Load-once holder for a `Dataset`.
///
/// The first successful `get_or_load` wins; later calls return that dataset
/// whatever path they pass. A failed load leaves the cache empty.
#[derive(Debug, Default)]
pub struct DatasetCache {
    cell: OnceCell<Dataset>,
}

impl DatasetCache {
    pub const fn new() -> Self {
        DatasetCache {
            cell: OnceCell::new(),
        }
    }

    pub fn get_or_load(&self, path: &Path) -> DashboardResult<&Dataset> {
        if let Some(dataset) = self.cell.get() {
            debug!(path = %path.display(), "dataset already loaded, reusing");
            return Ok(dataset);
        }
        self.cell.get_or_try_init(|| Dataset::load(path))
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}

static DATASET: DatasetCache = DatasetCache::new();

/// Load the global dataset. Safe to call repeatedly; only the first call reads the file.
pub fn init_dataset(path: &Path) -> DashboardResult<&'static Dataset> {
    DATASET.get_or_load(path)
}

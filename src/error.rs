// Error types for dataset loading and configuration.
// "No data for this commune" is not an error: see aggregate::Selection.

use std::path::PathBuf;
use thiserror::Error;

pub type DashboardResult<T> = Result<T, DashboardError>;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("data file not found: {0}")]
    DataFileMissing(PathBuf),

    #[error("failed to parse {path} at line {line}: {source}")]
    Csv {
        path: PathBuf,
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DashboardError {
    /// Wrap a csv error, pulling the line number out of its position if it has one.
    pub(crate) fn from_csv(path: &std::path::Path, err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        DashboardError::Csv {
            path: path.to_path_buf(),
            line,
            source: err,
        }
    }
}

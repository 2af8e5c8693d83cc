// DVF Dashboard - Core Library
// Exposes all modules for use in the TUI, CLI report, API server, and tests

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod presenter;
pub mod store;

#[cfg(feature = "server")]
pub mod api;

#[cfg(feature = "tui")]
pub mod ui;

// Re-export commonly used types
pub use aggregate::{
    percent_change, select_commune, yearly_means, CommuneReport, PriceTrend, Selection,
    YearlyMean,
};
pub use config::Config;
pub use dataset::{load_csv, Dataset, PropertyType, Transaction};
pub use error::{DashboardError, DashboardResult};
pub use presenter::{ChartSpec, DashboardView, MetricView, PanelView};
pub use store::{init_dataset, DatasetCache};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Data source abstraction for loading positions, price history and scenarios.

use crate::domain::{Position, PriceRecord, ScenarioRecord};
use async_trait::async_trait;
use std::fmt;

pub mod csv_file;
pub mod mock;

pub use csv_file::CsvDataSource;
pub use mock::MockDataSource;

/// Supplier of the three run inputs.
///
/// Implementations do all blocking I/O; the engine only ever sees the
/// fully loaded results.
#[async_trait]
pub trait DataSource: Send + Sync + fmt::Debug {
    /// Current portfolio positions.
    async fn fetch_positions(&self) -> Result<Vec<Position>, DataSourceError>;

    /// Long-format price rows. Rows for one asset must be in date order.
    async fn fetch_prices(&self) -> Result<Vec<PriceRecord>, DataSourceError>;

    /// Scenario catalog rows (unvalidated).
    async fn fetch_scenarios(&self) -> Result<Vec<ScenarioRecord>, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone)]
pub enum DataSourceError {
    /// File missing or unreadable.
    Io(String),
    /// Row could not be parsed.
    ParseError { file: String, message: String },
    /// Other error
    Other(String),
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::Io(msg) => write!(f, "I/O error: {}", msg),
            DataSourceError::ParseError { file, message } => {
                write!(f, "Parse error in {}: {}", file, message)
            }
            DataSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DataSourceError {}

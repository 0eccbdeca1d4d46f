pub mod api;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod report;

pub use config::Config;
pub use datasource::{CsvDataSource, DataSource, DataSourceError, MockDataSource};
pub use domain::{
    AssetId, Currency, Decimal, DefinitionError, Position, PriceRecord, Scenario, ScenarioId,
    ScenarioRecord,
};
pub use engine::{
    PriceIndex, ScenarioEvaluator, ScenarioRanker, ScenarioResult, WeightCalculator, WeightMode,
    Weights,
};
pub use error::AppError;
pub use orchestration::{RunError, RunOptions, StressInputs, StressRunner};
pub use report::{Report, ReportAssembler};

//! In-memory data source for tests and inline requests.

use super::{DataSource, DataSourceError};
use crate::domain::{Position, PriceRecord, ScenarioRecord};
use async_trait::async_trait;

/// Data source that returns predefined inputs.
#[derive(Debug, Clone, Default)]
pub struct MockDataSource {
    positions: Vec<Position>,
    prices: Vec<PriceRecord>,
    scenarios: Vec<ScenarioRecord>,
    failure: Option<String>,
}

impl MockDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.positions.push(position);
        self
    }

    pub fn with_positions(mut self, positions: Vec<Position>) -> Self {
        self.positions.extend(positions);
        self
    }

    pub fn with_prices(mut self, prices: Vec<PriceRecord>) -> Self {
        self.prices.extend(prices);
        self
    }

    pub fn with_scenario(mut self, scenario: ScenarioRecord) -> Self {
        self.scenarios.push(scenario);
        self
    }

    pub fn with_scenarios(mut self, scenarios: Vec<ScenarioRecord>) -> Self {
        self.scenarios.extend(scenarios);
        self
    }

    /// Make every fetch fail with `DataSourceError::Other(message)`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), DataSourceError> {
        match &self.failure {
            Some(msg) => Err(DataSourceError::Other(msg.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DataSource for MockDataSource {
    async fn fetch_positions(&self) -> Result<Vec<Position>, DataSourceError> {
        self.check()?;
        Ok(self.positions.clone())
    }

    async fn fetch_prices(&self) -> Result<Vec<PriceRecord>, DataSourceError> {
        self.check()?;
        Ok(self.prices.clone())
    }

    async fn fetch_scenarios(&self) -> Result<Vec<ScenarioRecord>, DataSourceError> {
        self.check()?;
        Ok(self.scenarios.clone())
    }
}

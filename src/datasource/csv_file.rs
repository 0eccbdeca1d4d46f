//! Directory of CSV files: `positions.csv`, `prices.csv`, `scenarios.csv`.

use super::{DataSource, DataSourceError};
use crate::domain::{
    AssetId, Currency, Decimal, Position, PriceRecord, ScenarioId, ScenarioRecord,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

pub const POSITIONS_FILE: &str = "positions.csv";
pub const PRICES_FILE: &str = "prices.csv";
pub const SCENARIOS_FILE: &str = "scenarios.csv";

#[derive(Debug, serde::Deserialize)]
struct PositionRow {
    asset_id: String,
    quantity: String,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    multiplier: Option<String>,
    #[serde(default)]
    avg_cost: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    price_key: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct PriceRow {
    asset_id: String,
    date: String,
    price: String,
}

#[derive(Debug, serde::Deserialize)]
struct ScenarioRow {
    scenario_id: String,
    start_date: String,
    end_date: String,
}

#[derive(Debug, Clone)]
pub struct CsvDataSource {
    dir: PathBuf,
}

impl CsvDataSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_bytes(&self, file: &str) -> Result<Vec<u8>, DataSourceError> {
        let path = self.dir.join(file);
        tokio::fs::read(&path)
            .await
            .map_err(|e| DataSourceError::Io(format!("{}: {}", path.display(), e)))
    }

    pub fn parse_positions(bytes: &[u8]) -> Result<Vec<Position>, DataSourceError> {
        parse_rows::<PositionRow>(POSITIONS_FILE, bytes)?
            .into_iter()
            .map(|row| {
                Ok(Position {
                    asset_id: AssetId::new(row.asset_id.trim()),
                    quantity: parse_decimal(POSITIONS_FILE, "quantity", &row.quantity)?,
                    price: parse_optional_decimal(POSITIONS_FILE, "price", row.price)?,
                    multiplier: parse_optional_decimal(
                        POSITIONS_FILE,
                        "multiplier",
                        row.multiplier,
                    )?
                    .unwrap_or_else(Decimal::one),
                    avg_cost: parse_optional_decimal(POSITIONS_FILE, "avg_cost", row.avg_cost)?,
                    currency: row
                        .currency
                        .filter(|c| !c.trim().is_empty())
                        .map(Currency::new),
                    price_key: row
                        .price_key
                        .filter(|k| !k.trim().is_empty())
                        .map(|k| AssetId::new(k.trim())),
                })
            })
            .collect()
    }

    pub fn parse_prices(bytes: &[u8]) -> Result<Vec<PriceRecord>, DataSourceError> {
        parse_rows::<PriceRow>(PRICES_FILE, bytes)?
            .into_iter()
            .map(|row| {
                Ok(PriceRecord {
                    asset_id: AssetId::new(row.asset_id.trim()),
                    date: parse_date(PRICES_FILE, &row.date)?,
                    price: parse_decimal(PRICES_FILE, "price", &row.price)?,
                })
            })
            .collect()
    }

    pub fn parse_scenarios(bytes: &[u8]) -> Result<Vec<ScenarioRecord>, DataSourceError> {
        parse_rows::<ScenarioRow>(SCENARIOS_FILE, bytes)?
            .into_iter()
            .map(|row| {
                Ok(ScenarioRecord {
                    scenario_id: ScenarioId::new(row.scenario_id.trim()),
                    start_date: parse_date(SCENARIOS_FILE, &row.start_date)?,
                    end_date: parse_date(SCENARIOS_FILE, &row.end_date)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl DataSource for CsvDataSource {
    async fn fetch_positions(&self) -> Result<Vec<Position>, DataSourceError> {
        let bytes = self.read_bytes(POSITIONS_FILE).await?;
        Self::parse_positions(&bytes)
    }

    async fn fetch_prices(&self) -> Result<Vec<PriceRecord>, DataSourceError> {
        let bytes = self.read_bytes(PRICES_FILE).await?;
        Self::parse_prices(&bytes)
    }

    async fn fetch_scenarios(&self) -> Result<Vec<ScenarioRecord>, DataSourceError> {
        let bytes = self.read_bytes(SCENARIOS_FILE).await?;
        Self::parse_scenarios(&bytes)
    }
}

fn parse_rows<T: DeserializeOwned>(file: &str, bytes: &[u8]) -> Result<Vec<T>, DataSourceError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(::csv::Trim::All)
        .from_reader(bytes);

    reader
        .deserialize::<T>()
        .map(|record| {
            record.map_err(|e| DataSourceError::ParseError {
                file: file.to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}

fn parse_decimal(file: &str, field: &str, raw: &str) -> Result<Decimal, DataSourceError> {
    Decimal::from_str_canonical(raw).map_err(|e| DataSourceError::ParseError {
        file: file.to_string(),
        message: format!("invalid {} '{}': {}", field, raw, e),
    })
}

fn parse_optional_decimal(
    file: &str,
    field: &str,
    raw: Option<String>,
) -> Result<Option<Decimal>, DataSourceError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_decimal(file, field, s).map(Some),
    }
}

fn parse_date(file: &str, raw: &str) -> Result<NaiveDate, DataSourceError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| DataSourceError::ParseError {
        file: file.to_string(),
        message: format!("invalid date '{}': {}", raw, e),
    })
}

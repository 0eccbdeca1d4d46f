//! Definition errors raised while validating inputs at the boundary.

use crate::domain::{AssetId, Decimal, ScenarioId};
use chrono::NaiveDate;
use thiserror::Error;

/// A malformed input supplied by the caller.
///
/// These are never recovered from inside the engine: the affected scope
/// (a scenario, a price series, a position) is rejected with a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("scenario {scenario}: start date {start} must be before end date {end}")]
    InvertedScenario {
        scenario: ScenarioId,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[error("price series for {asset}: date {date} appears more than once")]
    DuplicatePriceDate { asset: AssetId, date: NaiveDate },
    #[error("price series for {asset}: date {date} follows {previous} (series must be increasing)")]
    UnsortedPriceSeries {
        asset: AssetId,
        previous: NaiveDate,
        date: NaiveDate,
    },
    #[error("price series for {asset}: price {price} on {date} must be positive")]
    NonPositivePrice {
        asset: AssetId,
        date: NaiveDate,
        price: Decimal,
    },
    #[error("position {asset}: multiplier {multiplier} must be positive")]
    NonPositiveMultiplier { asset: AssetId, multiplier: Decimal },
    #[error("position {asset}: {quantity} exceeds the supported decimal range")]
    ValueOverflow {
        asset: AssetId,
        quantity: &'static str,
    },
}

//! Pure computation engine for historical scenario replay.
//!
//! Nothing here performs I/O or holds mutable shared state: every result is a
//! function of the scenario window, the price index and the weights.

use crate::domain::{AssetId, Currency, Decimal, PricePoint, Scenario, ScenarioId};
use serde::Serialize;
use thiserror::Error;

pub mod evaluator;
pub mod fx;
pub mod price_index;
pub mod ranker;
pub mod weights;

pub use evaluator::{EvaluationPolicy, ScenarioEvaluator};
pub use fx::{FxTranslator, FxTreatment};
pub use price_index::{PriceIndex, Resolution};
pub use ranker::{RankedScenario, ScenarioRanker};
pub use weights::{
    HoldingKey, PositionExclusion, WeightCalculator, WeightEntry, WeightError, WeightMode, Weights,
};

/// Which scenario boundary had no resolvable price.
///
/// Lookup only moves backwards in time and `start < end`, so a resolved start
/// always implies a resolved end: a gap is either at the start alone or at both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingBoundary {
    /// History begins inside the window.
    Start,
    /// History begins after the window (or the series is absent).
    Both,
}

/// Why an asset contributes nothing to a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExclusionReason {
    NoHistoricalCoverage { missing: MissingBoundary },
}

impl std::fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExclusionReason::NoHistoricalCoverage { missing } => {
                let boundary = match missing {
                    MissingBoundary::Start => "start",
                    MissingBoundary::Both => "start and end",
                };
                write!(f, "no historical coverage at scenario {}", boundary)
            }
        }
    }
}

/// An asset left out of one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetExclusion {
    pub asset_id: AssetId,
    pub currency: Option<Currency>,
    pub reason: ExclusionReason,
}

/// Per-(scenario, asset) outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetReturn {
    pub asset_id: AssetId,
    pub currency: Option<Currency>,
    /// Series the prices were resolved from.
    pub price_key: AssetId,
    /// Portfolio weight from the full book.
    pub weight: Decimal,
    /// Weight actually applied to the return (differs only when renormalizing).
    pub effective_weight: Decimal,
    pub start: Option<PricePoint>,
    pub end: Option<PricePoint>,
    /// `end / start - 1` in the asset's own currency.
    pub local_return: Option<Decimal>,
    /// Local return after currency translation.
    pub asset_return: Option<Decimal>,
    pub fx: Option<FxTreatment>,
    pub contribution: Option<Decimal>,
    pub included: bool,
}

/// A scenario that could not be scored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("scenario {scenario}: {quantity} of {asset} exceeds the supported decimal range")]
    Overflow {
        scenario: ScenarioId,
        asset: AssetId,
        quantity: &'static str,
    },
}

/// Outcome of replaying one scenario window over the portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub scenario: Scenario,
    /// Sum of contributions over included assets only.
    pub portfolio_return: Decimal,
    /// Every weighted asset, in asset-id order.
    pub assets: Vec<AssetReturn>,
    pub excluded: Vec<AssetExclusion>,
    /// No asset had coverage; `portfolio_return` is 0 but carries no information.
    pub fully_excluded: bool,
}

impl ScenarioResult {
    pub fn included(&self) -> impl Iterator<Item = &AssetReturn> {
        self.assets.iter().filter(|a| a.included)
    }

    pub fn included_count(&self) -> usize {
        self.included().count()
    }

    pub fn excluded_count(&self) -> usize {
        self.excluded.len()
    }
}

//! Domain types for historical scenario replay.
//!
//! This module provides:
//! - Exact numeric handling via the Decimal wrapper
//! - Identifiers: AssetId, ScenarioId, Currency
//! - Input records (positions, price rows, scenario rows) with boundary validation
//! - Validated price series and scenario windows

pub mod decimal;
pub mod position;
pub mod price;
pub mod primitives;
pub mod scenario;
pub mod validation;

pub use decimal::Decimal;
pub use position::{
    Position, PositionExclusionReason, PositionValuation, PriceSource, ValuationOutcome,
    CURRENCY_SUFFIX_SEPARATOR,
};
pub use price::{PricePoint, PriceRecord, PriceSeries};
pub use primitives::{AssetId, Currency, ScenarioId};
pub use scenario::{Scenario, ScenarioRecord};
pub use validation::DefinitionError;

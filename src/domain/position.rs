//! Position input record and its market valuation.

use crate::domain::{AssetId, Currency, Decimal, DefinitionError};
use serde::{Deserialize, Deserializer, Serialize};

/// Separator between a symbol and its listing currency in an asset id (`MSFT__CAD`).
pub const CURRENCY_SUFFIX_SEPARATOR: &str = "__";

fn default_multiplier() -> Decimal {
    Decimal::one()
}

/// Blank currency codes mean "no currency", as in the CSV reader.
fn deserialize_currency<'de, D>(deserializer: D) -> Result<Option<Currency>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|c| !c.trim().is_empty()).map(Currency::new))
}

/// A held position as reported by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub asset_id: AssetId,
    /// Signed quantity: positive = long, negative = short.
    pub quantity: Decimal,
    /// Live market price, if the broker supplied one.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Contract multiplier (1 for cash instruments).
    #[serde(default = "default_multiplier")]
    pub multiplier: Decimal,
    /// Average cost per unit, used when no live price is available.
    #[serde(default)]
    pub avg_cost: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_currency")]
    pub currency: Option<Currency>,
    /// Price series to replay instead of `asset_id`, e.g. a future's underlying.
    #[serde(default)]
    pub price_key: Option<AssetId>,
}

/// Where a position's market value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// `price × quantity × multiplier`.
    Live,
    /// `avg_cost × quantity × multiplier`; an approximation of market value.
    AvgCostFallback,
}

/// Market value of a single position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionValuation {
    pub asset_id: AssetId,
    pub currency: Option<Currency>,
    pub value: Decimal,
    pub price_source: PriceSource,
}

/// Result of valuing a well-formed position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValuationOutcome {
    Valued(PositionValuation),
    Excluded(PositionExclusionReason),
}

/// Why a position takes no part in weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionExclusionReason {
    ZeroQuantity,
    /// Neither a live price nor an average cost is available.
    NoMarketValue,
    /// Valued, but the value is exactly zero.
    ZeroValue,
}

impl std::fmt::Display for PositionExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionExclusionReason::ZeroQuantity => write!(f, "zero_quantity"),
            PositionExclusionReason::NoMarketValue => write!(f, "no_market_value"),
            PositionExclusionReason::ZeroValue => write!(f, "zero_value"),
        }
    }
}

impl Position {
    /// A position with a live price and unit multiplier.
    pub fn new(asset_id: AssetId, quantity: Decimal, price: Decimal) -> Self {
        Self {
            asset_id,
            quantity,
            price: Some(price),
            multiplier: Decimal::one(),
            avg_cost: None,
            currency: None,
            price_key: None,
        }
    }

    pub fn with_multiplier(mut self, multiplier: Decimal) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_avg_cost(mut self, avg_cost: Decimal) -> Self {
        self.avg_cost = Some(avg_cost);
        self
    }

    pub fn without_price(mut self) -> Self {
        self.price = None;
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    pub fn with_price_key(mut self, key: AssetId) -> Self {
        self.price_key = Some(key);
        self
    }

    /// Series key to replay: the explicit `price_key`, else the asset id.
    pub fn lookup_key(&self) -> &AssetId {
        self.price_key.as_ref().unwrap_or(&self.asset_id)
    }

    /// Check the record invariants.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if !self.multiplier.is_positive() {
            return Err(DefinitionError::NonPositiveMultiplier {
                asset: self.asset_id.clone(),
                multiplier: self.multiplier,
            });
        }
        Ok(())
    }

    /// Market value of the position, or the reason it has none.
    ///
    /// Fails only when `quantity × price × multiplier` is not representable.
    pub fn valuation(&self) -> Result<ValuationOutcome, DefinitionError> {
        if self.quantity.is_zero() {
            return Ok(ValuationOutcome::Excluded(
                PositionExclusionReason::ZeroQuantity,
            ));
        }

        let (unit_price, price_source) = match (self.price, self.avg_cost) {
            (Some(px), _) => (px, PriceSource::Live),
            (None, Some(cost)) => (cost, PriceSource::AvgCostFallback),
            (None, None) => {
                return Ok(ValuationOutcome::Excluded(
                    PositionExclusionReason::NoMarketValue,
                ))
            }
        };

        let value = self
            .quantity
            .checked_mul(unit_price)
            .and_then(|v| v.checked_mul(self.multiplier))
            .ok_or_else(|| DefinitionError::ValueOverflow {
                asset: self.asset_id.clone(),
                quantity: "market value",
            })?;
        if value.is_zero() {
            return Ok(ValuationOutcome::Excluded(PositionExclusionReason::ZeroValue));
        }

        Ok(ValuationOutcome::Valued(PositionValuation {
            asset_id: self.asset_id.clone(),
            currency: self.currency.clone(),
            value,
            price_source,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn valued(pos: &Position) -> PositionValuation {
        match pos.valuation().unwrap() {
            ValuationOutcome::Valued(v) => v,
            other => panic!("expected a valuation, got {other:?}"),
        }
    }

    fn excluded(pos: &Position) -> PositionExclusionReason {
        match pos.valuation().unwrap() {
            ValuationOutcome::Excluded(reason) => reason,
            other => panic!("expected an exclusion, got {other:?}"),
        }
    }

    #[test]
    fn test_live_valuation_applies_multiplier() {
        let pos = Position::new(AssetId::new("ES"), d("-2"), d("5000")).with_multiplier(d("50"));
        let val = valued(&pos);
        assert_eq!(val.value, d("-500000"));
        assert_eq!(val.price_source, PriceSource::Live);
    }

    #[test]
    fn test_avg_cost_fallback_is_tagged() {
        let pos = Position::new(AssetId::new("XYZ"), d("10"), d("1"))
            .without_price()
            .with_avg_cost(d("12.5"));
        let val = valued(&pos);
        assert_eq!(val.value, d("125"));
        assert_eq!(val.price_source, PriceSource::AvgCostFallback);
    }

    #[test]
    fn test_live_price_preferred_over_avg_cost() {
        let pos = Position::new(AssetId::new("XYZ"), d("10"), d("20")).with_avg_cost(d("12.5"));
        assert_eq!(valued(&pos).price_source, PriceSource::Live);
    }

    #[test]
    fn test_zero_quantity_excluded() {
        let pos = Position::new(AssetId::new("XYZ"), Decimal::zero(), d("20"));
        assert_eq!(excluded(&pos), PositionExclusionReason::ZeroQuantity);
    }

    #[test]
    fn test_no_price_no_cost_excluded() {
        let pos = Position::new(AssetId::new("XYZ"), d("3"), d("1")).without_price();
        assert_eq!(excluded(&pos), PositionExclusionReason::NoMarketValue);
    }

    #[test]
    fn test_zero_value_excluded() {
        let pos = Position::new(AssetId::new("XYZ"), d("3"), Decimal::zero());
        assert_eq!(excluded(&pos), PositionExclusionReason::ZeroValue);
    }

    #[test]
    fn test_validate_rejects_non_positive_multiplier() {
        let pos = Position::new(AssetId::new("ES"), d("1"), d("1")).with_multiplier(d("0"));
        assert!(matches!(
            pos.validate(),
            Err(DefinitionError::NonPositiveMultiplier { .. })
        ));
    }

    #[test]
    fn test_deserialize_defaults_multiplier() {
        let pos: Position =
            serde_json::from_str(r#"{"assetId":"SPY","quantity":10,"price":400}"#).unwrap();
        assert_eq!(pos.multiplier, Decimal::one());
        assert_eq!(pos.avg_cost, None);
        assert_eq!(pos.currency, None);
    }

    #[test]
    fn test_oversized_position_is_a_definition_error() {
        let big = d("10000000000000000");
        let pos = Position::new(AssetId::new("A"), big, big);
        match pos.valuation() {
            Err(DefinitionError::ValueOverflow { asset, .. }) => {
                assert_eq!(asset, AssetId::new("A"))
            }
            other => panic!("expected ValueOverflow, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_currency_deserializes_as_none() {
        let pos: Position = serde_json::from_str(
            r#"{"assetId":"SPY","quantity":10,"price":400,"currency":" "}"#,
        )
        .unwrap();
        assert_eq!(pos.currency, None);

        let pos: Position = serde_json::from_str(
            r#"{"assetId":"SHOP","quantity":10,"price":90,"currency":"cad"}"#,
        )
        .unwrap();
        assert_eq!(pos.currency, Some(Currency::new("CAD")));
    }

    #[test]
    fn test_lookup_key_prefers_price_key() {
        let pos = Position::new(AssetId::new("ESM6"), d("1"), d("5000"));
        assert_eq!(pos.lookup_key(), &AssetId::new("ESM6"));
        let pos = pos.with_price_key(AssetId::new("ES"));
        assert_eq!(pos.lookup_key(), &AssetId::new("ES"));
    }
}

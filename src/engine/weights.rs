use crate::domain::{
    AssetId, Currency, Decimal, DefinitionError, Position, PositionExclusionReason,
    PositionValuation, PriceSource, ValuationOutcome,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

/// Normalization convention for portfolio weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightMode {
    /// `value_i / Σ|value_j|`, so `Σ|w| = 1`.
    Gross,
    /// `value_i / Σ value_j`, so `Σ w = 1`.
    Net,
}

impl FromStr for WeightMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gross" => Ok(WeightMode::Gross),
            "net" => Ok(WeightMode::Net),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for WeightMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeightMode::Gross => write!(f, "gross"),
            WeightMode::Net => write!(f, "net"),
        }
    }
}

/// One weighted exposure: an asset held in one currency, replayed off one series.
///
/// Positions sharing a key are summed; the same asset held in two currencies
/// stays two holdings so each is translated on its own.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HoldingKey {
    pub asset_id: AssetId,
    pub currency: Option<Currency>,
    pub price_key: AssetId,
}

impl HoldingKey {
    pub fn of(position: &Position) -> Self {
        Self {
            asset_id: position.asset_id.clone(),
            currency: position.currency.clone(),
            price_key: position.lookup_key().clone(),
        }
    }
}

/// Weight of one holding, aggregated over all of its positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightEntry {
    pub asset_id: AssetId,
    /// Requested price series; the index may fall back to the base symbol.
    pub price_key: AssetId,
    pub weight: Decimal,
    pub value: Decimal,
    /// `AvgCostFallback` if any contributing position was valued from cost.
    pub price_source: PriceSource,
    pub currency: Option<Currency>,
}

/// A position (or an asset netting to zero) left out of weighting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionExclusion {
    pub asset_id: AssetId,
    pub reason: PositionExclusionReason,
}

#[derive(Debug, Error)]
pub enum WeightError {
    #[error("degenerate input for {mode} weights: {detail}")]
    DegenerateInput { mode: WeightMode, detail: String },
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

/// Normalized portfolio weights plus the valuation audit trail behind them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Weights {
    mode: WeightMode,
    entries: BTreeMap<HoldingKey, WeightEntry>,
    valuations: Vec<PositionValuation>,
    excluded: Vec<PositionExclusion>,
}

impl Weights {
    pub fn mode(&self) -> WeightMode {
        self.mode
    }

    /// The entry of an asset held as a single holding; `None` if absent or split.
    pub fn get(&self, asset: &AssetId) -> Option<&WeightEntry> {
        let mut holdings = self.holdings_of(asset);
        match (holdings.next(), holdings.next()) {
            (Some(entry), None) => Some(entry),
            _ => None,
        }
    }

    pub fn holdings_of<'a, 'b>(
        &'a self,
        asset: &'b AssetId,
    ) -> impl Iterator<Item = &'a WeightEntry> + 'b
    where
        'a: 'b,
    {
        self.entries.values().filter(move |e| &e.asset_id == asset)
    }

    /// Entries in (asset id, currency, price key) order.
    pub fn iter(&self) -> impl Iterator<Item = &WeightEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One valuation per position that survived filtering, in input order.
    pub fn valuations(&self) -> &[PositionValuation] {
        &self.valuations
    }

    pub fn excluded(&self) -> &[PositionExclusion] {
        &self.excluded
    }

    pub fn fallback_count(&self) -> usize {
        self.valuations
            .iter()
            .filter(|v| v.price_source == PriceSource::AvgCostFallback)
            .count()
    }
}

struct HoldingAccumulator {
    value: Decimal,
    price_source: PriceSource,
}

/// Converts raw positions into normalized weights.
pub struct WeightCalculator;

impl WeightCalculator {
    pub fn compute(positions: &[Position], mode: WeightMode) -> Result<Weights, WeightError> {
        let mut valuations = Vec::new();
        let mut excluded = Vec::new();
        let mut by_holding: BTreeMap<HoldingKey, HoldingAccumulator> = BTreeMap::new();

        for position in positions {
            position.validate()?;

            let valuation = match position.valuation()? {
                ValuationOutcome::Valued(v) => v,
                ValuationOutcome::Excluded(reason) => {
                    excluded.push(PositionExclusion {
                        asset_id: position.asset_id.clone(),
                        reason,
                    });
                    continue;
                }
            };

            let acc = by_holding
                .entry(HoldingKey::of(position))
                .or_insert_with(|| HoldingAccumulator {
                    value: Decimal::zero(),
                    price_source: PriceSource::Live,
                });
            acc.value = acc.value.checked_add(valuation.value).ok_or_else(|| {
                DefinitionError::ValueOverflow {
                    asset: position.asset_id.clone(),
                    quantity: "aggregated value",
                }
            })?;
            if valuation.price_source == PriceSource::AvgCostFallback {
                acc.price_source = PriceSource::AvgCostFallback;
            }
            valuations.push(valuation);
        }

        // Offsetting positions in the same holding carry no exposure.
        by_holding.retain(|key, acc| {
            if acc.value.is_zero() {
                excluded.push(PositionExclusion {
                    asset_id: key.asset_id.clone(),
                    reason: PositionExclusionReason::ZeroValue,
                });
                false
            } else {
                true
            }
        });

        if by_holding.is_empty() {
            return Err(WeightError::DegenerateInput {
                mode,
                detail: format!(
                    "no positions with a usable market value ({} excluded)",
                    excluded.len()
                ),
            });
        }

        let denominator = match mode {
            WeightMode::Gross => Decimal::checked_sum(by_holding.values().map(|a| a.value.abs())),
            WeightMode::Net => Decimal::checked_sum(by_holding.values().map(|a| a.value)),
        }
        .ok_or_else(|| WeightError::DegenerateInput {
            mode,
            detail: "total position value exceeds the supported decimal range".to_string(),
        })?;

        if denominator.is_zero() {
            let assets: Vec<&str> = by_holding.keys().map(|k| k.asset_id.as_str()).collect();
            return Err(WeightError::DegenerateInput {
                mode,
                detail: format!(
                    "position values of [{}] sum to zero",
                    assets.join(", ")
                ),
            });
        }

        let mut entries = BTreeMap::new();
        for (key, acc) in by_holding {
            let weight = acc
                .value
                .checked_div(denominator)
                .ok_or_else(|| WeightError::DegenerateInput {
                    mode,
                    detail: format!("weight of {} is not representable", key.asset_id),
                })?;
            let entry = WeightEntry {
                asset_id: key.asset_id.clone(),
                price_key: key.price_key.clone(),
                weight,
                value: acc.value,
                price_source: acc.price_source,
                currency: key.currency.clone(),
            };
            entries.insert(key, entry);
        }

        Ok(Weights {
            mode,
            entries,
            valuations,
            excluded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn pos(asset: &str, qty: &str, px: &str) -> Position {
        Position::new(AssetId::new(asset), d(qty), d(px))
    }

    fn close_to(a: Decimal, b: Decimal) -> bool {
        (a - b).abs() < d("0.000000001")
    }

    #[test]
    fn test_gross_weights_sum_abs_to_one() {
        let positions = vec![pos("A", "1", "100"), pos("B", "-1", "50")];
        let weights = WeightCalculator::compute(&positions, WeightMode::Gross).unwrap();

        let a = weights.get(&AssetId::new("A")).unwrap().weight;
        let b = weights.get(&AssetId::new("B")).unwrap().weight;
        assert!(close_to(a, d("0.6666666667")));
        assert!(close_to(b, d("-0.3333333333")));

        let total: Decimal = weights.iter().map(|e| e.weight.abs()).sum();
        assert!(close_to(total, Decimal::one()));
    }

    #[test]
    fn test_net_weights_sum_to_one() {
        let positions = vec![pos("A", "1", "100"), pos("B", "-1", "50")];
        let weights = WeightCalculator::compute(&positions, WeightMode::Net).unwrap();

        assert_eq!(weights.get(&AssetId::new("A")).unwrap().weight, d("2"));
        assert_eq!(weights.get(&AssetId::new("B")).unwrap().weight, d("-1"));
        let total: Decimal = weights.iter().map(|e| e.weight).sum();
        assert_eq!(total, Decimal::one());
    }

    #[test]
    fn test_net_offsetting_book_is_degenerate() {
        let positions = vec![pos("A", "1", "100"), pos("B", "-2", "50")];
        let err = WeightCalculator::compute(&positions, WeightMode::Net).unwrap_err();
        match err {
            WeightError::DegenerateInput { mode, detail } => {
                assert_eq!(mode, WeightMode::Net);
                assert!(detail.contains("A, B"));
            }
            other => panic!("expected DegenerateInput, got {other:?}"),
        }
    }

    #[test]
    fn test_gross_without_usable_positions_is_degenerate() {
        let positions = vec![pos("A", "0", "100"), pos("B", "3", "1").without_price()];
        let err = WeightCalculator::compute(&positions, WeightMode::Gross).unwrap_err();
        assert!(matches!(err, WeightError::DegenerateInput { .. }));
    }

    #[test]
    fn test_empty_book_is_degenerate() {
        let err = WeightCalculator::compute(&[], WeightMode::Gross).unwrap_err();
        assert!(matches!(err, WeightError::DegenerateInput { .. }));
    }

    #[test]
    fn test_zero_quantity_and_unpriced_positions_are_recorded() {
        let positions = vec![
            pos("A", "1", "100"),
            pos("B", "0", "50"),
            pos("C", "5", "1").without_price(),
        ];
        let weights = WeightCalculator::compute(&positions, WeightMode::Gross).unwrap();

        assert_eq!(weights.len(), 1);
        assert_eq!(weights.get(&AssetId::new("A")).unwrap().weight, Decimal::one());
        assert_eq!(
            weights.excluded(),
            &[
                PositionExclusion {
                    asset_id: AssetId::new("B"),
                    reason: PositionExclusionReason::ZeroQuantity,
                },
                PositionExclusion {
                    asset_id: AssetId::new("C"),
                    reason: PositionExclusionReason::NoMarketValue,
                },
            ]
        );
    }

    #[test]
    fn test_avg_cost_fallback_is_recorded_per_position() {
        let positions = vec![
            pos("A", "1", "100"),
            pos("B", "2", "1").without_price().with_avg_cost(d("50")),
        ];
        let weights = WeightCalculator::compute(&positions, WeightMode::Gross).unwrap();

        assert_eq!(weights.fallback_count(), 1);
        assert_eq!(
            weights.get(&AssetId::new("B")).unwrap().price_source,
            PriceSource::AvgCostFallback
        );
        assert_eq!(weights.get(&AssetId::new("B")).unwrap().weight, d("0.5"));
    }

    #[test]
    fn test_positions_in_same_asset_are_aggregated() {
        let positions = vec![
            pos("A", "1", "100"),
            pos("A", "1", "100"),
            pos("B", "2", "100"),
        ];
        let weights = WeightCalculator::compute(&positions, WeightMode::Gross).unwrap();
        assert_eq!(weights.len(), 2);
        assert_eq!(weights.get(&AssetId::new("A")).unwrap().weight, d("0.5"));
        assert_eq!(weights.valuations().len(), 3);
    }

    #[test]
    fn test_asset_netting_to_zero_is_excluded() {
        let positions = vec![
            pos("A", "1", "100"),
            pos("A", "-1", "100"),
            pos("B", "2", "100"),
        ];
        let weights = WeightCalculator::compute(&positions, WeightMode::Gross).unwrap();
        assert_eq!(weights.len(), 1);
        assert_eq!(weights.excluded()[0].reason, PositionExclusionReason::ZeroValue);
    }

    #[test]
    fn test_invalid_multiplier_is_a_definition_error() {
        let positions = vec![pos("ES", "1", "100").with_multiplier(d("-50"))];
        let err = WeightCalculator::compute(&positions, WeightMode::Gross).unwrap_err();
        assert!(matches!(err, WeightError::Definition(_)));
    }

    #[test]
    fn test_weight_mode_from_str() {
        assert_eq!("GROSS".parse::<WeightMode>(), Ok(WeightMode::Gross));
        assert_eq!(" net ".parse::<WeightMode>(), Ok(WeightMode::Net));
        assert!("long".parse::<WeightMode>().is_err());
    }

    #[test]
    fn test_same_asset_in_two_currencies_stays_split() {
        let positions = vec![
            pos("MSFT", "1", "100").with_currency(Currency::new("USD")),
            pos("MSFT", "1", "100").with_currency(Currency::new("CAD")),
            pos("MSFT", "1", "100").with_currency(Currency::new("CAD")),
        ];
        let weights = WeightCalculator::compute(&positions, WeightMode::Gross).unwrap();

        assert_eq!(weights.len(), 2);
        assert!(weights.get(&AssetId::new("MSFT")).is_none());
        let split: Vec<(Option<&str>, Decimal)> = weights
            .holdings_of(&AssetId::new("MSFT"))
            .map(|e| (e.currency.as_ref().map(|c| c.as_str()), e.weight))
            .collect();
        assert_eq!(split.len(), 2);
        assert!(split.iter().any(|(c, w)| *c == Some("CAD") && close_to(*w, d("0.6666666667"))));
        assert!(split.iter().any(|(c, w)| *c == Some("USD") && close_to(*w, d("0.3333333333"))));
    }

    #[test]
    fn test_price_key_carried_on_entry() {
        let positions = vec![pos("ESM6", "1", "5000")
            .with_multiplier(d("50"))
            .with_price_key(AssetId::new("ES"))];
        let weights = WeightCalculator::compute(&positions, WeightMode::Gross).unwrap();
        assert_eq!(
            weights.get(&AssetId::new("ESM6")).unwrap().price_key,
            AssetId::new("ES")
        );
    }

    #[test]
    fn test_oversized_position_is_rejected_not_panicking() {
        let big = d("10000000000000000");
        let positions = vec![pos("A", "1", "100"), Position::new(AssetId::new("B"), big, big)];
        match WeightCalculator::compute(&positions, WeightMode::Gross) {
            Err(WeightError::Definition(DefinitionError::ValueOverflow { asset, .. })) => {
                assert_eq!(asset, AssetId::new("B"))
            }
            other => panic!("expected ValueOverflow, got {other:?}"),
        }
    }

    #[test]
    fn test_total_exposure_overflow_is_degenerate() {
        let half_max = "50000000000000000000000000000";
        let positions = vec![pos("A", "1", half_max), pos("B", "1", half_max)];
        assert!(matches!(
            WeightCalculator::compute(&positions, WeightMode::Gross),
            Err(WeightError::DegenerateInput { .. })
        ));
    }
}

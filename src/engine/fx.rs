//! Currency translation of local-currency asset returns.

use super::price_index::PriceIndex;
use crate::domain::{AssetId, Currency, Decimal, Scenario};
use serde::Serialize;

/// How an asset's local return was converted into the base currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "treatment", rename_all = "snake_case")]
pub enum FxTreatment {
    /// Asset has no currency, or it already is the base currency.
    NotRequired,
    /// Translated using the window return of `pair`.
    #[serde(rename_all = "camelCase")]
    Applied { pair: AssetId, fx_return: Decimal },
    /// No FX series covers the window; the local return is used as-is.
    Unavailable,
}

impl FxTreatment {
    /// Compose a local return with the FX move: `(1 + local)(1 + fx) - 1`.
    ///
    /// `None` if the product is not representable.
    pub fn translate(&self, local_return: Decimal) -> Option<Decimal> {
        match self {
            FxTreatment::Applied { fx_return, .. } => {
                let growth = Decimal::one().checked_add(local_return)?;
                let fx_growth = Decimal::one().checked_add(*fx_return)?;
                growth.checked_mul(fx_growth)?.checked_sub(Decimal::one())
            }
            FxTreatment::NotRequired | FxTreatment::Unavailable => Some(local_return),
        }
    }
}

/// Looks up FX moves for a fixed base currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FxTranslator {
    base: Currency,
}

impl FxTranslator {
    pub fn new(base: Currency) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &Currency {
        &self.base
    }

    /// FX treatment for an asset quoted in `currency` over `scenario`.
    ///
    /// Prefers a direct `{CCY}{BASE}` series; falls back to inverting `{BASE}{CCY}`.
    pub fn treatment(
        &self,
        index: &PriceIndex,
        currency: Option<&Currency>,
        scenario: &Scenario,
    ) -> FxTreatment {
        let Some(ccy) = currency else {
            return FxTreatment::NotRequired;
        };
        if *ccy == self.base {
            return FxTreatment::NotRequired;
        }

        let direct = ccy.pair_with(&self.base);
        if let Some((start, end)) = window_prices(index, &direct, scenario) {
            if let Some(ratio) = end.checked_div(start) {
                return FxTreatment::Applied {
                    pair: direct,
                    fx_return: ratio - Decimal::one(),
                };
            }
        }

        // 1 / (1 + inv) - 1 == start / end - 1 for the inverse quote.
        let inverse = self.base.pair_with(ccy);
        if let Some((start, end)) = window_prices(index, &inverse, scenario) {
            if let Some(ratio) = start.checked_div(end) {
                return FxTreatment::Applied {
                    pair: inverse,
                    fx_return: ratio - Decimal::one(),
                };
            }
        }

        tracing::debug!(
            currency = %ccy,
            base = %self.base,
            scenario = %scenario.id(),
            "No FX coverage, using local return"
        );
        FxTreatment::Unavailable
    }
}

fn window_prices(
    index: &PriceIndex,
    pair: &AssetId,
    scenario: &Scenario,
) -> Option<(Decimal, Decimal)> {
    let start = index.resolve(pair, scenario.start_date()).point()?;
    let end = index.resolve(pair, scenario.end_date()).point()?;
    Some((start.price, end.price))
}

use super::fx::FxTranslator;
use super::price_index::PriceIndex;
use super::weights::Weights;
use super::{
    AssetExclusion, AssetReturn, EvaluationError, ExclusionReason, MissingBoundary, ScenarioResult,
};
use crate::domain::{AssetId, Currency, Decimal, Scenario};

/// Knobs that change how a scenario is scored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationPolicy {
    /// Rescale included weights to `Σ|w| = 1` over the covered subset.
    /// Off by default: uncovered assets simply contribute nothing.
    pub renormalize: bool,
    /// Translate non-base-currency returns through FX series.
    pub base_currency: Option<Currency>,
}

/// Replays one scenario window over fixed weights.
#[derive(Debug, Clone, Default)]
pub struct ScenarioEvaluator {
    renormalize: bool,
    fx: Option<FxTranslator>,
}

impl ScenarioEvaluator {
    pub fn new(policy: EvaluationPolicy) -> Self {
        Self {
            renormalize: policy.renormalize,
            fx: policy.base_currency.map(FxTranslator::new),
        }
    }

    pub fn evaluate(
        &self,
        scenario: &Scenario,
        weights: &Weights,
        index: &PriceIndex,
    ) -> Result<ScenarioResult, EvaluationError> {
        let overflow = |asset: &AssetId, quantity: &'static str| EvaluationError::Overflow {
            scenario: scenario.id().clone(),
            asset: asset.clone(),
            quantity,
        };

        let mut assets = Vec::with_capacity(weights.len());
        let mut excluded = Vec::new();

        for entry in weights.iter() {
            let price_key = index.series_key(&entry.price_key);
            let end = index.resolve(&price_key, scenario.end_date()).point();
            let start = index.resolve(&price_key, scenario.start_date()).point();

            let (start_pt, end_pt) = match (start, end) {
                (Some(s), Some(e)) => (s, e),
                _ => {
                    let missing = if end.is_none() {
                        MissingBoundary::Both
                    } else {
                        MissingBoundary::Start
                    };
                    excluded.push(AssetExclusion {
                        asset_id: entry.asset_id.clone(),
                        currency: entry.currency.clone(),
                        reason: ExclusionReason::NoHistoricalCoverage { missing },
                    });
                    assets.push(AssetReturn {
                        asset_id: entry.asset_id.clone(),
                        currency: entry.currency.clone(),
                        price_key,
                        weight: entry.weight,
                        effective_weight: entry.weight,
                        start,
                        end,
                        local_return: None,
                        asset_return: None,
                        fx: None,
                        contribution: None,
                        included: false,
                    });
                    continue;
                }
            };

            // Series prices are validated positive, so only overflow can fail here.
            let local_return = end_pt
                .price
                .checked_div(start_pt.price)
                .and_then(|ratio| ratio.checked_sub(Decimal::one()))
                .ok_or_else(|| overflow(&entry.asset_id, "local return"))?;

            let (asset_return, fx) = match &self.fx {
                Some(translator) => {
                    let treatment =
                        translator.treatment(index, entry.currency.as_ref(), scenario);
                    let translated = treatment
                        .translate(local_return)
                        .ok_or_else(|| overflow(&entry.asset_id, "translated return"))?;
                    (translated, Some(treatment))
                }
                None => (local_return, None),
            };

            assets.push(AssetReturn {
                asset_id: entry.asset_id.clone(),
                currency: entry.currency.clone(),
                price_key,
                weight: entry.weight,
                effective_weight: entry.weight,
                start: Some(start_pt),
                end: Some(end_pt),
                local_return: Some(local_return),
                asset_return: Some(asset_return),
                fx,
                contribution: None,
                included: true,
            });
        }

        let scale = if self.renormalize {
            let mut covered = Decimal::zero();
            for asset in assets.iter().filter(|a| a.included) {
                covered = covered
                    .checked_add(asset.weight.abs())
                    .ok_or_else(|| overflow(&asset.asset_id, "covered weight"))?;
            }
            Some(covered)
        } else {
            None
        };

        let mut portfolio_return = Decimal::zero();
        for asset in assets.iter_mut().filter(|a| a.included) {
            if let Some(effective) = scale.and_then(|s| asset.weight.checked_div(s)) {
                asset.effective_weight = effective;
            }
            if let Some(r) = asset.asset_return {
                let contribution = asset
                    .effective_weight
                    .checked_mul(r)
                    .ok_or_else(|| overflow(&asset.asset_id, "contribution"))?;
                asset.contribution = Some(contribution);
                portfolio_return = portfolio_return
                    .checked_add(contribution)
                    .ok_or_else(|| overflow(&asset.asset_id, "portfolio return"))?;
            }
        }

        let fully_excluded = !assets.iter().any(|a| a.included);

        tracing::debug!(
            scenario = %scenario.id(),
            included = assets.len() - excluded.len(),
            excluded = excluded.len(),
            portfolio_return = %portfolio_return,
            "Scenario evaluated"
        );

        Ok(ScenarioResult {
            scenario: scenario.clone(),
            portfolio_return,
            assets,
            excluded,
            fully_excluded,
        })
    }

    /// Evaluate each scenario independently, preserving input order.
    pub fn evaluate_all(
        &self,
        scenarios: &[Scenario],
        weights: &Weights,
        index: &PriceIndex,
    ) -> Vec<Result<ScenarioResult, EvaluationError>> {
        scenarios
            .iter()
            .map(|s| self.evaluate(s, weights, index))
            .collect()
    }
}

use super::{AssetReturn, ScenarioResult};
use crate::domain::Decimal;
use std::cmp::Ordering;

/// A scenario result with its severity rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedScenario {
    /// 1-based; 1 is the worst scenario.
    pub rank: usize,
    pub result: ScenarioResult,
    /// False when the result is fully excluded or has fewer included assets
    /// than the ranker's coverage threshold.
    pub informative: bool,
}

/// Orders scenario results by severity.
#[derive(Debug, Clone)]
pub struct ScenarioRanker {
    min_assets_required: usize,
}

impl Default for ScenarioRanker {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ScenarioRanker {
    pub fn new(min_assets_required: usize) -> Self {
        Self {
            min_assets_required: min_assets_required.max(1),
        }
    }

    /// Worst (most negative) first, ties by scenario id; fully excluded results last.
    pub fn rank(&self, mut results: Vec<ScenarioResult>) -> Vec<RankedScenario> {
        results.sort_by(compare_severity);
        results
            .into_iter()
            .enumerate()
            .map(|(i, result)| {
                let informative =
                    !result.fully_excluded && result.included_count() >= self.min_assets_required;
                RankedScenario {
                    rank: i + 1,
                    result,
                    informative,
                }
            })
            .collect()
    }

    /// Included assets by contribution, most negative first; ties by asset id, then currency.
    pub fn contributions_ascending(result: &ScenarioResult) -> Vec<&AssetReturn> {
        let mut ordered: Vec<(&AssetReturn, Decimal)> = result
            .included()
            .filter_map(|a| a.contribution.map(|c| (a, c)))
            .collect();
        ordered.sort_by(|(a, ca), (b, cb)| {
            ca.cmp(cb)
                .then_with(|| a.asset_id.cmp(&b.asset_id))
                .then_with(|| a.currency.cmp(&b.currency))
        });
        ordered.into_iter().map(|(a, _)| a).collect()
    }

    /// At most `k` assets that lost money in the scenario, worst first.
    ///
    /// Flat or positive contributions are never reported as loss drivers.
    pub fn top_loss_drivers(result: &ScenarioResult, k: usize) -> Vec<&AssetReturn> {
        Self::contributions_ascending(result)
            .into_iter()
            .filter(|a| a.contribution.is_some_and(|c| c.is_negative()))
            .take(k)
            .collect()
    }
}

fn compare_severity(a: &ScenarioResult, b: &ScenarioResult) -> Ordering {
    a.fully_excluded
        .cmp(&b.fully_excluded)
        .then_with(|| {
            if a.fully_excluded {
                Ordering::Equal
            } else {
                a.portfolio_return.cmp(&b.portfolio_return)
            }
        })
        .then_with(|| a.scenario.id().cmp(b.scenario.id()))
}

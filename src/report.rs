//! Shapes ranked scenario results into the externally visible tables.
//!
//! This is the only place numeric output is rounded; everything upstream
//! works at full precision.

use crate::domain::{
    AssetId, Currency, Decimal, PositionExclusionReason, PriceSource, ScenarioId,
};
use crate::engine::{FxTreatment, RankedScenario, ScenarioRanker, WeightMode, Weights};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub rank: usize,
    pub scenario_id: ScenarioId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub portfolio_return: Decimal,
    pub fully_excluded: bool,
    pub informative: bool,
    pub included_asset_count: usize,
    pub excluded_asset_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionRow {
    pub scenario_id: ScenarioId,
    pub asset_id: AssetId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
    /// Series the boundary prices came from.
    pub price_key: AssetId,
    pub weight: Decimal,
    pub asset_return: Decimal,
    pub contribution: Decimal,
    pub start_date: NaiveDate,
    pub start_price: Decimal,
    pub end_date: NaiveDate,
    pub end_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fx: Option<FxTreatment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LossDriverRow {
    pub scenario_id: ScenarioId,
    pub asset_id: AssetId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
    pub contribution: Decimal,
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExclusionRow {
    pub scenario_id: ScenarioId,
    pub asset_id: AssetId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRow {
    pub asset_id: AssetId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
    pub value: Decimal,
    pub price_source: PriceSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedPositionRow {
    pub asset_id: AssetId,
    pub reason: PositionExclusionReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightRow {
    pub asset_id: AssetId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
    pub weight: Decimal,
    pub price_source: PriceSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedScenarioRow {
    pub scenario_id: ScenarioId,
    pub reason: String,
}

/// Every table produced by one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub weight_mode: WeightMode,
    pub summary: Vec<SummaryRow>,
    pub contributions: Vec<ContributionRow>,
    pub loss_drivers: Vec<LossDriverRow>,
    pub exclusions: Vec<ExclusionRow>,
    pub positions: Vec<PositionRow>,
    pub excluded_positions: Vec<ExcludedPositionRow>,
    pub weights: Vec<WeightRow>,
    pub rejected_scenarios: Vec<RejectedScenarioRow>,
}

#[derive(Debug, Clone)]
pub struct ReportAssembler {
    driver_count: usize,
    precision: Option<u32>,
}

impl ReportAssembler {
    pub fn new(driver_count: usize, precision: Option<u32>) -> Self {
        Self {
            driver_count,
            precision,
        }
    }

    fn fmt(&self, value: Decimal) -> Decimal {
        match self.precision {
            Some(dp) => value.round_dp(dp),
            None => value,
        }
    }

    pub fn assemble(
        &self,
        weights: &Weights,
        ranked: &[RankedScenario],
        rejected: &[RejectedScenarioRow],
    ) -> Report {
        let mut summary = Vec::with_capacity(ranked.len());
        let mut contributions = Vec::new();
        let mut loss_drivers = Vec::new();
        let mut exclusions = Vec::new();

        for entry in ranked {
            let result = &entry.result;
            let scenario_id = result.scenario.id();

            summary.push(SummaryRow {
                rank: entry.rank,
                scenario_id: scenario_id.clone(),
                start_date: result.scenario.start_date(),
                end_date: result.scenario.end_date(),
                portfolio_return: self.fmt(result.portfolio_return),
                fully_excluded: result.fully_excluded,
                informative: entry.informative,
                included_asset_count: result.included_count(),
                excluded_asset_count: result.excluded_count(),
            });

            // Most negative contribution first, as in the loss drivers.
            for asset in ScenarioRanker::contributions_ascending(result) {
                let (Some(start), Some(end), Some(asset_return), Some(contribution)) =
                    (asset.start, asset.end, asset.asset_return, asset.contribution)
                else {
                    continue;
                };
                contributions.push(ContributionRow {
                    scenario_id: scenario_id.clone(),
                    asset_id: asset.asset_id.clone(),
                    currency: asset.currency.clone(),
                    price_key: asset.price_key.clone(),
                    weight: self.fmt(asset.effective_weight),
                    asset_return: self.fmt(asset_return),
                    contribution: self.fmt(contribution),
                    start_date: start.date,
                    start_price: start.price,
                    end_date: end.date,
                    end_price: end.price,
                    fx: asset.fx.clone(),
                });
            }

            let drivers = ScenarioRanker::top_loss_drivers(result, self.driver_count);
            for (i, asset) in drivers.iter().enumerate() {
                if let Some(contribution) = asset.contribution {
                    loss_drivers.push(LossDriverRow {
                        scenario_id: scenario_id.clone(),
                        asset_id: asset.asset_id.clone(),
                        currency: asset.currency.clone(),
                        contribution: self.fmt(contribution),
                        rank: i + 1,
                    });
                }
            }

            exclusions.extend(result.excluded.iter().map(|ex| ExclusionRow {
                scenario_id: scenario_id.clone(),
                asset_id: ex.asset_id.clone(),
                currency: ex.currency.clone(),
                reason: ex.reason.to_string(),
            }));
        }

        Report {
            weight_mode: weights.mode(),
            summary,
            contributions,
            loss_drivers,
            exclusions,
            positions: weights
                .valuations()
                .iter()
                .map(|v| PositionRow {
                    asset_id: v.asset_id.clone(),
                    currency: v.currency.clone(),
                    value: self.fmt(v.value),
                    price_source: v.price_source,
                })
                .collect(),
            excluded_positions: weights
                .excluded()
                .iter()
                .map(|ex| ExcludedPositionRow {
                    asset_id: ex.asset_id.clone(),
                    reason: ex.reason,
                })
                .collect(),
            weights: weights
                .iter()
                .map(|w| WeightRow {
                    asset_id: w.asset_id.clone(),
                    currency: w.currency.clone(),
                    weight: self.fmt(w.weight),
                    price_source: w.price_source,
                })
                .collect(),
            rejected_scenarios: rejected.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Position, PriceRecord, Scenario};
    use crate::engine::{PriceIndex, ScenarioEvaluator, WeightCalculator};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn fixture() -> (Weights, Vec<RankedScenario>) {
        let positions = vec![
            Position::new(AssetId::new("A"), d("2"), d("100")),
            Position::new(AssetId::new("B"), d("1"), d("100")),
            Position::new(AssetId::new("C"), d("0"), d("100")),
        ];
        let weights = WeightCalculator::compute(&positions, WeightMode::Gross).unwrap();
        let index = PriceIndex::from_records(&[
            PriceRecord::new(AssetId::new("A"), date(2020, 1, 2), d("100")),
            PriceRecord::new(AssetId::new("A"), date(2020, 2, 3), d("90")),
            PriceRecord::new(AssetId::new("B"), date(2020, 2, 3), d("30")),
        ])
        .unwrap();
        let scenarios = vec![
            Scenario::new(ScenarioId::new("EARLY"), date(2019, 1, 1), date(2019, 6, 1)).unwrap(),
            Scenario::new(ScenarioId::new("DROP"), date(2020, 1, 2), date(2020, 2, 3)).unwrap(),
        ];
        let results = ScenarioEvaluator::default()
            .evaluate_all(&scenarios, &weights, &index)
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        (weights, ScenarioRanker::default().rank(results))
    }

    #[test]
    fn test_summary_rows_follow_ranking() {
        let (weights, ranked) = fixture();
        let report = ReportAssembler::new(5, None).assemble(&weights, &ranked, &[]);

        assert_eq!(report.weight_mode, WeightMode::Gross);
        assert_eq!(report.summary.len(), 2);
        assert_eq!(report.summary[0].scenario_id, ScenarioId::new("DROP"));
        assert_eq!(report.summary[0].excluded_asset_count, 1);
        assert_eq!(report.summary[1].scenario_id, ScenarioId::new("EARLY"));
        assert!(report.summary[1].fully_excluded);
        assert_eq!(report.summary[1].excluded_asset_count, 2);
    }

    #[test]
    fn test_every_exclusion_is_reported() {
        let (weights, ranked) = fixture();
        let report = ReportAssembler::new(5, None).assemble(&weights, &ranked, &[]);

        assert_eq!(report.exclusions.len(), 3);
        assert!(report
            .exclusions
            .iter()
            .all(|e| e.reason.starts_with("no historical coverage")));
        assert_eq!(report.excluded_positions.len(), 1);
        assert_eq!(
            report.excluded_positions[0].reason,
            PositionExclusionReason::ZeroQuantity
        );
    }

    #[test]
    fn test_contribution_rows_only_for_included_assets() {
        let (weights, ranked) = fixture();
        let report = ReportAssembler::new(5, None).assemble(&weights, &ranked, &[]);

        assert_eq!(report.contributions.len(), 1);
        let row = &report.contributions[0];
        assert_eq!(row.asset_id, AssetId::new("A"));
        assert_eq!(row.asset_return, d("-0.1"));
        assert_eq!(row.start_price, d("100"));
        assert_eq!(row.end_price, d("90"));
    }

    #[test]
    fn test_precision_is_applied_only_to_output() {
        let (weights, ranked) = fixture();
        let report = ReportAssembler::new(5, Some(4)).assemble(&weights, &ranked, &[]);

        assert_eq!(report.weights[0].weight, d("0.6667"));
        assert_eq!(report.summary[0].portfolio_return, d("-0.0667"));
        // Upstream values stay at full precision.
        assert!(ranked[0].result.portfolio_return != d("-0.0667"));
    }

    #[test]
    fn test_loss_drivers_capped_at_k() {
        let (weights, ranked) = fixture();
        let report = ReportAssembler::new(0, None).assemble(&weights, &ranked, &[]);
        assert!(report.loss_drivers.is_empty());

        let report = ReportAssembler::new(3, None).assemble(&weights, &ranked, &[]);
        assert_eq!(report.loss_drivers.len(), 1);
        assert_eq!(report.loss_drivers[0].rank, 1);
    }

    #[test]
    fn test_rally_reports_no_loss_drivers() {
        let positions = vec![Position::new(AssetId::new("A"), d("1"), d("100"))];
        let weights = WeightCalculator::compute(&positions, WeightMode::Gross).unwrap();
        let index = PriceIndex::from_records(&[
            PriceRecord::new(AssetId::new("A"), date(2020, 3, 23), d("100")),
            PriceRecord::new(AssetId::new("A"), date(2020, 6, 8), d("130")),
        ])
        .unwrap();
        let scenario =
            Scenario::new(ScenarioId::new("RECOVERY"), date(2020, 3, 23), date(2020, 6, 8))
                .unwrap();
        let result = ScenarioEvaluator::default()
            .evaluate(&scenario, &weights, &index)
            .unwrap();
        let ranked = ScenarioRanker::default().rank(vec![result]);

        let report = ReportAssembler::new(5, None).assemble(&weights, &ranked, &[]);
        assert!(report.loss_drivers.is_empty());
        assert_eq!(report.contributions.len(), 1);
        assert_eq!(report.contributions[0].contribution, d("0.3"));
    }

    #[test]
    fn test_weight_mode_serializes_as_enum() {
        let (weights, ranked) = fixture();
        let report = ReportAssembler::new(5, None).assemble(&weights, &ranked, &[]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["weightMode"], "gross");
    }
}

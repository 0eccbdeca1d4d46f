use crate::datasource::{DataSource, DataSourceError};
use crate::domain::{
    Currency, DefinitionError, Position, PriceRecord, Scenario, ScenarioRecord,
};
use crate::engine::{
    EvaluationError, EvaluationPolicy, PriceIndex, ScenarioEvaluator, ScenarioRanker,
    WeightCalculator, WeightError, WeightMode,
};
use crate::report::{RejectedScenarioRow, Report, ReportAssembler};
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;

/// Parameters of a single stress run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub weight_mode: WeightMode,
    /// Loss drivers reported per scenario.
    pub driver_count: usize,
    pub renormalize: bool,
    pub min_assets_required: usize,
    pub base_currency: Option<Currency>,
    /// Scenarios starting before this date are dropped before evaluation.
    pub scenario_cutoff: Option<NaiveDate>,
    pub precision: Option<u32>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            weight_mode: WeightMode::Gross,
            driver_count: 5,
            renormalize: false,
            min_assets_required: 1,
            base_currency: None,
            scenario_cutoff: None,
            precision: None,
        }
    }
}

/// Fully loaded inputs of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StressInputs {
    pub positions: Vec<Position>,
    pub prices: Vec<PriceRecord>,
    pub scenarios: Vec<ScenarioRecord>,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error(transparent)]
    Weights(#[from] WeightError),
    #[error("failed to load inputs: {0}")]
    DataSource(#[from] DataSourceError),
    #[error("stress run aborted: {0}")]
    Aborted(String),
}

/// Replays every scenario in `inputs` and assembles the report.
pub fn run(inputs: &StressInputs, options: &RunOptions) -> Result<Report, RunError> {
    let candidates: Vec<&ScenarioRecord> = inputs
        .scenarios
        .iter()
        .filter(|s| options.scenario_cutoff.map_or(true, |cutoff| s.start_date >= cutoff))
        .collect();

    tracing::info!(
        total = inputs.scenarios.len(),
        kept = candidates.len(),
        cutoff = ?options.scenario_cutoff,
        "Scenario catalog filtered"
    );

    let mut scenarios = Vec::with_capacity(candidates.len());
    let mut rejected = Vec::new();
    for record in candidates {
        match Scenario::try_from(record.clone()) {
            Ok(scenario) => scenarios.push(scenario),
            Err(err) => {
                tracing::warn!(scenario = %record.scenario_id, error = %err, "Scenario rejected");
                rejected.push(RejectedScenarioRow {
                    scenario_id: record.scenario_id.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    let index = PriceIndex::from_records(&inputs.prices)?;
    let weights = WeightCalculator::compute(&inputs.positions, options.weight_mode)?;

    for ex in weights.excluded() {
        tracing::warn!(asset = %ex.asset_id, reason = %ex.reason, "Position excluded from weights");
    }
    if weights.fallback_count() > 0 {
        tracing::warn!(
            positions = weights.fallback_count(),
            "Positions valued at average cost (no live price)"
        );
    }

    let evaluator = ScenarioEvaluator::new(EvaluationPolicy {
        renormalize: options.renormalize,
        base_currency: options.base_currency.clone(),
    });
    let mut results = Vec::with_capacity(scenarios.len());
    for outcome in evaluator.evaluate_all(&scenarios, &weights, &index) {
        match outcome {
            Ok(result) => results.push(result),
            Err(err) => {
                let EvaluationError::Overflow { scenario, .. } = &err;
                tracing::warn!(scenario = %scenario, error = %err, "Scenario evaluation failed");
                rejected.push(RejectedScenarioRow {
                    scenario_id: scenario.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
    let ranked = ScenarioRanker::new(options.min_assets_required).rank(results);

    let fully_excluded = ranked.iter().filter(|r| r.result.fully_excluded).count();
    tracing::info!(
        scenarios = ranked.len(),
        rejected = rejected.len(),
        fully_excluded,
        assets = weights.len(),
        mode = %options.weight_mode,
        "Stress run complete"
    );

    Ok(ReportAssembler::new(options.driver_count, options.precision)
        .assemble(&weights, &ranked, &rejected))
}

/// Loads inputs from a data source, then runs.
#[derive(Debug, Clone)]
pub struct StressRunner {
    datasource: Arc<dyn DataSource>,
}

impl StressRunner {
    pub fn new(datasource: Arc<dyn DataSource>) -> Self {
        Self { datasource }
    }

    /// Fetch all three inputs concurrently.
    pub async fn load(&self) -> Result<StressInputs, DataSourceError> {
        let (positions, prices, scenarios) = futures::try_join!(
            self.datasource.fetch_positions(),
            self.datasource.fetch_prices(),
            self.datasource.fetch_scenarios(),
        )?;

        tracing::info!(
            positions = positions.len(),
            prices = prices.len(),
            scenarios = scenarios.len(),
            "Inputs loaded"
        );

        Ok(StressInputs {
            positions,
            prices,
            scenarios,
        })
    }

    pub async fn run(&self, options: RunOptions) -> Result<Report, RunError> {
        let inputs = self.load().await?;
        run_blocking(inputs, options).await
    }
}

/// Run the pure evaluation off the async executor.
pub async fn run_blocking(inputs: StressInputs, options: RunOptions) -> Result<Report, RunError> {
    tokio::task::spawn_blocking(move || run(&inputs, &options))
        .await
        .map_err(|e| RunError::Aborted(e.to_string()))?
}

//! Stress test endpoints.
//!
//! `GET` replays the configured data directory; `POST` evaluates inputs
//! supplied inline. Both accept the same run overrides.

use crate::api::AppState;
use crate::domain::{Currency, Position, PriceRecord, ScenarioRecord};
use crate::engine::WeightMode;
use crate::error::AppError;
use crate::orchestration::{run_blocking, RunOptions, StressInputs};
use crate::report::Report;
use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

/// Per-request overrides of the configured run options.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressOverrides {
    pub weight_mode: Option<WeightMode>,
    /// Loss drivers per scenario.
    pub k: Option<usize>,
    pub renormalize: Option<bool>,
    pub min_assets: Option<usize>,
    pub base_currency: Option<String>,
    pub cutoff: Option<NaiveDate>,
    pub precision: Option<u32>,
}

impl StressOverrides {
    fn apply(&self, mut options: RunOptions) -> Result<RunOptions, AppError> {
        if let Some(mode) = self.weight_mode {
            options.weight_mode = mode;
        }
        if let Some(k) = self.k {
            if k == 0 {
                return Err(AppError::BadRequest("k must be at least 1".into()));
            }
            options.driver_count = k;
        }
        if let Some(renormalize) = self.renormalize {
            options.renormalize = renormalize;
        }
        if let Some(min_assets) = self.min_assets {
            if min_assets == 0 {
                return Err(AppError::BadRequest("minAssets must be at least 1".into()));
            }
            options.min_assets_required = min_assets;
        }
        if let Some(ccy) = self.base_currency.as_deref().map(str::trim) {
            options.base_currency = (!ccy.is_empty()).then(|| Currency::new(ccy));
        }
        if let Some(cutoff) = self.cutoff {
            options.scenario_cutoff = Some(cutoff);
        }
        if let Some(precision) = self.precision {
            options.precision = Some(precision);
        }
        Ok(options)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressRequest {
    pub positions: Vec<Position>,
    pub prices: Vec<PriceRecord>,
    pub scenarios: Vec<ScenarioRecord>,
    #[serde(default)]
    pub options: StressOverrides,
}

pub async fn get_stress(
    Query(params): Query<StressOverrides>,
    State(state): State<AppState>,
) -> Result<Json<Report>, AppError> {
    let options = params.apply(state.config.run_options())?;
    let report = state.runner.run(options).await?;
    Ok(Json(report))
}

pub async fn post_stress(
    State(state): State<AppState>,
    Json(request): Json<StressRequest>,
) -> Result<Json<Report>, AppError> {
    let options = request.options.apply(state.config.run_options())?;

    for position in &request.positions {
        position
            .validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
    }

    let inputs = StressInputs {
        positions: request.positions,
        prices: request.prices,
        scenarios: request.scenarios,
    };
    let report = run_blocking(inputs, options).await?;
    Ok(Json(report))
}

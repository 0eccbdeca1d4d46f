use crate::domain::Currency;
use crate::engine::WeightMode;
use crate::orchestration::RunOptions;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    pub weight_mode: WeightMode,
    pub driver_count: usize,
    pub renormalize_weights: bool,
    pub min_assets_required: usize,
    pub base_currency: Option<Currency>,
    pub scenario_cutoff: Option<NaiveDate>,
    pub report_precision: Option<u32>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or(&env_map, "PORT", 8080u16, "must be a valid u16")?;

        let data_dir = env_map
            .get("DATA_DIR")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATA_DIR".to_string()))?;

        let weight_mode = match env_map.get("WEIGHT_MODE") {
            None => WeightMode::Gross,
            Some(raw) => WeightMode::from_str(raw).map_err(|_| {
                ConfigError::InvalidValue(
                    "WEIGHT_MODE".to_string(),
                    format!("must be gross or net, got {}", raw),
                )
            })?,
        };

        let driver_count = parse_or(&env_map, "DRIVER_COUNT", 5usize, "must be a valid usize")?;
        if driver_count == 0 {
            return Err(ConfigError::InvalidValue(
                "DRIVER_COUNT".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let renormalize_weights = match env_map
            .get("RENORMALIZE_WEIGHTS")
            .map(|s| s.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("false") | Some("0") => false,
            Some("true") | Some("1") => true,
            Some(other) => {
                return Err(ConfigError::InvalidValue(
                    "RENORMALIZE_WEIGHTS".to_string(),
                    format!("must be true or false, got {}", other),
                ))
            }
        };

        let min_assets_required =
            parse_or(&env_map, "MIN_ASSETS_REQUIRED", 1usize, "must be a valid usize")?;
        if min_assets_required == 0 {
            return Err(ConfigError::InvalidValue(
                "MIN_ASSETS_REQUIRED".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let base_currency = env_map
            .get("BASE_CURRENCY")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(Currency::new);

        let scenario_cutoff = env_map
            .get("SCENARIO_CUTOFF")
            .map(|raw| {
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
                    ConfigError::InvalidValue(
                        "SCENARIO_CUTOFF".to_string(),
                        "must be a YYYY-MM-DD date".to_string(),
                    )
                })
            })
            .transpose()?;

        let report_precision = env_map
            .get("REPORT_PRECISION")
            .map(|raw| {
                raw.trim().parse::<u32>().map_err(|_| {
                    ConfigError::InvalidValue(
                        "REPORT_PRECISION".to_string(),
                        "must be a valid u32".to_string(),
                    )
                })
            })
            .transpose()?;

        Ok(Config {
            port,
            data_dir,
            weight_mode,
            driver_count,
            renormalize_weights,
            min_assets_required,
            base_currency,
            scenario_cutoff,
            report_precision,
        })
    }

    /// Default run parameters derived from the environment.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            weight_mode: self.weight_mode,
            driver_count: self.driver_count,
            renormalize: self.renormalize_weights,
            min_assets_required: self.min_assets_required,
            base_currency: self.base_currency.clone(),
            scenario_cutoff: self.scenario_cutoff,
            precision: self.report_precision,
        }
    }
}

fn parse_or<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
    message: &str,
) -> Result<T, ConfigError> {
    match env_map.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), message.to_string())),
    }
}

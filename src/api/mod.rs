pub mod health;
pub mod stress;

use crate::config::Config;
use crate::orchestration::StressRunner;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub runner: Arc<StressRunner>,
}

impl AppState {
    pub fn new(config: Config, runner: Arc<StressRunner>) -> Self {
        Self { config, runner }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/v1/stress",
            get(stress::get_stress).post(stress::post_stress),
        )
        .layer(cors)
        .with_state(state)
}

use crate::api::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once the configured data directory is reachable.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let dir = &state.config.data_dir;
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "weightMode": state.config.weight_mode,
            })),
        ),
        _ => {
            tracing::warn!(data_dir = %dir, "Data directory unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({"status": "unavailable", "dataDir": dir})),
            )
        }
    }
}

// handlers/health.rs - GET /health

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use super::AppState;
use crate::database::DatabaseManager;
use crate::error::ApiError;

pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(&state.pool).await {
        Ok(()) => Ok(Json(json!({
            "success": true,
            "data": {
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            }
        }))),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            Err(ApiError::service_unavailable("Database unavailable"))
        }
    }
}

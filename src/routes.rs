use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use crate::aggregator::{AggregateError, Aggregator};

pub struct AppState {
    pub aggregator: Arc<Aggregator>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/admin/aggregate", post(trigger_aggregation))
        .route("/api/admin/aggregate/status", get(aggregation_status))
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_articles: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AggregateResponse {
    fn completed(new_articles: usize) -> Self {
        Self {
            success: true,
            message: Some(format!(
                "Aggregation completed. {} new articles added.",
                new_articles
            )),
            new_articles: Some(new_articles),
            error: None,
        }
    }

    fn failed(error: &str) -> Self {
        Self {
            success: false,
            message: None,
            new_articles: None,
            error: Some(error.to_string()),
        }
    }
}

// Custom error type
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.0.downcast_ref::<AggregateError>() {
            Some(AggregateError::AlreadyRunning) => (
                StatusCode::CONFLICT,
                Json(AggregateResponse::failed("Aggregation already in progress")),
            )
                .into_response(),
            None => {
                error!("Error during manual aggregation: {:#}", self.0);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(AggregateResponse::failed("Failed to aggregate content")),
                )
                    .into_response()
            }
        }
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

// Route handlers
pub async fn trigger_aggregation(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AggregateResponse>, AppError> {
    info!("Manual content aggregation triggered");

    // Spawned so a dropped request cannot cancel the run part way through
    let aggregator = state.aggregator.clone();
    let summary = tokio::spawn(async move { aggregator.aggregate_content().await }).await??;

    Ok(Json(AggregateResponse::completed(summary.total_inserted)))
}

pub async fn aggregation_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.aggregator.status().await)
}

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

use crate::model::{BannerResponse, HealthResponse};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::warn;

pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.gateway().health().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                store: Some("ok"),
                shortener: Some(if state.gateway().shortlinks().is_some() {
                    "configured"
                } else {
                    "missing"
                }),
                error: None,
            }),
        ),
        Err(error) => {
            warn!(error = %error, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy",
                    store: None,
                    shortener: None,
                    error: Some(error.to_string()),
                }),
            )
        }
    }
}

pub async fn root_handler() -> Json<BannerResponse> {
    Json(BannerResponse {
        service: "verigate",
        version: env!("CARGO_PKG_VERSION"),
    })
}

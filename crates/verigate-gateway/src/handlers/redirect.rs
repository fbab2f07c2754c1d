use super::render;
use crate::model::{RedirectQuery, StatusResponse};
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use tracing::info;

pub async fn redirect_handler(
    State(state): State<AppState>,
    Query(query): Query<RedirectQuery>,
) -> Response {
    let decision = state.gateway().resume(query.id.as_deref()).await;
    info!(state = decision.diagnostics.state, "redirect request decided");
    render(state.gateway(), decision)
}

/// Always answers ok; failures are only logged.
pub async fn mark_visited_handler(
    State(state): State<AppState>,
    Query(query): Query<RedirectQuery>,
) -> Json<StatusResponse> {
    state.gateway().mark_visited(query.id.as_deref()).await;
    Json(StatusResponse { status: "ok" })
}

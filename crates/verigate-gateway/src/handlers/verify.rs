use super::render;
use crate::model::VerifyQuery;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use tracing::info;

pub async fn telegram_handler(
    State(state): State<AppState>,
    Path((user_id, page_token)): Path<(String, String)>,
) -> Response {
    let decision = state.gateway().verify(&user_id, &page_token).await;
    info!(state = decision.diagnostics.state, "verification request decided");
    render(state.gateway(), decision)
}

/// Query-string form of [`telegram_handler`].
pub async fn verify_handler(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Response {
    let decision = state
        .gateway()
        .verify_query(query.user_id.as_deref(), query.token.as_deref())
        .await;
    info!(state = decision.diagnostics.state, "verification request decided");
    render(state.gateway(), decision)
}

use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::error::AppError;
use crate::handlers::{
    health_handler, mark_visited_handler, redirect_handler, root_handler, telegram_handler,
    verify_handler,
};
use crate::rate_limit::rate_limit;
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        let entry = Router::new()
            .route("/telegram/{user_id}/{page_token}", get(telegram_handler))
            .route("/verify", get(verify_handler))
            .route_layer(from_fn_with_state(state.limiter(), rate_limit));

        Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler))
            .route("/redirect", get(redirect_handler))
            .route("/mark-visited", get(mark_visited_handler))
            .merge(entry)
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "request handler panicked");
    AppError::Internal.into_response()
}

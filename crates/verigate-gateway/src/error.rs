use crate::diagnostics::Diagnostics;
use crate::page::message_page;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Externally visible failure of an HTTP request.
///
/// Messages are generic on purpose; details go to the log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("invalid input")]
    InvalidInput,
    /// Missing record, token mismatch, or an expired redirect page.
    #[error("invalid or expired")]
    NotFound,
    /// The verification session elapsed.
    #[error("verification session expired")]
    Gone,
    #[error("too many requests")]
    RateLimited { retry_after_secs: u64 },
    #[error("service temporarily unavailable")]
    Unavailable,
    #[error("service is not configured")]
    Misconfigured,
    #[error("internal error")]
    Internal,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Gone => StatusCode::GONE,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Misconfigured | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            AppError::InvalidInput => "Bad request",
            AppError::NotFound => "Link not valid",
            AppError::Gone => "Link expired",
            AppError::RateLimited { .. } => "Slow down",
            AppError::Unavailable | AppError::Misconfigured | AppError::Internal => {
                "Something went wrong"
            }
        }
    }

    fn message(&self) -> &'static str {
        match self {
            AppError::InvalidInput => "The link is malformed.",
            AppError::NotFound => "This link is invalid or expired.",
            AppError::Gone => "This verification link has expired. Request a new one.",
            AppError::RateLimited { .. } => "Too many requests. Try again later.",
            AppError::Unavailable => "The service is temporarily unavailable. Try again later.",
            AppError::Misconfigured | AppError::Internal => "Please try again later.",
        }
    }

    /// Renders the error page, attaching `diagnostics` when given.
    pub fn into_response_with(self, diagnostics: Option<&Diagnostics>) -> Response {
        let mut response = (
            self.status(),
            message_page(self.title(), self.message(), diagnostics),
        )
            .into_response();
        if let AppError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.into_response_with(None)
    }
}

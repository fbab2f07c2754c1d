mod health;
mod redirect;
mod verify;

pub use health::{health_handler, root_handler};
pub use redirect::{mark_visited_handler, redirect_handler};
pub use verify::{telegram_handler, verify_handler};

use crate::error::AppError;
use crate::gateway::{Decision, ExpiryClock, Outcome, RedirectGateway, ServiceFault};
use crate::page::{redirect_page, verified_page};
use axum::response::{IntoResponse, Response};

/// Maps a gateway decision onto the HTTP response.
fn render(gateway: &RedirectGateway, decision: Decision) -> Response {
    let Decision {
        outcome,
        diagnostics,
    } = decision;
    let diagnostics = gateway.config().debug.then_some(&diagnostics);

    let error = match outcome {
        Outcome::Redirecting(target) => {
            return redirect_page(&target.url, gateway.config().redirect_delay_secs, diagnostics)
                .into_response();
        }
        Outcome::Verified => return verified_page(diagnostics).into_response(),
        Outcome::Invalid => AppError::InvalidInput,
        Outcome::Rejected | Outcome::NotFound => AppError::NotFound,
        Outcome::Expired(ExpiryClock::Session) => AppError::Gone,
        Outcome::Expired(ExpiryClock::RedirectPage) => AppError::NotFound,
        Outcome::ServiceError(ServiceFault::Misconfigured(_)) => AppError::Misconfigured,
        Outcome::ServiceError(ServiceFault::Store(_) | ServiceFault::Shortener(_)) => {
            AppError::Unavailable
        }
    };
    error.into_response_with(diagnostics)
}

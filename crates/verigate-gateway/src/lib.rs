//! HTTP gateway that gates a bot deep link behind a verification check.
//!
//! The [`RedirectGateway`] state machine decides, per request, whether the
//! subject is already verified, whether its page token is still valid, and
//! otherwise produces a shortened redirect target. The axum [`App`] exposes
//! it over HTTP behind a per-client [`RateLimiter`].

pub mod app;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod model;
pub mod page;
pub mod rate_limit;
pub mod state;

pub use app::App;
pub use config::{ConfigFault, GatewayConfig};
pub use diagnostics::Diagnostics;
pub use error::AppError;
pub use gateway::{Decision, ExpiryClock, Outcome, RedirectGateway, RedirectTarget, ServiceFault};
pub use rate_limit::{Admission, RateLimitSettings, RateLimiter};
pub use state::AppState;

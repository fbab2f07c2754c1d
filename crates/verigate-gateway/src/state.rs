use crate::gateway::RedirectGateway;
use crate::rate_limit::RateLimiter;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    gateway: Arc<RedirectGateway>,
    limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(gateway: RedirectGateway, limiter: RateLimiter) -> Self {
        Self {
            gateway: Arc::new(gateway),
            limiter: Arc::new(limiter),
        }
    }

    pub fn gateway(&self) -> &RedirectGateway {
        &self.gateway
    }

    pub fn limiter(&self) -> Arc<RateLimiter> {
        self.limiter.clone()
    }
}

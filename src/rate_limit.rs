/// Rate limiting middleware
///
/// A single global limiter keeps the request volume bounded; in particular it
/// means the redemption endpoint is already throttled before its own
/// serialization kicks in.
use crate::{context::AppContext, error::ServiceError};
use axum::{extract::{Request, State}, middleware::Next, response::Response};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc};

pub use crate::config::RateLimitConfig;

/// Rate limiter manager
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    global: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let rps = NonZeroU32::new(config.requests_per_second)
            .unwrap_or(NonZeroU32::new(50).unwrap());
        let burst = NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::new(100).unwrap());

        let quota = Quota::per_second(rps).allow_burst(burst);

        Self {
            enabled: config.enabled,
            global: Arc::new(GovernorLimiter::direct(quota)),
        }
    }

    /// Check the global quota
    pub fn check(&self) -> bool {
        !self.enabled || self.global.check().is_ok()
    }
}

/// Axum middleware applying the global limiter
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    req: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    if !ctx.rate_limiter.check() {
        tracing::warn!("request rejected by rate limiter");
        return Err(ServiceError::RateLimitExceeded);
    }

    Ok(next.run(req).await)
}

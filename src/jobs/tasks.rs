/// Background task implementations
use crate::{context::AppContext, error::ServiceResult};

/// Cleanup expired sessions
pub async fn cleanup_expired_sessions(ctx: &AppContext) -> ServiceResult<u64> {
    ctx.account_manager.cleanup_expired_sessions().await
}

/// Drop purchase windows whose expiry has passed
pub fn sweep_expired_windows(ctx: &AppContext) -> usize {
    ctx.window_store.sweep_expired()
}

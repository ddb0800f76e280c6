/// Background task implementations
use crate::{context::AppContext, error::ApiResult};

/// Drop expired in-memory security state
pub fn prune_security_state(ctx: &AppContext) -> usize {
    ctx.security.prune()
}

/// Clear approval tokens past their expiry
pub async fn clear_expired_approval_tokens(ctx: &AppContext) -> ApiResult<u64> {
    ctx.account_manager.clear_expired_tokens().await
}

/// Health check - verify the store is reachable
pub async fn health_check(ctx: &AppContext) -> ApiResult<()> {
    ctx.store.ping().await
}

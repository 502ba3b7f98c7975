/// Account view endpoint
///
/// Read-only; deliberately not gated by the redemption lock, so account
/// lookups stay responsive while a purchase is in flight.
use crate::{auth::AuthContext, context::AppContext, error::ServiceResult};
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/account", get(get_account))
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub account_id: String,
    pub username: String,
    pub email: String,
    pub tier: crate::db::models::AccountTier,
    pub balance: f64,
}

/// Return the caller's account snapshot
async fn get_account(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ServiceResult<Json<AccountResponse>> {
    let account = ctx.account_manager.get_account(&auth.account_id).await?;

    Ok(Json(AccountResponse {
        account_id: account.id,
        username: account.username,
        email: account.email,
        tier: account.tier,
        balance: account.balance,
    }))
}

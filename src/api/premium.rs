/// Premium purchase endpoints
///
/// Three operations: open a purchase window, redeem with a coupon, redeem
/// with cash. All state-machine logic lives in the coordinator; these
/// handlers only authenticate and translate.
use crate::{
    auth::AuthContext,
    context::AppContext,
    error::ServiceResult,
    premium::{PaymentMethod, PurchaseReceipt},
};
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/premium/start", post(start_purchase))
        .route("/api/premium/redeem/coupon", post(redeem_with_coupon))
        .route("/api/premium/redeem/cash", post(redeem_with_cash))
}

#[derive(Debug, Serialize)]
pub struct StartPurchaseResponse {
    pub message: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CouponRedeemRequest {
    pub coupon_code: String,
}

/// Open a purchase window for the caller
async fn start_purchase(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ServiceResult<Json<StartPurchaseResponse>> {
    let expires_at = ctx.window_store.open(&auth.account_id);

    Ok(Json(StartPurchaseResponse {
        message: "Premium purchase started, complete it before the window expires".to_string(),
        expires_at,
    }))
}

/// Redeem a coupon for the premium upgrade
async fn redeem_with_coupon(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<CouponRedeemRequest>,
) -> ServiceResult<Json<PurchaseReceipt>> {
    let receipt = ctx
        .coordinator
        .redeem(
            &auth.account_id,
            PaymentMethod::Coupon {
                code: req.coupon_code,
            },
        )
        .await?;

    Ok(Json(receipt))
}

/// Redeem cash balance for the premium upgrade
async fn redeem_with_cash(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ServiceResult<Json<PurchaseReceipt>> {
    let receipt = ctx
        .coordinator
        .redeem(&auth.account_id, PaymentMethod::Cash)
        .await?;

    Ok(Json(receipt))
}

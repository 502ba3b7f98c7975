/// Coupon listing and admin management endpoints
use crate::{
    auth::{AdminAuthContext, AuthContext},
    context::AppContext,
    db::models::Coupon,
    error::ServiceResult,
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/coupons", get(list_coupons))
        .route("/api/admin/coupons", post(create_coupon))
        .route("/api/admin/coupons/assign", post(assign_coupon))
}

#[derive(Debug, Deserialize)]
pub struct CreateCouponRequest {
    /// Explicit code; generated when absent
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignCouponRequest {
    pub coupon_id: String,
    /// Target account; omit to fan the coupon out to every account
    pub account_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AssignCouponResponse {
    pub assigned: u64,
}

/// List the caller's coupons
async fn list_coupons(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ServiceResult<Json<Vec<Coupon>>> {
    let coupons = ctx.coupon_manager.list_for_account(&auth.account_id).await?;
    Ok(Json(coupons))
}

/// Create a new coupon (admin)
async fn create_coupon(
    State(ctx): State<AppContext>,
    admin: AdminAuthContext,
    Json(req): Json<CreateCouponRequest>,
) -> ServiceResult<Json<Coupon>> {
    let coupon = ctx.coupon_manager.create(req.code).await?;

    tracing::info!(coupon_id = %coupon.id, admin = %admin.username, "coupon created");

    Ok(Json(coupon))
}

/// Assign a coupon to one account, or to all accounts (admin)
async fn assign_coupon(
    State(ctx): State<AppContext>,
    admin: AdminAuthContext,
    Json(req): Json<AssignCouponRequest>,
) -> ServiceResult<Json<AssignCouponResponse>> {
    let assigned = match req.account_id {
        Some(account_id) => {
            // Reject assignment to a nonexistent account up front
            ctx.account_manager.get_account(&account_id).await?;
            ctx.coupon_manager.assign(&req.coupon_id, &account_id).await?;
            1
        }
        None => ctx.coupon_manager.assign_to_all(&req.coupon_id).await?,
    };

    tracing::info!(
        coupon_id = %req.coupon_id,
        admin = %admin.username,
        assigned,
        "coupon assigned"
    );

    Ok(Json(AssignCouponResponse { assigned }))
}

/// Registration, login, and logout endpoints
use crate::{
    auth::AuthContext,
    context::AppContext,
    error::{ServiceError, ServiceResult},
};
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Build auth routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 30))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub account_id: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub account_id: String,
    pub access_token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// Register a new account
async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> ServiceResult<Json<RegisterResponse>> {
    req.validate()
        .map_err(|e| ServiceError::Validation(e.to_string()))?;

    let account = ctx
        .account_manager
        .register(req.username, req.email, req.password)
        .await?;

    tracing::info!(account_id = %account.id, "account registered");

    Ok(Json(RegisterResponse {
        account_id: account.id,
        username: account.username,
    }))
}

/// Login and create a session
async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> ServiceResult<Json<LoginResponse>> {
    let (account, session) = ctx.account_manager.login(&req.email, &req.password).await?;

    Ok(Json(LoginResponse {
        account_id: account.id,
        access_token: session.token,
        expires_at: session.expires_at,
    }))
}

/// Logout, deleting the caller's session
async fn logout(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ServiceResult<Json<serde_json::Value>> {
    ctx.account_manager.delete_session(&auth.token).await?;

    Ok(Json(serde_json::json!({ "message": "Logged out" })))
}

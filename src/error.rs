/// Unified error types for the Chorale premium service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Account already holds the premium tier
    #[error("Account is already premium")]
    AlreadyPremium,

    /// No purchase window is open, or it has expired
    #[error("Purchase window is missing or expired")]
    PurchaseWindowInvalid,

    /// Coupon code missing or malformed
    #[error("Invalid coupon code")]
    InvalidCouponCode,

    /// Coupon absent or owned by another account
    #[error("Coupon not found")]
    CouponNotFound,

    /// Coupon has already been redeemed
    #[error("Coupon has already been used")]
    CouponAlreadyUsed,

    /// Balance below the premium price
    #[error("Insufficient balance")]
    InsufficientBalance,

    /// The purchase transaction exceeded its deadline
    #[error("Purchase transaction timed out")]
    TransactionTimeout,

    /// The purchase transaction was rolled back
    #[error("Purchase transaction failed: {0}")]
    TransactionFailed(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g., duplicate coupon code)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert ServiceError to HTTP response
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ServiceError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
            ),
            ServiceError::Authorization(_) => {
                (StatusCode::FORBIDDEN, "Forbidden", self.to_string())
            }
            ServiceError::Validation(_) | ServiceError::InvalidCouponCode => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            ServiceError::PurchaseWindowInvalid => (
                StatusCode::BAD_REQUEST,
                "PurchaseWindowInvalid",
                self.to_string(),
            ),
            ServiceError::InsufficientBalance => (
                StatusCode::BAD_REQUEST,
                "InsufficientBalance",
                self.to_string(),
            ),
            ServiceError::AlreadyPremium => {
                (StatusCode::CONFLICT, "AlreadyPremium", self.to_string())
            }
            ServiceError::CouponAlreadyUsed => {
                (StatusCode::CONFLICT, "CouponAlreadyUsed", self.to_string())
            }
            ServiceError::CouponNotFound => {
                (StatusCode::NOT_FOUND, "CouponNotFound", self.to_string())
            }
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            ServiceError::Conflict(_) => (StatusCode::CONFLICT, "Conflict", self.to_string()),
            ServiceError::RateLimitExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "RateLimitExceeded",
                self.to_string(),
            ),
            ServiceError::TransactionTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "TransactionTimeout",
                self.to_string(),
            ),
            // Don't leak store internals
            ServiceError::Database(_)
            | ServiceError::TransactionFailed(_)
            | ServiceError::Internal(_)
            | ServiceError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

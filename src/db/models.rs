/// Database models for accounts, coupons, and sessions
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account service tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountTier {
    Free,
    Premium,
}

impl AccountTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountTier::Free => "free",
            AccountTier::Premium => "premium",
        }
    }
}

/// Account record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    /// UUID, stored as text
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub tier: AccountTier,
    pub balance: f64,
    pub created_at: DateTime<Utc>,
}

/// Coupon record in the database
///
/// A coupon with no owner is unassigned and cannot be redeemed until an
/// admin assigns it. Once `used` is set it stays set.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Coupon {
    pub id: String,
    pub code: String,
    pub used: bool,
    pub owner_account_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Session record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub account_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

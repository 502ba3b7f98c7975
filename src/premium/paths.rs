/// Coupon and cash redemption paths
///
/// Mutually exclusive payment strategies. Each validates its own inputs, then
/// applies the tier upgrade (and its payment-specific mutation) inside a
/// single transaction run through `txn::commit_within`. Callers hold the
/// coordinator's redemption lock for the whole call, so the check-then-act
/// sequences here cannot interleave with another redemption.
use crate::{
    coupon::CouponManager,
    db::models::AccountTier,
    error::{ServiceError, ServiceResult},
    premium::txn,
};
use sqlx::SqlitePool;
use tokio::time::Instant;

/// Redeem a coupon: mark it used and upgrade the account, atomically.
/// The account's balance is untouched by this path.
pub async fn redeem_with_coupon(
    db: &SqlitePool,
    coupons: &CouponManager,
    account_id: &str,
    code: &str,
    deadline: Instant,
) -> ServiceResult<()> {
    if code.trim().is_empty() {
        return Err(ServiceError::InvalidCouponCode);
    }

    // Absent and foreign-owned coupons surface the same error
    let coupon = coupons
        .find_owned(code, account_id)
        .await?
        .ok_or(ServiceError::CouponNotFound)?;

    if coupon.used {
        return Err(ServiceError::CouponAlreadyUsed);
    }

    let pool = db.clone();
    let coupon_id = coupon.id;
    let account_id = account_id.to_string();

    txn::commit_within(deadline, async move {
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE coupon SET used = 1 WHERE id = ?1")
            .bind(&coupon_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE account SET tier = ?1 WHERE id = ?2")
            .bind(AccountTier::Premium.as_str())
            .bind(&account_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await
    })
    .await
}

/// Redeem with cash: debit the premium price and upgrade the account,
/// atomically. Returns the new balance.
pub async fn redeem_with_cash(
    db: &SqlitePool,
    account_id: &str,
    price: f64,
    deadline: Instant,
) -> ServiceResult<f64> {
    let (balance,): (f64,) = sqlx::query_as("SELECT balance FROM account WHERE id = ?1")
        .bind(account_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Account not found".to_string()))?;

    if balance < price {
        return Err(ServiceError::InsufficientBalance);
    }

    let pool = db.clone();
    let account_id = account_id.to_string();
    let new_balance = balance - price;

    txn::commit_within(deadline, async move {
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE account SET balance = ?1, tier = ?2 WHERE id = ?3")
            .bind(new_balance)
            .bind(AccountTier::Premium.as_str())
            .bind(&account_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await
    })
    .await?;

    Ok(new_balance)
}

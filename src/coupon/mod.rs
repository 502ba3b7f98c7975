/// Coupon management
///
/// Coupons are single-use premium upgrade tokens. Admins create them
/// unassigned, then assign them to one account or fan them out to every
/// account. Redemption itself lives in the premium module; this manager only
/// covers creation, assignment, and owner-scoped reads.
use crate::{
    db::models::Coupon,
    error::{ServiceError, ServiceResult},
};
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Coupon manager
#[derive(Clone)]
pub struct CouponManager {
    db: SqlitePool,
}

impl CouponManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Generate a new coupon code
    pub fn generate_code() -> String {
        let code: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect();

        format!("chorale-{}", code.to_lowercase())
    }

    /// Create an unassigned coupon
    pub async fn create(&self, code: Option<String>) -> ServiceResult<Coupon> {
        let code = code.unwrap_or_else(Self::generate_code);

        if self.code_exists(&code).await? {
            return Err(ServiceError::Conflict(format!(
                "Coupon code {} already exists",
                code
            )));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO coupon (id, code, used, owner_account_id, created_at)
             VALUES (?1, ?2, 0, NULL, ?3)",
        )
        .bind(&id)
        .bind(&code)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(Coupon {
            id,
            code,
            used: false,
            owner_account_id: None,
            created_at: now,
        })
    }

    /// Assign a coupon to a single account
    ///
    /// Only unassigned, unused coupons can be assigned, and an account can
    /// hold at most one coupon per code.
    pub async fn assign(&self, coupon_id: &str, account_id: &str) -> ServiceResult<()> {
        let coupon = self
            .get(coupon_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Coupon not found".to_string()))?;

        if coupon.used {
            return Err(ServiceError::Conflict(
                "Coupon has already been used".to_string(),
            ));
        }

        if coupon.owner_account_id.is_some() {
            return Err(ServiceError::Conflict(
                "Coupon is already assigned".to_string(),
            ));
        }

        if self.find_owned(&coupon.code, account_id).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Account already holds a coupon with code {}",
                coupon.code
            )));
        }

        sqlx::query("UPDATE coupon SET owner_account_id = ?1 WHERE id = ?2")
            .bind(account_id)
            .bind(coupon_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Assign a coupon's code to every account
    ///
    /// Each account that does not already hold the code gets its own copy of
    /// the coupon (fresh id, same code), so every copy can be redeemed exactly
    /// once by its owner. Returns the number of accounts reached.
    pub async fn assign_to_all(&self, coupon_id: &str) -> ServiceResult<u64> {
        let coupon = self
            .get(coupon_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Coupon not found".to_string()))?;

        let result = sqlx::query(
            "INSERT INTO coupon (id, code, used, owner_account_id, created_at)
             SELECT lower(hex(randomblob(16))), ?1, 0, a.id, ?2
             FROM account a
             WHERE NOT EXISTS (
                 SELECT 1 FROM coupon c
                 WHERE c.code = ?1 AND c.owner_account_id = a.id
             )",
        )
        .bind(&coupon.code)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Get a coupon by id
    pub async fn get(&self, coupon_id: &str) -> ServiceResult<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>(
            "SELECT id, code, used, owner_account_id, created_at FROM coupon WHERE id = ?1",
        )
        .bind(coupon_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(coupon)
    }

    /// Look up a coupon by code, scoped to its owner
    ///
    /// Absent and foreign-owned coupons are indistinguishable to the caller.
    pub async fn find_owned(&self, code: &str, account_id: &str) -> ServiceResult<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>(
            "SELECT id, code, used, owner_account_id, created_at
             FROM coupon WHERE code = ?1 AND owner_account_id = ?2",
        )
        .bind(code)
        .bind(account_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(coupon)
    }

    /// List the coupons owned by an account
    pub async fn list_for_account(&self, account_id: &str) -> ServiceResult<Vec<Coupon>> {
        let coupons = sqlx::query_as::<_, Coupon>(
            "SELECT id, code, used, owner_account_id, created_at
             FROM coupon WHERE owner_account_id = ?1 ORDER BY created_at DESC",
        )
        .bind(account_id)
        .fetch_all(&self.db)
        .await?;

        Ok(coupons)
    }

    async fn code_exists(&self, code: &str) -> ServiceResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM coupon WHERE code = ?1")
            .bind(code)
            .fetch_optional(&self.db)
            .await?;

        Ok(row.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        pool
    }

    async fn insert_account(pool: &SqlitePool, id: &str, username: &str) {
        sqlx::query(
            "INSERT INTO account (id, username, email, password_hash, tier, balance, created_at)
             VALUES (?1, ?2, ?3, 'hash', 'free', 100.0, ?4)",
        )
        .bind(id)
        .bind(username)
        .bind(format!("{}@example.com", username))
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
    }

    #[test]
    fn test_generate_code() {
        let code = CouponManager::generate_code();
        assert!(code.starts_with("chorale-"));
        assert!(code.len() > 12);
    }

    #[tokio::test]
    async fn test_create_and_assign() {
        let pool = test_pool().await;
        insert_account(&pool, "acct-1", "one").await;
        let manager = CouponManager::new(pool);

        let coupon = manager.create(None).await.unwrap();
        assert!(!coupon.used);
        assert!(coupon.owner_account_id.is_none());

        manager.assign(&coupon.id, "acct-1").await.unwrap();

        let owned = manager
            .find_owned(&coupon.code, "acct-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(owned.id, coupon.id);

        // Same code is invisible to another account
        assert!(manager
            .find_owned(&coupon.code, "acct-2")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let pool = test_pool().await;
        let manager = CouponManager::new(pool);

        manager.create(Some("chorale-promo".to_string())).await.unwrap();
        let err = manager
            .create(Some("chorale-promo".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_assign_to_all_reaches_every_account() {
        let pool = test_pool().await;
        insert_account(&pool, "acct-1", "one").await;
        insert_account(&pool, "acct-2", "two").await;
        insert_account(&pool, "acct-3", "three").await;
        let manager = CouponManager::new(pool);

        let coupon = manager.create(Some("chorale-launch".to_string())).await.unwrap();
        let reached = manager.assign_to_all(&coupon.id).await.unwrap();
        assert_eq!(reached, 3);

        for account in ["acct-1", "acct-2", "acct-3"] {
            let owned = manager
                .find_owned("chorale-launch", account)
                .await
                .unwrap()
                .unwrap();
            assert!(!owned.used);
        }

        // Re-running does not duplicate copies
        let reached_again = manager.assign_to_all(&coupon.id).await.unwrap();
        assert_eq!(reached_again, 0);
    }

    #[tokio::test]
    async fn test_assign_after_fan_out_rejects_duplicate_holder() {
        let pool = test_pool().await;
        insert_account(&pool, "acct-1", "one").await;
        let manager = CouponManager::new(pool);

        // Fan-out leaves the original row unassigned while every account
        // already holds a copy of its code.
        let coupon = manager.create(Some("chorale-launch".to_string())).await.unwrap();
        manager.assign_to_all(&coupon.id).await.unwrap();

        let err = manager.assign(&coupon.id, "acct-1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        // The account still holds exactly its fan-out copy
        let owned = manager
            .find_owned("chorale-launch", "acct-1")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(owned.id, coupon.id);
    }

    #[tokio::test]
    async fn test_assign_rejects_owned_and_used_coupons() {
        let pool = test_pool().await;
        insert_account(&pool, "acct-1", "one").await;
        insert_account(&pool, "acct-2", "two").await;
        let manager = CouponManager::new(pool);

        let coupon = manager.create(None).await.unwrap();
        manager.assign(&coupon.id, "acct-1").await.unwrap();

        // Already assigned: cannot be re-targeted
        let err = manager.assign(&coupon.id, "acct-2").await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        let owned = manager
            .find_owned(&coupon.code, "acct-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(owned.id, coupon.id);

        // Used: assignment is rejected even for the current owner
        sqlx::query("UPDATE coupon SET used = 1, owner_account_id = NULL WHERE id = ?1")
            .bind(&coupon.id)
            .execute(&manager.db)
            .await
            .unwrap();
        let err = manager.assign(&coupon.id, "acct-2").await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_assign_missing_coupon_not_found() {
        let pool = test_pool().await;
        insert_account(&pool, "acct-1", "one").await;
        let manager = CouponManager::new(pool);

        let err = manager.assign("no-such-id", "acct-1").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}

/// Redemption coordinator
///
/// Single entry point for premium purchases. One process-wide mutex covers
/// the entire redemption body: the tier guard, the window check, the path
/// reads, and the transactional write all happen while holding it. Coarse on
/// purpose: redemptions are low-frequency and rate-limited upstream, and full
/// serialization gives a simple correctness argument against double-spend and
/// lost updates. Read-only operations elsewhere in the service are not gated.
use crate::{
    account::AccountManager,
    config::PremiumConfig,
    coupon::CouponManager,
    db::models::AccountTier,
    error::{ServiceError, ServiceResult},
    premium::{paths, window::PurchaseWindowStore},
};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// How the redemption is paid for
#[derive(Debug, Clone)]
pub enum PaymentMethod {
    Coupon { code: String },
    Cash,
}

/// Snapshot of the account after a successful redemption
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    pub tier: AccountTier,
    pub balance: f64,
}

/// Redemption coordinator, constructed with explicit store handles
pub struct PurchaseCoordinator {
    db: SqlitePool,
    accounts: Arc<AccountManager>,
    coupons: Arc<CouponManager>,
    windows: Arc<PurchaseWindowStore>,
    config: PremiumConfig,
    /// Serializes every redemption attempt, system-wide
    redeem_lock: Mutex<()>,
}

impl PurchaseCoordinator {
    pub fn new(
        db: SqlitePool,
        accounts: Arc<AccountManager>,
        coupons: Arc<CouponManager>,
        windows: Arc<PurchaseWindowStore>,
        config: PremiumConfig,
    ) -> Self {
        Self {
            db,
            accounts,
            coupons,
            windows,
            config,
            redeem_lock: Mutex::new(()),
        }
    }

    /// Attempt a premium redemption for an account
    ///
    /// Exactly one attempt can commit the free-to-premium transition; every
    /// other concurrent or subsequent attempt observes `AlreadyPremium` or a
    /// state-conflict error. Failures never leave partial state behind, and a
    /// timed-out transaction still releases the lock on the way out. There is
    /// no retry here: the caller must open a new window and try again.
    pub async fn redeem(
        &self,
        account_id: &str,
        method: PaymentMethod,
    ) -> ServiceResult<PurchaseReceipt> {
        // Deadline runs from the start of the call, lock wait included
        let deadline =
            Instant::now() + Duration::from_secs(self.config.transaction_budget_secs);

        let _guard = self.redeem_lock.lock().await;

        // Idempotency guard, independent of payment method
        let account = self.accounts.get_account(account_id).await?;
        if account.tier == AccountTier::Premium {
            return Err(ServiceError::AlreadyPremium);
        }

        self.windows.validate(account_id)?;

        let balance = match method {
            PaymentMethod::Coupon { code } => {
                paths::redeem_with_coupon(&self.db, &self.coupons, account_id, &code, deadline)
                    .await?;
                account.balance
            }
            PaymentMethod::Cash => {
                paths::redeem_with_cash(&self.db, account_id, self.config.price, deadline).await?
            }
        };

        // The window is consumed only on success
        self.windows.remove(account_id);

        tracing::info!(account_id, "account upgraded to premium");

        Ok(PurchaseReceipt {
            tier: AccountTier::Premium,
            balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::premium::txn;
    use chrono::Utc;
    use uuid::Uuid;

    struct Harness {
        db: SqlitePool,
        coordinator: Arc<PurchaseCoordinator>,
        windows: Arc<PurchaseWindowStore>,
        coupons: Arc<CouponManager>,
    }

    async fn harness() -> Harness {
        let db = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        crate::db::run_migrations(&db).await.unwrap();

        let config = Arc::new(crate::config::ServerConfig::from_env().unwrap());
        let accounts = Arc::new(AccountManager::new(db.clone(), config));
        let coupons = Arc::new(CouponManager::new(db.clone()));
        let windows = Arc::new(PurchaseWindowStore::new(chrono::Duration::minutes(5)));

        let coordinator = Arc::new(PurchaseCoordinator::new(
            db.clone(),
            accounts,
            Arc::clone(&coupons),
            Arc::clone(&windows),
            PremiumConfig::default(),
        ));

        Harness {
            db,
            coordinator,
            windows,
            coupons,
        }
    }

    async fn seed_account(db: &SqlitePool, username: &str, balance: f64) -> String {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO account (id, username, email, password_hash, tier, balance, created_at)
             VALUES (?1, ?2, ?3, 'hash', 'free', ?4, ?5)",
        )
        .bind(&id)
        .bind(username)
        .bind(format!("{}@example.com", username))
        .bind(balance)
        .bind(Utc::now())
        .execute(db)
        .await
        .unwrap();
        id
    }

    async fn account_state(db: &SqlitePool, id: &str) -> (AccountTier, f64) {
        sqlx::query_as("SELECT tier, balance FROM account WHERE id = ?1")
            .bind(id)
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_cash_purchase_exact_balance() {
        let h = harness().await;
        let account = seed_account(&h.db, "buyer", 100.0).await;

        h.windows.open(&account);
        let receipt = h
            .coordinator
            .redeem(&account, PaymentMethod::Cash)
            .await
            .unwrap();
        assert_eq!(receipt.tier, AccountTier::Premium);
        assert_eq!(receipt.balance, 0.0);

        let (tier, balance) = account_state(&h.db, &account).await;
        assert_eq!(tier, AccountTier::Premium);
        assert_eq!(balance, 0.0);

        // A second attempt reports the idempotency conflict
        h.windows.open(&account);
        assert!(matches!(
            h.coordinator
                .redeem(&account, PaymentMethod::Cash)
                .await
                .unwrap_err(),
            ServiceError::AlreadyPremium
        ));
        let (_, balance) = account_state(&h.db, &account).await;
        assert_eq!(balance, 0.0);
    }

    #[tokio::test]
    async fn test_insufficient_balance_leaves_state_unchanged() {
        let h = harness().await;
        let account = seed_account(&h.db, "broke", 50.0).await;

        h.windows.open(&account);
        assert!(matches!(
            h.coordinator
                .redeem(&account, PaymentMethod::Cash)
                .await
                .unwrap_err(),
            ServiceError::InsufficientBalance
        ));

        let (tier, balance) = account_state(&h.db, &account).await;
        assert_eq!(tier, AccountTier::Free);
        assert_eq!(balance, 50.0);
    }

    #[tokio::test]
    async fn test_coupon_purchase_and_terminal_used_flag() {
        let h = harness().await;
        let account = seed_account(&h.db, "collector", 100.0).await;

        let coupon = h.coupons.create(None).await.unwrap();
        h.coupons.assign(&coupon.id, &account).await.unwrap();

        h.windows.open(&account);
        let receipt = h
            .coordinator
            .redeem(
                &account,
                PaymentMethod::Coupon {
                    code: coupon.code.clone(),
                },
            )
            .await
            .unwrap();
        assert_eq!(receipt.tier, AccountTier::Premium);
        // Coupon path leaves the balance alone
        assert_eq!(receipt.balance, 100.0);

        let stored = h.coupons.get(&coupon.id).await.unwrap().unwrap();
        assert!(stored.used);

        // Tier never regresses
        let (tier, balance) = account_state(&h.db, &account).await;
        assert_eq!(tier, AccountTier::Premium);
        assert_eq!(balance, 100.0);
    }

    #[tokio::test]
    async fn test_used_coupon_rejected() {
        let h = harness().await;
        let account = seed_account(&h.db, "late", 100.0).await;

        let coupon = h.coupons.create(None).await.unwrap();
        h.coupons.assign(&coupon.id, &account).await.unwrap();
        sqlx::query("UPDATE coupon SET used = 1 WHERE id = ?1")
            .bind(&coupon.id)
            .execute(&h.db)
            .await
            .unwrap();

        h.windows.open(&account);
        assert!(matches!(
            h.coordinator
                .redeem(&account, PaymentMethod::Coupon { code: coupon.code })
                .await
                .unwrap_err(),
            ServiceError::CouponAlreadyUsed
        ));

        let (tier, _) = account_state(&h.db, &account).await;
        assert_eq!(tier, AccountTier::Free);
    }

    #[tokio::test]
    async fn test_foreign_and_missing_coupons_look_the_same() {
        let h = harness().await;
        let account = seed_account(&h.db, "probing", 100.0).await;
        let other = seed_account(&h.db, "owner", 100.0).await;

        let coupon = h.coupons.create(None).await.unwrap();
        h.coupons.assign(&coupon.id, &other).await.unwrap();

        h.windows.open(&account);
        assert!(matches!(
            h.coordinator
                .redeem(&account, PaymentMethod::Coupon { code: coupon.code })
                .await
                .unwrap_err(),
            ServiceError::CouponNotFound
        ));

        h.windows.open(&account);
        assert!(matches!(
            h.coordinator
                .redeem(
                    &account,
                    PaymentMethod::Coupon {
                        code: "chorale-no-such-code".to_string(),
                    },
                )
                .await
                .unwrap_err(),
            ServiceError::CouponNotFound
        ));
    }

    #[tokio::test]
    async fn test_blank_coupon_code_rejected() {
        let h = harness().await;
        let account = seed_account(&h.db, "typo", 100.0).await;

        h.windows.open(&account);
        assert!(matches!(
            h.coordinator
                .redeem(
                    &account,
                    PaymentMethod::Coupon {
                        code: "   ".to_string(),
                    },
                )
                .await
                .unwrap_err(),
            ServiceError::InvalidCouponCode
        ));
    }

    #[tokio::test]
    async fn test_no_window_means_no_redemption() {
        let h = harness().await;
        let account = seed_account(&h.db, "eager", 100.0).await;

        assert!(matches!(
            h.coordinator
                .redeem(&account, PaymentMethod::Cash)
                .await
                .unwrap_err(),
            ServiceError::PurchaseWindowInvalid
        ));

        let (tier, balance) = account_state(&h.db, &account).await;
        assert_eq!(tier, AccountTier::Free);
        assert_eq!(balance, 100.0);
    }

    #[tokio::test]
    async fn test_expired_window_rejected_for_both_paths() {
        let h = harness().await;
        let account = seed_account(&h.db, "slow", 100.0).await;

        let coupon = h.coupons.create(None).await.unwrap();
        h.coupons.assign(&coupon.id, &account).await.unwrap();

        h.windows
            .open_expiring_at(&account, Utc::now() - chrono::Duration::seconds(1));

        assert!(matches!(
            h.coordinator
                .redeem(&account, PaymentMethod::Cash)
                .await
                .unwrap_err(),
            ServiceError::PurchaseWindowInvalid
        ));
        assert!(matches!(
            h.coordinator
                .redeem(&account, PaymentMethod::Coupon { code: coupon.code })
                .await
                .unwrap_err(),
            ServiceError::PurchaseWindowInvalid
        ));

        let stored = h.coupons.get(&coupon.id).await.unwrap().unwrap();
        assert!(!stored.used);
        let (tier, balance) = account_state(&h.db, &account).await;
        assert_eq!(tier, AccountTier::Free);
        assert_eq!(balance, 100.0);
    }

    #[tokio::test]
    async fn test_window_consumed_only_on_success() {
        let h = harness().await;
        let account = seed_account(&h.db, "retrier", 50.0).await;

        h.windows.open(&account);
        assert!(h
            .coordinator
            .redeem(&account, PaymentMethod::Cash)
            .await
            .is_err());

        // Failed attempt leaves the window open for an explicit retry
        assert!(h.windows.validate(&account).is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_redeemers_single_upgrade() {
        let h = harness().await;
        let account = seed_account(&h.db, "contended", 150.0).await;

        let coupon = h.coupons.create(None).await.unwrap();
        h.coupons.assign(&coupon.id, &account).await.unwrap();
        h.windows.open(&account);

        let mut handles = Vec::new();
        for i in 0..8 {
            let coordinator = Arc::clone(&h.coordinator);
            let account = account.clone();
            let method = if i % 2 == 0 {
                PaymentMethod::Cash
            } else {
                PaymentMethod::Coupon {
                    code: coupon.code.clone(),
                }
            };
            handles.push(tokio::spawn(async move {
                coordinator.redeem(&account, method).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(receipt) => {
                    successes += 1;
                    assert_eq!(receipt.tier, AccountTier::Premium);
                }
                Err(e) => assert!(matches!(e, ServiceError::AlreadyPremium)),
            }
        }
        assert_eq!(successes, 1);

        // Exactly one payment happened: either the coupon was consumed or the
        // balance was debited, never both
        let (tier, balance) = account_state(&h.db, &account).await;
        assert_eq!(tier, AccountTier::Premium);
        let stored = h.coupons.get(&coupon.id).await.unwrap().unwrap();
        if stored.used {
            assert_eq!(balance, 150.0);
        } else {
            assert_eq!(balance, 50.0);
        }
    }

    #[tokio::test]
    async fn test_timeout_leaves_no_partial_state() {
        let h = harness().await;
        let account = seed_account(&h.db, "stalled", 100.0).await;

        let pool = h.db.clone();
        let account_id = account.clone();
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_millis(50);

        // A transaction that mutates, then stalls past its deadline before
        // committing: the drop must roll the mutation back.
        let result = txn::commit_within(deadline, async move {
            let mut tx = pool.begin().await?;
            sqlx::query("UPDATE account SET balance = 0, tier = 'premium' WHERE id = ?1")
                .bind(&account_id)
                .execute(&mut *tx)
                .await?;
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            tx.commit().await
        })
        .await;

        assert!(matches!(
            result.unwrap_err(),
            ServiceError::TransactionTimeout
        ));

        let (tier, balance) = account_state(&h.db, &account).await;
        assert_eq!(tier, AccountTier::Free);
        assert_eq!(balance, 100.0);
    }
}

/// Application context and dependency injection
use crate::{
    account::AccountManager,
    config::ServerConfig,
    coupon::CouponManager,
    db,
    error::ServiceResult,
    premium::{PurchaseCoordinator, PurchaseWindowStore},
    rate_limit::RateLimiter,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub coupon_manager: Arc<CouponManager>,
    pub window_store: Arc<PurchaseWindowStore>,
    pub coordinator: Arc<PurchaseCoordinator>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ServiceResult<Self> {
        config.validate()?;

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let config = Arc::new(config);

        let account_manager = Arc::new(AccountManager::new(db.clone(), Arc::clone(&config)));
        let coupon_manager = Arc::new(CouponManager::new(db.clone()));
        let window_store = Arc::new(PurchaseWindowStore::new(chrono::Duration::seconds(
            config.premium.window_ttl_secs as i64,
        )));

        // The coordinator gets explicit handles to every store it touches
        let coordinator = Arc::new(PurchaseCoordinator::new(
            db.clone(),
            Arc::clone(&account_manager),
            Arc::clone(&coupon_manager),
            Arc::clone(&window_store),
            config.premium.clone(),
        ));

        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));

        Ok(Self {
            config,
            db,
            account_manager,
            coupon_manager,
            window_store,
            coordinator,
            rate_limiter,
        })
    }
}

/// Configuration management for the Chorale premium service
use crate::error::{ServiceError, ServiceResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub premium: PremiumConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in seconds
    pub session_ttl_secs: u64,
    /// Usernames allowed to manage coupons (comma-separated in env)
    pub admin_usernames: Vec<String>,
}

/// Premium purchase configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PremiumConfig {
    /// Price of the premium upgrade, debited by the cash path
    pub price: f64,
    /// How long an opened purchase window stays valid, in seconds
    pub window_ttl_secs: u64,
    /// Wall-clock budget for a redemption transaction, in seconds
    pub transaction_budget_secs: u64,
}

impl Default for PremiumConfig {
    fn default() -> Self {
        Self {
            price: 100.0,
            window_ttl_secs: 300,
            transaction_budget_secs: 10,
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_second: u32,
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 50,
            burst_size: 100,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ServiceResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("CHORALE_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("CHORALE_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ServiceError::Validation("Invalid port number".to_string()))?;

        let data_directory: PathBuf = env::var("CHORALE_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("CHORALE_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("chorale.sqlite"));

        let session_ttl_secs = env::var("CHORALE_SESSION_TTL_SECS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .unwrap_or(86400);

        let admin_usernames = env::var("CHORALE_ADMIN_USERNAMES")
            .unwrap_or_else(|_| String::new())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<String>>();

        let premium = PremiumConfig {
            price: env::var("CHORALE_PREMIUM_PRICE")
                .unwrap_or_else(|_| "100.0".to_string())
                .parse()
                .unwrap_or(100.0),
            window_ttl_secs: env::var("CHORALE_PURCHASE_WINDOW_TTL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap_or(300),
            transaction_budget_secs: env::var("CHORALE_TRANSACTION_BUDGET_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
        };

        let rate_limit = RateLimitConfig {
            enabled: env::var("CHORALE_RATE_LIMIT_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            requests_per_second: env::var("CHORALE_RATE_LIMIT_RPS")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .unwrap_or(50),
            burst_size: env::var("CHORALE_RATE_LIMIT_BURST")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .unwrap_or(100),
        };

        let logging = LoggingConfig {
            level: env::var("CHORALE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        Ok(Self {
            service: ServiceConfig { hostname, port },
            storage: StorageConfig {
                data_directory,
                database,
            },
            authentication: AuthConfig {
                session_ttl_secs,
                admin_usernames,
            },
            premium,
            rate_limit,
            logging,
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> ServiceResult<()> {
        if self.premium.price <= 0.0 {
            return Err(ServiceError::Validation(
                "Premium price must be positive".to_string(),
            ));
        }
        if self.premium.window_ttl_secs == 0 {
            return Err(ServiceError::Validation(
                "Purchase window TTL must be non-zero".to_string(),
            ));
        }
        if self.premium.transaction_budget_secs == 0 {
            return Err(ServiceError::Validation(
                "Transaction budget must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

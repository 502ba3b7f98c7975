/// Account manager implementation using runtime queries
use crate::{
    config::ServerConfig,
    db::models::{Account, AccountTier, Session},
    error::{ServiceError, ServiceResult},
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

/// Starting cash balance for newly registered accounts
const STARTING_BALANCE: f64 = 100.0;

/// Session handed back by token validation
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub account_id: String,
    pub token: String,
}

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>) -> Self {
        Self { db, config }
    }

    /// Register a new account
    ///
    /// New accounts start on the free tier with a fixed cash balance.
    pub async fn register(
        &self,
        username: String,
        email: String,
        password: String,
    ) -> ServiceResult<Account> {
        if self.username_exists(&username).await? {
            return Err(ServiceError::Conflict(format!(
                "Username {} already taken",
                username
            )));
        }
        if self.email_exists(&email).await? {
            return Err(ServiceError::Conflict(
                "Email already registered".to_string(),
            ));
        }

        let password_hash = hash_password(&password)?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO account (id, username, email, password_hash, tier, balance, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&id)
        .bind(&username)
        .bind(&email)
        .bind(&password_hash)
        .bind(AccountTier::Free)
        .bind(STARTING_BALANCE)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(ServiceError::Database)?;

        Ok(Account {
            id,
            username,
            email,
            password_hash,
            tier: AccountTier::Free,
            balance: STARTING_BALANCE,
            created_at: now,
        })
    }

    /// Authenticate an account and create a session
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<(Account, Session)> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, username, email, password_hash, tier, balance, created_at
             FROM account WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(ServiceError::Database)?
        .ok_or_else(|| ServiceError::Authentication("Invalid email or password".to_string()))?;

        if !verify_password(password, &account.password_hash) {
            return Err(ServiceError::Authentication(
                "Invalid email or password".to_string(),
            ));
        }

        let session = self.create_session(&account.id).await?;
        Ok((account, session))
    }

    /// Create a new session for an account
    pub async fn create_session(&self, account_id: &str) -> ServiceResult<Session> {
        let token = generate_session_token();
        let now = Utc::now();
        let expires_at =
            now + Duration::seconds(self.config.authentication.session_ttl_secs as i64);

        sqlx::query(
            "INSERT INTO session (token, account_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&token)
        .bind(account_id)
        .bind(now)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .map_err(ServiceError::Database)?;

        Ok(Session {
            token,
            account_id: account_id.to_string(),
            created_at: now,
            expires_at,
        })
    }

    /// Validate a bearer token against the session table
    pub async fn validate_token(&self, token: &str) -> ServiceResult<ValidatedSession> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT token, account_id, created_at, expires_at FROM session WHERE token = ?1",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
        .map_err(ServiceError::Database)?
        .ok_or_else(|| ServiceError::Authentication("Invalid or expired session".to_string()))?;

        if Utc::now() > session.expires_at {
            return Err(ServiceError::Authentication(
                "Session expired".to_string(),
            ));
        }

        Ok(ValidatedSession {
            account_id: session.account_id,
            token: session.token,
        })
    }

    /// Delete a session (logout)
    pub async fn delete_session(&self, token: &str) -> ServiceResult<()> {
        sqlx::query("DELETE FROM session WHERE token = ?1")
            .bind(token)
            .execute(&self.db)
            .await
            .map_err(ServiceError::Database)?;

        Ok(())
    }

    /// Delete expired sessions, returning the number removed
    pub async fn cleanup_expired_sessions(&self) -> ServiceResult<u64> {
        let result = sqlx::query("DELETE FROM session WHERE expires_at < ?1")
            .bind(Utc::now())
            .execute(&self.db)
            .await
            .map_err(ServiceError::Database)?;

        Ok(result.rows_affected())
    }

    /// Fetch an account by id
    pub async fn get_account(&self, account_id: &str) -> ServiceResult<Account> {
        sqlx::query_as::<_, Account>(
            "SELECT id, username, email, password_hash, tier, balance, created_at
             FROM account WHERE id = ?1",
        )
        .bind(account_id)
        .fetch_optional(&self.db)
        .await
        .map_err(ServiceError::Database)?
        .ok_or_else(|| ServiceError::NotFound("Account not found".to_string()))
    }

    async fn username_exists(&self, username: &str) -> ServiceResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM account WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.db)
            .await
            .map_err(ServiceError::Database)?;

        Ok(row.is_some())
    }

    async fn email_exists(&self, email: &str) -> ServiceResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM account WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .map_err(ServiceError::Database)?;

        Ok(row.is_some())
    }
}

/// Hash a password with Argon2id
fn hash_password(password: &str) -> ServiceResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ServiceError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored Argon2id hash
fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Generate an opaque session token
fn generate_session_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

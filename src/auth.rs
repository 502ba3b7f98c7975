/// Authentication extractors
use crate::{api::middleware::extract_bearer_token, context::AppContext, error::ServiceError};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated context - extracts and validates the session token
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account_id: String,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or_else(|| {
            ServiceError::Authentication("Missing authorization header".to_string())
        })?;

        let session = state.account_manager.validate_token(&token).await?;

        Ok(AuthContext {
            account_id: session.account_id,
            token: session.token,
        })
    }
}

/// Admin authentication context - requires a configured admin username
#[derive(Debug, Clone)]
pub struct AdminAuthContext {
    pub account_id: String,
    pub username: String,
}

#[async_trait]
impl FromRequestParts<AppContext> for AdminAuthContext {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state).await?;
        let account = state.account_manager.get_account(&auth.account_id).await?;

        if !state
            .config
            .authentication
            .admin_usernames
            .contains(&account.username)
        {
            tracing::warn!(username = %account.username, "admin route denied");
            return Err(ServiceError::Authorization(
                "Admin role required".to_string(),
            ));
        }

        Ok(AdminAuthContext {
            account_id: account.id,
            username: account.username,
        })
    }
}

/// API routes and handlers
pub mod account;
pub mod auth;
pub mod coupons;
pub mod middleware;
pub mod premium;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(auth::routes())
        .merge(account::routes())
        .merge(coupons::routes())
        .merge(premium::routes())
}

/// Chorale - music streaming backend, premium purchase service
///
/// Hosts the account-tier upgrade workflow: time-boxed purchase windows,
/// serialized coupon/cash redemption, and atomic tier transitions.

mod account;
mod api;
mod auth;
mod config;
mod context;
mod coupon;
mod db;
mod error;
mod jobs;
mod premium;
mod rate_limit;
mod server;

use config::ServerConfig;
use context::AppContext;
use error::ServiceResult;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ServiceResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chorale=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = Arc::new(AppContext::new(config).await?);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
   ________                    __
  / ____/ /_  ____  _________ / /__
 / /   / __ \/ __ \/ ___/ __ `/ / _ \
/ /___/ / / / /_/ / /  / /_/ / /  __/
\____/_/ /_/\____/_/   \__,_/_/\___/

        Premium Purchase Service v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}

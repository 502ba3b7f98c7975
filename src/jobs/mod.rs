use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{error, info};

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        tokio::spawn(Self::expired_session_cleanup_job(Arc::clone(&self)));
        tokio::spawn(Self::expired_window_sweep_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Cleanup expired sessions (runs every hour)
    async fn expired_session_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600));

        loop {
            interval.tick().await;

            match tasks::cleanup_expired_sessions(&scheduler.context).await {
                Ok(count) if count > 0 => {
                    info!("Cleaned up {} expired sessions", count);
                }
                Ok(_) => {}
                Err(e) => error!("Failed to cleanup expired sessions: {}", e),
            }
        }
    }

    /// Sweep lapsed purchase windows (runs every minute)
    async fn expired_window_sweep_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(60));

        loop {
            interval.tick().await;

            let swept = tasks::sweep_expired_windows(&scheduler.context);
            if swept > 0 {
                info!("Swept {} lapsed purchase windows", swept);
            }
        }
    }
}

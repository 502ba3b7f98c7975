/// Deadline-bounded transaction runner
///
/// Every redemption path funnels its store mutations through `commit_within`:
/// a single sqlx transaction future raced against a wall-clock deadline. If
/// the deadline fires first the future is dropped, the transaction rolls back
/// on drop, and no partial mutation is ever observable. Store errors roll the
/// whole transaction back too; details are logged here and surfaced to the
/// caller as a generic failure.
use crate::error::{ServiceError, ServiceResult};
use std::future::Future;
use tokio::time::Instant;

/// Run a transactional future to completion before `deadline`
///
/// The future must not commit partially: it owns a single transaction and
/// commits as its last step.
pub async fn commit_within<T, F>(deadline: Instant, work: F) -> ServiceResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout_at(deadline, work).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "purchase transaction rolled back");
            Err(ServiceError::TransactionFailed(e.to_string()))
        }
        Err(_) => {
            tracing::warn!("purchase transaction exceeded its deadline, rolled back");
            Err(ServiceError::TransactionTimeout)
        }
    }
}

/// Purchase window store
///
/// A key-value map from account id to window expiry. Opening a purchase
/// window grants the account a short interval in which a single redemption
/// may be attempted; the window is deleted on successful redemption and
/// otherwise lapses on its own. The map is in-process: a window is scoped to
/// this service instance, like the session it belongs to.
use crate::error::{ServiceError, ServiceResult};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

/// Purchase window store with per-entry expiry
pub struct PurchaseWindowStore {
    windows: RwLock<HashMap<String, DateTime<Utc>>>,
    ttl: Duration,
}

impl PurchaseWindowStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Open (or re-open) a purchase window for an account
    ///
    /// Overwrites any existing window; an account holds at most one.
    pub fn open(&self, account_id: &str) -> DateTime<Utc> {
        let expires_at = Utc::now() + self.ttl;
        self.windows
            .write()
            .expect("window store lock poisoned")
            .insert(account_id.to_string(), expires_at);

        tracing::debug!(account_id, %expires_at, "purchase window opened");
        expires_at
    }

    /// Check that an account has a live window, without consuming it
    pub fn validate(&self, account_id: &str) -> ServiceResult<DateTime<Utc>> {
        let windows = self.windows.read().expect("window store lock poisoned");

        match windows.get(account_id) {
            Some(&expires_at) if Utc::now() < expires_at => Ok(expires_at),
            _ => Err(ServiceError::PurchaseWindowInvalid),
        }
    }

    /// Remove an account's window (on successful redemption)
    pub fn remove(&self, account_id: &str) {
        self.windows
            .write()
            .expect("window store lock poisoned")
            .remove(account_id);
    }

    /// Drop all lapsed windows, returning the number removed
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut windows = self.windows.write().expect("window store lock poisoned");
        let before = windows.len();
        windows.retain(|_, expires_at| now < *expires_at);
        before - windows.len()
    }

    #[cfg(test)]
    pub(crate) fn open_expiring_at(&self, account_id: &str, expires_at: DateTime<Utc>) {
        self.windows
            .write()
            .expect("window store lock poisoned")
            .insert(account_id.to_string(), expires_at);
    }
}

/// Premium purchase engine
///
/// The one genuinely stateful workflow in the service: redeem a single-use
/// coupon or a cash balance to move an account from the free tier to premium,
/// exactly once. A short-lived purchase window bounds the intent, a global
/// mutex serializes all redemption attempts, and every store mutation runs
/// inside a deadline-bounded all-or-nothing transaction.
pub mod coordinator;
pub mod paths;
pub mod txn;
pub mod window;

pub use coordinator::{PaymentMethod, PurchaseCoordinator, PurchaseReceipt};
pub use window::PurchaseWindowStore;

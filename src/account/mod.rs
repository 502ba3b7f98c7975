/// Account management: registration, login, sessions, tier and balance reads
mod manager;

pub use manager::{AccountManager, ValidatedSession};

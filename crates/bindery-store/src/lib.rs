//! Administrator account management against the application's data store.

mod admin;
pub mod password;

pub use admin::{AdminCredentialManager, AdminUpdate, ChangeOutcome};

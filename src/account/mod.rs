//! Account domain: records, credential storage, password hashing, and the
//! lifecycle service that ties them together.

pub mod error;
pub mod models;
pub mod password;
pub mod service;
pub mod store;

pub use error::AuthError;
pub use models::{Account, AccountSummary, LOCK_WINDOW_MINUTES, MAX_FAILED_LOGIN_ATTEMPTS};
pub use service::{AccountService, LoginSuccess, TokenPair, VerifyOutcome};
pub use store::{CreateOutcome, CredentialStore, MemoryCredentialStore, PgCredentialStore};

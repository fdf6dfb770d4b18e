//! Account record and the lockout window rules attached to it.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Failed logins allowed before the lockout window opens.
pub const MAX_FAILED_LOGIN_ATTEMPTS: i32 = 5;

/// Length of the rolling lockout window.
pub const LOCK_WINDOW_MINUTES: i64 = 15;

/// A registered identity as stored by the credential store.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    /// Normalized lowercase, unique.
    pub email: String,
    pub password_hash: String,
    /// Starts false, becomes true exactly once.
    pub is_verified: bool,
    pub failed_login_attempts: i32,
    /// When set and in the future, login is refused regardless of password.
    pub lock_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// A lock in the past counts as no lock; the window is rolling, never
    /// permanent.
    #[must_use]
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.lock_until.is_some_and(|until| until > now)
    }

    /// Whole minutes left on an active lock, rounded up and never below one:
    /// while the lock holds, "try again in 0 minutes" would be a lie.
    #[must_use]
    pub fn lock_remaining_minutes(&self, now: DateTime<Utc>) -> Option<i64> {
        let until = self.lock_until.filter(|until| *until > now)?;
        let seconds = (until - now).num_seconds();
        Some(((seconds + 59) / 60).max(1))
    }

    #[must_use]
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            email: self.email.clone(),
            is_verified: self.is_verified,
            created_at: self.created_at,
        }
    }
}

/// Public view of an account; never carries the password hash.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccountSummary {
    pub id: Uuid,
    pub email: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Timestamp for the end of a lock window starting now.
#[must_use]
pub fn lock_until_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::minutes(LOCK_WINDOW_MINUTES)
}

//! Credential store contract and its Postgres implementation.
//!
//! Failed-attempt bookkeeping is applied as single-statement updates so two
//! simultaneous bad logins never lose an increment to a stale read.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

use super::models::{Account, LOCK_WINDOW_MINUTES, MAX_FAILED_LOGIN_ATTEMPTS, lock_until_from};

/// Outcome when attempting to create a new account.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(Account),
    /// Email already registered (case-insensitive).
    Conflict,
}

/// Persistence contract for account records.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    /// Create an unverified account with zero failed attempts. Duplicate
    /// emails surface as `CreateOutcome::Conflict`, not an error.
    async fn create(&self, email: &str, password_hash: &str) -> Result<CreateOutcome>;

    /// One-way transition to verified. Idempotent.
    async fn set_verified(&self, id: Uuid) -> Result<()>;

    /// Replace the password hash wholesale, clearing the failed-attempt
    /// counter and any lock.
    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()>;

    /// Atomically record one failed login: an expired lock resets the counter
    /// to 1 and clears the lock; otherwise the counter increments, and
    /// reaching the threshold opens a lock window without resetting it.
    async fn increment_failed_attempts(&self, id: Uuid) -> Result<()>;

    /// Atomically clear the failed-attempt counter and any lock.
    async fn reset_failed_attempts(&self, id: Uuid) -> Result<()>;
}

/// `sqlx`-backed store over the `accounts` table.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, is_verified, failed_login_attempts, lock_until, created_at, updated_at";

fn account_from_row(row: &PgRow) -> Result<Account> {
    Ok(Account {
        id: row.try_get("id").context("read account id")?,
        email: row.try_get("email").context("read account email")?,
        password_hash: row
            .try_get("password_hash")
            .context("read account password hash")?,
        is_verified: row
            .try_get("is_verified")
            .context("read account verification flag")?,
        failed_login_attempts: row
            .try_get("failed_login_attempts")
            .context("read account failed attempts")?,
        lock_until: row.try_get("lock_until").context("read account lock")?,
        created_at: row
            .try_get("created_at")
            .context("read account created_at")?,
        updated_at: row
            .try_get("updated_at")
            .context("read account updated_at")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to look up account by email")?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to look up account by id")?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<CreateOutcome> {
        let query = format!(
            "INSERT INTO accounts (email, password_hash) VALUES ($1, $2) RETURNING {ACCOUNT_COLUMNS}"
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(CreateOutcome::Created(account_from_row(&row)?)),
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert account"),
        }
    }

    async fn set_verified(&self, id: Uuid) -> Result<()> {
        let query = "UPDATE accounts SET is_verified = TRUE, updated_at = NOW() WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to mark account verified")?;
        Ok(())
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let query = r"
            UPDATE accounts
            SET password_hash = $2,
                failed_login_attempts = 0,
                lock_until = NULL,
                updated_at = NOW()
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to replace password hash")?;
        Ok(())
    }

    async fn increment_failed_attempts(&self, id: Uuid) -> Result<()> {
        // Single statement so concurrent failures cannot lose updates. An
        // expired lock restarts the counter at 1; hitting the threshold while
        // unlocked opens a fresh window without resetting the counter.
        let query = r"
            UPDATE accounts
            SET failed_login_attempts = CASE
                    WHEN lock_until IS NOT NULL AND lock_until <= NOW() THEN 1
                    ELSE failed_login_attempts + 1
                END,
                lock_until = CASE
                    WHEN lock_until IS NOT NULL AND lock_until <= NOW() THEN NULL
                    WHEN lock_until IS NULL AND failed_login_attempts + 1 >= $2
                        THEN NOW() + ($3 * INTERVAL '1 minute')
                    ELSE lock_until
                END,
                updated_at = NOW()
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id)
            .bind(MAX_FAILED_LOGIN_ATTEMPTS)
            .bind(LOCK_WINDOW_MINUTES)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to record failed login attempt")?;
        Ok(())
    }

    async fn reset_failed_attempts(&self, id: Uuid) -> Result<()> {
        let query = r"
            UPDATE accounts
            SET failed_login_attempts = 0,
                lock_until = NULL,
                updated_at = NOW()
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to reset failed login attempts")?;
        Ok(())
    }
}

/// In-memory store with the same lockout semantics as the Postgres store.
/// Used by tests and local experiments; not meant for production.
#[derive(Default)]
pub struct MemoryCredentialStore {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.lock().expect("store lock poisoned");
        Ok(accounts
            .values()
            .find(|account| account.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let accounts = self.accounts.lock().expect("store lock poisoned");
        Ok(accounts.get(&id).cloned())
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<CreateOutcome> {
        let mut accounts = self.accounts.lock().expect("store lock poisoned");
        if accounts.values().any(|account| account.email == email) {
            return Ok(CreateOutcome::Conflict);
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            is_verified: false,
            failed_login_attempts: 0,
            lock_until: None,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(account.id, account.clone());
        Ok(CreateOutcome::Created(account))
    }

    async fn set_verified(&self, id: Uuid) -> Result<()> {
        let mut accounts = self.accounts.lock().expect("store lock poisoned");
        if let Some(account) = accounts.get_mut(&id) {
            account.is_verified = true;
            account.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let mut accounts = self.accounts.lock().expect("store lock poisoned");
        if let Some(account) = accounts.get_mut(&id) {
            account.password_hash = password_hash.to_string();
            account.failed_login_attempts = 0;
            account.lock_until = None;
            account.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn increment_failed_attempts(&self, id: Uuid) -> Result<()> {
        let mut accounts = self.accounts.lock().expect("store lock poisoned");
        if let Some(account) = accounts.get_mut(&id) {
            let now = Utc::now();
            match account.lock_until {
                Some(until) if until <= now => {
                    account.failed_login_attempts = 1;
                    account.lock_until = None;
                }
                Some(_) => {
                    account.failed_login_attempts += 1;
                }
                None => {
                    account.failed_login_attempts += 1;
                    if account.failed_login_attempts >= MAX_FAILED_LOGIN_ATTEMPTS {
                        account.lock_until = Some(lock_until_from(now));
                    }
                }
            }
            account.updated_at = now;
        }
        Ok(())
    }

    async fn reset_failed_attempts(&self, id: Uuid) -> Result<()> {
        let mut accounts = self.accounts.lock().expect("store lock poisoned");
        if let Some(account) = accounts.get_mut(&id) {
            account.failed_login_attempts = 0;
            account.lock_until = None;
            account.updated_at = Utc::now();
        }
        Ok(())
    }
}

//! User persistence.
//!
//! [`UserStore`] is the seam between the auth core and the database. The
//! Postgres implementation backs the server; [`MemoryUserStore`] backs tests and
//! local runs without a database.

use anyhow::Result;
use std::future::Future;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

/// A row of the `users` table as the auth core needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    /// Canonical UTC text of the creation instant; part of the reset-token secret.
    pub created_at: String,
    pub reset_last_iat: Option<i64>,
    /// `None` forces every holder of the account through the reset flow.
    pub last_valid_iat: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub last_valid_iat: i64,
}

#[derive(Debug)]
pub enum InsertOutcome {
    Created(UserRecord),
    Conflict,
}

pub trait UserStore: Send + Sync {
    fn insert(&self, user: NewUser) -> impl Future<Output = Result<InsertOutcome>> + Send;

    fn find_by_id(&self, id: Uuid) -> impl Future<Output = Result<Option<UserRecord>>> + Send;

    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>>> + Send;

    /// Remember the newest reset token's `iat`; never moves the value backward.
    fn record_reset_issued(&self, id: Uuid, iat: i64) -> impl Future<Output = Result<()>> + Send;

    /// Replace the password and raise `last_valid_iat` to `reset_iat`.
    ///
    /// Applies only while the stored hash still equals `expected_hash` and no
    /// newer reset was issued. Returns whether the row changed.
    fn complete_reset(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        reset_iat: i64,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Set `last_valid_iat` to the force-reset sentinel. Returns whether a user matched.
    fn require_reset(&self, email: &str) -> impl Future<Output = Result<bool>> + Send;
}

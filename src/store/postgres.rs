//! `users` table access over a sqlx Postgres pool.

use super::{InsertOutcome, NewUser, UserRecord, UserStore};
use anyhow::{Context, Result};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{info_span, Instrument};
use uuid::Uuid;

// created_at is rendered in UTC with a fixed format so the derived reset secret
// does not depend on the session time zone.
const USER_COLUMNS: &str = r#"
    id,
    email,
    password,
    to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS.US"Z"') AS created_at,
    reset_last_iat,
    last_valid_iat
"#;

#[derive(Clone, Debug)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password"),
        created_at: row.get("created_at"),
        reset_last_iat: row.get("reset_last_iat"),
        last_valid_iat: row.get("last_valid_iat"),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

impl UserStore for PgUserStore {
    async fn insert(&self, user: NewUser) -> Result<InsertOutcome> {
        let query = format!(
            "INSERT INTO users (email, password, last_valid_iat) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        );
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = %query
        );
        let row = sqlx::query(&query)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.last_valid_iat)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(InsertOutcome::Created(user_from_row(&row))),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = %query
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by id")?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = %query
        );
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by email")?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn record_reset_issued(&self, id: Uuid, iat: i64) -> Result<()> {
        let query = r"
            UPDATE users
            SET reset_last_iat = GREATEST(COALESCE(reset_last_iat, 0), $2)
            WHERE id = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id)
            .bind(iat)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to record reset issue time")?;

        Ok(())
    }

    async fn complete_reset(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        reset_iat: i64,
    ) -> Result<bool> {
        // Compare-and-swap: a concurrent confirmation or a newer reset request
        // turns this into a no-op.
        let query = r"
            UPDATE users
            SET password = $3,
                last_valid_iat = $4
            WHERE id = $1
              AND password = $2
              AND (reset_last_iat IS NULL OR reset_last_iat <= $4)
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id)
            .bind(expected_hash)
            .bind(new_hash)
            .bind(reset_iat)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to update password")?;

        Ok(result.rows_affected() == 1)
    }

    async fn require_reset(&self, email: &str) -> Result<bool> {
        let query = "UPDATE users SET last_valid_iat = NULL WHERE email = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(email)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to force password reset")?;

        Ok(result.rows_affected() > 0)
    }
}

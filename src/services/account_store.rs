use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::user::AccountRow;
use crate::database::models::{Account, User, UserStatus};
use crate::database::DatabaseError;

/// Fields for a user created by sign-up or invite. Always starts `pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub role: String,
}

/// A persisted one-time token. Only the digest is ever stored.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredToken {
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Persistence needed by the account workflow.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DatabaseError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DatabaseError>;
    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError>;
    async fn set_status(&self, id: Uuid, status: UserStatus) -> Result<(), DatabaseError>;

    /// Stores the password hash, marks the user `active` and removes every
    /// outstanding token for the user.
    async fn activate(&self, id: Uuid, password_hash: &str) -> Result<User, DatabaseError>;

    /// Removes the user's tokens, then the user. `Ok(false)` if no such user.
    async fn delete_user(&self, id: Uuid) -> Result<bool, DatabaseError>;

    async fn store_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;
    async fn find_token(&self, token_hash: &str) -> Result<Option<StoredToken>, DatabaseError>;
    async fn delete_tokens(&self, user_id: Uuid) -> Result<u64, DatabaseError>;
}

const ACCOUNT_COLUMNS: &str =
    "id, email, username, role, status, password_hash, created_at, updated_at";

fn to_account(row: AccountRow) -> Result<Account, DatabaseError> {
    Account::try_from(row).map_err(DatabaseError::Decode)
}

pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DatabaseError> {
        let query = format!("SELECT {} FROM users WHERE lower(email) = lower($1)", ACCOUNT_COLUMNS);
        sqlx::query_as::<_, AccountRow>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(to_account)
            .transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DatabaseError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", ACCOUNT_COLUMNS);
        sqlx::query_as::<_, AccountRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(to_account)
            .transpose()
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let query = format!(
            "INSERT INTO users (email, username, role, status) VALUES ($1, $2, $3, $4) RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let row = sqlx::query_as::<_, AccountRow>(&query)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.role)
            .bind(UserStatus::Pending.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(to_account(row)?.user)
    }

    async fn set_status(&self, id: Uuid, status: UserStatus) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE users SET status = $1, updated_at = now() WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    async fn activate(&self, id: Uuid, password_hash: &str) -> Result<User, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            "UPDATE users SET password_hash = $1, status = $2, updated_at = now() WHERE id = $3 RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let row = sqlx::query_as::<_, AccountRow>(&query)
            .bind(password_hash)
            .bind(UserStatus::Active.as_str())
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))?;

        sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(to_account(row)?.user)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn store_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO password_reset_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_token(&self, token_hash: &str) -> Result<Option<StoredToken>, DatabaseError> {
        Ok(sqlx::query_as::<_, StoredToken>(
            "SELECT user_id, token_hash, expires_at FROM password_reset_tokens WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_tokens(&self, user_id: Uuid) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

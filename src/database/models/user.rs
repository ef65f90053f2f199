use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::validate::{self, ValidationError};
use super::Resource;
use crate::auth::{hash_password, PasswordError};
use crate::database::query_builder::{Changeset, FilterKind, ListFilter, SortDirection, TableSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Pending,
    Active,
    Disabled,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Pending => "pending",
            UserStatus::Active => "active",
            UserStatus::Disabled => "disabled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(UserStatus::Pending),
            "active" => Some(UserStatus::Active),
            "disabled" => Some(UserStatus::Disabled),
            _ => None,
        }
    }
}

/// API-facing user. The password hash is never projected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub role: String,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User row including credentials, used only by the account workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub user: User,
    pub password_hash: Option<String>,
}

#[derive(Debug, FromRow)]
pub(crate) struct AccountRow {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub role: String,
    pub status: String,
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = String;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let status = UserStatus::parse(&row.status)
            .ok_or_else(|| format!("unknown user status '{}'", row.status))?;
        Ok(Account {
            user: User {
                id: row.id,
                email: row.email,
                username: row.username,
                role: row.role,
                status,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            password_hash: row.password_hash,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUser {
    pub email: Option<String>,
    pub username: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub username: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub password: Option<String>,
}

fn status(value: Option<String>) -> Result<Option<&'static str>, ValidationError> {
    value
        .map(|v| {
            UserStatus::parse(&v).map(|s| s.as_str()).ok_or_else(|| {
                ValidationError::invalid("status", "status must be one of pending, active, disabled")
            })
        })
        .transpose()
}

fn password_hash(value: Option<String>) -> Result<Option<String>, ValidationError> {
    value
        .map(|pw| {
            hash_password(&pw).map_err(|e| match e {
                PasswordError::TooShort => ValidationError::invalid("password", e.to_string()),
                PasswordError::Hashing(_) => {
                    tracing::error!("Password hashing failed: {}", e);
                    ValidationError::invalid("password", "Password could not be processed")
                }
            })
        })
        .transpose()
}

impl Resource for User {
    const TABLE: TableSpec = TableSpec {
        table: "users",
        label: "User",
        columns: &["id", "email", "username", "role", "status", "created_at", "updated_at"],
        relations: &[],
        children: &[],
        filters: &[
            ListFilter { param: "role", column: "role", kind: FilterKind::Text },
            ListFilter { param: "status", column: "status", kind: FilterKind::Text },
        ],
        order_by: ("created_at", SortDirection::Desc),
    };

    type Create = CreateUser;
    type Update = UpdateUser;

    fn create_changeset(input: CreateUser) -> Result<Changeset, ValidationError> {
        let mut cs = Changeset::new();
        cs.set("email", validate::required_email("email", input.email)?)
            .set("username", validate::required_text("username", input.username)?)
            .set("role", validate::required_text("role", input.role)?)
            .set(
                "status",
                status(input.status)?.unwrap_or(UserStatus::Pending.as_str()).to_string(),
            )
            .set_some("password_hash", password_hash(input.password)?);
        Ok(cs)
    }

    fn update_changeset(input: UpdateUser) -> Result<Changeset, ValidationError> {
        let mut cs = Changeset::new();
        cs.set_some("email", validate::email("email", input.email)?)
            .set_some("username", validate::non_empty_text("username", input.username)?)
            .set_some("role", validate::non_empty_text("role", input.role)?)
            .set_some("status", status(input.status)?.map(str::to_string))
            .set_some("password_hash", password_hash(input.password)?);
        Ok(cs)
    }
}

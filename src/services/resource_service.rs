use std::collections::HashMap;

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{Ownership, Resource, ValidationError};
use crate::database::query_builder::{FilterKind, SqlValue, TableSpec};
use crate::database::{DatabaseError, Repository};

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Database(DatabaseError),
}

impl From<DatabaseError> for ResourceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ResourceError::NotFound(msg),
            other => ResourceError::Database(other),
        }
    }
}

/// Create/read/update/delete for any [`Resource`].
pub struct ResourceService<R> {
    repo: Repository<R>,
}

impl<R: Resource> ResourceService<R> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repo: Repository::new(pool),
        }
    }

    /// `session_user` is the caller's user id when a valid session is present.
    pub async fn create(&self, mut input: R::Create, session_user: Option<Uuid>) -> Result<R, ResourceError> {
        match (R::OWNERSHIP, session_user) {
            (Ownership::Unowned, _) => {}
            (Ownership::DefaultsToSession, Some(user_id)) => R::assign_owner(&mut input, user_id),
            (Ownership::DefaultsToSession, None) => {}
            (Ownership::RequiresSession, Some(user_id)) => R::assign_owner(&mut input, user_id),
            (Ownership::RequiresSession, None) => {
                return Err(ResourceError::Unauthorized(format!(
                    "A valid session is required to create a {}",
                    R::TABLE.label.to_lowercase()
                )));
            }
        }

        let changeset = R::create_changeset(input)?;
        Ok(self.repo.insert(&changeset).await?)
    }

    pub async fn find(&self, id: Uuid) -> Result<R, ResourceError> {
        Ok(self.repo.select_404(id).await?)
    }

    /// Lists rows matching the declared filters present in `params`; other
    /// parameters are ignored.
    pub async fn list(&self, params: &HashMap<String, String>) -> Result<Vec<R>, ResourceError> {
        let conditions = list_conditions(&R::TABLE, params)?;
        Ok(self.repo.select_any(&conditions).await?)
    }

    pub async fn update(&self, id: Uuid, input: R::Update) -> Result<R, ResourceError> {
        let changeset = R::update_changeset(input)?;
        self.repo
            .update(id, &changeset)
            .await?
            .ok_or_else(|| not_found::<R>())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ResourceError> {
        if self.repo.delete(id).await? {
            Ok(())
        } else {
            Err(not_found::<R>())
        }
    }
}

fn not_found<R: Resource>() -> ResourceError {
    ResourceError::NotFound(format!("{} not found", R::TABLE.label))
}

/// Turns query parameters into equality conditions, in declaration order.
pub fn list_conditions(
    spec: &TableSpec,
    params: &HashMap<String, String>,
) -> Result<Vec<(&'static str, SqlValue)>, ValidationError> {
    let mut conditions = Vec::new();
    for filter in spec.filters {
        let Some(raw) = params.get(filter.param) else {
            continue;
        };
        let value = match filter.kind {
            FilterKind::Uuid => Uuid::parse_str(raw.trim())
                .map(SqlValue::from)
                .map_err(|_| ValidationError::invalid(filter.param, format!("{} must be a UUID", filter.param)))?,
            FilterKind::Bool => match raw.trim() {
                "true" => SqlValue::Bool(true),
                "false" => SqlValue::Bool(false),
                _ => {
                    return Err(ValidationError::invalid(
                        filter.param,
                        format!("{} must be true or false", filter.param),
                    ))
                }
            },
            FilterKind::Text => SqlValue::from(raw.to_string()),
        };
        conditions.push((filter.column, value));
    }
    Ok(conditions)
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validate::{self, ValidationError};
use super::{Ownership, Resource, UserRef, USER_REF_COLUMNS};
use crate::database::query_builder::{
    Changeset, FilterKind, ListFilter, Relation, SortDirection, TableSpec,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct UseCase {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image: String,
    pub user_id: Uuid,
    pub author: Option<UserRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUseCase {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    /// Always taken from the session, never from the body.
    #[serde(skip)]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUseCase {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl Resource for UseCase {
    const TABLE: TableSpec = TableSpec {
        table: "use_cases",
        label: "Use case",
        columns: &["id", "title", "description", "image", "user_id", "created_at", "updated_at"],
        relations: &[Relation::BelongsTo {
            field: "author",
            table: "users",
            foreign_key: "user_id",
            columns: USER_REF_COLUMNS,
        }],
        children: &[],
        filters: &[ListFilter { param: "userId", column: "user_id", kind: FilterKind::Uuid }],
        order_by: ("created_at", SortDirection::Desc),
    };

    const OWNERSHIP: Ownership = Ownership::RequiresSession;

    type Create = CreateUseCase;
    type Update = UpdateUseCase;

    fn create_changeset(input: CreateUseCase) -> Result<Changeset, ValidationError> {
        let mut cs = Changeset::new();
        cs.set("title", validate::required_text("title", input.title)?)
            .set("description", validate::required_text("description", input.description)?)
            .set("image", validate::required_url("image", input.image)?)
            .set("user_id", input.user_id.ok_or_else(|| ValidationError::required("userId"))?);
        Ok(cs)
    }

    fn update_changeset(input: UpdateUseCase) -> Result<Changeset, ValidationError> {
        let mut cs = Changeset::new();
        cs.set_some("title", validate::non_empty_text("title", input.title)?)
            .set_some("description", validate::non_empty_text("description", input.description)?)
            .set_some("image", validate::non_empty_url("image", input.image)?);
        Ok(cs)
    }

    fn assign_owner(input: &mut CreateUseCase, user_id: Uuid) {
        input.user_id = Some(user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_cannot_choose_the_owner() {
        let input: CreateUseCase = serde_json::from_value(serde_json::json!({
            "title": "t",
            "description": "d",
            "image": "https://cdn/i.png",
            "user_id": "7d3b1e52-3c1e-4e55-9d5c-1a2b3c4d5e6f"
        }))
        .unwrap();
        assert!(input.user_id.is_none());
        assert_eq!(UseCase::create_changeset(input).unwrap_err().field, "userId");
    }

    #[test]
    fn session_owner_is_written() {
        let owner = Uuid::new_v4();
        let mut input = CreateUseCase {
            title: Some("t".into()),
            description: Some("d".into()),
            image: Some("https://cdn/i.png".into()),
            user_id: None,
        };
        UseCase::assign_owner(&mut input, owner);
        let cs = UseCase::create_changeset(input).unwrap();
        assert!(cs.get("user_id").is_some());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validate::{self, ValidationError};
use super::{CategoryRef, Ownership, Resource, UserRef, CATEGORY_COLUMNS, USER_REF_COLUMNS};
use crate::database::query_builder::{
    Changeset, FilterKind, ListFilter, Relation, SortDirection, TableSpec,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Blog {
    pub id: Uuid,
    pub title: String,
    /// Rich HTML body
    pub content: String,
    pub published: bool,
    pub tags: Vec<String>,
    /// Cover image
    pub url: Option<String>,
    pub category_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub category: Option<CategoryRef>,
    pub author: Option<UserRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlog {
    pub title: Option<String>,
    pub content: Option<String>,
    pub published: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub url: Option<String>,
    pub category_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlog {
    pub title: Option<String>,
    pub content: Option<String>,
    pub published: Option<bool>,
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "validate::nullable")]
    pub url: Option<Option<String>>,
    /// `null` disconnects the category.
    #[serde(default, deserialize_with = "validate::nullable")]
    pub category_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "validate::nullable")]
    pub user_id: Option<Option<Uuid>>,
}

impl Resource for Blog {
    const TABLE: TableSpec = TableSpec {
        table: "blogs",
        label: "Blog",
        columns: &[
            "id", "title", "content", "published", "tags", "url", "category_id", "user_id",
            "created_at", "updated_at",
        ],
        relations: &[
            Relation::BelongsTo {
                field: "category",
                table: "categories",
                foreign_key: "category_id",
                columns: CATEGORY_COLUMNS,
            },
            Relation::BelongsTo {
                field: "author",
                table: "users",
                foreign_key: "user_id",
                columns: USER_REF_COLUMNS,
            },
        ],
        children: &[],
        filters: &[
            ListFilter { param: "categoryId", column: "category_id", kind: FilterKind::Uuid },
            ListFilter { param: "userId", column: "user_id", kind: FilterKind::Uuid },
            ListFilter { param: "published", column: "published", kind: FilterKind::Bool },
        ],
        order_by: ("created_at", SortDirection::Desc),
    };

    const OWNERSHIP: Ownership = Ownership::DefaultsToSession;

    type Create = CreateBlog;
    type Update = UpdateBlog;

    fn create_changeset(input: CreateBlog) -> Result<Changeset, ValidationError> {
        let mut cs = Changeset::new();
        cs.set("title", validate::required_text("title", input.title)?)
            .set("content", validate::required_text("content", input.content)?)
            .set("published", input.published.unwrap_or(false))
            .set("tags", validate::string_list(input.tags.unwrap_or_default()))
            .set_some("url", validate::url("url", input.url)?)
            .set_some("category_id", input.category_id)
            .set_some("user_id", input.user_id);
        Ok(cs)
    }

    fn update_changeset(input: UpdateBlog) -> Result<Changeset, ValidationError> {
        let mut cs = Changeset::new();
        cs.set_some("title", validate::non_empty_text("title", input.title)?)
            .set_some("content", validate::non_empty_text("content", input.content)?)
            .set_some("published", input.published)
            .set_some("tags", input.tags.map(validate::string_list))
            .set_nullable("url", validate::clearable_url("url", input.url)?)
            .set_nullable("category_id", input.category_id)
            .set_nullable("user_id", input.user_id);
        Ok(cs)
    }

    fn assign_owner(input: &mut CreateBlog, user_id: Uuid) {
        input.user_id.get_or_insert(user_id);
    }
}

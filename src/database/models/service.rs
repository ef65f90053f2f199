use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validate::{self, ValidationError};
use super::{CategoryRef, Resource, CATEGORY_COLUMNS};
use crate::database::query_builder::{
    Changeset, FilterKind, ListFilter, Relation, SortDirection, TableSpec,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Service {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image: String,
    pub cursor_image: Option<String>,
    pub cursor_hover_image: Option<String>,
    pub category_id: Uuid,
    pub category: Option<CategoryRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateService {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub cursor_image: Option<String>,
    pub cursor_hover_image: Option<String>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateService {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    #[serde(default, deserialize_with = "validate::nullable")]
    pub cursor_image: Option<Option<String>>,
    #[serde(default, deserialize_with = "validate::nullable")]
    pub cursor_hover_image: Option<Option<String>>,
    pub category_id: Option<Uuid>,
}

impl Resource for Service {
    const TABLE: TableSpec = TableSpec {
        table: "services",
        label: "Service",
        columns: &[
            "id", "title", "description", "image", "cursor_image", "cursor_hover_image",
            "category_id", "created_at", "updated_at",
        ],
        relations: &[Relation::BelongsTo {
            field: "category",
            table: "categories",
            foreign_key: "category_id",
            columns: CATEGORY_COLUMNS,
        }],
        children: &[],
        filters: &[ListFilter { param: "categoryId", column: "category_id", kind: FilterKind::Uuid }],
        order_by: ("created_at", SortDirection::Desc),
    };

    type Create = CreateService;
    type Update = UpdateService;

    fn create_changeset(input: CreateService) -> Result<Changeset, ValidationError> {
        let mut cs = Changeset::new();
        cs.set("title", validate::required_text("title", input.title)?)
            .set("description", validate::required_text("description", input.description)?)
            .set("image", validate::required_url("image", input.image)?)
            .set_some("cursor_image", validate::url("cursorImage", input.cursor_image)?)
            .set_some("cursor_hover_image", validate::url("cursorHoverImage", input.cursor_hover_image)?)
            .set("category_id", input.category_id.ok_or_else(|| ValidationError::required("categoryId"))?);
        Ok(cs)
    }

    fn update_changeset(input: UpdateService) -> Result<Changeset, ValidationError> {
        let mut cs = Changeset::new();
        cs.set_some("title", validate::non_empty_text("title", input.title)?)
            .set_some("description", validate::non_empty_text("description", input.description)?)
            .set_some("image", validate::non_empty_url("image", input.image)?)
            .set_nullable("cursor_image", validate::clearable_url("cursorImage", input.cursor_image)?)
            .set_nullable(
                "cursor_hover_image",
                validate::clearable_url("cursorHoverImage", input.cursor_hover_image)?,
            )
            .set_some("category_id", input.category_id);
        Ok(cs)
    }
}

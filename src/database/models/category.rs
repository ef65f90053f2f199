use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validate::{self, ValidationError};
use super::Resource;
use crate::database::query_builder::{Changeset, FilterKind, ListFilter, SortDirection, TableSpec};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    /// Owning domain, e.g. "blog", "service", "porfolio"
    pub category_for: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategory {
    pub name: Option<String>,
    pub category_for: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub category_for: Option<String>,
}

impl Resource for Category {
    const TABLE: TableSpec = TableSpec {
        table: "categories",
        label: "Category",
        columns: &["id", "name", "category_for", "created_at", "updated_at"],
        relations: &[],
        children: &[],
        filters: &[ListFilter { param: "categoryFor", column: "category_for", kind: FilterKind::Text }],
        order_by: ("created_at", SortDirection::Desc),
    };

    type Create = CreateCategory;
    type Update = UpdateCategory;

    fn create_changeset(input: CreateCategory) -> Result<Changeset, ValidationError> {
        let mut cs = Changeset::new();
        cs.set("name", validate::required_text("name", input.name)?)
            .set("category_for", validate::required_text("categoryFor", input.category_for)?);
        Ok(cs)
    }

    fn update_changeset(input: UpdateCategory) -> Result<Changeset, ValidationError> {
        let mut cs = Changeset::new();
        cs.set_some("name", validate::non_empty_text("name", input.name)?)
            .set_some("category_for", validate::non_empty_text("categoryFor", input.category_for)?);
        Ok(cs)
    }
}

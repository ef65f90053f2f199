use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validate::{self, ValidationError};
use super::Resource;
use crate::database::query_builder::{Changeset, SortDirection, TableSpec};

/// Registry entry for an uploaded asset. Deleting the row leaves the
/// stored asset alone; see `AssetStore::destroy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Media {
    pub id: Uuid,
    pub url: String,
    pub public_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMedia {
    pub url: Option<String>,
    pub public_id: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMedia {
    pub url: Option<String>,
    pub public_id: Option<String>,
    pub title: Option<String>,
}

impl Resource for Media {
    const TABLE: TableSpec = TableSpec {
        table: "media",
        label: "Media",
        columns: &["id", "url", "public_id", "title", "created_at", "updated_at"],
        relations: &[],
        children: &[],
        filters: &[],
        order_by: ("created_at", SortDirection::Desc),
    };

    type Create = CreateMedia;
    type Update = UpdateMedia;

    fn create_changeset(input: CreateMedia) -> Result<Changeset, ValidationError> {
        let mut cs = Changeset::new();
        cs.set("url", validate::required_url("url", input.url)?)
            .set("public_id", validate::required_text("publicId", input.public_id)?)
            .set("title", validate::required_text("title", input.title)?);
        Ok(cs)
    }

    fn update_changeset(input: UpdateMedia) -> Result<Changeset, ValidationError> {
        let mut cs = Changeset::new();
        cs.set_some("url", validate::non_empty_url("url", input.url)?)
            .set_some("public_id", validate::non_empty_text("publicId", input.public_id)?)
            .set_some("title", validate::non_empty_text("title", input.title)?);
        Ok(cs)
    }
}

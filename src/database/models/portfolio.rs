use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validate::{self, ValidationError};
use super::{CategoryRef, Resource, CATEGORY_COLUMNS};
use crate::database::query_builder::{
    Changeset, ChildTable, FilterKind, ListFilter, Relation, SortDirection, TableSpec,
};

pub const SCREENSHOTS: ChildTable = ChildTable {
    table: "screenshots",
    foreign_key: "portfolio_id",
    value_column: "url",
    position_column: "position",
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Portfolio {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub live_demo_url: Option<String>,
    pub github_url: Option<String>,
    pub category_id: Uuid,
    pub category: Option<CategoryRef>,
    pub screenshots: Vec<Screenshot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screenshot {
    pub id: Uuid,
    pub url: String,
    pub position: i32,
}

/// Create payload. Arrives either as JSON or as the multipart form parsed by
/// the portfolio handler.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePortfolio {
    pub title: Option<String>,
    pub description: Option<String>,
    pub technologies: Option<Vec<String>>,
    #[serde(alias = "liveUrl")]
    pub live_demo_url: Option<String>,
    #[serde(alias = "repoUrl")]
    pub github_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePortfolio {
    pub title: Option<String>,
    pub description: Option<String>,
    pub technologies: Option<Vec<String>>,
    #[serde(alias = "liveUrl", default, deserialize_with = "validate::nullable")]
    pub live_demo_url: Option<Option<String>>,
    #[serde(alias = "repoUrl", default, deserialize_with = "validate::nullable")]
    pub github_url: Option<Option<String>>,
    pub category_id: Option<Uuid>,
    /// Present → the screenshot collection is replaced wholesale.
    pub images: Option<Vec<String>>,
}

impl From<CreatePortfolio> for UpdatePortfolio {
    fn from(c: CreatePortfolio) -> Self {
        Self {
            title: c.title,
            description: c.description,
            technologies: c.technologies,
            live_demo_url: c.live_demo_url.map(Some),
            github_url: c.github_url.map(Some),
            category_id: c.category_id,
            images: c.images,
        }
    }
}

fn screenshot_urls(images: Vec<String>) -> Result<Vec<String>, ValidationError> {
    validate::string_list(images)
        .into_iter()
        .map(|image| validate::required_url("images", Some(image)))
        .collect()
}

impl Resource for Portfolio {
    const TABLE: TableSpec = TableSpec {
        table: "portfolios",
        label: "Portfolio",
        columns: &[
            "id", "title", "description", "technologies", "live_demo_url", "github_url",
            "category_id", "created_at", "updated_at",
        ],
        relations: &[
            Relation::BelongsTo {
                field: "category",
                table: "categories",
                foreign_key: "category_id",
                columns: CATEGORY_COLUMNS,
            },
            Relation::HasMany {
                field: "screenshots",
                table: "screenshots",
                foreign_key: "portfolio_id",
                columns: &["id", "url", "position"],
                order_by: "position",
            },
        ],
        children: &[SCREENSHOTS],
        filters: &[ListFilter { param: "categoryId", column: "category_id", kind: FilterKind::Uuid }],
        order_by: ("created_at", SortDirection::Desc),
    };

    type Create = CreatePortfolio;
    type Update = UpdatePortfolio;

    fn create_changeset(input: CreatePortfolio) -> Result<Changeset, ValidationError> {
        let mut cs = Changeset::new();
        cs.set("title", validate::required_text("title", input.title)?)
            .set("description", validate::required_text("description", input.description)?)
            .set("technologies", validate::string_list(input.technologies.unwrap_or_default()))
            .set_some("live_demo_url", validate::url("liveDemoUrl", input.live_demo_url)?)
            .set_some("github_url", validate::url("githubUrl", input.github_url)?)
            .set("category_id", input.category_id.ok_or_else(|| ValidationError::required("categoryId"))?);
        if let Some(images) = input.images {
            cs.replace_children(SCREENSHOTS, screenshot_urls(images)?);
        }
        Ok(cs)
    }

    fn update_changeset(input: UpdatePortfolio) -> Result<Changeset, ValidationError> {
        let mut cs = Changeset::new();
        cs.set_some("title", validate::non_empty_text("title", input.title)?)
            .set_some("description", validate::non_empty_text("description", input.description)?)
            .set_some("technologies", input.technologies.map(validate::string_list))
            .set_nullable("live_demo_url", validate::clearable_url("liveDemoUrl", input.live_demo_url)?)
            .set_nullable("github_url", validate::clearable_url("githubUrl", input.github_url)?)
            .set_some("category_id", input.category_id);
        if let Some(images) = input.images {
            cs.replace_children(SCREENSHOTS, screenshot_urls(images)?);
        }
        Ok(cs)
    }
}

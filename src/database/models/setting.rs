use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validate::{self, ValidationError};
use super::Resource;
use crate::database::query_builder::{Changeset, SortDirection, TableSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteMode {
    Light,
    Dark,
    System,
}

impl SiteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteMode::Light => "light",
            SiteMode::Dark => "dark",
            SiteMode::System => "system",
        }
    }

    pub fn parse(field: &str, value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(SiteMode::Light),
            "dark" => Ok(SiteMode::Dark),
            "system" => Ok(SiteMode::System),
            _ => Err(ValidationError::invalid(field, "mode must be one of light, dark, system")),
        }
    }
}

/// Site configuration. The table is expected to hold zero or one row;
/// nothing enforces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Setting {
    pub id: Uuid,
    pub site_name: String,
    pub site_url: String,
    pub site_logo: Option<String>,
    pub site_favicon: Option<String>,
    pub mode: SiteMode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSetting {
    pub site_name: Option<String>,
    pub site_url: Option<String>,
    pub site_logo: Option<String>,
    pub site_favicon: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSetting {
    pub site_name: Option<String>,
    pub site_url: Option<String>,
    #[serde(default, deserialize_with = "validate::nullable")]
    pub site_logo: Option<Option<String>>,
    #[serde(default, deserialize_with = "validate::nullable")]
    pub site_favicon: Option<Option<String>>,
    pub mode: Option<String>,
}

impl Resource for Setting {
    const TABLE: TableSpec = TableSpec {
        table: "settings",
        label: "Setting",
        columns: &[
            "id", "site_name", "site_url", "site_logo", "site_favicon", "mode", "created_at",
            "updated_at",
        ],
        relations: &[],
        children: &[],
        filters: &[],
        order_by: ("created_at", SortDirection::Asc),
    };

    type Create = CreateSetting;
    type Update = UpdateSetting;

    fn create_changeset(input: CreateSetting) -> Result<Changeset, ValidationError> {
        let mode = validate::required_text("mode", input.mode)?;
        let mut cs = Changeset::new();
        cs.set("site_name", validate::required_text("siteName", input.site_name)?)
            .set("site_url", validate::required_url("siteUrl", input.site_url)?)
            .set_some("site_logo", validate::url("siteLogo", input.site_logo)?)
            .set_some("site_favicon", validate::url("siteFavicon", input.site_favicon)?)
            .set("mode", SiteMode::parse("mode", &mode)?.as_str().to_string());
        Ok(cs)
    }

    fn update_changeset(input: UpdateSetting) -> Result<Changeset, ValidationError> {
        let mode = input
            .mode
            .map(|m| SiteMode::parse("mode", &m))
            .transpose()?
            .map(|m| m.as_str().to_string());

        let mut cs = Changeset::new();
        cs.set_some("site_name", validate::non_empty_text("siteName", input.site_name)?)
            .set_some("site_url", validate::non_empty_url("siteUrl", input.site_url)?)
            .set_nullable("site_logo", validate::clearable_url("siteLogo", input.site_logo)?)
            .set_nullable("site_favicon", validate::clearable_url("siteFavicon", input.site_favicon)?)
            .set_some("mode", mode);
        Ok(cs)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validate::{self, ValidationError};
use super::Resource;
use crate::database::query_builder::{Changeset, SortDirection, TableSpec};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub image: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateTeam {
    pub name: Option<String>,
    pub role: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTeam {
    pub name: Option<String>,
    pub role: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
}

impl Resource for Team {
    const TABLE: TableSpec = TableSpec {
        table: "teams",
        label: "Team",
        columns: &["id", "name", "role", "image", "description", "created_at", "updated_at"],
        relations: &[],
        children: &[],
        filters: &[],
        order_by: ("created_at", SortDirection::Desc),
    };

    type Create = CreateTeam;
    type Update = UpdateTeam;

    fn create_changeset(input: CreateTeam) -> Result<Changeset, ValidationError> {
        let mut cs = Changeset::new();
        cs.set("name", validate::required_text("name", input.name)?)
            .set("role", validate::required_text("role", input.role)?)
            .set("image", validate::required_url("image", input.image)?)
            .set("description", validate::required_text("description", input.description)?);
        Ok(cs)
    }

    fn update_changeset(input: UpdateTeam) -> Result<Changeset, ValidationError> {
        let mut cs = Changeset::new();
        cs.set_some("name", validate::non_empty_text("name", input.name)?)
            .set_some("role", validate::non_empty_text("role", input.role)?)
            .set_some("image", validate::non_empty_url("image", input.image)?)
            .set_some("description", validate::non_empty_text("description", input.description)?);
        Ok(cs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_fields_required_on_create() {
        let err = Team::create_changeset(CreateTeam {
            name: Some("Ada".into()),
            role: Some("Engineer".into()),
            image: Some("https://cdn/ada.png".into()),
            description: None,
        })
        .unwrap_err();
        assert_eq!(err.field, "description");
    }

    #[test]
    fn update_rejects_blank_name() {
        let err = Team::update_changeset(UpdateTeam {
            name: Some("  ".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.field, "name");
    }
}
